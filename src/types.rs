//! Minimal domain types for the backup workflow.
//!
//! These are the records the pruner needs to see from the provider.
//! Nothing more. The provider owns their lifecycle; we only read and
//! delete them.

use serde::{Deserialize, Serialize};

/// A provider-side machine image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: String,
    pub name: String,
    /// Raw creation timestamp as sent by the provider (RFC 3339).
    pub creation_date: String,
}

impl BackupRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        creation_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            creation_date: creation_date.into(),
        }
    }
}

/// Block-storage snapshot backing an image.
///
/// There is no structured link to the image. The provider writes the image
/// id into the description, and that is all we have to go on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: String,
    pub description: Option<String>,
}

impl SnapshotRecord {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: Some(description.into()),
        }
    }

    /// Description for messages; empty when the provider sent none.
    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// One provider-native filter: a key and the values it may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Filters applied to every list query. Opaque to the pruner; it is handed
/// to the backend as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet(pub Vec<Filter>);

impl FilterSet {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self(filters)
    }

    pub fn filters(&self) -> &[Filter] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Filter> for FilterSet {
    fn from_iter<T: IntoIterator<Item = Filter>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// What a prune pass removed, in deletion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Images found expired and deregistered.
    pub deregistered: Vec<BackupRecord>,
    /// Snapshots deleted alongside them.
    pub deleted_snapshots: Vec<SnapshotRecord>,
    /// Records that were listed but kept (current, foreign series, or young).
    pub retained: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_description_or_empty() {
        let snap = SnapshotRecord::new("snap-1", "from ami-1");
        assert_eq!(snap.description_or_empty(), "from ami-1");

        let bare = SnapshotRecord {
            id: "snap-2".into(),
            description: None,
        };
        assert_eq!(bare.description_or_empty(), "");
    }

    #[test]
    fn test_filter_set_collects_in_order() {
        let set: FilterSet = vec![
            Filter::new("owner-id", ["533779774295"]),
            Filter::new("tag:Env", ["prod", "staging"]),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.filters().len(), 2);
        assert_eq!(set.filters()[0].key, "owner-id");
        assert_eq!(set.filters()[1].values, vec!["prod", "staging"]);
        assert!(!set.is_empty());
        assert!(FilterSet::default().is_empty());
    }
}
