//! Run configuration.
//!
//! Filters come from a small YAML file:
//!
//! ```yaml
//! filters:
//!   - key: owner-id
//!     values: ["533779774295"]
//!   - key: tag:Backup
//!     values: ["nightly"]
//! ```
//!
//! Everything else is passed in explicitly; nothing here reads globals.

use crate::error::BackupError;
use crate::retention::RetentionPolicy;
use crate::types::{Filter, FilterSet};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum length of the base image name, before the stamp is appended.
pub const MIN_IMAGE_NAME_LEN: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Contents of the filter file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl FilterConfig {
    pub fn from_yaml(content: &str) -> Result<Self, BackupError> {
        serde_yaml::from_str(content)
            .map_err(|e| BackupError::Config(format!("invalid filter config: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BackupError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// One provider filter per rule, in file order.
    pub fn into_filter_set(self) -> FilterSet {
        self.filters
            .into_iter()
            .map(|r| Filter::new(r.key, r.values))
            .collect()
    }
}

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Description attached to every created image.
    pub description: String,
    /// What gets pruned after the image is created.
    pub policy: RetentionPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            description: "Automated instance backup".to_string(),
            policy: RetentionPolicy::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Reject inputs the provider would accept but the rotation can't work with.
pub fn validate_request(instance_id: &str, image_name: &str) -> Result<(), BackupError> {
    if instance_id.trim().is_empty() {
        return Err(BackupError::Config("instance id must not be empty".into()));
    }
    if image_name.chars().count() < MIN_IMAGE_NAME_LEN {
        return Err(BackupError::Config(format!(
            "image name must be at least {} characters, got {:?}",
            MIN_IMAGE_NAME_LEN, image_name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_filters_translate_in_order() {
        let cfg = FilterConfig::from_yaml(
            r#"
filters:
  - key: owner-id
    values: ["533779774295"]
  - key: tag:Backup
    values:
      - nightly
      - weekly
"#,
        )
        .unwrap();

        let set = cfg.into_filter_set();
        assert_eq!(set.filters().len(), 2);
        assert_eq!(set.filters()[0], Filter::new("owner-id", ["533779774295"]));
        assert_eq!(set.filters()[1], Filter::new("tag:Backup", ["nightly", "weekly"]));
    }

    #[test]
    fn test_empty_config() {
        assert!(FilterConfig::from_yaml("{}").unwrap().into_filter_set().is_empty());
        assert!(FilterConfig::from_yaml("filters: []")
            .unwrap()
            .into_filter_set()
            .is_empty());
    }

    #[test]
    fn test_bad_yaml() {
        let err = FilterConfig::from_yaml("filters: [key: 1, : :").unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "filters:\n  - key: name\n    values: [\"web.bak.*\"]").unwrap();

        let cfg = FilterConfig::load(file.path()).unwrap();
        assert_eq!(cfg.filters[0].key, "name");
        assert_eq!(cfg.filters[0].values, vec!["web.bak.*"]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilterConfig::load(dir.path().join("nope.yml")).unwrap_err();
        assert!(err.to_string().contains("nope.yml"));
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_request("i-0abc", "web1").is_ok());
        assert!(validate_request("", "web1").is_err());
        assert!(validate_request("i-0abc", "web").is_err());
        // Counted in characters, not bytes.
        assert!(validate_request("i-0abc", "ééé").is_err());
        assert!(validate_request("i-0abc", "éééé").is_ok());
    }

    #[test]
    fn test_default_workflow_config() {
        let cfg = WorkflowConfig::default();
        assert_eq!(cfg.policy.max_age_seconds, 604_800);
        assert!(cfg.policy.filter.is_empty());
    }
}
