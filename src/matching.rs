//! Relationship rules between records.
//!
//! Providers give us no foreign keys. Series membership and the
//! image→snapshot link are both inferred from text, and both inferences
//! live here so the pruner never hard-codes them.

use crate::types::{BackupRecord, SnapshotRecord};

/// Decides which records are related.
pub trait Matcher: Send + Sync {
    /// Whether an image belongs to the rotation series identified by `series`.
    fn in_series(&self, series: &str, image: &BackupRecord) -> bool;

    /// Whether a snapshot backs the image with id `image_id`.
    fn backs_image(&self, image_id: &str, snapshot: &SnapshotRecord) -> bool;

    /// First snapshot in listing order that backs `image_id`.
    fn find_snapshot<'a>(
        &self,
        image_id: &str,
        snapshots: &'a [SnapshotRecord],
    ) -> Option<&'a SnapshotRecord> {
        snapshots.iter().find(|s| self.backs_image(image_id, s))
    }
}

/// Substring rules.
///
/// An image is in the series if its name contains the series base name;
/// a snapshot backs an image if its description contains the image id.
/// Approximate on purpose: `web` also matches `web2.bak`, and a
/// description mentioning two ids matches both.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl Matcher for SubstringMatcher {
    fn in_series(&self, series: &str, image: &BackupRecord) -> bool {
        image.name.contains(series)
    }

    fn backs_image(&self, image_id: &str, snapshot: &SnapshotRecord) -> bool {
        snapshot
            .description
            .as_deref()
            .is_some_and(|d| d.contains(image_id))
    }
}
