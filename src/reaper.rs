//! Snapshot reaper.
//!
//! Deleting an image leaves its block-storage snapshot behind. The reaper
//! finds that snapshot by description and deletes it too.

use crate::backend::ImageBackend;
use crate::error::BackupError;
use crate::matching::{Matcher, SubstringMatcher};
use crate::types::{FilterSet, SnapshotRecord};
use tracing::{debug, info};

pub struct SnapshotReaper<'a, B: ImageBackend, M: Matcher = SubstringMatcher> {
    backend: &'a B,
    filter: &'a FilterSet,
    matcher: &'a M,
}

impl<'a, B: ImageBackend, M: Matcher> SnapshotReaper<'a, B, M> {
    pub fn new(backend: &'a B, filter: &'a FilterSet, matcher: &'a M) -> Self {
        Self {
            backend,
            filter,
            matcher,
        }
    }

    /// Delete the first snapshot backing `image_id`.
    ///
    /// Returns the deleted snapshot, or `None` when nothing references the
    /// image. No match is not an error; only the first match is deleted.
    pub async fn reap_snapshot_for(
        &self,
        image_id: &str,
    ) -> Result<Option<SnapshotRecord>, BackupError> {
        let snapshots = self
            .backend
            .list_snapshots(self.filter)
            .await
            .map_err(|e| BackupError::ListSnapshots(e.cause_text()))?;

        let Some(snapshot) = self.matcher.find_snapshot(image_id, &snapshots) else {
            debug!(image_id, "no snapshot references image");
            return Ok(None);
        };

        self.backend
            .delete_snapshot(&snapshot.id, false)
            .await
            .map_err(|e| BackupError::DeleteSnapshot {
                id: snapshot.id.clone(),
                description: snapshot.description_or_empty().to_string(),
                cause: e.cause_text(),
            })?;

        info!(image_id, snapshot_id = %snapshot.id, "deleted snapshot");
        Ok(Some(snapshot.clone()))
    }
}
