//! In-memory [`ImageBackend`].
//!
//! Holds images and snapshots in process, records every call in order and
//! can be told to fail specific operations. Filters are accepted but not
//! applied; whatever is loaded is what a listing returns.
//!
//! Useful for:
//! - Exercising the pruner without a provider account
//! - Asserting the exact sequence of provider calls in tests

use crate::backend::ImageBackend;
use crate::error::BackupError;
use crate::timestamp::format_creation_date;
use crate::types::{BackupRecord, FilterSet, SnapshotRecord};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Backend operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ListImages,
    CreateImage,
    DeregisterImage,
    ListSnapshots,
    DeleteSnapshot,
}

/// A call as the backend received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListImages,
    CreateImage { name: String, instance_id: String },
    DeregisterImage { id: String, dry_run: bool },
    ListSnapshots,
    DeleteSnapshot { id: String, dry_run: bool },
}

#[derive(Debug, Clone)]
struct Failure {
    op: Op,
    /// `None` fails every call of `op`.
    target: Option<String>,
    message: String,
}

#[derive(Debug, Default)]
struct Inner {
    images: Vec<BackupRecord>,
    snapshots: Vec<SnapshotRecord>,
    calls: Vec<Call>,
    failures: Vec<Failure>,
    created: u64,
}

impl Inner {
    fn check(&self, op: Op, target: Option<&str>) -> Result<(), BackupError> {
        let hit = self.failures.iter().find(|f| {
            f.op == op
                && match (&f.target, target) {
                    (None, _) => true,
                    (Some(want), Some(got)) => want == got,
                    (Some(_), None) => false,
                }
        });
        match hit {
            Some(f) => Err(BackupError::Provider(f.message.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_images(self, images: Vec<BackupRecord>) -> Self {
        self.lock().images = images;
        self
    }

    pub fn with_snapshots(self, snapshots: Vec<SnapshotRecord>) -> Self {
        self.lock().snapshots = snapshots;
        self
    }

    /// Make every call of `op` fail with `message`.
    pub fn fail(self, op: Op, message: impl Into<String>) -> Self {
        self.lock().failures.push(Failure {
            op,
            target: None,
            message: message.into(),
        });
        self
    }

    /// Make calls of `op` on `id` fail with `message`.
    ///
    /// `id` is the image id for `DeregisterImage`, the snapshot id for
    /// `DeleteSnapshot`, and the source instance id for `CreateImage`.
    /// Listings have no target; use [`fail`](Self::fail) for those.
    pub fn fail_on(self, op: Op, id: impl Into<String>, message: impl Into<String>) -> Self {
        self.lock().failures.push(Failure {
            op,
            target: Some(id.into()),
            message: message.into(),
        });
        self
    }

    pub fn images(&self) -> Vec<BackupRecord> {
        self.lock().images.clone()
    }

    pub fn snapshots(&self) -> Vec<SnapshotRecord> {
        self.lock().snapshots.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Ids passed to `deregister_image`, in call order.
    pub fn deregistered(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::DeregisterImage { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids passed to `delete_snapshot`, in call order.
    pub fn deleted_snapshots(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::DeleteSnapshot { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageBackend for MemoryBackend {
    async fn list_images(&self, _filter: &FilterSet) -> Result<Vec<BackupRecord>, BackupError> {
        let mut inner = self.lock();
        inner.calls.push(Call::ListImages);
        inner.check(Op::ListImages, None)?;
        Ok(inner.images.clone())
    }

    async fn create_image(
        &self,
        name: &str,
        instance_id: &str,
        _description: &str,
    ) -> Result<String, BackupError> {
        let mut inner = self.lock();
        inner.calls.push(Call::CreateImage {
            name: name.to_string(),
            instance_id: instance_id.to_string(),
        });
        inner.check(Op::CreateImage, Some(instance_id))?;

        inner.created += 1;
        let id = format!("ami-mem{:08x}", inner.created);
        inner.images.push(BackupRecord::new(
            id.clone(),
            name,
            format_creation_date(chrono::Utc::now()),
        ));
        // Same description shape EC2 writes on image snapshots.
        let snap_id = format!("snap-mem{:08x}", inner.created);
        inner.snapshots.push(SnapshotRecord::new(
            snap_id,
            format!("Created by CreateImage({}) for {}", instance_id, id),
        ));
        Ok(id)
    }

    async fn deregister_image(&self, image_id: &str, dry_run: bool) -> Result<(), BackupError> {
        let mut inner = self.lock();
        inner.calls.push(Call::DeregisterImage {
            id: image_id.to_string(),
            dry_run,
        });
        inner.check(Op::DeregisterImage, Some(image_id))?;

        let Some(pos) = inner.images.iter().position(|i| i.id == image_id) else {
            return Err(BackupError::Provider(format!(
                "image {} does not exist",
                image_id
            )));
        };
        if !dry_run {
            inner.images.remove(pos);
        }
        Ok(())
    }

    async fn list_snapshots(
        &self,
        _filter: &FilterSet,
    ) -> Result<Vec<SnapshotRecord>, BackupError> {
        let mut inner = self.lock();
        inner.calls.push(Call::ListSnapshots);
        inner.check(Op::ListSnapshots, None)?;
        Ok(inner.snapshots.clone())
    }

    async fn delete_snapshot(&self, snapshot_id: &str, dry_run: bool) -> Result<(), BackupError> {
        let mut inner = self.lock();
        inner.calls.push(Call::DeleteSnapshot {
            id: snapshot_id.to_string(),
            dry_run,
        });
        inner.check(Op::DeleteSnapshot, Some(snapshot_id))?;

        let Some(pos) = inner.snapshots.iter().position(|s| s.id == snapshot_id) else {
            return Err(BackupError::Provider(format!(
                "snapshot {} does not exist",
                snapshot_id
            )));
        };
        if !dry_run {
            inner.snapshots.remove(pos);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_registers_image_and_snapshot() {
        let backend = MemoryBackend::new();
        let id = backend
            .create_image("web.20240101000000", "i-1", "nightly")
            .await
            .unwrap();

        let images = backend.images();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, id);
        assert_eq!(images[0].name, "web.20240101000000");

        let snaps = backend.snapshots();
        assert_eq!(snaps.len(), 1);
        assert!(snaps[0].description_or_empty().contains(&id));
    }

    #[tokio::test]
    async fn test_dry_run_keeps_records() {
        let backend = MemoryBackend::new()
            .with_images(vec![BackupRecord::new("ami-1", "web.1", "2024-01-01T00:00:00Z")])
            .with_snapshots(vec![SnapshotRecord::new("snap-1", "for ami-1")]);

        backend.deregister_image("ami-1", true).await.unwrap();
        backend.delete_snapshot("snap-1", true).await.unwrap();
        assert_eq!(backend.images().len(), 1);
        assert_eq!(backend.snapshots().len(), 1);

        backend.deregister_image("ami-1", false).await.unwrap();
        backend.delete_snapshot("snap-1", false).await.unwrap();
        assert!(backend.images().is_empty());
        assert!(backend.snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_targeted_failure() {
        let backend = MemoryBackend::new()
            .with_images(vec![
                BackupRecord::new("ami-1", "web.1", "2024-01-01T00:00:00Z"),
                BackupRecord::new("ami-2", "web.2", "2024-01-01T00:00:00Z"),
            ])
            .fail_on(Op::DeregisterImage, "ami-2", "InvalidAMIID.Unavailable");

        assert!(backend.deregister_image("ami-1", false).await.is_ok());
        let err = backend.deregister_image("ami-2", false).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "provider request failed: InvalidAMIID.Unavailable"
        );
        assert_eq!(backend.deregistered(), vec!["ami-1", "ami-2"]);
    }

    #[tokio::test]
    async fn test_create_failure_targets_instance() {
        let backend = MemoryBackend::new().fail_on(
            Op::CreateImage,
            "i-bad",
            "InvalidInstanceID.NotFound",
        );

        assert!(backend.create_image("web.1", "i-good", "nightly").await.is_ok());
        let err = backend
            .create_image("web.2", "i-bad", "nightly")
            .await
            .unwrap_err();
        assert_eq!(err.cause_text(), "InvalidInstanceID.NotFound");
        assert_eq!(backend.images().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_record_is_an_error() {
        let backend = MemoryBackend::new();
        assert!(backend.deregister_image("ami-x", false).await.is_err());
        assert!(backend.delete_snapshot("snap-x", false).await.is_err());
    }
}
