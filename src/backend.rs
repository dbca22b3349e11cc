//! The One Trait: ImageBackend
//!
//! This is the single abstraction point for the cloud provider.
//! The pruner is pure logic. It doesn't know about SDKs, regions or
//! credentials; that lives in whatever implements this trait.

use crate::error::BackupError;
use crate::types::{BackupRecord, FilterSet, SnapshotRecord};
use std::future::Future;

/// Provider operations the workflow needs.
///
/// Implementations should return [`BackupError::Provider`] for raw
/// failures. Callers wrap them with the operation and record involved.
pub trait ImageBackend: Send + Sync {
    // ═══════════════════════════════════════════════════════════════
    // IMAGES
    // ═══════════════════════════════════════════════════════════════

    /// List images matching the filters, in provider order.
    fn list_images(
        &self,
        filter: &FilterSet,
    ) -> impl Future<Output = Result<Vec<BackupRecord>, BackupError>> + Send;

    /// Create an image of a running instance. Returns the new image id once
    /// the provider has registered it.
    fn create_image(
        &self,
        name: &str,
        instance_id: &str,
        description: &str,
    ) -> impl Future<Output = Result<String, BackupError>> + Send;

    /// Deregister an image.
    fn deregister_image(
        &self,
        image_id: &str,
        dry_run: bool,
    ) -> impl Future<Output = Result<(), BackupError>> + Send;

    // ═══════════════════════════════════════════════════════════════
    // SNAPSHOTS
    // ═══════════════════════════════════════════════════════════════

    /// List snapshots matching the filters, in provider order.
    fn list_snapshots(
        &self,
        filter: &FilterSet,
    ) -> impl Future<Output = Result<Vec<SnapshotRecord>, BackupError>> + Send;

    /// Delete a snapshot.
    fn delete_snapshot(
        &self,
        snapshot_id: &str,
        dry_run: bool,
    ) -> impl Future<Output = Result<(), BackupError>> + Send;
}
