//! Backup Workflow
//!
//! One run: create an image of the instance, then prune the series.
//! It's dumb. It stamps a name, calls the backend, and hands the new id
//! to the pruner. No storage, no retries, no state between runs.

use crate::backend::ImageBackend;
use crate::config::{validate_request, WorkflowConfig};
use crate::error::BackupError;
use crate::retention::RetentionPruner;
use crate::timestamp::stamp_name;
use crate::types::PruneReport;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Result of a run where the image was created.
///
/// Creation and pruning are independent outcomes. A failed prune does not
/// undo the backup.
#[derive(Debug)]
pub struct BackupOutcome {
    /// Id of the image created by this run.
    pub image_id: String,
    /// Stamped name the image was created with.
    pub image_name: String,
    /// What the prune pass did, or why it stopped.
    pub prune: Result<PruneReport, BackupError>,
}

impl BackupOutcome {
    pub fn pruned_cleanly(&self) -> bool {
        self.prune.is_ok()
    }
}

/// The backup workflow.
///
/// Parameterized by the backend — you provide the implementation.
pub struct BackupWorkflow<'a, B: ImageBackend> {
    backend: &'a B,
    config: WorkflowConfig,
}

impl<'a, B: ImageBackend> BackupWorkflow<'a, B> {
    pub fn new(backend: &'a B, config: WorkflowConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Back up `instance_id` as `<base_name>.<stamp>` and prune the series.
    ///
    /// `Err` means nothing was created. Pruning failures come back inside
    /// the `Ok` outcome.
    pub async fn run(
        &self,
        instance_id: &str,
        base_name: &str,
    ) -> Result<BackupOutcome, BackupError> {
        self.run_at(instance_id, base_name, Utc::now()).await
    }

    /// Like [`run`](Self::run) with an explicit clock for stamping and aging.
    pub async fn run_at(
        &self,
        instance_id: &str,
        base_name: &str,
        now: DateTime<Utc>,
    ) -> Result<BackupOutcome, BackupError> {
        validate_request(instance_id, base_name)?;

        let image_name = stamp_name(base_name, now);
        let image_id = self.create(instance_id, &image_name).await?;

        let pruner = RetentionPruner::new(self.backend, &self.config.policy, base_name);
        let prune = pruner.prune_at(&image_id, now).await;
        match &prune {
            Ok(report) => info!(
                deregistered = report.deregistered.len(),
                snapshots = report.deleted_snapshots.len(),
                retained = report.retained,
                "prune complete"
            ),
            Err(e) => warn!(error = %e, "prune stopped"),
        }

        Ok(BackupOutcome {
            image_id,
            image_name,
            prune,
        })
    }

    async fn create(&self, instance_id: &str, image_name: &str) -> Result<String, BackupError> {
        info!(instance_id, image_name, "creating image");
        let image_id = self
            .backend
            .create_image(image_name, instance_id, &self.config.description)
            .await
            .map_err(|e| BackupError::Create {
                instance_id: instance_id.to_string(),
                cause: e.cause_text(),
            })?;
        info!(instance_id, image_id = %image_id, "image created");
        Ok(image_id)
    }
}
