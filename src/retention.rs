//! Retention pruner.
//!
//! Lists the images in scope, decides which ones belong to this backup's
//! series and are past the retention window, and deletes them along with
//! their snapshots. Classification runs over the whole listing before the
//! first delete, so a corrupt record aborts the pass with nothing removed.
//!
//! Deletion is fail-fast: the first deregister or snapshot failure stops the
//! pass. Whatever was deleted before it stays deleted.

use crate::backend::ImageBackend;
use crate::error::BackupError;
use crate::matching::{Matcher, SubstringMatcher};
use crate::reaper::SnapshotReaper;
use crate::timestamp::parse_creation_date;
use crate::types::{BackupRecord, FilterSet, PruneReport};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// One week.
pub const DEFAULT_MAX_AGE_SECONDS: u64 = 604_800;

/// Which images are in scope and how old they may get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Images strictly older than this are expired.
    pub max_age_seconds: u64,
    /// Scopes both image and snapshot listings.
    pub filter: FilterSet,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            filter: FilterSet::default(),
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_age_seconds: u64, filter: FilterSet) -> Self {
        Self {
            max_age_seconds,
            filter,
        }
    }

    /// Age exactly at the limit is retained.
    pub fn is_expired(&self, age_seconds: i64) -> bool {
        u64::try_from(age_seconds).is_ok_and(|age| age > self.max_age_seconds)
    }
}

/// Why a listed image was or wasn't selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Created by this run.
    Current,
    /// Name not in this series.
    ForeignSeries,
    /// Inside the retention window.
    Retained { age_seconds: i64 },
    /// Past the retention window.
    Expired { age_seconds: i64 },
}

pub struct RetentionPruner<'a, B: ImageBackend, M: Matcher = SubstringMatcher> {
    backend: &'a B,
    policy: &'a RetentionPolicy,
    series: &'a str,
    matcher: M,
}

impl<'a, B: ImageBackend> RetentionPruner<'a, B> {
    /// Pruner using substring series and snapshot matching.
    pub fn new(backend: &'a B, policy: &'a RetentionPolicy, series: &'a str) -> Self {
        Self::with_matcher(backend, policy, series, SubstringMatcher)
    }
}

impl<'a, B: ImageBackend, M: Matcher> RetentionPruner<'a, B, M> {
    pub fn with_matcher(
        backend: &'a B,
        policy: &'a RetentionPolicy,
        series: &'a str,
        matcher: M,
    ) -> Self {
        Self {
            backend,
            policy,
            series,
            matcher,
        }
    }

    /// Prune against the wall clock.
    pub async fn prune(&self, current_id: &str) -> Result<PruneReport, BackupError> {
        self.prune_at(current_id, Utc::now()).await
    }

    /// Prune as if the current time were `now`.
    pub async fn prune_at(
        &self,
        current_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PruneReport, BackupError> {
        let records = self
            .backend
            .list_images(&self.policy.filter)
            .await
            .map_err(|e| BackupError::ListImages(e.cause_text()))?;

        let expired = self.select_expired(&records, current_id, now)?;
        let mut report = PruneReport {
            retained: records.len() - expired.len(),
            ..Default::default()
        };

        let reaper = SnapshotReaper::new(self.backend, &self.policy.filter, &self.matcher);
        for record in expired {
            self.backend
                .deregister_image(&record.id, false)
                .await
                .map_err(|e| BackupError::Deregister {
                    id: record.id.clone(),
                    name: record.name.clone(),
                    cause: e.cause_text(),
                })?;
            info!(image_id = %record.id, name = %record.name, "deregistered image");
            report.deregistered.push(record.clone());

            let snapshot = reaper
                .reap_snapshot_for(&record.id)
                .await
                .map_err(|e| BackupError::Reap {
                    id: record.id.clone(),
                    name: record.name.clone(),
                    cause: Box::new(e),
                })?;
            report.deleted_snapshots.extend(snapshot);
        }

        Ok(report)
    }

    /// Expired series members other than `current_id`, in listing order.
    ///
    /// Fails on the first series member whose creation date does not parse.
    pub fn select_expired<'r>(
        &self,
        records: &'r [BackupRecord],
        current_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<&'r BackupRecord>, BackupError> {
        let mut expired = Vec::new();
        for record in records {
            let verdict = self.classify(record, current_id, now)?;
            debug!(image_id = %record.id, name = %record.name, ?verdict, "classified image");
            if matches!(verdict, Verdict::Expired { .. }) {
                expired.push(record);
            }
        }
        Ok(expired)
    }

    /// Decide what to do with one listed image.
    pub fn classify(
        &self,
        record: &BackupRecord,
        current_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Verdict, BackupError> {
        if record.id == current_id {
            return Ok(Verdict::Current);
        }
        if !self.matcher.in_series(self.series, record) {
            return Ok(Verdict::ForeignSeries);
        }

        let created = parse_creation_date(&record.creation_date).map_err(|e| {
            BackupError::MalformedRecord {
                id: record.id.clone(),
                value: record.creation_date.clone(),
                cause: e.to_string(),
            }
        })?;
        let age_seconds = now.timestamp() - created.timestamp();

        if self.policy.is_expired(age_seconds) {
            Ok(Verdict::Expired { age_seconds })
        } else {
            Ok(Verdict::Retained { age_seconds })
        }
    }
}
