//! Default [`ImageBackend`] backed by the AWS EC2 SDK.
//!
//! # Quick Start
//!
//! ```ignore
//! use instance_backup::{BackupWorkflow, Ec2Client, WorkflowConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Ec2Client::from_region("us-east-1").await;
//! let workflow = BackupWorkflow::new(&client, WorkflowConfig::default());
//! let outcome = workflow.run("i-0123456789abcdef0", "web.bak").await?;
//! println!("{}", outcome.image_id);
//! # Ok(())
//! # }
//! ```
//!
//! Credentials come from the standard AWS provider chain. `DescribeImages`
//! is not restricted to owned images, so the configured filters should
//! include `owner-id` (or similar) to keep public images out of scope.

use crate::backend::ImageBackend;
use crate::error::BackupError;
use crate::types::{BackupRecord, FilterSet, SnapshotRecord};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Filter as Ec2Filter;
use aws_sdk_ec2::Client;

pub struct Ec2Client {
    client: Client,
}

impl Ec2Client {
    /// Load shared AWS config for `region` and build a client.
    pub async fn from_region(region: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.into()))
            .load()
            .await;
        Self::new(Client::new(&config))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }
}

fn to_ec2_filters(filter: &FilterSet) -> Option<Vec<Ec2Filter>> {
    if filter.is_empty() {
        return None;
    }
    Some(
        filter
            .filters()
            .iter()
            .map(|f| {
                Ec2Filter::builder()
                    .name(&f.key)
                    .set_values(Some(f.values.clone()))
                    .build()
            })
            .collect(),
    )
}

fn provider_error<E>(err: E) -> BackupError
where
    E: std::error::Error,
{
    BackupError::Provider(DisplayErrorContext(err).to_string())
}

fn next_page(token: Option<&str>) -> Option<String> {
    token.filter(|t| !t.is_empty()).map(str::to_string)
}

impl ImageBackend for Ec2Client {
    async fn list_images(&self, filter: &FilterSet) -> Result<Vec<BackupRecord>, BackupError> {
        let filters = to_ec2_filters(filter);
        let mut records = Vec::new();
        let mut token = None;

        loop {
            let resp = self
                .client
                .describe_images()
                .set_filters(filters.clone())
                .set_next_token(token)
                .send()
                .await
                .map_err(provider_error)?;

            records.extend(resp.images().iter().map(|image| {
                BackupRecord::new(
                    image.image_id().unwrap_or_default(),
                    image.name().unwrap_or_default(),
                    image.creation_date().unwrap_or_default(),
                )
            }));

            token = next_page(resp.next_token());
            if token.is_none() {
                break;
            }
        }

        Ok(records)
    }

    async fn create_image(
        &self,
        name: &str,
        instance_id: &str,
        description: &str,
    ) -> Result<String, BackupError> {
        let resp = self
            .client
            .create_image()
            .instance_id(instance_id)
            .name(name)
            .description(description)
            .dry_run(false)
            .send()
            .await
            .map_err(provider_error)?;

        resp.image_id()
            .map(str::to_string)
            .ok_or_else(|| BackupError::Provider("CreateImage returned no image id".into()))
    }

    async fn deregister_image(&self, image_id: &str, dry_run: bool) -> Result<(), BackupError> {
        self.client
            .deregister_image()
            .image_id(image_id)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn list_snapshots(
        &self,
        filter: &FilterSet,
    ) -> Result<Vec<SnapshotRecord>, BackupError> {
        let filters = to_ec2_filters(filter);
        let mut records = Vec::new();
        let mut token = None;

        loop {
            let resp = self
                .client
                .describe_snapshots()
                .set_filters(filters.clone())
                .set_next_token(token)
                .send()
                .await
                .map_err(provider_error)?;

            records.extend(resp.snapshots().iter().map(|snap| SnapshotRecord {
                id: snap.snapshot_id().unwrap_or_default().to_string(),
                description: snap.description().map(str::to_string),
            }));

            token = next_page(resp.next_token());
            if token.is_none() {
                break;
            }
        }

        Ok(records)
    }

    async fn delete_snapshot(&self, snapshot_id: &str, dry_run: bool) -> Result<(), BackupError> {
        self.client
            .delete_snapshot()
            .snapshot_id(snapshot_id)
            .dry_run(dry_run)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Filter;

    #[test]
    fn test_filters_map_one_to_one() {
        let set = FilterSet::new(vec![
            Filter::new("owner-id", ["533779774295"]),
            Filter::new("tag:Backup", ["nightly", "weekly"]),
        ]);
        let ec2 = to_ec2_filters(&set).unwrap();
        assert_eq!(ec2.len(), 2);
        assert_eq!(ec2[0].name(), Some("owner-id"));
        assert_eq!(ec2[0].values(), ["533779774295".to_string()]);
        assert_eq!(ec2[1].name(), Some("tag:Backup"));
        assert_eq!(ec2[1].values().len(), 2);
    }

    #[test]
    fn test_empty_filter_sends_none() {
        assert!(to_ec2_filters(&FilterSet::default()).is_none());
    }

    #[test]
    fn test_next_page() {
        assert_eq!(next_page(Some("abc")), Some("abc".to_string()));
        assert_eq!(next_page(Some("")), None);
        assert_eq!(next_page(None), None);
    }
}
