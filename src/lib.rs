//! Instance Backup Library
//!
//! Back up a running compute instance as a machine image, then prune older
//! images of the same series that are past their retention window, together
//! with the snapshots behind them.
//!
//! # Design
//!
//! The workflow is pure logic over the [`ImageBackend`] trait. It doesn't
//! know about SDKs, regions or credentials. Implement the trait for your
//! provider, or enable `default-client` for [`Ec2Client`].
//!
//! # Usage
//!
//! ```ignore
//! use instance_backup::{
//!     BackupWorkflow, FilterConfig, RetentionPolicy, WorkflowConfig,
//! };
//!
//! let filter = FilterConfig::load("config.yml")?.into_filter_set();
//! let config = WorkflowConfig::default()
//!     .with_policy(RetentionPolicy::new(7 * 24 * 3600, filter));
//! let workflow = BackupWorkflow::new(&backend, config);
//!
//! let outcome = workflow.run("i-0123456789abcdef0", "web.bak").await?;
//! println!("created {}", outcome.image_id);
//! if let Err(e) = outcome.prune {
//!     eprintln!("prune failed: {}", e);
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod matching;
pub mod memory;
pub mod reaper;
pub mod retention;
pub mod timestamp;
pub mod types;
pub mod workflow;

#[cfg(feature = "default-client")]
pub mod client;

// Re-export the main types at crate root for convenience
pub use backend::ImageBackend;
pub use config::{FilterConfig, FilterRule, WorkflowConfig, MIN_IMAGE_NAME_LEN};
pub use error::{BackupError, Phase};
pub use matching::{Matcher, SubstringMatcher};
pub use memory::MemoryBackend;
pub use reaper::SnapshotReaper;
pub use retention::{RetentionPolicy, RetentionPruner, Verdict, DEFAULT_MAX_AGE_SECONDS};
pub use timestamp::{format_creation_date, parse_creation_date, stamp_name};
pub use types::*;
pub use workflow::{BackupOutcome, BackupWorkflow};

#[cfg(feature = "default-client")]
pub use client::Ec2Client;
