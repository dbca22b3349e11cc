//! `instance-backup`: create an image of an EC2 instance and prune the
//! expired images of its series.
//!
//! Prints the new image id on stdout. Logs go to stderr (`RUST_LOG`).
//!
//! Exit codes: 0 success, 1 nothing created, 2 image created but pruning
//! failed.

use anyhow::Context;
use clap::Parser;
use instance_backup::{
    BackupWorkflow, Ec2Client, FilterConfig, RetentionPolicy, WorkflowConfig,
    DEFAULT_MAX_AGE_SECONDS,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Back up an instance and rotate old backups
#[derive(Parser, Debug)]
#[command(name = "instance-backup", version, about)]
struct Cli {
    /// Region the instance lives in
    #[arg(long, env = "INSTANCE_BACKUP_REGION", default_value = "us-east-1")]
    region: String,

    /// Instance to back up
    #[arg(long, env = "INSTANCE_BACKUP_INSTANCE_ID")]
    instance_id: String,

    /// Base name of the image; a timestamp is appended
    #[arg(long, env = "INSTANCE_BACKUP_IMAGE_NAME")]
    image_name: String,

    /// Seconds to keep older backups of this series
    #[arg(long, env = "INSTANCE_BACKUP_TIME_TO_SAVE", default_value_t = DEFAULT_MAX_AGE_SECONDS)]
    time_to_save: u64,

    /// YAML file with list filters
    #[arg(long, env = "INSTANCE_BACKUP_CONFIG", default_value = "./config.yml")]
    config: PathBuf,

    /// Description attached to the new image
    #[arg(long, env = "INSTANCE_BACKUP_DESCRIPTION")]
    description: Option<String>,
}

enum Run {
    Clean,
    PruneFailed,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(Run::Clean) => ExitCode::SUCCESS,
        Ok(Run::PruneFailed) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {e}");
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<Run> {
    let filter = FilterConfig::load(&cli.config)
        .with_context(|| format!("loading filters from {}", cli.config.display()))?
        .into_filter_set();

    let mut config =
        WorkflowConfig::default().with_policy(RetentionPolicy::new(cli.time_to_save, filter));
    if let Some(description) = cli.description {
        config = config.with_description(description);
    }

    let client = Ec2Client::from_region(cli.region).await;
    let workflow = BackupWorkflow::new(&client, config);
    let outcome = workflow
        .run(&cli.instance_id, &cli.image_name)
        .await
        .context("backup not created")?;

    println!("{}", outcome.image_id);

    match outcome.prune {
        Ok(_) => Ok(Run::Clean),
        Err(e) => {
            eprintln!("Error: backup {} created, pruning failed: {e}", outcome.image_id);
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = std::error::Error::source(cause);
            }
            Ok(Run::PruneFailed)
        }
    }
}
