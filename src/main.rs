//! # Photoup - Deduplicating Photo Uploader
//!
//! Walks the given directories, fingerprints every image file, and uploads
//! each distinct image exactly once to the Google Photos library.
//!
//! ## Features
//!
//! - **Concurrent Uploads**: A bounded worker pool drains the queue of
//!   discovered files
//! - **Durable Dedup**: A local SQLite database records every successful
//!   upload by content fingerprint, so re-runs never upload twice
//! - **Failure Isolation**: One unreadable or rejected file never aborts the
//!   run; failed files are simply re-attempted on the next run
//!
//! ## Usage
//!
//! ```bash
//! # Upload everything under two photo directories with 4 workers
//! photoup ~/Pictures /mnt/camera
//!
//! # Crank up the concurrency
//! photoup -c 8 ~/Pictures
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use photoup::commands::upload::UploadCommand;

/// Photoup - A concurrent, deduplicating photo uploader
#[derive(Parser)]
#[command(
    name = "photoup",
    about = "A concurrent, deduplicating photo uploader for Google Photos",
    long_about = "Walks the given directories, fingerprints every image file, and uploads each distinct image exactly once to the Google Photos library.",
    version
)]
struct Cli {
    /// Root directories to scan for image files
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Number of concurrent upload workers
    #[arg(long, short = 'c', default_value_t = 4)]
    concurrency: usize,

    /// Path to the upload database (defaults to ~/.photoup.db)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        "Starting upload for roots: {:?}, workers: {}",
        cli.roots, cli.concurrency
    );

    let result = UploadCommand::new(cli.roots, cli.concurrency, cli.db)
        .execute()
        .await;

    if let Err(e) = result {
        error!("Upload failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
