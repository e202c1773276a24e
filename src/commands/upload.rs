use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::pipeline::UploadPipeline;
use crate::remote::PhotosClient;
use crate::store::UploadStore;
use crate::walk;

/// Command to upload every image under the given roots exactly once.
pub struct UploadCommand {
    roots: Vec<PathBuf>,
    workers: usize,
    db_path: Option<PathBuf>,
}

impl UploadCommand {
    pub fn new(roots: Vec<PathBuf>, workers: usize, db_path: Option<PathBuf>) -> Self {
        Self {
            roots,
            workers,
            db_path,
        }
    }

    pub async fn execute(&self) -> Result<()> {
        for root in &self.roots {
            if !root.exists() {
                return Err(anyhow!("Directory does not exist: {:?}", root));
            }
            if !root.is_dir() {
                return Err(anyhow!("Path is not a directory: {:?}", root));
            }
        }

        let config = Config::from_env();
        let db_path = self
            .db_path
            .clone()
            .unwrap_or_else(|| config.db_path.clone());

        // Store and auth failures here are startup-fatal; everything past
        // this point is isolated per file.
        let store = UploadStore::open(&db_path)
            .await
            .map_err(|e| anyhow!("Error opening upload database {db_path:?}: {e}"))?;
        let access_token = auth::load_access_token(&config.token_file)?;
        let library = Arc::new(PhotosClient::with_base_url(
            access_token,
            config.api_base_url.clone(),
        ));

        info!("✅ Starting {} upload workers", self.workers);

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let pipeline = UploadPipeline::new(self.workers, store, library);
        let pipeline_task = tokio::spawn(async move { pipeline.run(receiver).await });

        let mut enqueued = 0;
        for root in &self.roots {
            info!("🔎 Scanning directory: {:?}", root);
            enqueued += walk::enqueue_images(root, &sender).await;
        }

        // Closing the queue lets the workers drain and exit.
        drop(sender);

        let report = pipeline_task
            .await
            .map_err(|e| anyhow!("Upload pipeline panicked: {e}"))?;

        info!(
            "✅ Done. {} enqueued, {} uploaded, {} skipped as duplicates, {} failed.",
            enqueued, report.uploaded, report.skipped, report.failed
        );
        Ok(())
    }
}
