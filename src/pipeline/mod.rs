use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::fs::File;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::fingerprint;
use crate::job::UploadJob;
use crate::remote::{MediaLibrary, RemoteError};
use crate::store::{StoreError, UploadStore};

/// Per-file failure taxonomy. Every variant is caught at the per-file
/// boundary, logged, and counted; none aborts the pool and none is retried
/// within the run.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The file could not be opened or read.
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Either of the two remote calls failed.
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),
    /// The dedup lookup or the final insert failed, including losing the
    /// duplicate-key race to a concurrent worker.
    #[error("failed to persist upload record: {0}")]
    Persist(#[from] StoreError),
}

/// Terminal state of a successfully processed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Both remote phases succeeded and the fingerprint was recorded.
    Recorded,
    /// The fingerprint was already in the store; no remote calls were made.
    SkippedDuplicate,
}

/// Totals reported after the queue has drained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Counters {
    uploaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

/// Bounded worker pool draining a queue of upload jobs.
///
/// Workers share the dedup store (read/write) and the remote library
/// (read-only). The queue is the only synchronization point between the
/// producer and the workers; no ordering is guaranteed across files.
pub struct UploadPipeline {
    workers: usize,
    store: UploadStore,
    library: Arc<dyn MediaLibrary>,
}

impl UploadPipeline {
    pub fn new(workers: usize, store: UploadStore, library: Arc<dyn MediaLibrary>) -> Self {
        Self {
            workers: workers.max(1),
            store,
            library,
        }
    }

    /// Drain `receiver` with the configured number of workers. Returns once
    /// the sender side is closed and every dequeued job has finished,
    /// success or failure.
    pub async fn run(&self, receiver: mpsc::Receiver<UploadJob>) -> PipelineReport {
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let receiver = Arc::clone(&receiver);
            let counters = Arc::clone(&counters);
            let store = self.store.clone();
            let library = Arc::clone(&self.library);

            handles.push(tokio::spawn(async move {
                loop {
                    let job = { receiver.lock().await.recv().await };
                    let Some(job) = job else { break };

                    match process_job(&store, library.as_ref(), &job).await {
                        Ok(JobOutcome::Recorded) => {
                            info!(worker_id, path = ?job.path, "✅ Uploaded");
                            counters.uploaded.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(JobOutcome::SkippedDuplicate) => {
                            debug!(worker_id, path = ?job.path, "Skipping duplicate");
                            counters.skipped.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            error!(worker_id, path = ?job.path, "❌ Upload failed: {e}");
                            counters.failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker task failed: {e}");
            }
        }

        PipelineReport {
            uploaded: counters.uploaded.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Run one job through fingerprint → dedup check → two-phase upload → record.
async fn process_job(
    store: &UploadStore,
    library: &dyn MediaLibrary,
    job: &UploadJob,
) -> Result<JobOutcome, UploadError> {
    let mut file = File::open(&job.path)
        .await
        .map_err(|source| UploadError::Read {
            path: job.path.clone(),
            source,
        })?;

    let fingerprint = fingerprint::fingerprint(&mut file)
        .await
        .map_err(|source| UploadError::Read {
            path: job.path.clone(),
            source,
        })?;

    // Optimistic check only: two workers racing on the same new content can
    // both pass here and both upload. The primary key on the store is what
    // guarantees at most one record; the loser fails with a duplicate-key
    // condition after the wasted network work.
    if store.exists(&fingerprint).await? {
        return Ok(JobOutcome::SkippedDuplicate);
    }

    let file_name = job.file_name();
    let token = library.upload_bytes(file, &file_name).await?;
    library.register_item(&token).await?;

    let uploaded_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    store.record(&fingerprint, &file_name, uploaded_at).await?;

    Ok(JobOutcome::Recorded)
}
