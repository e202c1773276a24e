use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs::File;
use tokio::sync::mpsc;

use photoup::job::UploadJob;
use photoup::pipeline::{PipelineReport, UploadPipeline};
use photoup::remote::{MediaLibrary, RemoteError, StatusCode};
use photoup::store::UploadStore;
use photoup::walk;

/// Counting fake of the remote library. Tokens are handed out per file name;
/// registrations can be forced to fail to exercise the two-phase failure
/// path.
#[derive(Default)]
struct FakeLibrary {
    uploads: AtomicUsize,
    registrations: AtomicUsize,
    fail_registration: bool,
}

impl FakeLibrary {
    fn failing_registration() -> Self {
        Self {
            fail_registration: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MediaLibrary for FakeLibrary {
    async fn upload_bytes(&self, _file: File, file_name: &str) -> Result<String, RemoteError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("token-{file_name}"))
    }

    async fn register_item(&self, _upload_token: &str) -> Result<(), RemoteError> {
        if self.fail_registration {
            return Err(RemoteError::Status {
                endpoint: "mediaItems:batchCreate",
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Walk `root` and run the pipeline over everything it finds.
async fn run_pipeline(
    root: &Path,
    workers: usize,
    store: &UploadStore,
    library: Arc<FakeLibrary>,
) -> PipelineReport {
    let (sender, receiver) = mpsc::channel(100);
    let pipeline = UploadPipeline::new(workers, store.clone(), library);
    let pipeline_task = tokio::spawn(async move { pipeline.run(receiver).await });

    walk::enqueue_images(root, &sender).await;
    drop(sender);

    pipeline_task.await.unwrap()
}

/// Two files sharing their first 8192 bytes are one upload: the second is
/// skipped as a duplicate with no remote calls of its own.
#[tokio::test]
async fn test_identical_prefix_files_upload_once() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.jpg"), "X".repeat(9000)).unwrap();
    fs::write(temp_dir.path().join("b.jpg"), "X".repeat(9000)).unwrap();

    let store = UploadStore::in_memory().await.unwrap();
    let library = Arc::new(FakeLibrary::default());

    let report = run_pipeline(temp_dir.path(), 1, &store, Arc::clone(&library)).await;

    assert_eq!(report.uploaded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(library.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(library.registrations.load(Ordering::SeqCst), 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

/// Running twice over an unchanged file set performs zero remote work the
/// second time.
#[tokio::test]
async fn test_second_run_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.jpg"), "first image content").unwrap();
    fs::write(temp_dir.path().join("b.png"), "second image content").unwrap();

    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("uploads.db");

    let store = UploadStore::open(&db_path).await.unwrap();
    let first = Arc::new(FakeLibrary::default());
    let report = run_pipeline(temp_dir.path(), 2, &store, Arc::clone(&first)).await;

    assert_eq!(report.uploaded, 2);
    assert_eq!(store.count().await.unwrap(), 2);

    // Fresh store handle, as a new process would open.
    let store = UploadStore::open(&db_path).await.unwrap();
    let second = Arc::new(FakeLibrary::default());
    let report = run_pipeline(temp_dir.path(), 2, &store, Arc::clone(&second)).await;

    assert_eq!(report.uploaded, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(second.uploads.load(Ordering::SeqCst), 0);
    assert_eq!(second.registrations.load(Ordering::SeqCst), 0);
    assert_eq!(store.count().await.unwrap(), 2);
}

/// Non-image files in the walked tree never become jobs.
#[tokio::test]
async fn test_non_image_files_are_never_enqueued() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.jpg"), "image content").unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "shopping list").unwrap();

    let (sender, mut receiver) = mpsc::channel(10);
    let enqueued = walk::enqueue_images(temp_dir.path(), &sender).await;
    drop(sender);

    let mut jobs: Vec<UploadJob> = Vec::new();
    while let Some(job) = receiver.recv().await {
        jobs.push(job);
    }

    assert_eq!(enqueued, 1);
    assert_eq!(jobs.len(), 1);
    assert!(jobs[0].path.ends_with("a.jpg"));
}

/// A failed registration leaves no record, and the file is re-attempted by
/// the next run.
#[tokio::test]
async fn test_failed_registration_is_retried_on_next_run() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a.jpg"), "image content").unwrap();

    let store = UploadStore::in_memory().await.unwrap();

    let broken = Arc::new(FakeLibrary::failing_registration());
    let report = run_pipeline(temp_dir.path(), 1, &store, Arc::clone(&broken)).await;

    // Bytes went up, registration failed: server-side orphan, no local row.
    assert_eq!(report.failed, 1);
    assert_eq!(broken.uploads.load(Ordering::SeqCst), 1);
    assert_eq!(store.count().await.unwrap(), 0);

    let healthy = Arc::new(FakeLibrary::default());
    let report = run_pipeline(temp_dir.path(), 1, &store, Arc::clone(&healthy)).await;

    assert_eq!(report.uploaded, 1);
    assert_eq!(store.count().await.unwrap(), 1);
}

/// Many workers racing over copies of the same content still produce exactly
/// one durable record.
#[tokio::test]
async fn test_at_most_one_record_per_fingerprint_under_concurrency() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..6 {
        fs::write(temp_dir.path().join(format!("copy{i}.jpg")), "X".repeat(9000)).unwrap();
    }

    let store = UploadStore::in_memory().await.unwrap();
    let library = Arc::new(FakeLibrary::default());

    let report = run_pipeline(temp_dir.path(), 4, &store, Arc::clone(&library)).await;

    // Racing workers may perform redundant remote uploads, but the primary
    // key guarantees a single row; losers count as failures.
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(report.uploaded + report.skipped + report.failed, 6);
    assert_eq!(report.uploaded, 1);
    assert!(library.uploads.load(Ordering::SeqCst) >= 1);
}
