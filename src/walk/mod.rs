use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::job::UploadJob;

/// File extensions treated as images, matched case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "gif", "heif", "orf", "png", "bmp", "tiff", "tif",
];

/// Whether a path looks like an image file by extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Walk `root` and enqueue every image file as an upload job.
///
/// Blocks on the channel when the pipeline is at capacity (producer
/// backpressure). Unreadable entries are skipped with a warning. Returns the
/// number of jobs enqueued.
pub async fn enqueue_images(root: &Path, sender: &mpsc::Sender<UploadJob>) -> usize {
    let mut enqueued = 0;

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && is_image_file(path) {
            debug!("... {:?}", path);
            if sender.send(UploadJob::new(path)).await.is_err() {
                // Receiver side is gone; the pipeline has shut down.
                break;
            }
            enqueued += 1;
        }
    }

    enqueued
}
