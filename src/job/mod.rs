use std::path::PathBuf;

/// A single file queued for upload.
///
/// Jobs are transient: created by the directory walk, consumed exactly once
/// by one worker, and dropped after processing, success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub path: PathBuf,
}

impl UploadJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Base name of the source file, used for the upload filename header and
    /// the stored record. Display and audit only, never required to be unique.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}
