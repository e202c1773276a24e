use std::env;
use std::path::PathBuf;

use crate::remote::PHOTOS_API_BASE;

/// Runtime configuration for the uploader.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the media library API.
    pub api_base_url: String,
    /// Path to the local upload database.
    pub db_path: PathBuf,
    /// Path to the cached OAuth token file.
    pub token_file: PathBuf,
    /// Capacity of the job queue between the walk and the workers.
    pub queue_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            api_base_url: env::var("PHOTOUP_API_BASE")
                .unwrap_or_else(|_| PHOTOS_API_BASE.to_string()),
            db_path: env::var("PHOTOUP_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".photoup.db")),
            token_file: env::var("PHOTOUP_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| home.join(".photoup-token.json")),
            queue_capacity: env::var("PHOTOUP_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            api_base_url: PHOTOS_API_BASE.to_string(),
            db_path: home.join(".photoup.db"),
            token_file: home.join(".photoup-token.json"),
            queue_capacity: 100,
        }
    }
}
