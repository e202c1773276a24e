use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

pub use reqwest::StatusCode;

/// Google Photos Library API base URL.
pub const PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1";

/// Errors from the two remote calls.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
}

/// Remote media library consumed by the upload pipeline.
///
/// Making an upload visible is a two-phase commit: bytes first, then the item
/// referencing the returned upload token. If the second phase fails, the
/// bytes remain server-side as an unregistered orphan; no compensating delete
/// is attempted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Stream the full file content (handle positioned at the start) to the
    /// upload endpoint. Returns the opaque upload token issued by the
    /// service; the token references transmitted bytes that are not yet
    /// visible as a library item.
    async fn upload_bytes(&self, file: File, file_name: &str) -> Result<String, RemoteError>;

    /// Register previously uploaded bytes as a visible library item.
    async fn register_item(&self, upload_token: &str) -> Result<(), RemoteError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateRequest {
    new_media_items: Vec<NewMediaItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMediaItem {
    description: String,
    simple_media_item: SimpleMediaItem,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimpleMediaItem {
    upload_token: String,
}

impl BatchCreateRequest {
    fn single(upload_token: &str) -> Self {
        Self {
            new_media_items: vec![NewMediaItem {
                description: String::new(),
                simple_media_item: SimpleMediaItem {
                    upload_token: upload_token.to_string(),
                },
            }],
        }
    }
}

/// Google Photos Library API client.
///
/// Shared read-only across all workers; the access token is assumed valid
/// for the duration of the run. No retry is attempted on an expired
/// credential.
pub struct PhotosClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl PhotosClient {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(access_token, PHOTOS_API_BASE.to_string())
    }

    /// Point the client at a different API base (`PHOTOUP_API_BASE`
    /// override, tests).
    pub fn with_base_url(access_token: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[async_trait]
impl MediaLibrary for PhotosClient {
    async fn upload_bytes(&self, file: File, file_name: &str) -> Result<String, RemoteError> {
        let url = format!("{}/uploads", self.base_url);
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/octet-stream")
            .header("X-Goog-Upload-Protocol", "raw")
            .header("X-Goog-Upload-File-Name", file_name)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                endpoint: "uploads",
                status,
            });
        }

        let token = response.text().await?;
        debug!(file_name, "Received upload token");
        Ok(token)
    }

    async fn register_item(&self, upload_token: &str) -> Result<(), RemoteError> {
        let url = format!("{}/mediaItems:batchCreate", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&BatchCreateRequest::single(upload_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                endpoint: "mediaItems:batchCreate",
                status,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_create_wire_shape() {
        let request = BatchCreateRequest::single("tok-123");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "newMediaItems": [{
                    "description": "",
                    "simpleMediaItem": { "uploadToken": "tok-123" }
                }]
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = PhotosClient::with_base_url("t".into(), "http://localhost:9999/v1/".into());
        assert_eq!(client.base_url, "http://localhost:9999/v1");
    }
}
