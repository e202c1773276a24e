use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Cached OAuth token file shape. Only the access token is consumed here;
/// acquiring and refreshing it is the authorization flow's concern, outside
/// this tool.
#[derive(Debug, Deserialize)]
struct CachedToken {
    access_token: String,
}

/// Resolve the access token used to sign every outbound request.
///
/// `PHOTOUP_ACCESS_TOKEN` wins; otherwise the cached token file is read.
/// The token is assumed valid for the duration of the run.
pub fn load_access_token(token_file: &Path) -> Result<String> {
    if let Ok(token) = std::env::var("PHOTOUP_ACCESS_TOKEN") {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let raw = std::fs::read_to_string(token_file).with_context(|| {
        format!(
            "No access token: set PHOTOUP_ACCESS_TOKEN or place a token file at {token_file:?}"
        )
    })?;

    let cached: CachedToken = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed token file: {token_file:?}"))?;

    if cached.access_token.is_empty() {
        return Err(anyhow!("Token file {token_file:?} has an empty access token"));
    }

    Ok(cached.access_token)
}
