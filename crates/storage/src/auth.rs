//! OAuth access tokens for Google Cloud REST APIs.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use imagery_common::{ImageryError, ImageryResult};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the server-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Where bearer tokens come from.
pub enum TokenSource {
    /// A fixed token supplied through configuration.
    Static(String),
    /// The GCE/App Engine metadata server, cached until shortly before expiry.
    Metadata { cached: Mutex<Option<CachedToken>> },
}

pub struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

impl TokenSource {
    /// Use a static token if one is configured, otherwise the metadata server.
    pub fn from_config(token: Option<String>) -> Self {
        match token {
            Some(token) if !token.is_empty() => TokenSource::Static(token),
            _ => TokenSource::Metadata {
                cached: Mutex::new(None),
            },
        }
    }

    /// Get a bearer token, fetching a fresh one from the metadata server if needed.
    pub async fn bearer(&self, client: &Client) -> ImageryResult<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata { cached } => {
                let mut guard = cached.lock().await;
                if let Some(cached) = guard.as_ref() {
                    if Instant::now() < cached.expires_at {
                        return Ok(cached.token.clone());
                    }
                }

                debug!("Fetching access token from metadata server");
                let response = client
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| ImageryError::upstream("auth", e.to_string()))?;

                if !response.status().is_success() {
                    return Err(ImageryError::upstream(
                        "auth",
                        format!("metadata server returned {}", response.status()),
                    ));
                }

                let body: MetadataTokenResponse = response
                    .json()
                    .await
                    .map_err(|e| ImageryError::upstream("auth", e.to_string()))?;

                let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
                *guard = Some(CachedToken {
                    token: body.access_token.clone(),
                    expires_at: Instant::now() + lifetime,
                });

                Ok(body.access_token)
            }
        }
    }
}
