//! Raw data acquisition with a primary source and a fallback
//!
//! The primary endpoint is tried once; on any failure (transport error,
//! non-success status, unreadable body) the fallback is tried once. The two
//! attempts are strictly sequential.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Dataset compiled into the binary, used as the default fallback
const BUNDLED_DATASET: &str = include_str!("../../data/fountains.json");

/// Default timeout applied to every HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected HTTP status: {0}")]
    Status(StatusCode),

    /// Local file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Body was not valid JSON
    #[error("Failed to parse payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Both the primary and the fallback source failed
#[derive(Debug, Error)]
#[error("Water source data unavailable (primary: {primary}; fallback: {fallback})")]
pub struct DataUnavailable {
    /// Why the primary source failed
    pub primary: FetchError,
    /// Why the fallback source failed
    #[source]
    pub fallback: FetchError,
}

/// Where a raw payload can be read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Remote JSON document fetched with HTTP GET
    Http(String),
    /// JSON document on the local filesystem
    File(PathBuf),
    /// Dataset shipped inside the binary
    Bundled,
}

impl DataSource {
    /// Parses a source argument
    ///
    /// `http://` and `https://` prefixes select a remote source, the literal
    /// `bundled` selects the built-in dataset, anything else is a file path.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataSource::Http(trimmed.to_string())
        } else if trimmed.eq_ignore_ascii_case("bundled") {
            DataSource::Bundled
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Http(url) => write!(f, "{}", url),
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Bundled => write!(f, "bundled dataset"),
        }
    }
}

/// Which stage produced a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Primary,
    Fallback,
}

/// Raw payload returned by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    /// The JSON document exactly as received
    pub raw: Value,
    /// Stage the payload came from
    pub stage: FetchStage,
}

/// Fetches raw water source payloads
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    /// HTTP client shared by both stages
    http_client: Client,
    /// Source tried first
    primary: DataSource,
    /// Source tried when the primary fails
    fallback: DataSource,
}

impl SourceFetcher {
    /// Creates a fetcher with the default request timeout
    pub fn new(primary: DataSource, fallback: DataSource) -> Self {
        Self::with_timeout(primary, fallback, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a fetcher whose HTTP requests give up after `timeout`
    pub fn with_timeout(primary: DataSource, fallback: DataSource, timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                Client::new()
            });
        Self {
            http_client,
            primary,
            fallback,
        }
    }

    pub fn primary(&self) -> &DataSource {
        &self.primary
    }

    pub fn fallback(&self) -> &DataSource {
        &self.fallback
    }

    /// Fetches the raw payload, falling back once if the primary fails
    ///
    /// # Returns
    /// * `Ok(FetchedPayload)` - Payload from whichever stage succeeded first
    /// * `Err(DataUnavailable)` - Both stages failed; carries both causes
    pub async fn fetch(&self) -> Result<FetchedPayload, DataUnavailable> {
        let primary = match self.fetch_from(&self.primary).await {
            Ok(raw) => {
                debug!(source = %self.primary, "Primary fetch succeeded");
                return Ok(FetchedPayload {
                    raw,
                    stage: FetchStage::Primary,
                });
            }
            Err(e) => e,
        };
        warn!(source = %self.primary, error = %primary, "Primary fetch failed, trying fallback");

        match self.fetch_from(&self.fallback).await {
            Ok(raw) => {
                info!(source = %self.fallback, "Loaded data from fallback source");
                Ok(FetchedPayload {
                    raw,
                    stage: FetchStage::Fallback,
                })
            }
            Err(fallback) => {
                warn!(source = %self.fallback, error = %fallback, "Fallback fetch failed");
                Err(DataUnavailable { primary, fallback })
            }
        }
    }

    /// Reads one source without any retry
    async fn fetch_from(&self, source: &DataSource) -> Result<Value, FetchError> {
        match source {
            DataSource::Http(url) => {
                let response = self.http_client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status(status));
                }
                let text = response.text().await?;
                Ok(serde_json::from_str(&text)?)
            }
            DataSource::File(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| FetchError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Ok(serde_json::from_str(&text)?)
            }
            DataSource::Bundled => Ok(serde_json::from_str(BUNDLED_DATASET)?),
        }
    }
}
