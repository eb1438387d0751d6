//! PexelsClient - stock footage search.

use std::time::Duration;

use serde::Deserialize;

use crate::config::PexelsConfig;

/// Default base URL for the Pexels API.
pub const PEXELS_API_BASE_URL: &str = "https://api.pexels.com";

/// Orientation filter used for every search; the output is vertical.
pub const PORTRAIT_ORIENTATION: &str = "portrait";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Search response body.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<StockVideo>,
}

/// One search hit with all of its encodings.
#[derive(Debug, Clone, Deserialize)]
pub struct StockVideo {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

/// One encoding of a stock video.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoFile {
    pub link: String,
    /// Missing for some encodings (e.g. HLS playlists).
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Client for the Pexels video search API.
pub struct PexelsClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl PexelsClient {
    /// Create a client from the `[pexels]` config section.
    ///
    /// # Errors
    ///
    /// Returns `FootageError::MissingApiKey` if no key was configured.
    pub fn from_config(config: &PexelsConfig) -> Result<Self, FootageError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::build(api_key, config.base_url.clone(), config.timeout())
    }

    /// Create a new PexelsClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, FootageError> {
        Self::build(api_key, base_url, DEFAULT_TIMEOUT)
    }

    fn build(api_key: String, base_url: String, timeout: Duration) -> Result<Self, FootageError> {
        if api_key.trim().is_empty() {
            return Err(FootageError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Search portrait videos for `query`, asking for a single result.
    ///
    /// # Errors
    ///
    /// Returns `FootageError::ApiError` on a non-success status or
    /// `FootageError::HttpError` if the request or decoding fails.
    pub async fn search_portrait(&self, query: &str) -> Result<Vec<StockVideo>, FootageError> {
        let url = format!("{}/videos/search", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", &self.api_key)
            .query(&[
                ("query", query),
                ("orientation", PORTRAIT_ORIENTATION),
                ("per_page", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FootageError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.videos)
    }
}

/// Errors that can occur while talking to the footage provider.
#[derive(Debug, thiserror::Error)]
pub enum FootageError {
    #[error("Pexels API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Search failed with status {status}: {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
}
