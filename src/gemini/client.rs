//! GeminiClient - handles communication with the Gemini REST API.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::models::ModelDescriptor;
use super::retry::is_overloaded;
use crate::config::GeminiConfig;

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Generation method a model must advertise to be usable for scripts.
pub const GENERATE_CONTENT_METHOD: &str = "generateContent";

/// Default timeout for HTTP requests. Script generation can be slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on listing pages followed through `nextPageToken`.
const MAX_LIST_PAGES: usize = 10;

/// Prefix the listing puts in front of every model identifier.
const MODEL_NAME_PREFIX: &str = "models/";

/// Request body for `generateContent`.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// One page of the model listing.
#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ListedModel>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListedModel {
    name: String,
    #[serde(default, rename = "supportedGenerationMethods")]
    supported_generation_methods: Vec<String>,
}

impl From<ListedModel> for ModelDescriptor {
    fn from(model: ListedModel) -> Self {
        let identifier = model
            .name
            .strip_prefix(MODEL_NAME_PREFIX)
            .unwrap_or(&model.name)
            .to_string();
        let supports_generation = model
            .supported_generation_methods
            .iter()
            .any(|m| m == GENERATE_CONTENT_METHOD);
        ModelDescriptor {
            identifier,
            supports_generation,
        }
    }
}

/// Client for communicating with the Gemini API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a client from the `[gemini]` config section.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::MissingApiKey` if no key was configured.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::build(api_key, config.base_url.clone(), config.timeout())
    }

    /// Create a new GeminiClient with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, GeminiError> {
        Self::build(api_key, base_url, DEFAULT_TIMEOUT)
    }

    fn build(api_key: String, base_url: String, timeout: Duration) -> Result<Self, GeminiError> {
        if api_key.trim().is_empty() {
            return Err(GeminiError::MissingApiKey);
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

    /// List every model the key can see, following pagination.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::ApiError` for a non-success status and
    /// `GeminiError::HttpError` if the request or body decoding fails.
    pub async fn list_models(&self) -> Result<Vec<ModelDescriptor>, GeminiError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut descriptors = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let mut request = self
                .http_client
                .get(&url)
                .header("x-goog-api-key", &self.api_key);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(GeminiError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }

            let page: ListModelsResponse = response.json().await?;
            descriptors.extend(page.models.into_iter().map(ModelDescriptor::from));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(descriptors)
    }

    /// Send one generation request and return the reply text.
    ///
    /// Makes exactly one attempt; see `ScriptGenerator` for the retry loop.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::Overloaded` on HTTP 503 or 429,
    /// `GeminiError::ApiError` on any other non-success status,
    /// `GeminiError::EmptyReply` if the reply carries no text,
    /// or `GeminiError::HttpError` if the request fails.
    pub async fn generate_content(&self, model: &str, prompt: &str) -> Result<String, GeminiError> {
        let model = model.strip_prefix(MODEL_NAME_PREFIX).unwrap_or(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if is_overloaded(status) {
                log::warn!("Model {} is overloaded: {}", model, message);
                return Err(GeminiError::Overloaded { message });
            }

            return Err(GeminiError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let reply: GenerateResponse = response.json().await?;
        let text: String = reply
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::EmptyReply);
        }
        Ok(text)
    }
}

/// Errors that can occur during Gemini operations.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("Gemini API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Model overloaded: {message}")]
    Overloaded {
        /// Body returned with the overload status
        message: String,
    },

    #[error("Model still overloaded after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made before giving up
        attempts: u32,
    },

    #[error("API request failed with status {status}: {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    #[error("Model returned no text")]
    EmptyReply,

    #[error("Empty topic")]
    EmptyTopic,
}
