//! Narration synthesis.
//!
//! The speech endpoint accepts short texts only, so the script is cut into chunks
//! at punctuation and the MP3 segments are appended in order; MP3 frames
//! concatenate into one playable stream.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::config::NarrationConfig;

/// Characters a chunk may end on.
const BREAK_CHARS: &[char] = &[
    '。', '！', '？', '!', '?', '.', '、', '，', ',', ' ', '　',
];

/// Default timeout for one synthesis request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns text into a spoken audio file.
#[async_trait]
pub trait NarrationSynthesizer {
    /// Write narration for `text` to `dest`.
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), NarrationError>;
}

/// Replace line breaks with spaces; the engine reads them as long pauses.
pub fn flatten_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// A chunk ends on the last punctuation or space inside the limit when there is
/// one, otherwise it is cut at the limit. Blank chunks are dropped.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let limit = (start + max).min(chars.len());
        let mut end = limit;
        if limit < chars.len() {
            if let Some(pos) = chars[start..limit]
                .iter()
                .rposition(|c| BREAK_CHARS.contains(c))
            {
                end = start + pos + 1;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        start = end;
    }

    chunks
}

/// Google Translate text-to-speech.
pub struct GoogleTts {
    base_url: String,
    language: String,
    chunk_chars: usize,
    http_client: reqwest::Client,
}

impl GoogleTts {
    pub fn from_config(config: &NarrationConfig) -> Result<Self, NarrationError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent("Mozilla/5.0")
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            chunk_chars: config.chunk_chars,
            http_client,
        })
    }

    async fn fetch_chunk(&self, chunk: &str, idx: usize, total: usize) -> Result<Vec<u8>, NarrationError> {
        let url = format!("{}/translate_tts", self.base_url);
        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NarrationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl NarrationSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), NarrationError> {
        let chunks = chunk_text(&flatten_newlines(text), self.chunk_chars);
        if chunks.is_empty() {
            return Err(NarrationError::EmptyText);
        }

        log::info!(
            "Synthesizing narration ({}, {} chunks)",
            self.language,
            chunks.len()
        );

        let mut file = tokio::fs::File::create(dest).await?;
        for (idx, chunk) in chunks.iter().enumerate() {
            let audio = self.fetch_chunk(chunk, idx, chunks.len()).await?;
            if audio.is_empty() {
                return Err(NarrationError::EmptyAudio { chunk: idx });
            }
            file.write_all(&audio).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// Errors that can occur during narration synthesis.
#[derive(Debug, thiserror::Error)]
pub enum NarrationError {
    #[error("Nothing to narrate")]
    EmptyText,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Speech request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Speech service returned no audio for chunk {chunk}")]
    EmptyAudio { chunk: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
