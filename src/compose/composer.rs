//! Download, narrate, caption and render one reel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use super::captions::plan_captions;
use super::ffmpeg::{fit_footage, MediaError, MediaToolkit, RenderPlan};
use super::overlay::{render_overlays, CaptionStyle};
use crate::narration::{NarrationError, NarrationSynthesizer};

/// Timeout for the footage download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// A finished reel on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub duration: Duration,
    pub cue_count: usize,
}

/// Errors that can occur while composing a reel.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Footage download failed with status {status}: {message}")]
    DownloadFailed { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Narration failed: {0}")]
    Narration(#[from] NarrationError),

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{what} has zero length")]
    InvalidDuration { what: &'static str },
}

/// Builds reels from a footage URL and a script.
///
/// Intermediate footage and narration live in temporary files that are removed
/// when `compose` returns, whether it succeeded or not.
pub struct VideoComposer<S, M> {
    http_client: reqwest::Client,
    synthesizer: S,
    media: M,
    style: CaptionStyle,
    output_dir: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl<S: NarrationSynthesizer, M: MediaToolkit> VideoComposer<S, M> {
    pub fn new(
        synthesizer: S,
        media: M,
        style: CaptionStyle,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ComposeError> {
        let http_client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            synthesizer,
            media,
            style,
            output_dir: output_dir.into(),
            scratch_dir: None,
        })
    }

    /// Put intermediate files in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    fn scratch_file(&self, prefix: &str, suffix: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(prefix).suffix(suffix);
        match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<(), ComposeError> {
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ComposeError::DownloadFailed {
                status: status.as_u16(),
                message,
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }

    /// Compose a reel from `footage_url` and `script` into `output_dir/output_name`.
    ///
    /// The reel runs exactly as long as the narration. Footage is looped or cut
    /// to fit, and captions split the script evenly across that length.
    pub async fn compose(
        &self,
        footage_url: &str,
        script: &str,
        output_name: &str,
    ) -> Result<RenderedVideo, ComposeError> {
        let footage = self.scratch_file("reelsmith-footage-", ".mp4")?;
        let narration = self.scratch_file("reelsmith-narration-", ".mp3")?;

        log::info!("Downloading footage from {}", footage_url);
        self.download(footage_url, footage.path()).await?;

        self.synthesizer
            .synthesize(script, narration.path())
            .await?;

        let narration_length = self.media.media_duration(narration.path()).await?;
        if narration_length.is_zero() {
            return Err(ComposeError::InvalidDuration { what: "narration" });
        }
        let footage_length = self.media.media_duration(footage.path()).await?;
        if footage_length.is_zero() {
            return Err(ComposeError::InvalidDuration { what: "footage" });
        }

        let fit = fit_footage(footage_length, narration_length);
        let cues = plan_captions(script, narration_length);
        let overlays = render_overlays(&cues, &self.style);
        log::debug!(
            "Footage {:.1}s, narration {:.1}s, {:?}, {} captions",
            footage_length.as_secs_f64(),
            narration_length.as_secs_f64(),
            fit,
            cues.len()
        );

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output = self.output_dir.join(output_name);
        let plan = RenderPlan {
            footage: footage.path().to_path_buf(),
            narration: narration.path().to_path_buf(),
            output: output.clone(),
            duration: narration_length,
            fit,
            overlays,
        };
        self.media.render(&plan).await?;

        drop(footage);
        drop(narration);

        Ok(RenderedVideo {
            path: output,
            duration: narration_length,
            cue_count: cues.len(),
        })
    }
}
