//! FFmpeg/ffprobe process management for rendering.
//!
//! Argument building is kept separate from process spawning so the render plan
//! can be checked without FFmpeg installed.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::VideoConfig;

/// Number of stderr lines kept in a `ProcessFailed` error.
const STDERR_TAIL_LINES: usize = 20;

/// Errors that can occur while probing or rendering media.
#[derive(Debug)]
pub enum MediaError {
    /// The executable could not be found on PATH
    ToolNotFound { binary: String },
    /// Failed to spawn the process
    SpawnFailed(std::io::Error),
    /// The process exited with non-zero status
    ProcessFailed { exit_code: Option<i32>, stderr: String },
    /// ffprobe output was not a usable duration
    InvalidDuration { path: PathBuf, output: String },
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::ToolNotFound { binary } => {
                write!(
                    f,
                    "{} not found. Please install FFmpeg (e.g. apt install ffmpeg)",
                    binary
                )
            }
            MediaError::SpawnFailed(e) => write!(f, "Failed to spawn FFmpeg: {}", e),
            MediaError::ProcessFailed { exit_code, stderr } => {
                write!(f, "FFmpeg exited with code {:?}\n{}", exit_code, stderr)
            }
            MediaError::InvalidDuration { path, output } => {
                write!(
                    f,
                    "Could not read duration of '{}': {:?}",
                    path.display(),
                    output
                )
            }
        }
    }
}

impl std::error::Error for MediaError {}

/// How the footage is fitted to the narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootageFit {
    /// Footage is shorter: play it this many extra times, then cut.
    Loop { extra_repeats: u32 },
    /// Footage is at least as long: cut it at the narration length.
    Trim,
}

/// Decide how to fit footage of length `footage` to `narration`.
pub fn fit_footage(footage: Duration, narration: Duration) -> FootageFit {
    if footage >= narration {
        return FootageFit::Trim;
    }
    let footage_ns = footage.as_nanos().max(1);
    let plays = narration.as_nanos().div_ceil(footage_ns);
    FootageFit::Loop {
        extra_repeats: u32::try_from(plays - 1).unwrap_or(u32::MAX),
    }
}

/// Everything needed for the final encode.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub footage: PathBuf,
    pub narration: PathBuf,
    pub output: PathBuf,
    /// Final length; always the narration length.
    pub duration: Duration,
    pub fit: FootageFit,
    /// One `drawtext` filter per caption, in cue order.
    pub overlays: Vec<String>,
}

/// Output format settings for the encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

impl EncodeSettings {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            fps: config.fps,
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
        }
    }
}

/// Build the video filter graph: fill the vertical frame, then draw captions.
pub fn build_filter_graph(plan: &RenderPlan, settings: &EncodeSettings) -> String {
    let (w, h) = (settings.width, settings.height);
    let mut filters = vec![
        format!("scale={}:{}:force_original_aspect_ratio=increase", w, h),
        format!("crop={}:{}", w, h),
        "setsar=1".to_string(),
    ];
    filters.extend(plan.overlays.iter().cloned());
    format!("[0:v]{}[v]", filters.join(","))
}

/// Build the full FFmpeg argument list for a plan.
pub fn build_render_args(plan: &RenderPlan, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-hide_banner".into(), "-loglevel".into(), "error".into()];

    if let FootageFit::Loop { extra_repeats } = plan.fit {
        args.push("-stream_loop".into());
        args.push(extra_repeats.to_string());
    }
    args.push("-i".into());
    args.push(plan.footage.display().to_string());
    args.push("-i".into());
    args.push(plan.narration.display().to_string());

    args.push("-filter_complex".into());
    args.push(build_filter_graph(plan, settings));
    args.extend(["-map".into(), "[v]".into(), "-map".into(), "1:a".into()]);

    args.push("-t".into());
    args.push(format!("{:.3}", plan.duration.as_secs_f64()));
    args.push("-r".into());
    args.push(settings.fps.to_string());
    args.extend([
        "-c:v".into(),
        settings.video_codec.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        settings.audio_codec.clone(),
        "-movflags".into(),
        "+faststart".into(),
    ]);
    args.push(plan.output.display().to_string());
    args
}

/// Parse ffprobe's `format=duration` output.
pub fn parse_media_duration(output: &str) -> Option<Duration> {
    let secs: f64 = output.trim().lines().next()?.trim().parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Media probing and rendering.
#[async_trait]
pub trait MediaToolkit {
    /// Length of a media file.
    async fn media_duration(&self, path: &Path) -> Result<Duration, MediaError>;

    /// Encode `plan` to `plan.output`.
    async fn render(&self, plan: &RenderPlan) -> Result<(), MediaError>;
}

/// `MediaToolkit` backed by the `ffmpeg` and `ffprobe` executables.
pub struct Ffmpeg {
    ffmpeg_bin: String,
    ffprobe_bin: String,
    settings: EncodeSettings,
}

impl Ffmpeg {
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            ffmpeg_bin: config.ffmpeg_bin.clone(),
            ffprobe_bin: config.ffprobe_bin.clone(),
            settings: EncodeSettings::from_config(config),
        }
    }

    /// Run `binary` with `args`, returning stdout on success.
    async fn run(binary: &str, args: &[String]) -> Result<String, MediaError> {
        let output = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    MediaError::ToolNotFound {
                        binary: binary.to_string(),
                    }
                } else {
                    MediaError::SpawnFailed(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            return Err(MediaError::ProcessFailed {
                exit_code: output.status.code(),
                stderr: tail,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaToolkit for Ffmpeg {
    async fn media_duration(&self, path: &Path) -> Result<Duration, MediaError> {
        let args: Vec<String> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            path.display().to_string(),
        ];
        let stdout = Self::run(&self.ffprobe_bin, &args).await?;
        parse_media_duration(&stdout).ok_or_else(|| MediaError::InvalidDuration {
            path: path.to_path_buf(),
            output: stdout.trim().to_string(),
        })
    }

    async fn render(&self, plan: &RenderPlan) -> Result<(), MediaError> {
        let args = build_render_args(plan, &self.settings);
        log::info!(
            "Rendering {} ({:.1}s, {} captions, {:?})",
            plan.output.display(),
            plan.duration.as_secs_f64(),
            plan.overlays.len(),
            plan.fit
        );
        log::debug!("{} {}", self.ffmpeg_bin, args.join(" "));
        Self::run(&self.ffmpeg_bin, &args).await.map(|_| ())
    }
}
