//! Configuration file handling for reelsmith.
//!
//! Loads configuration from `~/.config/reelsmith/config.toml` or a custom path,
//! then layers provider secrets from the process environment on top. This is the
//! only place the environment is read; every component receives its section by
//! reference.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the Pexels API key.
pub const PEXELS_API_KEY_ENV: &str = "PEXELS_API_KEY";

/// Environment variable holding the Google Sheets OAuth access token.
pub const SHEETS_TOKEN_ENV: &str = "GOOGLE_SHEETS_TOKEN";

/// Configuration file structure for reelsmith.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub pexels: PexelsConfig,
    #[serde(default)]
    pub narration: NarrationConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Generation provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Model used when discovery fails or finds nothing eligible.
    pub fallback_model: String,
    /// Substring marking the preferred model tier.
    pub preferred_marker: String,
    /// Total attempts made when the provider reports overload.
    pub max_attempts: u32,
    /// Back-off grows linearly: attempt number times this step.
    pub backoff_step_secs: f64,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::gemini::GEMINI_API_BASE_URL.to_string(),
            fallback_model: "gemini-1.5-flash".to_string(),
            preferred_marker: "flash".to_string(),
            max_attempts: 3,
            backoff_step_secs: 10.0,
            timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    pub fn backoff_step(&self) -> Duration {
        Duration::try_from_secs_f64(self.backoff_step_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Prompt and reply-format settings for the narration script.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub duration_secs: u32,
    pub narration_language: String,
    pub keyword_language: String,
    /// Token separating the narration from the search keyword in the reply.
    pub delimiter: String,
    /// Keyword recorded when the reply carries no delimiter.
    pub default_keyword: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            narration_language: "日本語".to_string(),
            keyword_language: "英語".to_string(),
            delimiter: "###".to_string(),
            default_keyword: "nature".to_string(),
        }
    }
}

/// Stock footage provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PexelsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Search term used when the sanitized keyword comes out empty.
    pub default_term: String,
    /// Generic term for the second search when the first finds nothing.
    pub fallback_term: String,
    /// Asset used when both searches come back empty.
    pub placeholder_url: String,
    pub timeout_secs: u64,
}

impl Default for PexelsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: crate::footage::PEXELS_API_BASE_URL.to_string(),
            default_term: "nature".to_string(),
            fallback_term: "cinematic".to_string(),
            placeholder_url:
                "https://videos.pexels.com/video-files/3571264/3571264-uhd_2160_3840_30fps.mp4"
                    .to_string(),
            timeout_secs: 30,
        }
    }
}

impl PexelsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    pub language: String,
    pub base_url: String,
    /// Longest piece of text sent in one synthesis request.
    pub chunk_chars: usize,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            language: "ja".to_string(),
            base_url: "https://translate.google.com".to_string(),
            chunk_chars: 100,
        }
    }
}

/// Rendering settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    /// Font used for captions; must cover the narration language.
    pub font_file: String,
    pub font_size: u32,
    /// Characters per caption line before wrapping.
    pub wrap_chars: usize,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub output_dir: PathBuf,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            font_file: "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc".to_string(),
            font_size: 64,
            wrap_chars: 14,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Spreadsheet queue settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub access_token: Option<String>,
    pub base_url: String,
    pub status: StatusMarkers,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: "シート1".to_string(),
            access_token: None,
            base_url: crate::queue::SHEETS_API_BASE_URL.to_string(),
            status: StatusMarkers::default(),
        }
    }
}

/// Values written to (and matched in) the status column.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusMarkers {
    pub pending: String,
    pub completed: String,
    pub script_failed: String,
    pub compose_failed: String,
}

impl Default for StatusMarkers {
    fn default() -> Self {
        Self {
            pending: "未処理".to_string(),
            completed: "完了".to_string(),
            script_failed: "台本生成エラー".to_string(),
            compose_failed: "動画生成エラー".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the default file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(explicit) => Self::load_from_explicit(explicit)?,
            None => {
                let path = default_path();
                if path.exists() {
                    Self::read(&path)?
                } else {
                    Config::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a path the user asked for; the file must exist.
    pub fn load_from_explicit(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Self::read(path)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Override secrets with values from the environment, when present.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(GEMINI_API_KEY_ENV) {
            self.gemini.api_key = Some(key);
        }
        if let Some(key) = non_empty(PEXELS_API_KEY_ENV) {
            self.pexels.api_key = Some(key);
        }
        if let Some(token) = non_empty(SHEETS_TOKEN_ENV) {
            self.queue.access_token = Some(token);
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    NotFound {
        path: PathBuf,
    },
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound { path } => {
                write!(f, "Config file not found: '{}'", path.display())
            }
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::NotFound { .. } => None,
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("reelsmith").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/reelsmith/config.toml")
        })
}

/// Commented default configuration written by `reelsmith config init`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r####"# reelsmith configuration
# Secrets may also come from GEMINI_API_KEY, PEXELS_API_KEY and GOOGLE_SHEETS_TOKEN.

[gemini]
# api_key = "..."
fallback_model = "gemini-1.5-flash"
# Models whose name contains this are preferred
preferred_marker = "flash"
# Attempts made while the model reports overload (503) or rate limiting (429)
max_attempts = 3
# Back-off is attempt * step seconds
backoff_step_secs = 10

[script]
duration_secs = 60
narration_language = "日本語"
keyword_language = "英語"
delimiter = "###"
default_keyword = "nature"

[pexels]
# api_key = "..."
default_term = "nature"
fallback_term = "cinematic"

[narration]
language = "ja"
chunk_chars = 100

[video]
width = 1080
height = 1920
fps = 30
font_file = "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc"
font_size = 64
wrap_chars = 14
output_dir = "output"

[queue]
spreadsheet_id = ""
sheet_name = "シート1"
# access_token = "..."

[queue.status]
pending = "未処理"
completed = "完了"
script_failed = "台本生成エラー"
compose_failed = "動画生成エラー"
"####;
