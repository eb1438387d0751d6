//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing and subcommand handlers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::compose::{CaptionStyle, Ffmpeg, VideoComposer};
use crate::config::{default_path as get_config_path, Config, DEFAULT_CONFIG_TEMPLATE};
use crate::footage::{sanitize_keyword, FootageLocator, PexelsClient};
use crate::gemini::{GeminiClient, ModelResolver, ScriptGenerator};
use crate::job::{JobPipeline, RunOutcome};
use crate::narration::GoogleTts;
use crate::queue::SheetsQueue;

// ==================== CLI Arguments ====================

/// Turns the next pending topic in a spreadsheet into a narrated vertical reel
#[derive(Parser, Debug)]
#[command(name = "reelsmith")]
#[command(version, about = "Topic-to-reel video generator", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Process the next pending row (the default)
    Run,
    /// List models that can generate scripts and show which one would be used
    Models,
    /// Generate a script and keyword for a topic without touching the queue
    Script {
        /// Topic to write about
        topic: String,
    },
    /// Look up stock footage for a keyword without touching the queue
    Footage {
        /// Search keyword
        keyword: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

// ==================== Subcommand Handlers ====================

/// Load configuration for a subcommand.
///
/// An explicit `--config` must exist; otherwise the default file is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    Config::load(path).map_err(|e| e.to_string())
}

/// Process one pending row end to end.
pub async fn run_job(config: Config) -> Result<(), String> {
    let queue = SheetsQueue::from_config(&config.queue).map_err(|e| e.to_string())?;
    let gemini = GeminiClient::from_config(&config.gemini).map_err(|e| e.to_string())?;
    let pexels = PexelsClient::from_config(&config.pexels).map_err(|e| e.to_string())?;
    let tts = GoogleTts::from_config(&config.narration).map_err(|e| e.to_string())?;
    let composer = VideoComposer::new(
        tts,
        Ffmpeg::from_config(&config.video),
        CaptionStyle::from_config(&config.video),
        config.video.output_dir.clone(),
    )
    .map_err(|e| e.to_string())?;

    let mut pipeline = JobPipeline::new(config, queue, gemini, pexels, composer);
    match pipeline.run().await.map_err(|e| format!("Queue error: {}", e))? {
        RunOutcome::NothingToDo => {
            println!("Nothing to do: no pending rows.");
            Ok(())
        }
        RunOutcome::Completed {
            row,
            output,
            model,
            keyword,
            footage,
        } => {
            println!("Row {} completed.", row);
            println!("  Model:   {}", model);
            println!("  Keyword: {}", keyword);
            println!("  Footage: {} ({:?})", footage.url, footage.origin);
            println!("  Output:  {}", output.display());
            Ok(())
        }
        RunOutcome::Failed { row, stage, error } => {
            Err(format!("Row {} failed during {}: {}", row, stage, error))
        }
    }
}

/// Print the eligible models and the one a run would pick.
pub async fn list_models(config: &Config) -> Result<(), String> {
    let client = GeminiClient::from_config(&config.gemini).map_err(|e| e.to_string())?;
    let resolver = ModelResolver::new(
        &client,
        &config.gemini.preferred_marker,
        &config.gemini.fallback_model,
    );

    match resolver.eligible_models().await {
        Ok(models) if models.is_empty() => println!("No models support script generation."),
        Ok(models) => {
            println!("Models that support script generation:");
            for model in models {
                println!("  {}", model);
            }
        }
        Err(e) => eprintln!("Could not list models: {}", e),
    }
    println!();

    let choice = resolver.resolve().await;
    println!("Selected: {} ({:?})", choice.identifier(), choice);
    Ok(())
}

/// Generate and print a script for `topic`.
pub async fn generate_script(config: &Config, topic: &str) -> Result<(), String> {
    let client = GeminiClient::from_config(&config.gemini).map_err(|e| e.to_string())?;
    let choice = ModelResolver::new(
        &client,
        &config.gemini.preferred_marker,
        &config.gemini.fallback_model,
    )
    .resolve()
    .await;

    let result = ScriptGenerator::new(&client, &config.script, &config.gemini)
        .generate(topic, choice.identifier())
        .await
        .map_err(|e| e.to_string())?;

    println!("Model:   {}", choice.identifier());
    println!("Keyword: {}", result.keyword);
    println!();
    println!("{}", result.script);
    Ok(())
}

/// Search footage for `keyword` and print the chosen asset.
pub async fn find_footage(config: &Config, keyword: &str) -> Result<(), String> {
    let client = PexelsClient::from_config(&config.pexels).map_err(|e| e.to_string())?;
    let asset = FootageLocator::new(&client, &config.pexels)
        .locate(keyword)
        .await;

    println!(
        "Query:  {}",
        sanitize_keyword(keyword, &config.pexels.default_term)
    );
    println!("Origin: {:?}", asset.origin);
    println!("Width:  {}", asset.width);
    println!("URL:    {}", asset.url);
    Ok(())
}

/// Show all but the last four characters of a secret.
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        None => "(not set)".to_string(),
        Some(s) if s.trim().is_empty() => "(not set)".to_string(),
        Some(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.len() <= 4 {
                "****".to_string()
            } else {
                let tail: String = chars[chars.len() - 4..].iter().collect();
                format!("****{}", tail)
            }
        }
    }
}

/// Print the effective configuration with secrets masked.
pub fn show_config(config: &Config, path: Option<&Path>) {
    println!("Current configuration:");
    println!("  [gemini]");
    println!("    api_key: {}", mask_secret(config.gemini.api_key.as_deref()));
    println!("    base_url: {}", config.gemini.base_url);
    println!("    preferred_marker: {}", config.gemini.preferred_marker);
    println!("    fallback_model: {}", config.gemini.fallback_model);
    println!(
        "    retry: {} attempts, {}s step",
        config.gemini.max_attempts, config.gemini.backoff_step_secs
    );
    println!("  [script]");
    println!("    duration: {}s", config.script.duration_secs);
    println!(
        "    languages: narration {}, keyword {}",
        config.script.narration_language, config.script.keyword_language
    );
    println!("    delimiter: {}", config.script.delimiter);
    println!("    default_keyword: {}", config.script.default_keyword);
    println!("  [pexels]");
    println!("    api_key: {}", mask_secret(config.pexels.api_key.as_deref()));
    println!(
        "    terms: default {}, fallback {}",
        config.pexels.default_term, config.pexels.fallback_term
    );
    println!("  [narration]");
    println!("    language: {}", config.narration.language);
    println!("    chunk_chars: {}", config.narration.chunk_chars);
    println!("  [video]");
    println!(
        "    frame: {}x{} @ {}fps ({}/{})",
        config.video.width,
        config.video.height,
        config.video.fps,
        config.video.video_codec,
        config.video.audio_codec
    );
    println!(
        "    font: {} ({}pt, wrap {})",
        config.video.font_file, config.video.font_size, config.video.wrap_chars
    );
    println!("    output_dir: {}", config.video.output_dir.display());
    println!("  [queue]");
    println!("    spreadsheet_id: {}", config.queue.spreadsheet_id);
    println!("    sheet_name: {}", config.queue.sheet_name);
    println!(
        "    access_token: {}",
        mask_secret(config.queue.access_token.as_deref())
    );
    println!();

    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    if config_path.exists() {
        println!("Config file: {} (exists)", config_path.display());
    } else {
        println!("Config file: {} (not found)", config_path.display());
    }
}

/// Write the default config file, refusing to overwrite an existing one.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf, String> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

    if config_path.exists() {
        return Err(format!(
            "Config file already exists: {}\nUse 'reelsmith config show' to view current settings.",
            config_path.display()
        ));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating config directory: {}", e))?;
    }

    std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)
        .map_err(|e| format!("Error writing config file: {}", e))?;

    Ok(config_path)
}
