use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelsmith::cli::{self, Args, Command, ConfigAction};

/// Load `.env` without overriding variables already set.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();
}

/// Install the log subscriber; `RUST_LOG` overrides the `info` default.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    load_env();
    init_logging();

    let args = Args::parse();
    let config_path = args.config.as_deref();

    let result = match args.command {
        Some(Command::Config {
            action: ConfigAction::Init,
        }) => cli::init_config(config_path)
            .map(|path| println!("Created config file: {}", path.display())),
        Some(Command::Config {
            action: ConfigAction::Show,
        }) => cli::load_config(config_path).map(|config| cli::show_config(&config, config_path)),
        Some(Command::Models) => match cli::load_config(config_path) {
            Ok(config) => cli::list_models(&config).await,
            Err(e) => Err(e),
        },
        Some(Command::Script { topic }) => match cli::load_config(config_path) {
            Ok(config) => cli::generate_script(&config, &topic).await,
            Err(e) => Err(e),
        },
        Some(Command::Footage { keyword }) => match cli::load_config(config_path) {
            Ok(config) => cli::find_footage(&config, &keyword).await,
            Err(e) => Err(e),
        },
        Some(Command::Run) | None => match cli::load_config(config_path) {
            Ok(config) => cli::run_job(config).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
