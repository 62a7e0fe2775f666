use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use grpc_logger::{load_config, Fields, Level, Logger, LoggerConfig, Settings};

#[derive(Parser)]
#[command(name = "logcheck")]
#[command(about = "Inspect a logger configuration and the lines it produces", long_about = None)]
struct Cli {
    /// Logger configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(short, long)]
    level: Option<String>,

    /// Override the configured formatter (custom, json, text)
    #[arg(short, long)]
    formatter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved level, formatter and hooks
    Show,
    /// Emit one sample line per enabled level
    Sample {
        #[arg(short, long, default_value = "logcheck sample")]
        message: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grpc_logger=debug,logcheck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading logger configuration");
            load_config(path)?
        }
        None => LoggerConfig::default(),
    };

    let mut settings = Settings::from_config(&config);
    if let Some(level) = cli.level {
        settings = settings.with_level(level);
    }
    if let Some(formatter) = cli.formatter {
        settings = settings.with_formatter_name(formatter);
    }
    let logger = Logger::from_settings(settings.with_base_fields(Fields::new().with("app", "logcheck")));

    match cli.command {
        Commands::Show => {
            println!("level:     {}", logger.level());
            println!("formatter: {:?}", logger.formatter());
            let hooks = logger.hook_names();
            if hooks.is_empty() {
                println!("hooks:     (none)");
            } else {
                println!("hooks:     {}", hooks.join(", "));
            }
        }
        Commands::Sample { message } => {
            // Fatal and panic terminate the process, so they are never sampled.
            for level in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace] {
                logger.with_field("sample", level.as_str()).log(level, &message);
            }
        }
    }

    Ok(())
}
