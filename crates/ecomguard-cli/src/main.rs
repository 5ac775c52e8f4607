mod commands;
mod display;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use ecomguard_ai::{DEFAULT_ENDPOINT, DEFAULT_MODEL, GeminiConfig};
use tracing_subscriber::EnvFilter;

/// Photo & Pack: record packing evidence for a shipment, checked for AI-generated photos.
#[derive(Parser)]
#[command(name = "ecomguard", version)]
struct Cli {
    #[command(flatten)]
    ai: AiArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run only the AI authenticity check on a photo.
    Verify {
        /// Photo of the packed parcel.
        photo: PathBuf,
    },
    /// Record packing evidence for a tracking number.
    Record(commands::RecordArgs),
}

#[derive(Args)]
struct AiArgs {
    /// Gemini API key. Without it the AI check is skipped.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL, global = true)]
    gemini_model: String,

    #[arg(long, env = "GEMINI_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    gemini_endpoint: String,

    /// Seconds before an AI check is abandoned.
    #[arg(long, env = "ECOMGUARD_AI_TIMEOUT_SECS", default_value_t = 30, global = true)]
    ai_timeout_secs: u64,
}

impl AiArgs {
    fn config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone(),
            model: self.gemini_model.clone(),
            endpoint: self.gemini_endpoint.clone(),
            timeout: Duration::from_secs(self.ai_timeout_secs),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("ecomguard v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let ai = cli.ai.config();
    match cli.command {
        Command::Verify { photo } => commands::run_verify(&ai, &photo).await,
        Command::Record(args) => commands::run_record(&ai, args).await,
    }
}
