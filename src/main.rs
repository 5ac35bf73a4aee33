use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use logmedic::detect::service::LogRecord;
use logmedic::detect::train;
use logmedic::storage;

#[derive(Parser)]
#[command(
    name = "logmedic",
    about = "ML-powered anomaly scoring for service log traffic",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + scoring engine)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:5001")]
        bind: String,

        /// Directory holding the persisted model artifacts
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
    },

    /// Bootstrap-train a detector from synthetic traffic and persist it
    Train {
        /// Directory to write the model artifacts to
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        /// RNG seed for the synthetic training population
        #[arg(long, default_value_t = train::DEFAULT_SEED)]
        seed: u64,

        /// Overwrite existing artifacts
        #[arg(long)]
        force: bool,
    },

    /// Score a single log record and print the prediction as JSON
    Score {
        /// Service that emitted the record
        #[arg(long)]
        service: String,

        /// Log message to score
        #[arg(long)]
        message: String,

        /// Directory holding the persisted model artifacts
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, models_dir } => {
            tracing::info!(%bind, "Starting logmedic daemon");
            logmedic::serve(&bind, &models_dir).await?;
        }
        Commands::Train {
            models_dir,
            seed,
            force,
        } => {
            if !force
                && matches!(
                    storage::load_artifacts(&models_dir),
                    storage::LoadOutcome::Loaded { .. }
                )
            {
                println!(
                    "Model already exists in {}. Use --force to retrain.",
                    models_dir.display()
                );
                return Ok(());
            }

            let (detector, scaler) = train::train(seed)?;
            let vocabulary = storage::load_vocabulary(&models_dir);
            storage::save_artifacts(&models_dir, &detector, &scaler, &vocabulary.snapshot())?;
            println!("Trained and persisted model to {}", models_dir.display());
        }
        Commands::Score {
            service,
            message,
            models_dir,
        } => {
            let scoring = storage::load_or_train(&models_dir, train::DEFAULT_SEED)?;
            let prediction = scoring.predict(&LogRecord { service, message })?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
    }

    Ok(())
}
