use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use neutralizer::auth::{EmailCipher, PasswordHasher, TokenSigner};
use neutralizer::bias::{BiasClassifier, OnnxBiasClassifier};
use neutralizer::config::Config;
use neutralizer::db::Database;
use neutralizer::directory::UserDirectory;
use neutralizer::download;
use neutralizer::multimodal::LocalImageDescriber;
use neutralizer::neutralize::{Neutralizer, OpenAiClient, TierModels};
use neutralizer::web::{AppState, UploadDir};

/// Neutralizer: bias analysis and neutral rewriting.
///
/// Classifies the political lean of text, and rewrites or explains it with
/// a remote language model, optionally using an image for context.
#[derive(Parser)]
#[command(name = "neutralizer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Download the ONNX models (bias classifier, CLIP, GPT-2)
    DownloadModel,

    /// Start the HTTP API
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Classify the political lean of a piece of text
    Classify {
        /// The text to classify
        text: String,
    },

    /// Show system status (DB stats, models, configuration)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("neutralizer=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            info!("Initializing Neutralizer database...");
            let config = Config::load()?;
            let db = neutralizer::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  1. Set up your .env file (see .env.example for required variables)");
            println!("  2. Run: neutralizer download-model");
            println!("  3. Run: neutralizer serve");
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX models...");
            println!("  Destination: {}", model_dir.display());

            download::download_models(model_dir, &config.bias_model_url).await?;

            println!("\n{}", "Models downloaded successfully.".bold());
            println!("You can now run `neutralizer serve` or `neutralizer classify \"...\"`.");
        }

        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            config.require_session_secret()?;
            config.require_completion()?;
            config.require_models()?;

            let db = neutralizer::db::open_sqlite(&config.db_path)?;
            let state = build_state(&config, db)?;
            neutralizer::web::run_server(state, &config.cors_origins, port, &bind).await?;
        }

        Commands::Classify { text } => {
            if text.trim().is_empty() {
                anyhow::bail!("Nothing to classify: the text is empty");
            }
            let config = Config::load()?;
            let classifier =
                OnnxBiasClassifier::load(&download::bias_model_dir(&config.model_dir))?;
            let bias = classifier.classify(&text).await?;
            neutralizer::output::terminal::display_bias(&text, &bias);
        }

        Commands::Status => {
            let config = Config::load()?;
            let db = neutralizer::db::open_sqlite(&config.db_path).ok();
            neutralizer::status::show(&config, db.as_ref()).await?;
        }
    }

    Ok(())
}

/// Load every model and service the API needs. Slow: the ONNX sessions are
/// built here, once, before the listener starts.
fn build_state(config: &Config, db: Arc<dyn Database>) -> Result<AppState> {
    let cipher = config
        .encryption_key
        .as_deref()
        .map(EmailCipher::from_base64)
        .transpose()
        .context("ENCRYPTION_KEY is not a valid base64-encoded 32-byte key")?;
    let directory = UserDirectory::new(db, cipher, PasswordHasher::default());
    if !directory.encrypts_email() {
        info!("ENCRYPTION_KEY not set; emails are stored unencrypted");
    }
    let tokens = TokenSigner::new(
        config.session_secret.clone(),
        chrono::Duration::minutes(config.token_ttl_minutes),
    );

    info!("Loading bias classifier...");
    let classifier = OnnxBiasClassifier::load(&download::bias_model_dir(&config.model_dir))?;
    info!("Loading CLIP and GPT-2...");
    let describer = LocalImageDescriber::load(&config.model_dir)?;

    let completion = OpenAiClient::new(
        config.completion_api_key.clone(),
        &config.completion_base_url,
    )?;
    let neutralizer = Neutralizer::new(
        Arc::new(completion),
        Arc::new(describer),
        TierModels::new(config.standard_model.clone(), config.advanced_model.clone()),
    );

    Ok(AppState {
        directory: Arc::new(directory),
        tokens: Arc::new(tokens),
        classifier: Arc::new(classifier),
        neutralizer: Arc::new(neutralizer),
        uploads: Arc::new(UploadDir::new(config.upload_dir.clone())?),
    })
}
