use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Default chat-completion endpoint (OpenAI-compatible).
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when the text already leans toward the center.
pub const DEFAULT_STANDARD_MODEL: &str = "gpt-3.5-turbo";

/// Model used when the classifier sees a strong lean.
pub const DEFAULT_ADVANCED_MODEL: &str = "gpt-4";

/// Access tokens expire after this many minutes unless overridden.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Longest accepted token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 525_600;

/// Origins allowed by CORS when NEUTRALIZER_CORS_ORIGINS is unset.
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:8080"];

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the remote chat-completion service (OPENAI_API_KEY)
    pub completion_api_key: String,
    pub completion_base_url: String,
    /// Cheaper tier, used when the Center probability is at or above the threshold
    pub standard_model: String,
    /// Higher-capability tier, used for strongly leaning text
    pub advanced_model: String,
    /// Base64 key for email-at-rest encryption. Unset means emails are stored as given.
    pub encryption_key: Option<String>,
    pub db_path: String,
    /// Secret for HMAC access token signing (NEUTRALIZER_SESSION_SECRET)
    pub session_secret: String,
    pub token_ttl_minutes: i64,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Where `download-model` fetches the bias classifier export from
    pub bias_model_url: String,
    /// Scratch directory for uploaded images (files are removed after each request)
    pub upload_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Only the secrets are required, and only by the commands that use them;
    /// see the `require_*` methods.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("NEUTRALIZER_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| crate::download::default_model_dir());

        let token_ttl_minutes =
            parse_token_ttl(env::var("NEUTRALIZER_TOKEN_TTL_MINUTES").ok().as_deref())?;

        let cors_origins = env::var("NEUTRALIZER_CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect());

        Ok(Self {
            completion_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            completion_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_COMPLETION_BASE_URL.to_string()),
            standard_model: env::var("NEUTRALIZER_STANDARD_MODEL")
                .unwrap_or_else(|_| DEFAULT_STANDARD_MODEL.to_string()),
            advanced_model: env::var("NEUTRALIZER_ADVANCED_MODEL")
                .unwrap_or_else(|_| DEFAULT_ADVANCED_MODEL.to_string()),
            encryption_key: env::var("ENCRYPTION_KEY").ok().filter(|k| !k.is_empty()),
            db_path: resolve_db_path(
                env::var("DATABASE_URL").ok().as_deref(),
                env::var("NEUTRALIZER_DB_PATH").ok().as_deref(),
            ),
            session_secret: env::var("NEUTRALIZER_SESSION_SECRET").unwrap_or_default(),
            token_ttl_minutes,
            model_dir,
            bias_model_url: env::var("NEUTRALIZER_BIAS_MODEL_URL")
                .unwrap_or_else(|_| crate::download::DEFAULT_BIAS_MODEL_URL.to_string()),
            upload_dir: env::var("NEUTRALIZER_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./uploads")),
            cors_origins,
        })
    }

    /// Check that the completion API key is configured.
    /// Call this before serving, since every rewrite goes through the remote API.
    pub fn require_completion(&self) -> Result<()> {
        if self.completion_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        Ok(())
    }

    /// Check that the token signing secret is configured.
    pub fn require_session_secret(&self) -> Result<()> {
        if self.session_secret.is_empty() {
            anyhow::bail!(
                "NEUTRALIZER_SESSION_SECRET not set. Add a long random value to your .env file."
            );
        }
        Ok(())
    }

    /// Validate that every model the server loads at startup is on disk.
    pub fn require_models(&self) -> Result<()> {
        let missing = crate::download::missing_models(&self.model_dir);
        if !missing.is_empty() {
            anyhow::bail!(
                "Model files not found in {} ({})\n\
                 Run `neutralizer download-model` to download them.",
                self.model_dir.display(),
                missing.join(", ")
            );
        }
        Ok(())
    }
}

/// Token lifetime in minutes; unset means the default. Must be within
/// 1..=MAX_TOKEN_TTL_MINUTES.
fn parse_token_ttl(raw: Option<&str>) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TOKEN_TTL_MINUTES);
    };
    let minutes = raw.trim().parse::<i64>().map_err(|_| {
        anyhow::anyhow!("NEUTRALIZER_TOKEN_TTL_MINUTES must be a whole number, got {raw:?}")
    })?;
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!(
            "NEUTRALIZER_TOKEN_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {minutes}"
        );
    }
    Ok(minutes)
}

/// DATABASE_URL wins when it names a SQLite database; otherwise fall back to
/// NEUTRALIZER_DB_PATH, then ./neutralizer.db.
fn resolve_db_path(database_url: Option<&str>, db_path: Option<&str>) -> String {
    if let Some(url) = database_url {
        if let Some(path) = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
        {
            if !path.is_empty() {
                return path.to_string();
            }
        }
    }
    db_path
        .filter(|p| !p.is_empty())
        .unwrap_or("./neutralizer.db")
        .to_string()
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
