use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default cadence: every 12 hours, on the hour.
pub const DEFAULT_INGEST_SCHEDULE: &str = "0 0 0/12 * * *";
const DEFAULT_DOCS_PATH: &str = "docs";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_COMPLETION_MODEL: &str = "chatgpt-4o-latest";
const DEFAULT_PINECONE_CONTROLLER_URL: &str = "https://api.pinecone.io";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EMBED_MAX_ATTEMPTS: usize = 5;
const DEFAULT_EMBED_RETRY_DELAY_MS: u64 = 5000;
const DEFAULT_CACHE_TOP_K: usize = 100;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ingestion service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for documents on every run.
    pub docs_path: PathBuf,
    /// Cron expression controlling the run cadence.
    pub ingest_schedule: String,
    /// API key for the OpenAI embeddings and chat endpoints.
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub openai_base_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Chat model used by the completion path.
    pub completion_model: String,
    /// Request timeout applied to embedding and completion calls.
    pub embedding_timeout: Duration,
    /// API key for Pinecone.
    pub pinecone_api_key: String,
    /// Name of the Pinecone index receiving the records.
    pub pinecone_index_name: String,
    /// Pinecone control-plane URL used to resolve the index host.
    pub pinecone_controller_url: String,
    /// Optional data-plane host override; skips host resolution when set.
    pub pinecone_index_host: Option<String>,
    /// Request timeout applied to Pinecone calls.
    pub index_timeout: Duration,
    /// Total embedding attempts per document.
    pub embed_max_attempts: usize,
    /// Fixed pause between embedding attempts.
    pub embed_retry_delay: Duration,
    /// Number of records fetched into the startup cache.
    pub cache_top_k: usize,
    /// Optional port for the admin HTTP surface.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let embedding_dimension = vars.parsed("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        let embed_max_attempts = vars.parsed("EMBED_MAX_ATTEMPTS", DEFAULT_EMBED_MAX_ATTEMPTS)?;
        if embed_max_attempts == 0 {
            return Err(ConfigError::InvalidValue("EMBED_MAX_ATTEMPTS".into()));
        }

        Ok(Self {
            docs_path: PathBuf::from(vars.or_default("DOCS_PATH", DEFAULT_DOCS_PATH)),
            ingest_schedule: vars.or_default("INGEST_SCHEDULE", DEFAULT_INGEST_SCHEDULE),
            openai_api_key: vars.required("OPENAI_API_KEY")?,
            openai_base_url: vars.or_default("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            embedding_model: vars.or_default("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension,
            completion_model: vars.or_default("COMPLETION_MODEL", DEFAULT_COMPLETION_MODEL),
            embedding_timeout: Duration::from_secs(
                vars.parsed("EMBEDDING_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            ),
            pinecone_api_key: vars.required("PINECONE_API_KEY")?,
            pinecone_index_name: vars.required("PINECONE_INDEX_NAME")?,
            pinecone_controller_url: vars
                .or_default("PINECONE_CONTROLLER_URL", DEFAULT_PINECONE_CONTROLLER_URL),
            pinecone_index_host: vars.optional("PINECONE_INDEX_HOST"),
            index_timeout: Duration::from_secs(
                vars.parsed("INDEX_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            ),
            embed_max_attempts,
            embed_retry_delay: Duration::from_millis(
                vars.parsed("EMBED_RETRY_DELAY_MS", DEFAULT_EMBED_RETRY_DELAY_MS)?,
            ),
            cache_top_k: vars.parsed("CACHE_TOP_K", DEFAULT_CACHE_TOP_K)?,
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

/// Load `.env` (when present) and the process environment into a validated [`Config`].
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        docs_path = %config.docs_path.display(),
        schedule = %config.ingest_schedule,
        index = %config.pinecone_index_name,
        embedding_model = %config.embedding_model,
        embedding_dimension = config.embedding_dimension,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
