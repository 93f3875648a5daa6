pub mod tables;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub vector: VectorConfig,
    pub embedding: EmbeddingConfig,
    pub retry: RetryConfig,
    pub ranking: RankingConfig,
    pub ingest: IngestConfig,
    pub rules_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub external_url: Option<String>,
    pub api_rate_limit: u64,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub index_name: String,
    pub control_url: String,
    pub dimension: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

/// Bounded retry with exponential backoff for service initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Number of nearest neighbors requested from the index
    pub initial_results: usize,
    /// Number of ranked recipes returned to the caller
    pub display_count: usize,
    /// Scale the diversity term to [0,1] before blending
    pub normalize_diversity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl RetryConfig {
    pub fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.min_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                external_url: None,
                api_rate_limit: 20,
                max_request_body_size: 65_536,
            },
            vector: VectorConfig {
                api_key: None,
                index_name: "recipes".to_string(),
                control_url: "https://api.pinecone.io".to_string(),
                dimension: 384,
                timeout_seconds: 30,
            },
            embedding: EmbeddingConfig {
                url: "http://127.0.0.1:8080".to_string(),
                model: "all-MiniLM-L6-v2".to_string(),
                timeout_seconds: 30,
            },
            retry: RetryConfig {
                max_attempts: 3,
                min_backoff_ms: 4_000,
                max_backoff_ms: 10_000,
            },
            ranking: RankingConfig {
                initial_results: 30,
                display_count: 5,
                normalize_diversity: false,
            },
            ingest: IngestConfig {
                batch_size: 10,
                batch_delay_ms: 1_000,
            },
            rules_path: None,
        }
    }
}

/// Read an environment variable, falling back to `default` when unset
fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("Invalid {key} value"))),
        Err(_) => Ok(default),
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        Ok(Settings {
            server: ServerConfig {
                host: env_or("HOST", defaults.server.host)?,
                port: env_or("PORT", defaults.server.port)?,
                external_url: std::env::var("EXTERNAL_URL").ok(),
                api_rate_limit: env_or("API_RATE_LIMIT", defaults.server.api_rate_limit)?,
                max_request_body_size: env_or(
                    "MAX_REQUEST_BODY_SIZE",
                    defaults.server.max_request_body_size,
                )?,
            },
            vector: VectorConfig {
                api_key: std::env::var("PINECONE_API_KEY").ok(),
                index_name: env_or("INDEX_NAME", defaults.vector.index_name)?,
                control_url: env_or("PINECONE_CONTROL_URL", defaults.vector.control_url)?,
                dimension: env_or("VECTOR_DIM", defaults.vector.dimension)?,
                timeout_seconds: env_or("VECTOR_TIMEOUT", defaults.vector.timeout_seconds)?,
            },
            embedding: EmbeddingConfig {
                url: env_or("EMBEDDING_URL", defaults.embedding.url)?,
                model: env_or("EMBEDDING_MODEL", defaults.embedding.model)?,
                timeout_seconds: env_or("EMBEDDING_TIMEOUT", defaults.embedding.timeout_seconds)?,
            },
            retry: RetryConfig {
                max_attempts: env_or("MAX_RETRIES", defaults.retry.max_attempts)?,
                min_backoff_ms: env_or("RETRY_MIN_BACKOFF_MS", defaults.retry.min_backoff_ms)?,
                max_backoff_ms: env_or("RETRY_MAX_BACKOFF_MS", defaults.retry.max_backoff_ms)?,
            },
            ranking: RankingConfig {
                initial_results: env_or("INITIAL_RESULTS", defaults.ranking.initial_results)?,
                display_count: env_or("DISPLAY_COUNT", defaults.ranking.display_count)?,
                normalize_diversity: env_or(
                    "NORMALIZE_DIVERSITY",
                    defaults.ranking.normalize_diversity,
                )?,
            },
            ingest: IngestConfig {
                batch_size: env_or("INGEST_BATCH_SIZE", defaults.ingest.batch_size)?,
                batch_delay_ms: env_or("INGEST_BATCH_DELAY_MS", defaults.ingest.batch_delay_ms)?,
            },
            rules_path: std::env::var("RULES_PATH").ok().map(PathBuf::from),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.server.api_rate_limit == 0 {
            return Err(Error::Config("API rate limit must be non-zero".to_string()));
        }

        if self.ranking.display_count == 0 {
            return Err(Error::Config("DISPLAY_COUNT must be non-zero".to_string()));
        }

        if self.ranking.initial_results < self.ranking.display_count {
            return Err(Error::Config(format!(
                "INITIAL_RESULTS ({}) must be at least DISPLAY_COUNT ({})",
                self.ranking.initial_results, self.ranking.display_count
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::Config("MAX_RETRIES must be at least 1".to_string()));
        }

        if self.retry.min_backoff_ms > self.retry.max_backoff_ms {
            return Err(Error::Config(
                "RETRY_MIN_BACKOFF_MS must not exceed RETRY_MAX_BACKOFF_MS".to_string(),
            ));
        }

        if self.vector.dimension == 0 {
            return Err(Error::Config("VECTOR_DIM must be non-zero".to_string()));
        }

        if self.ingest.batch_size == 0 {
            return Err(Error::Config("INGEST_BATCH_SIZE must be non-zero".to_string()));
        }

        Url::parse(&self.embedding.url)
            .map_err(|e| Error::Config(format!("Invalid EMBEDDING_URL: {e}")))?;
        Url::parse(&self.vector.control_url)
            .map_err(|e| Error::Config(format!("Invalid PINECONE_CONTROL_URL: {e}")))?;

        Ok(())
    }
}
