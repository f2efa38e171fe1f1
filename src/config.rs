//! Process-wide configuration.
//!
//! Configuration is constructed once at startup and passed to the dispatcher by
//! reference; it is immutable for the process lifetime. [`Config::from_env`] merges
//! `VOLLEY_`-prefixed environment variables over the built-in defaults, so
//! `VOLLEY_TEXT_ENDPOINT=https://... VOLLEY_RETRY__MAX_ATTEMPTS=5` works without a
//! config file. Nested values use double underscores.

use std::time::Duration;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::GenerationKind;

/// Retry behavior for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of outbound calls per logical request.
    pub max_attempts: u32,

    /// Base backoff duration in milliseconds (will be exponentially increased)
    pub backoff_ms: u64,

    /// Factor by which the backoff is increased with each retry
    pub backoff_factor: u64,

    /// Maximum backoff time in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 500,
            backoff_factor: 2,
            max_backoff_ms: 8000,
        }
    }
}

impl RetryPolicy {
    /// Calculate the backoff duration for a given attempt index.
    ///
    /// Uses exponential backoff: `backoff_ms * backoff_factor^attempt`, capped
    /// at `max_backoff_ms`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .backoff_ms
            .saturating_mul(self.backoff_factor.saturating_pow(attempt));
        Duration::from_millis(exponential.min(self.max_backoff_ms))
    }
}

/// Immutable process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Inference endpoint for text generation.
    pub text_endpoint: String,

    /// Inference endpoint for image generation.
    pub image_endpoint: String,

    /// Inference endpoint for video generation.
    pub video_endpoint: String,

    /// API key sent as an `Authorization: Bearer` header when present.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Retry behavior for transient failures.
    #[serde(default)]
    pub retry: RetryPolicy,

    /// Timeout for each individual attempt in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// SQLite database URL for the interaction log.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// When set, response bodies are logged at debug level during classification.
    #[serde(default)]
    pub debug: bool,
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_database_url() -> String {
    "sqlite://volley.db".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            text_endpoint: String::new(),
            image_endpoint: String::new(),
            video_endpoint: String::new(),
            api_key: None,
            retry: RetryPolicy::default(),
            timeout_ms: default_timeout_ms(),
            database_url: default_database_url(),
            debug: false,
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Variables are prefixed with `VOLLEY_`; nested fields use double
    /// underscores (e.g. `VOLLEY_RETRY__BACKOFF_MS=250`).
    pub fn from_env() -> Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("VOLLEY_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// The configured endpoint for a generation kind.
    pub fn endpoint_for(&self, kind: GenerationKind) -> &str {
        match kind {
            GenerationKind::Text => &self.text_endpoint,
            GenerationKind::Image => &self.image_endpoint,
            GenerationKind::Video => &self.video_endpoint,
        }
    }

    /// Whether `endpoint` is one of the configured targets.
    pub fn is_configured_endpoint(&self, endpoint: &str) -> bool {
        !endpoint.is_empty()
            && [
                &self.text_endpoint,
                &self.image_endpoint,
                &self.video_endpoint,
            ]
            .iter()
            .any(|configured| configured.as_str() == endpoint)
    }
}
