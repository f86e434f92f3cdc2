//! Configuration management for the generative-AI connectors
//!
//! - [`Secret`]: credentials given inline or resolved from environment variables
//! - [`AppConfig`]: process-level settings loaded from `GENAI_*` variables

pub mod secret;

pub use secret::{Secret, SecretError};

use serde::Deserialize;

/// Prefix for process-level settings, e.g. `GENAI_LOG_LEVEL`.
pub const ENV_PREFIX: &str = "GENAI";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Console,
    Json,
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub cohere_base_url: Option<String>,
    pub nvidia_embedder_url: Option<String>,
    pub nvidia_generator_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(ENV_PREFIX)
    }

    /// Load configuration from variables carrying the given prefix
    pub fn load(prefix: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "console")?
            .add_source(config::Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }
}
