//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the Google Programmable Search JSON API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebSearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub curriculum_model: String,
    pub lesson_model: String,
    pub youtube_api_key: Option<String>,
    pub web_search: Option<WebSearchCredentials>,
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Model Provider ---
        // Keys pasted into .env files often keep their quotes.
        let openai_api_key = var("OPENAI_API_KEY")
            .map(|k| strip_quotes(&k).to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        let openai_api_base = var("OPENAI_API_BASE");
        let curriculum_model =
            var("CURRICULUM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let lesson_model = var("LESSON_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Search Providers (optional) ---
        let youtube_api_key = var("YOUTUBE_API_KEY");
        let web_search = match (var("GOOGLE_SEARCH_API_KEY"), var("GOOGLE_SEARCH_ENGINE_ID")) {
            (Some(api_key), Some(engine_id)) => Some(WebSearchCredentials { api_key, engine_id }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingVar("GOOGLE_SEARCH_ENGINE_ID".to_string()))
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingVar("GOOGLE_SEARCH_API_KEY".to_string()))
            }
        };

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            openai_api_base,
            curriculum_model,
            lesson_model,
            youtube_api_key,
            web_search,
            allowed_origins,
        })
    }
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    value
}
