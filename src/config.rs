//! Environment-driven configuration
//!
//! Secrets and API keys are mandatory: startup fails if they are absent
//! rather than falling back to an insecure default.

use crate::error::{ApiError, Result};
use std::env;

pub const DEFAULT_ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2";

/// Server configuration loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub jwt_secret: String,
    pub alpha_vantage_key: String,
    pub alpha_vantage_url: String,
    pub news_api_key: String,
    pub news_api_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: optional("HOST", "0.0.0.0"),
            port: optional("PORT", "8000")
                .parse()
                .map_err(|e| ApiError::Config(format!("Invalid PORT value: {}", e)))?,
            database_path: optional("DATABASE_PATH", "markstro.db"),
            jwt_secret: required("JWT_SECRET")?,
            alpha_vantage_key: required("ALPHA_VANTAGE_KEY")?,
            alpha_vantage_url: optional("ALPHA_VANTAGE_URL", DEFAULT_ALPHA_VANTAGE_URL),
            news_api_key: required("NEWS_API_KEY")?,
            news_api_url: optional("NEWS_API_URL", DEFAULT_NEWS_API_URL),
        })
    }
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::Config(format!(
            "Environment variable {} must be set",
            key
        ))),
    }
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        tracing::info!("{} not set, using default: {}", key, default);
        default.to_string()
    })
}
