use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

use crate::evaluation::batch::DEFAULT_MAX_CONCURRENCY;
use crate::llm_client::DEFAULT_API_URL;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub port: u16,
    pub rust_log: String,
    pub usage_log_path: PathBuf,
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_concurrency: usize =
            parse_or(&lookup, "MAX_CONCURRENCY", DEFAULT_MAX_CONCURRENCY)?;
        ensure!(max_concurrency >= 1, "MAX_CONCURRENCY must be at least 1");

        let max_upload_mb: usize = parse_or(&lookup, "MAX_UPLOAD_MB", 25)?;

        Ok(Config {
            gemini_api_key: lookup("GEMINI_API_KEY")
                .filter(|v| !v.trim().is_empty())
                .context("Required environment variable 'GEMINI_API_KEY' is not set")?,
            gemini_api_url: lookup("GEMINI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            usage_log_path: lookup("USAGE_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("usage_log.csv")),
            max_concurrency,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 120)?),
            max_retries: parse_or(&lookup, "MAX_RETRIES", 0)?,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
