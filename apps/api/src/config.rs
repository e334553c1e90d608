use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::screening::orchestrator::ScreeningSettings;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on candidate evaluations in flight at once.
    pub max_concurrent_evaluations: usize,
    pub scorer_timeout_secs: u64,
    /// Per-file limit for uploaded resumes.
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_concurrent_evaluations = optional_env("MAX_CONCURRENT_EVALUATIONS", 4usize)?;
        if max_concurrent_evaluations == 0 {
            bail!("MAX_CONCURRENT_EVALUATIONS must be at least 1");
        }

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: optional_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_concurrent_evaluations,
            scorer_timeout_secs: optional_env("SCORER_TIMEOUT_SECS", 60u64)?,
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    /// The subset of configuration the screening pipeline consumes.
    pub fn screening_settings(&self) -> ScreeningSettings {
        ScreeningSettings {
            max_concurrent_evaluations: self.max_concurrent_evaluations,
            scorer_timeout: Duration::from_secs(self.scorer_timeout_secs),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
