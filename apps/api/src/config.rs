use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_FALLBACK_SENDER: &str = "Hirebuddy <noreply@hirebuddy.net>";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Base URL of the hosted auth service that validates bearer tokens.
    pub auth_url: String,
    pub auth_anon_key: String,
    pub resend_api_key: String,
    /// Sender used when the caller's own address is on a free consumer domain.
    pub fallback_sender: String,
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            auth_url: require_env("AUTH_URL")?,
            auth_anon_key: require_env("AUTH_ANON_KEY")?,
            resend_api_key: require_env("RESEND_API_KEY")?,
            fallback_sender: std::env::var("FALLBACK_SENDER")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_SENDER.to_string()),
            batch_size: parse_env("EMAIL_BATCH_SIZE", 10)?,
            batch_delay: Duration::from_millis(parse_env("EMAIL_BATCH_DELAY_MS", 1000)?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
