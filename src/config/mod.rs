//! Configuration module for the banner service.
//!
//! All configuration is loaded from environment variables with sensible
//! defaults. The token signing key has no default and must be provided.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Minimum accepted length of a signing key, in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 16;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Secret used to sign and verify session tokens
    pub signing_key: String,
    /// Key retired by the last rotation; still accepted for verification
    pub previous_signing_key: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("signing_key", &"<redacted>")
            .field(
                "previous_signing_key",
                &self.previous_signing_key.as_ref().map(|_| "<redacted>"),
            )
            .field("db_path", &self.db_path)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_key = lookup("BANNER_SIGNING_KEY")
            .ok_or_else(|| config_error("BANNER_SIGNING_KEY must be set"))?;
        validate_key("BANNER_SIGNING_KEY", &signing_key)?;

        let previous_signing_key = lookup("BANNER_PREVIOUS_SIGNING_KEY");
        if let Some(key) = &previous_signing_key {
            validate_key("BANNER_PREVIOUS_SIGNING_KEY", key)?;
        }

        let db_path = lookup("BANNER_DB_PATH")
            .unwrap_or_else(|| "./data/banners.sqlite".to_string())
            .into();

        let bind_addr = lookup("BANNER_BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8000".to_string())
            .parse()
            .map_err(|e| config_error(&format!("Invalid BANNER_BIND_ADDR format: {}", e)))?;

        let log_level = lookup("BANNER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match lookup("BANNER_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(config_error(&format!(
                    "Invalid BANNER_LOG_FORMAT '{}': expected 'text' or 'json'",
                    other
                )))
            }
        };

        Ok(Self {
            signing_key,
            previous_signing_key,
            db_path,
            bind_addr,
            log_level,
            log_format,
        })
    }
}

fn validate_key(name: &str, key: &str) -> Result<(), AppError> {
    if key.len() < MIN_SIGNING_KEY_LEN {
        return Err(config_error(&format!(
            "{} must be at least {} bytes",
            name, MIN_SIGNING_KEY_LEN
        )));
    }
    Ok(())
}

fn config_error(message: &str) -> AppError {
    AppError::Internal(format!("Configuration error: {}", message))
}
