//! Application configuration loaded from environment variables.

use thiserror::Error;

/// Credential stored for a bootstrapped admin when none is configured.
/// No password hash ever equals it, so the account cannot log in.
pub const LOCKED_CREDENTIAL: &str = "!";

/// An environment variable holds a value that cannot be used.
#[derive(Debug, Error)]
#[error("Invalid value for {var}: {value:?}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: Postgres connection string; unset runs on the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `ADMIN_EMAIL`: administrator account created at startup if missing
/// - `ADMIN_CREDENTIAL`: pre-hashed credential for that account (default: locked)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub admin_email: Option<String>,
    pub admin_credential: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let present = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let port = match present("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => defaults.port,
        };
        let log_format = match present("LOG_FORMAT") {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError {
                var: "LOG_FORMAT",
                value: raw,
            })?,
            None => defaults.log_format,
        };
        let database_max_connections = match present("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => parse_var("DATABASE_MAX_CONNECTIONS", &raw)?,
            None => defaults.database_max_connections,
        };

        Ok(Self {
            host: present("HOST").unwrap_or(defaults.host),
            port,
            log_level: present("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: present("DATABASE_URL"),
            database_max_connections,
            admin_email: present("ADMIN_EMAIL"),
            admin_credential: present("ADMIN_CREDENTIAL").unwrap_or(defaults.admin_credential),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError {
        var,
        value: raw.to_string(),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 5,
            admin_email: None,
            admin_credential: LOCKED_CREDENTIAL.to_string(),
        }
    }
}
