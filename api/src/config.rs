//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{bail, Result};
use std::net::SocketAddr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `PUSHWATCH_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `PUSHWATCH_PORT`: The port to listen on (default: 8080)
/// - `PUSHWATCH_LOG_FORMAT`: `text` or `json` (default: "text")
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `PUSHWATCH_PORT` is set but cannot be parsed as a valid port number
    /// - `PUSHWATCH_LOG_FORMAT` is set to something other than `text` or `json`
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("PUSHWATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PUSHWATCH_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()?
            .unwrap_or(8080);

        let log_format = match std::env::var("PUSHWATCH_LOG_FORMAT") {
            Ok(format) => parse_log_format(&format)?,
            Err(_) => LogFormat::default(),
        };

        Ok(Self {
            host,
            port,
            log_format,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_format: LogFormat::default(),
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "" | "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => bail!("unsupported log format '{other}', expected 'text' or 'json'"),
    }
}
