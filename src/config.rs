//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LABS_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:8081";
pub const DEFAULT_STORAGE_PATH: &str = "reservalab-storage.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL for {var}: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Backend locations and local persistence settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the labs service (laboratories, analyses, patients, reservations).
    pub labs_url: String,
    /// Base URL of the auth service (login, users, areas, roles).
    pub auth_url: String,
    /// File backing the durable key-value store.
    pub storage_path: PathBuf,
    pub timeouts: HttpTimeouts,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `RESERVALAB_LABS_URL`: default `http://127.0.0.1:8080`
    /// - `RESERVALAB_AUTH_URL`: default `http://127.0.0.1:8081`
    /// - `RESERVALAB_STORAGE_PATH`: default `reservalab-storage.json`
    /// - `RESERVALAB_REQUEST_TIMEOUT_SECS`: default 30
    /// - `RESERVALAB_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if a base URL is not `http(s)://`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let labs_url = parse_base_url(
            "RESERVALAB_LABS_URL",
            std::env::var("RESERVALAB_LABS_URL").ok().as_deref(),
            DEFAULT_LABS_URL,
        )?;
        let auth_url = parse_base_url(
            "RESERVALAB_AUTH_URL",
            std::env::var("RESERVALAB_AUTH_URL").ok().as_deref(),
            DEFAULT_AUTH_URL,
        )?;
        let storage_path = std::env::var("RESERVALAB_STORAGE_PATH")
            .map_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("RESERVALAB_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("RESERVALAB_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { labs_url, auth_url, storage_path, timeouts })
    }

    /// Replace the labs base URL, normalizing it the same way as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] for non-HTTP URLs.
    pub fn with_labs_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.labs_url = parse_base_url("labs_url", Some(raw), DEFAULT_LABS_URL)?;
        Ok(self)
    }

    /// Replace the auth base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] for non-HTTP URLs.
    pub fn with_auth_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.auth_url = parse_base_url("auth_url", Some(raw), DEFAULT_AUTH_URL)?;
        Ok(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            labs_url: DEFAULT_LABS_URL.to_owned(),
            auth_url: DEFAULT_AUTH_URL.to_owned(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            timeouts: HttpTimeouts::default(),
        }
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_base_url(var: &'static str, raw: Option<&str>, default: &str) -> Result<String, ConfigError> {
    let value = raw.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default);
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl { var, value: value.to_owned() });
    }
    Ok(value.trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
