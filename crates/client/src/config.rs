//! Startup configuration for the transport client.
//!
//! The API host is resolved once from the environment; a missing host is
//! a startup error, never a per-request one. Endpoint paths are
//! configuration too, since they have changed between service versions.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the service base URL.
pub const API_HOST_ENV: &str = "ASSETDECK_API_HOST";

/// Environment variable pointing at an optional JSON endpoint override file.
pub const ENDPOINTS_ENV: &str = "ASSETDECK_ENDPOINTS";

/// Placeholder replaced by the percent-encoded content hash.
const HASH_PLACEHOLDER: &str = "{hash}";

/// Errors raised while building the client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ASSETDECK_API_HOST is not set")]
    MissingApiHost,

    #[error("invalid API host {value:?}: {reason}")]
    InvalidApiHost { value: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Path templates for the four remote operations.
///
/// Any subset can be overridden from a JSON file; missing fields keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub list: String,
    pub upload: String,
    pub delete: String,
    pub resize: String,
    /// Name of the single multipart field carrying the file.
    pub file_field: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            list: "/image/list".into(),
            upload: "/image/upload".into(),
            delete: "/image/delete/{hash}".into(),
            resize: "/image/resize/{hash}".into(),
            file_field: "file".into(),
        }
    }
}

impl Endpoints {
    /// Loads endpoint overrides from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Transport client configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_host: String,
    endpoints: Endpoints,
    timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a configuration for `api_host` with the default endpoints.
    pub fn new(api_host: &str) -> Result<Self, ConfigError> {
        let trimmed = api_host.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingApiHost);
        }

        let url = reqwest::Url::parse(trimmed).map_err(|e| ConfigError::InvalidApiHost {
            value: trimmed.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiHost {
                value: trimmed.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        Ok(Self {
            api_host: trimmed.trim_end_matches('/').to_string(),
            endpoints: Endpoints::default(),
            timeout: None,
        })
    }

    /// Reads [`API_HOST_ENV`] and, if set, the [`ENDPOINTS_ENV`] override file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup(API_HOST_ENV).ok_or(ConfigError::MissingApiHost)?;
        let mut config = Self::new(&host)?;

        if let Some(path) = lookup(ENDPOINTS_ENV).filter(|p| !p.trim().is_empty()) {
            config.endpoints = Endpoints::load(Path::new(path.trim()))?;
            tracing::debug!(path = %path, "loaded endpoint overrides");
        }

        Ok(config)
    }

    /// Replaces the endpoint set.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets an overall per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Builds the absolute URL for `template`, substituting `hash` if given.
    pub(crate) fn url(&self, template: &str, hash: Option<&str>) -> String {
        let path = match hash {
            Some(h) => {
                let encoded =
                    percent_encoding::utf8_percent_encode(h, percent_encoding::NON_ALPHANUMERIC)
                        .to_string();
                template.replace(HASH_PLACEHOLDER, &encoded)
            }
            None => template.to_string(),
        };

        if path.starts_with('/') {
            format!("{}{}", self.api_host, path)
        } else {
            format!("{}/{}", self.api_host, path)
        }
    }
}
