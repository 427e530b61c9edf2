//! Store configuration.
//!
//! Everything has a working default; `from_env` overrides individual values
//! from the process environment.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::capabilities::{HttpError, ValidatedUrl};
use crate::{
    DEFAULT_SERVER_URL, ITEMS_PATH, PLACEHOLDER_IMAGE_URL, REQUEST_TIMEOUT, UPLOAD_PATH,
    UPLOAD_TIMEOUT,
};

pub const SERVER_URL_VAR: &str = "SERVER_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "CATALOG_REQUEST_TIMEOUT_MS";
pub const UPLOAD_TIMEOUT_VAR: &str = "CATALOG_UPLOAD_TIMEOUT_MS";
pub const PLACEHOLDER_IMAGE_VAR: &str = "CATALOG_PLACEHOLDER_IMAGE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {reason}")]
    InvalidUrl { var: &'static str, reason: String },

    #[error("{var} must be a positive number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub server_url: Url,
    pub request_timeout: Duration,
    pub upload_timeout: Duration,
    pub placeholder_image: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server URL parses"),
            request_timeout: REQUEST_TIMEOUT,
            upload_timeout: UPLOAD_TIMEOUT,
            placeholder_image: PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(server_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: parse_url(SERVER_URL_VAR, server_url)?,
            ..Self::default()
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key/value source. Unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(SERVER_URL_VAR) {
            config.server_url = parse_url(SERVER_URL_VAR, &raw)?;
        }
        if let Some(raw) = get(REQUEST_TIMEOUT_VAR) {
            config.request_timeout = parse_timeout(REQUEST_TIMEOUT_VAR, &raw)?;
        }
        if let Some(raw) = get(UPLOAD_TIMEOUT_VAR) {
            config.upload_timeout = parse_timeout(UPLOAD_TIMEOUT_VAR, &raw)?;
        }
        if let Some(raw) = get(PLACEHOLDER_IMAGE_VAR) {
            parse_url(PLACEHOLDER_IMAGE_VAR, &raw)?;
            config.placeholder_image = raw.trim().to_string();
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> Result<ValidatedUrl, HttpError> {
        ValidatedUrl::new(self.server_url.as_str())
    }

    /// `{base}/items`
    pub fn items_url(&self) -> Result<ValidatedUrl, HttpError> {
        self.base_url()?.join(ITEMS_PATH)
    }

    /// `{base}/items/{id}`; the id is percent-encoded as one path segment.
    pub fn item_url(&self, id: &str) -> Result<ValidatedUrl, HttpError> {
        let mut url = Url::parse(self.items_url()?.as_str()).map_err(|e| HttpError::InvalidUrl {
            url: id.to_string(),
            reason: e.to_string(),
        })?;
        url.path_segments_mut()
            .map_err(|()| HttpError::InvalidUrl {
                url: self.server_url.to_string(),
                reason: "base URL cannot carry a path".into(),
            })?
            .pop_if_empty()
            .push(id);
        ValidatedUrl::new(url.to_string())
    }

    pub fn upload_url(&self) -> Result<ValidatedUrl, HttpError> {
        self.base_url()?.join(UPLOAD_PATH)
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        var,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            var,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn parse_timeout(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidTimeout {
            var,
            value: raw.to_string(),
        }),
    }
}
