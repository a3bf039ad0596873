//! Connection settings for Terraform Cloud.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::transport::{ReqwestTransport, TransportError};

pub const DEFAULT_BASE_URL: &str = "https://app.terraform.io/api/v2";

pub const TOKEN_ENV: &str = "TFC_API_TOKEN";
pub const BASE_URL_ENV: &str = "TFC_BASE_URL";
pub const TIMEOUT_ENV: &str = "TFC_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API token configured (set TFC_API_TOKEN or pass --token)")]
    MissingToken,

    #[error("invalid timeout '{0}': expected whole seconds")]
    InvalidTimeout(String),
}

#[derive(Clone)]
pub struct TerraformCloudConfig {
    pub base_url: String,
    pub api_token: String,
    /// Request timeout handed to the transport. `None` means no limit.
    pub timeout: Option<Duration>,
}

impl Default for TerraformCloudConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_token: String::new(),
            timeout: None,
        }
    }
}

impl TerraformCloudConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            ..Self::default()
        }
    }

    /// Build the authenticated `reqwest` transport.
    pub fn transport(&self) -> Result<ReqwestTransport, TransportError> {
        ReqwestTransport::new(self.api_token.clone(), self.timeout)
    }
}

/// Parse a whole number of seconds, as accepted by `TFC_TIMEOUT_SECS`.
pub fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidTimeout(raw.to_owned()))
}

impl fmt::Debug for TerraformCloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerraformCloudConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &mask_token(&self.api_token))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Mask a token for logging. Counts chars, not bytes.
fn mask_token(value: &str) -> String {
    let count = value.chars().count();
    if count <= 8 {
        return "*".repeat(count);
    }
    let head: String = value.chars().take(4).collect();
    let tail: String = value.chars().skip(count - 4).collect();
    format!("{head}...{tail}")
}
