//! Client configuration

use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Connection settings for the pharmacy backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend root, always ending in `/` so endpoints join underneath it.
    pub base_url: Url,

    /// Bearer token sent with every request.
    pub token: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Parses and checks `base_url` ("https://api.example.com" or with a
    /// path prefix such as "https://example.com/pharmacy").
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let mut url = Url::parse(base_url.trim())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                base_url
            )));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ClientError::InvalidUrl(format!("{}: missing host", base_url)));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self {
            base_url: url,
            token: None,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Set the bearer token. Blank tokens are ignored.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token)
        };
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
