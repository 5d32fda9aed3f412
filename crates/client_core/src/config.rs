use std::time::Duration;

use url::Url;

use crate::error::ClientError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    /// Clear the session when an authenticated call comes back 401.
    pub logout_on_unauthorized: bool,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let trimmed = base_url.trim();
        let parsed = Url::parse(trimmed)
            .map_err(|err| ClientError::Config(format!("invalid base url '{trimmed}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "base url must start with http:// or https://, got '{trimmed}'"
            )));
        }
        Ok(Self {
            base_url: parsed,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            logout_on_unauthorized: true,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_logout_on_unauthorized(mut self, enabled: bool) -> Self {
        self.logout_on_unauthorized = enabled;
        self
    }

    pub fn api_root(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}
