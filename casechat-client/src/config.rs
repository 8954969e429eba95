//! Client configuration.

use crate::error::{ClientError, ClientResult};
use std::time::Duration;
use url::Url;

/// Configuration for [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:8000/api`.
    pub base_url: Url,
    /// Timeout for JSON requests. Streamed replies are not bounded by it.
    pub timeout: Duration,
    /// Timeout for establishing a connection, applied to every request.
    pub connect_timeout: Duration,
    /// User agent header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Default API root.
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000/api";

    /// Environment variable for the API root.
    pub const BASE_URL_ENV: &'static str = "CASECHAT_API_BASE";

    /// Environment variable for the JSON request timeout in seconds.
    pub const TIMEOUT_ENV: &'static str = "CASECHAT_TIMEOUT_SECS";

    /// Create a config for an API root.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("casechat/", env!("CARGO_PKG_VERSION")).to_string(),
        })
    }

    /// Create from `CASECHAT_API_BASE` and `CASECHAT_TIMEOUT_SECS`.
    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var(Self::BASE_URL_ENV)
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(raw) = std::env::var(Self::TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::configuration(format!("{} must be whole seconds, got {raw:?}", Self::TIMEOUT_ENV))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the JSON request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build an endpoint URL from path segments under the API root.
    pub fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::configuration(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(Self::DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("casechat/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http://localhost:8000/api", &["conversations", "c-1", "messages"], "http://localhost:8000/api/conversations/c-1/messages")]
    #[case("http://example.com/api/", &["cases", "k 1", "conversations"], "http://example.com/api/cases/k%201/conversations")]
    #[case("http://example.com", &["conversations", "a/b", "messages"], "http://example.com/conversations/a%2Fb/messages")]
    fn test_endpoint(#[case] base: &str, #[case] segments: &[&str], #[case] expected: &str) {
        let config = ClientConfig::new(base).unwrap();
        assert_eq!(config.endpoint(segments).unwrap().as_str(), expected);
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ClientConfig::new("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn test_cannot_be_a_base() {
        let config = ClientConfig::new("mailto:someone@example.com").unwrap();
        assert!(matches!(
            config.endpoint(&["x"]),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("test-agent");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api");
    }
}
