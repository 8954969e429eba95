//! Client error types.

use casechat_streaming::StreamError;
use std::time::Duration;
use thiserror::Error;

/// Errors from the REST collaborator layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Request timeout.
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The response body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other request error.
    #[error("Request error: {0}")]
    Request(String),
}

impl ClientError {
    /// Create an HTTP error.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Status code, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Translate a reqwest error, keeping the configured timeout.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::http(status.as_u16(), err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<ClientError> for StreamError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http { status, body } => StreamError::Http { status, body },
            ClientError::Connection(message) => StreamError::Connection(message),
            other => StreamError::Connection(other.to_string()),
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::http(404, "not found");
        assert_eq!(err.to_string(), "HTTP error: 404 - not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_into_stream_error() {
        let err: StreamError = ClientError::http(500, "boom").into();
        assert!(matches!(err, StreamError::Http { status: 500, .. }));

        let err: StreamError = ClientError::Timeout(Duration::from_secs(3)).into();
        assert!(matches!(err, StreamError::Connection(_)));
        assert!(err.is_transport());
    }
}
