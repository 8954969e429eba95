//! Streaming errors.

use thiserror::Error;

/// Errors that can occur while running a streamed exchange.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The server answered with a non-success status.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Connection error before or during the response body.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A single line grew past the configured buffer limit.
    #[error("Stream buffer exceeded {limit} bytes without a line break")]
    BufferOverflow {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// `send` was called while an exchange was already streaming.
    #[error("Session is busy with another exchange")]
    Busy,

    /// The exchange was cancelled by the caller.
    #[error("Stream cancelled")]
    Cancelled,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl StreamError {
    /// Check if the error came from the transport rather than the caller.
    ///
    /// Transport failures move the session into the error phase; caller
    /// errors (`Busy`, `Cancelled`) do not.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http { .. } | Self::Connection(_) | Self::BufferOverflow { .. }
        )
    }
}

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;
