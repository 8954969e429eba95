//! # casechat-streaming
//!
//! Consumes the assistant's streamed reply.
//!
//! The reply arrives as an HTTP body of `data: <json>` lines, chunked at
//! arbitrary byte boundaries. This crate turns that body into typed events
//! and drives the per-conversation session state from them.
//!
//! ## Core Concepts
//!
//! - **[`FrameDecoder`]**: Boundary-safe bytes-to-lines decoding
//! - **[`EventParser`]**: Lines to [`StreamEvent`]s, tolerant of unknown records
//! - **[`EventStream`]**: Both of the above as a `futures::Stream` adapter
//! - **[`StreamSession`]**: The `Idle -> Streaming -> (Idle | Error)` state machine
//! - **[`MessageTransport`]**: The outbound request, implemented by the HTTP client
//!
//! ## Example - Decoding a body
//!
//! ```rust
//! use casechat_streaming::{EventParser, FrameDecoder, StreamEvent};
//!
//! let mut decoder = FrameDecoder::new();
//! let parser = EventParser::new();
//!
//! let mut events = Vec::new();
//! for chunk in [&b"data: {\"type\":\"token\",\"con"[..], &b"tent\":\"Hi\"}\n\n"[..]] {
//!     for frame in decoder.feed(chunk).unwrap() {
//!         events.push(parser.parse(&frame));
//!     }
//! }
//! assert_eq!(events, vec![StreamEvent::Token("Hi".to_string())]);
//! ```
//!
//! ## Example - Running a session
//!
//! ```ignore
//! use casechat_streaming::{Completion, StreamSession};
//!
//! let session = StreamSession::new(transport).with_completion_handler(|c: &Completion| {
//!     tracing::info!(success = c.is_success(), "exchange finished");
//! });
//!
//! let mut state = session.subscribe();
//! let exchange = session.send(&conversation_id, "What does clause 4 say?").await?;
//! println!("{}", exchange.text);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod events;
pub mod frame;
pub mod session;
pub mod transport;

// Re-exports
pub use error::{StreamError, StreamResult};
pub use events::{collect_events, EventParser, EventStream, EventStreamExt, StreamEvent};
pub use frame::{Frame, FrameDecoder, Utf8Decoder, EVENT_PREFIX};
pub use session::{
    Completion, CompletionHandler, Exchange, Phase, SessionConfig, SessionInput, SessionState,
    StreamSession,
};
pub use transport::{ByteStream, MessageTransport};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Completion, CompletionHandler, EventParser, EventStreamExt, Exchange, FrameDecoder,
        MessageTransport, Phase, SessionState, StreamError, StreamEvent, StreamResult,
        StreamSession,
    };
}
