//! # casechat - Streaming client for document-grounded case conversations
//!
//! casechat talks to an assistant whose answers are grounded in a case's
//! documents. Replies stream in token by token and cite their sources with
//! inline `[Source N]` markers; casechat decodes the stream, tracks the
//! exchange, and resolves the markers into structured citations.
//!
//! ## Quick Start
//!
//! ```no_run
//! use casechat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     casechat::telemetry::init_tracing();
//!
//!     let client = ApiClient::new(ClientConfig::from_env()?)?;
//!     let chat = ChatController::with_client(ConversationId::from("conv-1"), client);
//!
//!     let exchange = chat.submit("What is the notice period?").await?;
//!     for segment in ContentSegmenter::new(&exchange.citations).segment(&exchange.text) {
//!         match segment {
//!             Segment::Text { content } => print!("{content}"),
//!             Segment::CitationRef { citation } => print!("[{}]", citation.document_name),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! casechat is organized as a workspace of focused crates:
//!
//! - [`casechat_core`] - Messages, citations and identifiers
//! - [`casechat_streaming`] - Frame decoding, event parsing and the stream session
//! - [`casechat_ui`] - Citation index and content segmentation
//! - [`casechat_client`] - HTTP client for the conversation API
//!
//! This crate adds [`ChatController`], which ties a session to the
//! persisted message list, and [`telemetry`] for binaries.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod chat;
pub mod telemetry;

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Domain types.
pub use casechat_core as core;

/// Stream decoding and session state.
pub use casechat_streaming as streaming;

/// Citation rendering helpers.
pub use casechat_ui as ui;

/// HTTP client.
pub use casechat_client as client;

// ============================================================================
// Type Re-exports (Flat)
// ============================================================================

// Core
pub use casechat_core::{CaseId, Citation, Conversation, ConversationId, Message, Role};

// Streaming
pub use casechat_streaming::{
    Completion, CompletionHandler, EventParser, Exchange, FrameDecoder, MessageTransport, Phase,
    SessionConfig, SessionState, StreamError, StreamEvent, StreamResult, StreamSession,
};

// Rendering
pub use casechat_ui::{badge_label, page_label, segment, CitationIndex, ContentSegmenter, Segment};

// Client
pub use casechat_client::{ApiClient, ClientConfig, ClientError, MessageStore};

// Chat
pub use chat::{ChatController, ChatError, ChatResult, ChatView};

/// Prelude for common imports.
///
/// ```rust
/// use casechat::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ApiClient, ChatController, ChatError, ChatView, Citation, CitationIndex, ClientConfig,
        Completion, ContentSegmenter, ConversationId, Exchange, Message, Phase, Role, Segment,
        StreamError, StreamSession,
    };
}
