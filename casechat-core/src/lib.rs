//! # casechat-core
//!
//! Core domain types for the casechat client.
//!
//! This crate provides the types shared across the casechat workspace:
//!
//! - **Citations**: Structured references from an assistant answer back to
//!   the case documents that support it
//! - **Messages**: Persisted user and assistant turns of a conversation
//! - **Conversations**: Conversation metadata scoped to a case
//! - **Identifiers**: Type-safe IDs for conversations and cases
//!
//! ## Example
//!
//! ```rust
//! use casechat_core::{Citation, ConversationId, Message, Role};
//!
//! let conversation = ConversationId::from("conv-1");
//! let pending = Message::pending_user(conversation.clone(), "What does clause 4 say?");
//! assert_eq!(pending.role, Role::User);
//! assert!(pending.is_pending());
//!
//! let citation = Citation::new(1, "lease.pdf", vec![4], "The tenant shall...");
//! assert_eq!(citation.source_index, 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod identifier;
pub mod messages;

// Re-exports for convenience
pub use identifier::{now_utc, CaseId, ConversationId};
pub use messages::{Citation, Conversation, Message, Role};

/// Prelude module for common imports.
///
/// ```rust
/// use casechat_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::identifier::{now_utc, CaseId, ConversationId};
    pub use crate::messages::{Citation, Conversation, Message, Role};
}
