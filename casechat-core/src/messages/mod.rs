//! Message types for casechat conversations.
//!
//! These mirror the JSON the server returns for persisted conversation
//! state, and the citation records carried by the terminal stream event.

mod citation;
mod conversation;
mod message;

pub use citation::Citation;
pub use conversation::Conversation;
pub use message::{Message, Role};
