//! Persisted conversation messages.

use super::Citation;
use crate::identifier::{now_utc, ConversationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    User,
    /// The document-grounded assistant.
    Assistant,
}

/// A single turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID assigned by the server.
    pub id: String,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Author of the message.
    pub role: Role,
    /// Message text. Assistant text may contain `[Source N]` markers.
    pub content: String,
    /// Citations for the markers in `content`.
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// ID used for a user message that has not been persisted yet.
    pub const PENDING_ID: &'static str = "temp";

    /// Build the optimistic placeholder for a user message that is being sent.
    ///
    /// The placeholder is replaced once the persisted message list is fetched.
    #[must_use]
    pub fn pending_user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            id: Self::PENDING_ID.to_string(),
            conversation_id,
            role: Role::User,
            content: content.into(),
            citations: Vec::new(),
            created_at: now_utc(),
        }
    }

    /// Check if this is an unpersisted placeholder.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.id == Self::PENDING_ID
    }

    /// Check if the assistant wrote this message.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}
