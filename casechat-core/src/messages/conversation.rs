//! Conversation metadata.

use crate::identifier::{CaseId, ConversationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation about one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation ID.
    pub id: ConversationId,
    /// Case the conversation belongs to.
    pub case_id: CaseId,
    /// Display title.
    pub title: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Set once the conversation has been archived.
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Conversation {
    /// Title used when none is supplied on creation.
    pub const DEFAULT_TITLE: &'static str = "New Conversation";

    /// Check if the conversation has been archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_conversation() {
        let json = r#"{"id":"c-1","case_id":"k-1","title":"Lease questions","created_at":"2024-05-01T10:00:00Z","archived_at":null}"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conversation.title, "Lease questions");
        assert!(!conversation.is_archived());
    }
}
