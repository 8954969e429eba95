//! Read access to persisted conversation messages.

use crate::error::ClientResult;
use async_trait::async_trait;
use casechat_core::{ConversationId, Message};
use std::sync::Arc;

/// Source of the persisted message list of a conversation.
///
/// After an exchange completes, the chat view refetches through this trait
/// so the optimistic placeholder and the live buffer are replaced by the
/// server's copy.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Fetch all messages of a conversation in server order.
    async fn fetch_messages(&self, conversation_id: &ConversationId) -> ClientResult<Vec<Message>>;
}

#[async_trait]
impl<T> MessageStore for Arc<T>
where
    T: MessageStore + ?Sized,
{
    async fn fetch_messages(&self, conversation_id: &ConversationId) -> ClientResult<Vec<Message>> {
        (**self).fetch_messages(conversation_id).await
    }
}
