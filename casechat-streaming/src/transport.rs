//! The outbound side of an exchange.
//!
//! A [`MessageTransport`] submits the user's message and hands back the
//! streamed response body. Authentication, URLs and retries belong to the
//! implementation; the session only sees bytes.

use crate::error::StreamResult;
use async_trait::async_trait;
use bytes::Bytes;
use casechat_core::ConversationId;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// A streamed response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = StreamResult<Bytes>> + Send>>;

/// Submits a message to a conversation and returns the streamed reply.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Submit `content` to the conversation.
    ///
    /// Implementations return [`StreamError::Http`](crate::StreamError::Http)
    /// for a non-success status, so the body is only ever a successful
    /// response.
    async fn open_stream(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> StreamResult<ByteStream>;
}

#[async_trait]
impl<T> MessageTransport for Arc<T>
where
    T: MessageTransport + ?Sized,
{
    async fn open_stream(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> StreamResult<ByteStream> {
        (**self).open_stream(conversation_id, content).await
    }
}
