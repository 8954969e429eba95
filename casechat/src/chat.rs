//! One conversation's chat view, without the view.
//!
//! [`ChatController`] keeps the message list of a conversation, runs
//! exchanges through a [`StreamSession`] and refreshes the list from the
//! server once each exchange ends.

use casechat_client::{ApiClient, ClientError, MessageStore};
use casechat_core::{ConversationId, Message};
use casechat_streaming::{Exchange, SessionState, StreamError, StreamSession};
use casechat_ui::{ContentSegmenter, Segment};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Errors surfaced by [`ChatController`].
#[derive(Debug, Error)]
pub enum ChatError {
    /// The message was empty after trimming.
    #[error("Message is empty")]
    EmptyMessage,

    /// The exchange was rejected or failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Loading the persisted messages failed.
    #[error("Failed to load messages: {0}")]
    Store(#[from] ClientError),
}

impl ChatError {
    /// Check if the send was rejected because an exchange is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Stream(StreamError::Busy))
    }
}

/// Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// What a chat window shows at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    /// Persisted messages, plus the optimistic user message while sending.
    pub messages: Vec<Message>,
    /// Reply text received so far. Shown raw; markers are not resolved.
    pub live_text: String,
    /// An exchange is in flight. Input should be disabled.
    pub is_streaming: bool,
    /// Streaming has started but no text has arrived yet.
    pub show_thinking: bool,
}

/// Drives one conversation.
pub struct ChatController {
    conversation_id: ConversationId,
    session: StreamSession,
    store: Arc<dyn MessageStore>,
    messages: RwLock<Vec<Message>>,
    revision: AtomicU64,
}

impl std::fmt::Debug for ChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatController")
            .field("conversation_id", &self.conversation_id)
            .field("session", &self.session)
            .field("messages", &self.messages.read().len())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl ChatController {
    /// Create a controller from a session and a message store.
    pub fn new(
        conversation_id: ConversationId,
        session: StreamSession,
        store: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            conversation_id,
            session,
            store,
            messages: RwLock::new(Vec::new()),
            revision: AtomicU64::new(0),
        }
    }

    /// Create a controller that streams and loads through one API client.
    pub fn with_client(conversation_id: ConversationId, client: ApiClient) -> Self {
        let client = Arc::new(client);
        Self::new(conversation_id, StreamSession::new(client.clone()), client)
    }

    /// The conversation this controller drives.
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// The underlying session.
    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Counter bumped after every completed exchange.
    ///
    /// Conversation lists compare it against the value they last loaded at
    /// to know when to refetch.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Subscribe to streaming state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Cancel the exchange in flight, if any.
    pub fn cancel(&self) {
        self.session.cancel();
    }

    /// Replace the cached messages with the server's list.
    pub async fn refresh(&self) -> ChatResult<()> {
        let messages = self.store.fetch_messages(&self.conversation_id).await?;
        debug!(
            conversation_id = %self.conversation_id,
            count = messages.len(),
            "Loaded messages"
        );
        *self.messages.write() = messages;
        Ok(())
    }

    /// Send a message and stream the reply.
    ///
    /// Input is trimmed. Empty input and a send while streaming are
    /// rejected without touching the cached messages. Once the exchange
    /// ends, successfully or not, the cache is refreshed from the store; a
    /// failed refresh is logged and keeps the previous cache.
    pub async fn submit(&self, text: &str) -> ChatResult<Exchange> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.session.is_streaming() {
            return Err(StreamError::Busy.into());
        }

        self.messages
            .write()
            .push(Message::pending_user(self.conversation_id.clone(), content));

        let result = self.session.send(&self.conversation_id, content).await;

        match &result {
            Err(StreamError::Busy) => {
                // Lost a race with another submit; undo our placeholder only.
                let mut messages = self.messages.write();
                if let Some(pos) = messages
                    .iter()
                    .rposition(|m| m.is_pending() && m.content == content)
                {
                    messages.remove(pos);
                }
                return Err(StreamError::Busy.into());
            }
            Ok(_) => {
                self.revision.fetch_add(1, Ordering::AcqRel);
            }
            Err(_) => {}
        }

        if let Err(e) = self.refresh().await {
            warn!(
                conversation_id = %self.conversation_id,
                error = %e,
                "Failed to refresh messages after exchange"
            );
        }

        result.map_err(ChatError::from)
    }

    /// Snapshot of what the chat window shows.
    pub fn view(&self) -> ChatView {
        let state = self.session.state();
        ChatView {
            messages: self.messages.read().clone(),
            live_text: state.accumulated_text().to_string(),
            is_streaming: state.is_streaming(),
            show_thinking: state.awaiting_first_token(),
        }
    }

    /// Segments for displaying a message.
    ///
    /// Assistant text has its markers resolved against the message's own
    /// citations; user text is a single text segment.
    pub fn render(message: &Message) -> Vec<Segment> {
        if message.is_assistant() {
            ContentSegmenter::new(&message.citations).segment(&message.content)
        } else {
            vec![Segment::text(message.content.clone())]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use casechat_client::ClientResult;
    use casechat_core::{Citation, Role};
    use casechat_streaming::{ByteStream, MessageTransport, StreamResult};
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    fn conversation() -> ConversationId {
        ConversationId::from("conv-1")
    }

    fn message(id: &str, role: Role, content: &str, citations: Vec<Citation>) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation(),
            role,
            content: content.to_string(),
            citations,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        }
    }

    fn cite() -> Citation {
        Citation::new(1, "lease.pdf", vec![2], "payable monthly")
    }

    fn frame(json: &str) -> Bytes {
        Bytes::from(format!("data: {json}\n\n"))
    }

    struct ScriptedTransport {
        reply: StreamResult<Vec<Bytes>>,
    }

    #[async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn open_stream(
            &self,
            _conversation_id: &ConversationId,
            _content: &str,
        ) -> StreamResult<ByteStream> {
            match &self.reply {
                Ok(chunks) => Ok(Box::pin(futures::stream::iter(
                    chunks.clone().into_iter().map(Ok),
                ))),
                Err(StreamError::Http { status, body }) => Err(StreamError::Http {
                    status: *status,
                    body: body.clone(),
                }),
                Err(e) => Err(StreamError::Other(e.to_string())),
            }
        }
    }

    struct ChannelTransport {
        receiver: Mutex<Option<mpsc::UnboundedReceiver<StreamResult<Bytes>>>>,
    }

    #[async_trait]
    impl MessageTransport for ChannelTransport {
        async fn open_stream(
            &self,
            _conversation_id: &ConversationId,
            _content: &str,
        ) -> StreamResult<ByteStream> {
            let receiver = self
                .receiver
                .lock()
                .take()
                .ok_or_else(|| StreamError::Other("body already taken".to_string()))?;
            Ok(Box::pin(futures::stream::unfold(receiver, |mut rx| async move {
                rx.recv().await.map(|chunk| (chunk, rx))
            })))
        }
    }

    #[derive(Default)]
    struct FakeStore {
        messages: Mutex<Vec<Message>>,
        fail: bool,
        fetches: AtomicU64,
    }

    #[async_trait]
    impl MessageStore for FakeStore {
        async fn fetch_messages(&self, _conversation_id: &ConversationId) -> ClientResult<Vec<Message>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClientError::http(503, "unavailable"));
            }
            Ok(self.messages.lock().clone())
        }
    }

    fn controller(
        reply: StreamResult<Vec<Bytes>>,
        store: Arc<FakeStore>,
    ) -> ChatController {
        let session = StreamSession::new(Arc::new(ScriptedTransport { reply }));
        ChatController::new(conversation(), session, store)
    }

    fn persisted() -> Vec<Message> {
        vec![
            message("m-1", Role::User, "When is rent due?", vec![]),
            message("m-2", Role::Assistant, "Monthly [Source 1].", vec![cite()]),
        ]
    }

    #[tokio::test]
    async fn test_submit_refreshes_from_store() {
        let store = Arc::new(FakeStore {
            messages: Mutex::new(persisted()),
            ..Default::default()
        });
        let chat = controller(
            Ok(vec![
                frame(r#"{"type":"token","content":"Monthly "}"#),
                frame(r#"{"type":"token","content":"[Source 1]."}"#),
                frame(r#"{"type":"done","citations":[{"source_index":1,"document_name":"lease.pdf","page_numbers":[2],"snippet":"payable monthly"}]}"#),
            ]),
            store.clone(),
        );

        let exchange = chat.submit("  When is rent due?  ").await.unwrap();

        assert_eq!(exchange.text, "Monthly [Source 1].");
        assert_eq!(exchange.citations, vec![cite()]);
        assert_eq!(chat.revision(), 1);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);

        let view = chat.view();
        assert_eq!(view.messages, persisted());
        assert_eq!(view.live_text, "");
        assert!(!view.is_streaming);
        assert!(!view.show_thinking);
    }

    #[tokio::test]
    async fn test_empty_submit_is_rejected() {
        let store = Arc::new(FakeStore::default());
        let chat = controller(Ok(vec![]), store.clone());

        let err = chat.submit(" \n\t ").await.unwrap_err();

        assert!(matches!(err, ChatError::EmptyMessage));
        assert!(chat.view().messages.is_empty());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(chat.revision(), 0);
    }

    #[tokio::test]
    async fn test_failed_exchange_still_refreshes() {
        let store = Arc::new(FakeStore {
            messages: Mutex::new(vec![message("m-1", Role::User, "hi", vec![])]),
            ..Default::default()
        });
        let chat = controller(
            Err(StreamError::Http {
                status: 500,
                body: "boom".to_string(),
            }),
            store.clone(),
        );

        let err = chat.submit("hi").await.unwrap_err();

        assert!(matches!(err, ChatError::Stream(StreamError::Http { status: 500, .. })));
        assert_eq!(chat.revision(), 0);
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        let view = chat.view();
        assert!(!view.is_streaming);
        assert_eq!(view.messages.len(), 1);
        assert!(!view.messages[0].is_pending());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_cache() {
        let store = Arc::new(FakeStore {
            fail: true,
            ..Default::default()
        });
        let chat = controller(
            Ok(vec![
                frame(r#"{"type":"token","content":"ok"}"#),
                frame(r#"{"type":"done","citations":[]}"#),
            ]),
            store,
        );

        let exchange = chat.submit("question").await.unwrap();

        assert_eq!(exchange.text, "ok");
        assert_eq!(chat.revision(), 1);
        let messages = chat.view().messages;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_pending());
        assert_eq!(messages[0].content, "question");
    }

    #[tokio::test]
    async fn test_refresh_error_surfaces_on_explicit_load() {
        let store = Arc::new(FakeStore {
            fail: true,
            ..Default::default()
        });
        let chat = controller(Ok(vec![]), store);

        let err = chat.refresh().await.unwrap_err();
        assert!(matches!(err, ChatError::Store(_)));
    }

    #[tokio::test]
    async fn test_view_while_streaming() {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(ChannelTransport {
            receiver: Mutex::new(Some(rx)),
        });
        let store = Arc::new(FakeStore::default());
        let chat = Arc::new(ChatController::new(
            conversation(),
            StreamSession::new(transport),
            store,
        ));
        let mut observer = chat.subscribe();

        let running = tokio::spawn({
            let chat = chat.clone();
            async move { chat.submit("question").await }
        });

        observer.wait_for(|s| s.is_streaming()).await.unwrap();
        let view = chat.view();
        assert!(view.is_streaming);
        assert!(view.show_thinking);
        assert_eq!(view.messages.len(), 1);
        assert!(view.messages[0].is_pending());

        let err = chat.submit("again").await.unwrap_err();
        assert!(err.is_busy());
        assert_eq!(chat.view().messages.len(), 1);

        tx.send(Ok(frame(r#"{"type":"token","content":"Hi"}"#))).unwrap();
        observer
            .wait_for(|s| s.accumulated_text() == "Hi")
            .await
            .unwrap();
        let view = chat.view();
        assert!(!view.show_thinking);
        assert_eq!(view.live_text, "Hi");

        drop(tx);
        let exchange = running.await.unwrap().unwrap();
        assert!(exchange.is_truncated());
        assert!(!chat.view().is_streaming);
    }

    #[test]
    fn test_render_assistant_resolves_markers() {
        let assistant = message("m-2", Role::Assistant, "Monthly [Source 1] [Source 2]", vec![cite()]);
        assert_eq!(
            ChatController::render(&assistant),
            vec![
                Segment::text("Monthly "),
                Segment::citation(cite()),
                Segment::text(" "),
                Segment::text("[Source 2]"),
            ]
        );
    }

    #[test]
    fn test_render_user_is_plain_text() {
        let user = message("m-1", Role::User, "What is [Source 1]?", vec![cite()]);
        assert_eq!(
            ChatController::render(&user),
            vec![Segment::text("What is [Source 1]?")]
        );
    }
}
