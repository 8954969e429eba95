//! The session state machine for one streamed exchange.
//!
//! A [`StreamSession`] moves through `Idle -> Streaming -> (Idle | Error)`.
//! All transitions go through [`SessionState::apply`], a pure function of
//! the current state and one [`SessionInput`]; the session only decides
//! which input to feed next and publishes each new state to observers.

use crate::error::{StreamError, StreamResult};
use crate::events::{EventParser, EventStream, StreamEvent};
use crate::frame::{FrameDecoder, DEFAULT_MAX_BUFFER_SIZE, EVENT_PREFIX};
use crate::transport::MessageTransport;
use casechat_core::{Citation, ConversationId};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No exchange in flight. `send` is accepted.
    #[default]
    Idle,
    /// An exchange is in flight.
    Streaming,
    /// The last exchange failed at the transport level. `send` is accepted.
    Error,
}

/// Input to the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    /// A message was submitted.
    Begin,
    /// An event was decoded from the body.
    Event(StreamEvent),
    /// The body ended, with or without a `Done` event.
    Finish,
    /// The transport failed.
    Fail(String),
    /// The caller abandoned the exchange.
    Cancel,
    /// Drop the live buffers once persisted state has taken over.
    Clear,
}

/// Observable state of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    phase: Phase,
    accumulated_text: String,
    citations: Vec<Citation>,
    saw_done: bool,
    error: Option<String>,
}

impl SessionState {
    /// Create an idle state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one input and return the next state.
    ///
    /// Inputs that do not make sense in the current phase leave the state
    /// unchanged: `Begin` while streaming, events outside of streaming, and
    /// events after `Done`.
    #[must_use]
    pub fn apply(mut self, input: SessionInput) -> Self {
        match (self.phase, input) {
            (Phase::Streaming, SessionInput::Begin) => {}
            (_, SessionInput::Begin) => {
                self = Self {
                    phase: Phase::Streaming,
                    ..Self::default()
                };
            }
            (Phase::Streaming, SessionInput::Event(event)) if !self.saw_done => match event {
                StreamEvent::Token(content) => self.accumulated_text.push_str(&content),
                StreamEvent::Done(citations) => {
                    self.citations = citations;
                    self.saw_done = true;
                }
                StreamEvent::Malformed(_) => {}
            },
            (_, SessionInput::Event(_)) => {}
            (Phase::Streaming, SessionInput::Finish) => self.phase = Phase::Idle,
            (Phase::Streaming, SessionInput::Fail(error)) => {
                self.phase = Phase::Error;
                self.accumulated_text.clear();
                self.citations.clear();
                self.error = Some(error);
            }
            (Phase::Streaming, SessionInput::Cancel) => {
                self.phase = Phase::Idle;
                self.accumulated_text.clear();
                self.citations.clear();
            }
            (_, SessionInput::Finish | SessionInput::Fail(_) | SessionInput::Cancel) => {}
            (_, SessionInput::Clear) => {
                self.accumulated_text.clear();
                self.citations.clear();
            }
        }
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Text streamed so far in the current exchange.
    #[must_use]
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// Citations from the `Done` event, empty until it arrives.
    #[must_use]
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Whether the `Done` event has been applied.
    #[must_use]
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    /// Transport error of the last exchange, if it failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Check if an exchange is in flight.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.phase == Phase::Streaming
    }

    /// True while streaming and before the first text arrives.
    #[must_use]
    pub fn awaiting_first_token(&self) -> bool {
        self.is_streaming() && self.accumulated_text.is_empty()
    }
}

/// Result of an exchange that reached the end of its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    /// Concatenation of every token, in arrival order.
    pub text: String,
    /// Citations from the `Done` event.
    pub citations: Vec<Citation>,
    /// False when the body ended before a `Done` event.
    pub saw_done: bool,
}

impl Exchange {
    /// Check if the body ended before the terminal event.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        !self.saw_done
    }
}

/// How an exchange ended, as reported to the completion handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The body ended. Includes premature close.
    Completed(Exchange),
    /// Transport failure.
    Failed(String),
    /// The caller cancelled or dropped the exchange.
    Cancelled,
}

impl Completion {
    /// Check if the exchange reached the end of its body.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Called once per accepted `send`, whatever the outcome.
///
/// Runs synchronously on the task that ended the exchange (or on drop), so
/// implementations should only record or schedule work.
pub trait CompletionHandler: Send + Sync {
    /// Handle the end of an exchange.
    fn on_complete(&self, completion: &Completion);
}

impl<F> CompletionHandler for F
where
    F: Fn(&Completion) + Send + Sync,
{
    fn on_complete(&self, completion: &Completion) {
        self(completion)
    }
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prefix that marks event lines.
    pub event_prefix: String,
    /// Largest unterminated line the decoder will hold.
    pub max_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_prefix: EVENT_PREFIX.to_string(),
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl SessionConfig {
    /// Create a new default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event prefix.
    #[must_use]
    pub fn event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }

    /// Set the decoder buffer limit.
    #[must_use]
    pub fn max_buffer_size(mut self, max: usize) -> Self {
        self.max_buffer_size = max;
        self
    }
}

/// Owns the streamed exchanges of one conversation view.
///
/// At most one exchange is in flight; a second `send` while streaming is
/// rejected with [`StreamError::Busy`] and leaves the running exchange
/// untouched. Observers follow the state through [`StreamSession::subscribe`].
pub struct StreamSession {
    transport: Arc<dyn MessageTransport>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    handler: Option<Arc<dyn CompletionHandler>>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    /// Create a new session over a transport.
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self {
            transport,
            config: SessionConfig::default(),
            state,
            handler: None,
            cancel: Mutex::new(None),
        }
    }

    /// Set the session configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the completion handler.
    pub fn with_completion_handler(mut self, handler: impl CompletionHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Check if an exchange is in flight.
    pub fn is_streaming(&self) -> bool {
        self.state.borrow().is_streaming()
    }

    /// Subscribe to state changes.
    ///
    /// Rapid token updates may be coalesced for a slow observer; the
    /// latest value is always exact.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Cancel the exchange in flight, if any.
    ///
    /// The pending read is abandoned and the body released. The completion
    /// handler sees [`Completion::Cancelled`].
    pub fn cancel(&self) {
        if let Some(token) = self.cancel.lock().as_ref() {
            token.cancel();
        }
    }

    /// Send a message and stream the reply into the session state.
    ///
    /// Returns the finished exchange when the body ends, whether or not a
    /// `Done` event arrived. Transport failures return the error and leave
    /// the session in [`Phase::Error`]. Dropping the returned future counts
    /// as cancellation.
    pub async fn send(
        &self,
        conversation_id: &ConversationId,
        content: &str,
    ) -> StreamResult<Exchange> {
        let token = CancellationToken::new();
        // The token is installed together with the move to Streaming, so a
        // cancel() that observes Streaming always finds it.
        let accepted = self.state.send_if_modified(|state| {
            if state.is_streaming() {
                return false;
            }
            *self.cancel.lock() = Some(token.clone());
            *state = std::mem::take(state).apply(SessionInput::Begin);
            true
        });
        if !accepted {
            tracing::warn!(conversation_id = %conversation_id, "Rejected send while streaming");
            return Err(StreamError::Busy);
        }
        let guard = ExchangeGuard {
            session: self,
            armed: true,
        };

        tracing::info!(conversation_id = %conversation_id, "Starting streamed exchange");

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(StreamError::Cancelled),
            result = self.run(conversation_id, content) => result,
        };

        guard.finish(result)
    }

    async fn run(&self, conversation_id: &ConversationId, content: &str) -> StreamResult<()> {
        let body = self.transport.open_stream(conversation_id, content).await?;

        let decoder = FrameDecoder::new()
            .with_prefix(self.config.event_prefix.clone())
            .with_max_buffer_size(self.config.max_buffer_size);
        let parser = EventParser::new().with_prefix(self.config.event_prefix.clone());
        let mut events = EventStream::with_parts(body, decoder, parser);

        while let Some(event) = events.next().await {
            let event = event?;
            if event.is_malformed() {
                continue;
            }

            let done = event.is_done();
            self.transition(SessionInput::Event(event));
            if done {
                tracing::debug!(conversation_id = %conversation_id, "Received done event");
                break;
            }
        }

        Ok(())
    }

    fn transition(&self, input: SessionInput) {
        self.state
            .send_modify(|state| *state = std::mem::take(state).apply(input));
    }

    fn notify(&self, completion: &Completion) {
        if let Some(handler) = &self.handler {
            handler.on_complete(completion);
        }
    }

    fn complete(&self, result: StreamResult<()>) -> StreamResult<Exchange> {
        self.cancel.lock().take();

        match result {
            Ok(()) => {
                self.transition(SessionInput::Finish);
                let exchange = {
                    let state = self.state.borrow();
                    Exchange {
                        text: state.accumulated_text.clone(),
                        citations: state.citations.clone(),
                        saw_done: state.saw_done,
                    }
                };
                if exchange.is_truncated() {
                    tracing::warn!("Stream ended without a done event");
                }
                tracing::info!(
                    chars = exchange.text.chars().count(),
                    citations = exchange.citations.len(),
                    "Streamed exchange completed"
                );

                self.notify(&Completion::Completed(exchange.clone()));
                self.transition(SessionInput::Clear);
                Ok(exchange)
            }
            Err(StreamError::Cancelled) => {
                self.transition(SessionInput::Cancel);
                tracing::info!("Streamed exchange cancelled");
                self.notify(&Completion::Cancelled);
                Err(StreamError::Cancelled)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Streamed exchange failed");
                self.transition(SessionInput::Fail(e.to_string()));
                self.notify(&Completion::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}

/// Ends the exchange exactly once, including when the `send` future is
/// dropped before it resolves.
struct ExchangeGuard<'a> {
    session: &'a StreamSession,
    armed: bool,
}

impl ExchangeGuard<'_> {
    fn finish(mut self, result: StreamResult<()>) -> StreamResult<Exchange> {
        self.armed = false;
        self.session.complete(result)
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            let _ = self.session.complete(Err(StreamError::Cancelled));
        }
    }
}
