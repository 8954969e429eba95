//! Stream event types and parsing.
//!
//! Each frame carries one JSON record with a `type` discriminator:
//!
//! ```text
//! data: {"type":"token","content":"Hel"}
//! data: {"type":"done","citations":[{"source_index":1,...}]}
//! ```
//!
//! The wire format is append-only. Records that fail to decode, including
//! records with a `type` this client does not know, become
//! [`StreamEvent::Malformed`] instead of failing the stream.

use crate::error::StreamResult;
use crate::frame::{Frame, FrameDecoder, EVENT_PREFIX};
use bytes::Bytes;
use casechat_core::Citation;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// An application event decoded from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of assistant text to append verbatim.
    Token(String),
    /// Terminal event carrying the citation set for the turn.
    Done(Vec<Citation>),
    /// A frame that could not be decoded. Carries the raw line.
    Malformed(String),
}

impl StreamEvent {
    /// Check if this is the terminal event.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Check if this event should be ignored.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    Token {
        content: String,
    },
    Done {
        #[serde(default)]
        citations: Option<Vec<Citation>>,
    },
}

/// Parses frames into [`StreamEvent`]s. Never fails.
#[derive(Debug, Clone)]
pub struct EventParser {
    prefix: String,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser {
    /// Create a parser for the standard `data: ` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: EVENT_PREFIX.to_string(),
        }
    }

    /// Set the event prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Parse one frame.
    #[must_use]
    pub fn parse(&self, frame: &Frame) -> StreamEvent {
        let Some(payload) = frame.payload(&self.prefix) else {
            return StreamEvent::Malformed(frame.raw().to_string());
        };

        match serde_json::from_str::<WireEvent>(payload) {
            Ok(WireEvent::Token { content }) => StreamEvent::Token(content),
            Ok(WireEvent::Done { citations }) => StreamEvent::Done(citations.unwrap_or_default()),
            Err(e) => {
                tracing::warn!(error = %e, frame = %frame.raw(), "Skipping malformed stream frame");
                StreamEvent::Malformed(frame.raw().to_string())
            }
        }
    }
}

pin_project! {
    /// Stream adapter that decodes events from a byte stream.
    ///
    /// Frames decoded from one chunk are yielded in the order they appear.
    /// Transport errors from the inner stream are passed through and end
    /// the stream.
    pub struct EventStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        parser: EventParser,
        pending: VecDeque<StreamEvent>,
        finished: bool,
    }
}

impl<S> EventStream<S>
where
    S: Stream<Item = StreamResult<Bytes>>,
{
    /// Create a new event stream over a response body.
    pub fn new(inner: S) -> Self {
        Self::with_parts(inner, FrameDecoder::new(), EventParser::new())
    }

    /// Create a new event stream with a configured decoder and parser.
    pub fn with_parts(inner: S, decoder: FrameDecoder, parser: EventParser) -> Self {
        Self {
            inner,
            decoder,
            parser,
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

impl<S> Stream for EventStream<S>
where
    S: Stream<Item = StreamResult<Bytes>>,
{
    type Item = StreamResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => match this.decoder.feed(&bytes) {
                    Ok(frames) => {
                        let parser = &*this.parser;
                        this.pending.extend(frames.iter().map(|frame| parser.parse(frame)));
                    }
                    Err(e) => {
                        *this.finished = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                },
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    if let Some(fragment) = this.decoder.flush() {
                        tracing::debug!(
                            fragment = %fragment,
                            "Stream ended with an unterminated line"
                        );
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Extension trait for decoding events from a byte stream.
pub trait EventStreamExt: Stream<Item = StreamResult<Bytes>> + Sized {
    /// Decode `data: ` events from this byte stream.
    fn events(self) -> EventStream<Self> {
        EventStream::new(self)
    }
}

impl<S> EventStreamExt for S where S: Stream<Item = StreamResult<Bytes>> + Sized {}

/// Collect every event from a byte stream. Mostly useful in tests and tools.
pub async fn collect_events<S>(stream: S) -> StreamResult<Vec<StreamEvent>>
where
    S: Stream<Item = StreamResult<Bytes>> + Unpin,
{
    let mut events = Vec::new();
    let mut stream = stream.events();
    while let Some(event) = stream.next().await {
        events.push(event?);
    }
    Ok(events)
}
