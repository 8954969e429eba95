//! Splitting assistant text into text and citation segments.
//!
//! Markers have the literal form `[Source N]`. Segmentation runs on final
//! text only; live streaming text is shown as-is because a marker can be
//! split across tokens.

use crate::citations::CitationIndex;
use casechat_core::Citation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[Source ([0-9]+)\]").expect("citation marker pattern is valid")
});

/// One piece of rendered message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Segment {
    /// Plain text, including markers that did not resolve.
    Text {
        /// The text.
        content: String,
    },
    /// A resolved citation marker.
    CitationRef {
        /// The citation the marker refers to.
        citation: Citation,
    },
}

impl Segment {
    /// Create a text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create a citation segment.
    pub fn citation(citation: Citation) -> Self {
        Self::CitationRef { citation }
    }

    /// Check if this segment is a resolved citation.
    #[must_use]
    pub fn is_citation(&self) -> bool {
        matches!(self, Self::CitationRef { .. })
    }

    /// The source text this segment was cut from.
    #[must_use]
    pub fn source_text(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::CitationRef { citation } => citation.marker(),
        }
    }
}

/// Split `text` into segments, resolving markers through `index`.
///
/// Text between markers is emitted verbatim. A marker whose number is not
/// in the index (or does not fit in a `u32`) is emitted as a text segment
/// holding the original bracketed marker. Zero-width text between adjacent
/// markers, or at either end, produces no segment.
#[must_use]
pub fn segment(text: &str, index: &CitationIndex) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for captures in MARKER.captures_iter(text) {
        let (Some(marker), Some(number)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        if marker.start() > last {
            segments.push(Segment::text(&text[last..marker.start()]));
        }

        let resolved = number
            .as_str()
            .parse::<u32>()
            .ok()
            .and_then(|n| index.get(n));
        segments.push(match resolved {
            Some(citation) => Segment::citation(citation.clone()),
            None => Segment::text(marker.as_str()),
        });

        last = marker.end();
    }

    if last < text.len() {
        segments.push(Segment::text(&text[last..]));
    }

    segments
}

/// Rebuild the source text from segments.
///
/// Inverse of [`segment`], except that resolved markers come back in
/// canonical form (`[Source 01]` becomes `[Source 1]`).
#[must_use]
pub fn to_source_text(segments: &[Segment]) -> String {
    segments.iter().map(Segment::source_text).collect()
}

/// Segments the content of one message against that message's citations.
#[derive(Debug, Clone, Default)]
pub struct ContentSegmenter {
    index: CitationIndex,
}

impl ContentSegmenter {
    /// Create a segmenter for a turn's citations.
    #[must_use]
    pub fn new(citations: &[Citation]) -> Self {
        Self {
            index: CitationIndex::build(citations),
        }
    }

    /// Create a segmenter over an existing index.
    #[must_use]
    pub fn with_index(index: CitationIndex) -> Self {
        Self { index }
    }

    /// The citation index.
    #[must_use]
    pub fn index(&self) -> &CitationIndex {
        &self.index
    }

    /// Split `text` into segments.
    #[must_use]
    pub fn segment(&self, text: &str) -> Vec<Segment> {
        segment(text, &self.index)
    }
}
