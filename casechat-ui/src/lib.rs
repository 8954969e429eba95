//! Citation-aware rendering helpers for casechat.
//!
//! Assistant answers reference their sources with inline `[Source N]`
//! markers. This crate maps those markers to the structured citations of
//! the same turn so a view layer can swap each marker for a badge:
//!
//! - **[`CitationIndex`]**: `source_index` to [`Citation`](casechat_core::Citation) lookup
//! - **[`segment`]** / **[`ContentSegmenter`]**: Split final text into [`Segment`]s
//! - **[`labels`]**: Badge and page labels
//!
//! Markdown rendering of the text segments is left to the view layer.
//!
//! # Example
//!
//! ```rust
//! use casechat_core::Citation;
//! use casechat_ui::{segment, CitationIndex, Segment};
//!
//! let cite = Citation::new(1, "lease.pdf", vec![3], "Rent is due on the first.");
//! let index = CitationIndex::build(&[cite.clone()]);
//!
//! let segments = segment("Rent is due monthly [Source 1].", &index);
//! assert_eq!(
//!     segments,
//!     vec![
//!         Segment::text("Rent is due monthly "),
//!         Segment::citation(cite),
//!         Segment::text("."),
//!     ]
//! );
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod citations;
pub mod labels;
pub mod segment;

pub use citations::CitationIndex;
pub use labels::{badge_label, page_label};
pub use segment::{segment, to_source_text, ContentSegmenter, Segment};
