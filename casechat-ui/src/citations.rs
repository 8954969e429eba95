//! Lookup from source ordinal to citation.

use casechat_core::Citation;
use std::collections::HashMap;

/// Citations of one assistant turn, keyed by `source_index`.
///
/// Built fresh from each `Done` event or persisted message; never merged
/// with another turn's citations.
///
/// Duplicate `source_index` values are a producer bug that is tolerated,
/// not corrected: the later citation in the input wins, so every marker
/// with that index resolves to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitationIndex {
    by_index: HashMap<u32, Citation>,
}

impl CitationIndex {
    /// Build an index from a turn's citations.
    #[must_use]
    pub fn build(citations: &[Citation]) -> Self {
        citations.iter().cloned().collect()
    }

    /// Look up a citation. `None` is an expected outcome for markers the
    /// assistant wrote without a matching source.
    #[must_use]
    pub fn get(&self, source_index: u32) -> Option<&Citation> {
        self.by_index.get(&source_index)
    }

    /// Check if an ordinal resolves.
    #[must_use]
    pub fn contains(&self, source_index: u32) -> bool {
        self.by_index.contains_key(&source_index)
    }

    /// Number of distinct ordinals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    /// Check if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    /// Citations ordered by `source_index`.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Citation> {
        let mut citations: Vec<_> = self.by_index.values().collect();
        citations.sort_by_key(|c| c.source_index);
        citations
    }
}

impl FromIterator<Citation> for CitationIndex {
    fn from_iter<I: IntoIterator<Item = Citation>>(iter: I) -> Self {
        let mut by_index = HashMap::new();
        for citation in iter {
            let source_index = citation.source_index;
            if by_index.insert(source_index, citation).is_some() {
                tracing::debug!(source_index, "Duplicate citation index, keeping the later entry");
            }
        }
        Self { by_index }
    }
}
