//! Citation records.

use serde::{Deserialize, Serialize};

/// A reference from an assistant answer to a passage of a case document.
///
/// `source_index` is the ordinal used by `[Source N]` markers in the answer
/// text. It is only unique within one assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Ordinal referenced by `[Source N]` markers.
    pub source_index: u32,
    /// Name of the cited document.
    pub document_name: String,
    /// Pages the passage was taken from, in document order.
    pub page_numbers: Vec<u32>,
    /// The supporting passage.
    pub snippet: String,
}

impl Citation {
    /// Create a new citation.
    #[must_use]
    pub fn new(
        source_index: u32,
        document_name: impl Into<String>,
        page_numbers: Vec<u32>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            source_index,
            document_name: document_name.into(),
            page_numbers,
            snippet: snippet.into(),
        }
    }

    /// The marker text that references this citation, e.g. `[Source 3]`.
    #[must_use]
    pub fn marker(&self) -> String {
        format!("[Source {}]", self.source_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_citation_wire_format() {
        let json = r#"{"source_index":2,"document_name":"deposition.pdf","page_numbers":[12,13],"snippet":"I was not present."}"#;
        let citation: Citation = serde_json::from_str(json).unwrap();

        assert_eq!(
            citation,
            Citation::new(2, "deposition.pdf", vec![12, 13], "I was not present.")
        );
        assert_eq!(serde_json::to_string(&citation).unwrap(), json);
    }

    #[test]
    fn test_marker() {
        let citation = Citation::new(7, "a.pdf", vec![1], "");
        assert_eq!(citation.marker(), "[Source 7]");
    }
}
