//! Display labels for citation badges.

use casechat_core::Citation;

/// Label shown on the badge that replaces a marker, e.g. `Source 2`.
#[must_use]
pub fn badge_label(citation: &Citation) -> String {
    format!("Source {}", citation.source_index)
}

/// Page line of the expanded badge: `Page 4` or `Pages 4, 5`.
#[must_use]
pub fn page_label(citation: &Citation) -> String {
    let pages = citation
        .page_numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if citation.page_numbers.len() > 1 {
        format!("Pages {pages}")
    } else {
        format!("Page {pages}")
    }
}
