//! Text-level parsing of prices and product names.
//!
//! The storefront renders prices inconsistently: sometimes as a bare
//! `data-price` attribute, sometimes as decimal text with a space or
//! non-breaking-space thousands separator and a comma decimal mark. These
//! helpers normalize both shapes before any number leaves the scraper.

/// Names shorter than this are treated as markup noise, not product titles.
pub(crate) const MIN_NAME_CHARS: usize = 6;

/// Minimum length for a title taken off a product-detail page, where `<h1>`
/// content competes with breadcrumbs and section labels.
pub(crate) const MIN_DETAIL_NAME_CHARS: usize = 11;

/// Parses a price string into a positive finite number.
///
/// Strips regular, non-breaking, and narrow non-breaking spaces, converts a
/// comma decimal mark to a dot, then parses as `f64`. Returns `None` for
/// anything non-numeric, non-finite, or negative — a bad price is a
/// not-found, never a zero.
#[must_use]
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => None,
    }
}

/// Collapses whitespace runs and rejects names below `min_chars` characters.
#[must_use]
pub fn clean_name(raw: &str, min_chars: usize) -> Option<String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.chars().count() < min_chars {
        None
    } else {
        Some(name)
    }
}
