//! Domain types shared between the scraper, the markup engine, and the writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stock state as shown on the source site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    /// The page gave no usable signal (typical for fallback extraction).
    Unknown,
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Availability::InStock => write!(f, "in_stock"),
            Availability::OutOfStock => write!(f, "out_of_stock"),
            Availability::Unknown => write!(f, "unknown"),
        }
    }
}

/// How the extraction result was verified against the requested identifier.
///
/// `Confirmed` means the page was checked to literally contain the article
/// code (container scan or detail-page guard). `Heuristic` marks the
/// text-adjacency fallback, which only proves the code and a price appeared
/// near each other in the DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Confirmed,
    Heuristic,
}

/// One price pulled off the source site. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPrice {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub availability: Availability,
    pub source_url: String,
    pub confidence: MatchConfidence,
    pub extracted_at: DateTime<Utc>,
}

/// The computed destination price for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalPrice {
    pub sku: String,
    pub product_id: i64,
    pub base_price: f64,
    pub final_price: f64,
    pub percent_applied: f64,
}
