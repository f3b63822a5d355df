//! HTML extraction strategies for locating one product's price on the
//! storefront.
//!
//! The site's markup is not a stable contract: the same search can render a
//! structured result list, a near-empty page with a couple of detail links,
//! or a layout where the article code and the price only sit near each other
//! in the DOM. Extraction therefore runs a fixed-priority list of
//! strategies, each returning a tagged [`StrategyOutcome`], and the first
//! match wins:
//!
//! 1. [`Extractor::scan_result_containers`] — structured result-list scan.
//! 2. [`Extractor::extract_from_detail`] — product-detail page, guarded by a
//!    literal article-code check (see the doc comment there).
//! 3. [`Extractor::scan_text_adjacency`] — text-proximity fallback, flagged
//!    [`MatchConfidence::Heuristic`].
//!
//! A record is only ever produced for a page that contains the requested
//! article text; proximity or keyword similarity alone is never enough.

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

use satsync_core::{Availability, ExtractedPrice, MatchConfidence};

use crate::error::ScraperError;
use crate::parse::{clean_name, parse_price, MIN_DETAIL_NAME_CHARS, MIN_NAME_CHARS};

/// How many product-detail links are followed off one results page before
/// the link-follow strategy gives up.
pub(crate) const MAX_DETAIL_LINKS: usize = 3;

/// How far up the ancestor chain the text-adjacency fallback will walk from
/// a matching text node while looking for a priced element.
const MAX_ANCESTOR_LEVELS: usize = 10;

/// Result of one extraction strategy.
#[derive(Debug, Clone)]
pub enum StrategyOutcome {
    Matched(ExtractedPrice),
    NotFound,
}

/// Compiled selectors plus the supplier article prefix.
pub struct Extractor {
    supplier_prefix: String,
    catalog_item: Selector,
    article: Selector,
    name_link: Selector,
    priced: Selector,
    not_available: Selector,
    any_link: Selector,
    headings: Vec<Selector>,
}

fn sel(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|_| ScraperError::Selector {
        selector: selector.to_owned(),
    })
}

impl Extractor {
    /// Compiles the selector set for the storefront's known result markup.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Selector`] if any selector fails to compile.
    pub fn new(supplier_prefix: &str) -> Result<Self, ScraperError> {
        Ok(Self {
            supplier_prefix: supplier_prefix.to_owned(),
            catalog_item: sel("div.catalog-item")?,
            article: sel("span.article")?,
            name_link: sel("a.name")?,
            priced: sel("[data-price]")?,
            not_available: sel("span.not-available")?,
            any_link: sel("a[href]")?,
            headings: vec![sel("h1")?, sel("h2")?, sel("title")?],
        })
    }

    /// The article prefix this extractor confirms against.
    #[must_use]
    pub fn supplier_prefix(&self) -> &str {
        &self.supplier_prefix
    }

    fn prefixed(&self, sku: &str) -> String {
        format!("{}{sku}", self.supplier_prefix)
    }

    /// Strategy 1: scan `div.catalog-item` result containers.
    ///
    /// A container is accepted only when its `span.article` text contains
    /// the requested code (prefixed or bare); name and price are then read
    /// from sibling fields inside the same container, so the three values
    /// cannot come from different products.
    #[must_use]
    pub fn scan_result_containers(
        &self,
        sku: &str,
        html: &Html,
        source_url: &str,
    ) -> StrategyOutcome {
        let prefixed = self.prefixed(sku);

        for item in html.select(&self.catalog_item) {
            let Some(article_el) = item.select(&self.article).next() else {
                continue;
            };
            let article_text: String = article_el.text().collect();
            if !article_text.contains(&prefixed) && !article_text.contains(sku) {
                continue;
            }

            let Some(price) = priced_value(item, &self.priced) else {
                continue;
            };

            let name = item
                .select(&self.name_link)
                .next()
                .and_then(|el| clean_name(&el.text().collect::<String>(), MIN_NAME_CHARS))
                .unwrap_or_else(|| placeholder_name(sku));

            let availability = if item.select(&self.not_available).next().is_some() {
                Availability::OutOfStock
            } else {
                Availability::InStock
            };

            return StrategyOutcome::Matched(ExtractedPrice {
                sku: sku.to_owned(),
                name,
                price,
                availability,
                source_url: source_url.to_owned(),
                confidence: MatchConfidence::Confirmed,
                extracted_at: Utc::now(),
            });
        }

        StrategyOutcome::NotFound
    }

    /// Collects up to [`MAX_DETAIL_LINKS`] distinct product-detail hrefs from
    /// a results page, in document order.
    #[must_use]
    pub fn product_links(&self, html: &Html) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();
        for href in html
            .select(&self.any_link)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| is_product_link(href))
        {
            if !links.iter().any(|known| known == href) {
                links.push(href.to_owned());
            }
            if links.len() == MAX_DETAIL_LINKS {
                break;
            }
        }
        links
    }

    /// Strategy 2: extract from a product-detail page.
    ///
    /// The page text MUST literally contain the requested article code
    /// before any price on it is accepted. An earlier pipeline skipped this
    /// check and took the first priced element on whatever page the search
    /// linked to, which stamped one unrelated product's price onto hundreds
    /// of articles; the guard is not optional.
    #[must_use]
    pub fn extract_from_detail(&self, sku: &str, html: &Html, source_url: &str) -> StrategyOutcome {
        let prefixed = self.prefixed(sku);
        let page_text: String = html.root_element().text().collect();
        if !page_text.contains(&prefixed) && !page_text.contains(sku) {
            return StrategyOutcome::NotFound;
        }

        let Some(price) = priced_value(html.root_element(), &self.priced) else {
            return StrategyOutcome::NotFound;
        };

        let name = self
            .headings
            .iter()
            .filter_map(|heading| html.select(heading).next())
            .find_map(|el| clean_name(&el.text().collect::<String>(), MIN_DETAIL_NAME_CHARS))
            .unwrap_or_else(|| placeholder_name(sku));

        let availability = if html.select(&self.not_available).next().is_some() {
            Availability::OutOfStock
        } else {
            Availability::InStock
        };

        StrategyOutcome::Matched(ExtractedPrice {
            sku: sku.to_owned(),
            name,
            price,
            availability,
            source_url: source_url.to_owned(),
            confidence: MatchConfidence::Confirmed,
            extracted_at: Utc::now(),
        })
    }

    /// Strategy 3: text-adjacency fallback.
    ///
    /// Finds a text node containing the article code, then walks up at most
    /// [`MAX_ANCESTOR_LEVELS`] ancestors looking for an enclosing element
    /// with a priced descendant. Results carry
    /// [`MatchConfidence::Heuristic`] and [`Availability::Unknown`] so
    /// downstream consumers can tell them from confirmed matches.
    #[must_use]
    pub fn scan_text_adjacency(&self, sku: &str, html: &Html, source_url: &str) -> StrategyOutcome {
        let prefixed = self.prefixed(sku);

        for node in html.tree.nodes() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            if !text.contains(&prefixed) && !text.contains(sku) {
                continue;
            }

            for ancestor in node.ancestors().take(MAX_ANCESTOR_LEVELS) {
                let Some(element) = ElementRef::wrap(ancestor) else {
                    continue;
                };
                let Some(price) = priced_value(element, &self.priced) else {
                    continue;
                };

                let name = element
                    .select(&self.name_link)
                    .next()
                    .and_then(|el| clean_name(&el.text().collect::<String>(), MIN_NAME_CHARS))
                    .unwrap_or_else(|| placeholder_name(sku));

                return StrategyOutcome::Matched(ExtractedPrice {
                    sku: sku.to_owned(),
                    name,
                    price,
                    availability: Availability::Unknown,
                    source_url: source_url.to_owned(),
                    confidence: MatchConfidence::Heuristic,
                    extracted_at: Utc::now(),
                });
            }
        }

        StrategyOutcome::NotFound
    }
}

/// First parseable `data-price` attribute among `scope`'s descendants.
fn priced_value(scope: ElementRef<'_>, priced: &Selector) -> Option<f64> {
    scope
        .select(priced)
        .filter_map(|el| el.value().attr("data-price"))
        .find_map(parse_price)
}

/// Whether an href points at a product-detail page
/// (`/catalog/<section>/<item>/`).
fn is_product_link(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    if !path.ends_with('/') {
        return false;
    }
    let Some(idx) = path.find("/catalog/") else {
        return false;
    };
    let tail = &path[idx + "/catalog/".len()..];
    let segments: Vec<&str> = tail.trim_end_matches('/').split('/').collect();
    segments.len() == 2 && segments.iter().all(|s| !s.is_empty())
}

fn placeholder_name(sku: &str) -> String {
    format!("Товар {sku}")
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
