//! Per-article search flow: query the catalog, run the extraction
//! strategies in priority order, fall back to an alternate query.

use scraper::Html;

use satsync_core::ExtractedPrice;

use crate::client::SaturnClient;
use crate::error::ScraperError;
use crate::extract::{Extractor, StrategyOutcome};

/// Locates one article on the storefront.
///
/// Queries are tried in order — the prefixed article code first, then the
/// bare code. For each results page the strategies run in priority order:
/// container scan, detail-link follow, text-adjacency fallback. The first
/// match ends the search.
///
/// `Ok(None)` means the article is simply not listed — an expected business
/// outcome, counted but never fatal. Detail-page fetch failures downgrade to
/// the next strategy rather than failing the article, since the results page
/// itself may still yield a fallback match.
///
/// # Errors
///
/// Returns [`ScraperError`] only when every results-page fetch failed, i.e.
/// nothing could be inspected at all.
pub async fn find_product(
    client: &SaturnClient,
    extractor: &Extractor,
    sku: &str,
) -> Result<Option<ExtractedPrice>, ScraperError> {
    let queries = [
        format!("{}{sku}", extractor.supplier_prefix()),
        sku.to_owned(),
    ];

    let mut last_err: Option<ScraperError> = None;
    let mut fetched_any = false;

    for query in &queries {
        let search_url = client.search_url(query)?;
        let body = match client.fetch(&search_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(sku = %sku, query = %query, error = %e, "search fetch failed");
                last_err = Some(e);
                continue;
            }
        };
        fetched_any = true;

        let results = Html::parse_document(&body);

        if let StrategyOutcome::Matched(found) =
            extractor.scan_result_containers(sku, &results, &search_url)
        {
            return Ok(Some(found));
        }

        for href in extractor.product_links(&results) {
            let detail_url = client.absolute_url(&href);
            let detail_body = match client.fetch(&detail_url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(sku = %sku, url = %detail_url, error = %e, "detail fetch failed");
                    continue;
                }
            };
            let detail = Html::parse_document(&detail_body);
            if let StrategyOutcome::Matched(found) =
                extractor.extract_from_detail(sku, &detail, &detail_url)
            {
                return Ok(Some(found));
            }
        }

        if let StrategyOutcome::Matched(found) =
            extractor.scan_text_adjacency(sku, &results, &search_url)
        {
            tracing::debug!(sku = %sku, "matched via text-adjacency fallback");
            return Ok(Some(found));
        }
    }

    match last_err {
        // Every results-page fetch failed; surface the error so the runner
        // counts this as a failure, not a missing product.
        Some(e) if !fetched_any => Err(e),
        _ => Ok(None),
    }
}
