//! Concurrent batch extraction over a list of articles.

use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};

use satsync_core::ExtractedPrice;

use crate::client::SaturnClient;
use crate::extract::Extractor;
use crate::search::find_product;

/// Progress is logged after this many completions.
const PROGRESS_EVERY: u64 = 50;

/// Counters for one batch. `processed` always equals
/// `found + missing + failed` — every article lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: u64,
    /// A confirmed or heuristic match was extracted.
    pub found: u64,
    /// Searched successfully but the article is not listed.
    pub missing: u64,
    /// Fetch errors exhausted their retries; nothing could be inspected.
    pub failed: u64,
}

/// Runs extraction for every article with a bounded worker pool.
///
/// Results are collected in completion order, not input order. Per-article
/// failures are logged and counted; they never abort the batch or other
/// in-flight articles. After each completion the configured politeness delay
/// is applied once more on the collector side, capping the aggregate
/// completion rate regardless of worker count.
///
/// There is no mid-batch cancellation; the batch runs to completion.
pub async fn run_batch(
    client: &SaturnClient,
    extractor: &Extractor,
    skus: &[String],
    workers: usize,
    completion_delay_ms: u64,
) -> (Vec<ExtractedPrice>, BatchStats) {
    let total = skus.len();
    let started = Instant::now();
    tracing::info!(total, workers, "starting batch extraction");

    let mut results = Vec::new();
    let mut stats = BatchStats::default();

    let mut completions = stream::iter(skus)
        .map(|sku| async move {
            let outcome = find_product(client, extractor, sku).await;
            (sku, outcome)
        })
        .buffer_unordered(workers.max(1));

    while let Some((sku, outcome)) = completions.next().await {
        stats.processed += 1;

        match outcome {
            Ok(Some(found)) => {
                stats.found += 1;
                tracing::info!(sku = %sku, price = found.price, name = %found.name, "found");
                results.push(found);
            }
            Ok(None) => {
                stats.missing += 1;
                tracing::warn!(sku = %sku, "not listed on the source site");
            }
            Err(e) => {
                stats.failed += 1;
                tracing::error!(sku = %sku, error = %e, "extraction failed");
            }
        }

        if stats.processed % PROGRESS_EVERY == 0 {
            let elapsed = started.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                #[allow(clippy::cast_precision_loss)]
                let processed = stats.processed as f64;
                processed / elapsed
            } else {
                0.0
            };
            tracing::info!(
                processed = stats.processed,
                total,
                rate = format!("{rate:.1}/s"),
                "batch progress"
            );
        }

        if completion_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(completion_delay_ms)).await;
        }
    }

    let elapsed = started.elapsed();
    tracing::info!(
        processed = stats.processed,
        found = stats.found,
        missing = stats.missing,
        failed = stats.failed,
        elapsed_secs = elapsed.as_secs(),
        "batch extraction finished"
    );

    (results, stats)
}
