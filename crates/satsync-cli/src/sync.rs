//! Stage orchestration: resolve articles → extract → apply markup → write →
//! recalculate.
//!
//! Per-article problems are counted and logged, never fatal. Only systemic
//! failures — destination database unreachable, zero articles resolved —
//! abort the run. A summary is emitted at the end of every run, including
//! partially failed ones.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;

use satsync_core::{
    apply_markup, load_skus_from_file, AppConfig, DefaultMarkupPolicy, ExtractedPrice,
};
use satsync_db::ProductRow;
use satsync_scraper::{run_batch, write_report, BatchStats, Extractor, SaturnClient};

pub struct SyncOptions {
    pub skus_file: Option<PathBuf>,
    pub batch_size: Option<usize>,
    pub workers: Option<usize>,
    pub output: PathBuf,
    pub recalc: bool,
}

/// Counters for the markup/write stage.
#[derive(Debug, Default, Clone, Copy)]
struct UpdateTotals {
    updated: u64,
    failed: u64,
    /// Extracted articles with no matching destination product.
    unmatched: u64,
}

/// Full pipeline: extract everything, then apply markup and write, then
/// optionally recalculate dependent tiers.
///
/// # Errors
///
/// Returns an error only for systemic failures (database unreachable, no
/// articles resolved, scraper misconfiguration).
pub async fn run_sync(config: &AppConfig, opts: SyncOptions) -> anyhow::Result<()> {
    let started = Instant::now();

    let pool = connect(config).await?;
    let products = satsync_db::get_products_by_prefix(
        &pool,
        config.iblock_id,
        &config.supplier_prefix,
    )
    .await
    .context("loading supplier products from the destination")?;

    let skus = resolve_skus(&products, opts.skus_file.as_deref(), config, opts.batch_size)?;
    anyhow::ensure!(!skus.is_empty(), "no articles to sync");

    let (extracted, batch_stats) = extract_stage(config, &skus, opts.workers).await?;

    // Durable intermediate for replay via `process`; losing it does not lose
    // the in-memory batch, so a write failure only warns.
    if let Err(e) = write_report(&opts.output, &extracted) {
        tracing::warn!(error = %e, "could not write extraction report");
    }

    let totals = write_stage(&pool, config, &products, &extracted).await?;

    if opts.recalc && totals.updated > 0 {
        trigger_recalc(&pool, config).await;
    }

    summarize(started, batch_stats, Some(totals));
    Ok(())
}

/// Extraction stage only; the report file is the deliverable.
///
/// # Errors
///
/// Returns an error for systemic failures (no articles, report unwritable).
pub async fn run_parse(config: &AppConfig, opts: SyncOptions) -> anyhow::Result<()> {
    let started = Instant::now();

    let skus = if let Some(file) = opts.skus_file.as_deref() {
        cap(load_file_skus(file)?, opts.batch_size)
    } else {
        let pool = connect(config).await?;
        let products = satsync_db::get_products_by_prefix(
            &pool,
            config.iblock_id,
            &config.supplier_prefix,
        )
        .await
        .context("loading supplier products from the destination")?;
        resolve_skus(&products, None, config, opts.batch_size)?
    };
    anyhow::ensure!(!skus.is_empty(), "no articles to parse");

    let (extracted, batch_stats) = extract_stage(config, &skus, opts.workers).await?;

    write_report(&opts.output, &extracted)
        .with_context(|| format!("writing report to {}", opts.output.display()))?;

    summarize(started, batch_stats, None);
    Ok(())
}

/// Markup/write stage over an existing report file.
///
/// # Errors
///
/// Returns an error for systemic failures (unreadable report, database
/// unreachable).
pub async fn run_process(config: &AppConfig, input: &Path, recalc: bool) -> anyhow::Result<()> {
    let started = Instant::now();

    let extracted = satsync_scraper::read_report(input)
        .with_context(|| format!("reading report from {}", input.display()))?;
    anyhow::ensure!(!extracted.is_empty(), "report {} holds no rows", input.display());

    let pool = connect(config).await?;
    let products = satsync_db::get_products_by_prefix(
        &pool,
        config.iblock_id,
        &config.supplier_prefix,
    )
    .await
    .context("loading supplier products from the destination")?;

    let totals = write_stage(&pool, config, &products, &extracted).await?;

    if recalc && totals.updated > 0 {
        trigger_recalc(&pool, config).await;
    }

    let batch_stats = BatchStats {
        processed: extracted.len() as u64,
        found: extracted.len() as u64,
        ..BatchStats::default()
    };
    summarize(started, batch_stats, Some(totals));
    Ok(())
}

/// Recalculation pass alone.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the pass itself fails.
pub async fn run_recalc(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let outcome = satsync_db::run_recalc(&pool, config.recalc_batch_size)
        .await
        .context("recalculation pass")?;
    tracing::info!(
        processed = outcome.processed,
        updated = outcome.updated,
        "recalculation finished"
    );
    Ok(())
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::MySqlPool> {
    let pool = satsync_db::connect_pool(
        &config.database_url,
        satsync_db::PoolConfig {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        },
    )
    .await
    .context("cannot reach the destination database")?;
    satsync_db::ping(&pool)
        .await
        .context("destination database did not answer a ping")?;
    Ok(pool)
}

async fn extract_stage(
    config: &AppConfig,
    skus: &[String],
    workers: Option<usize>,
) -> anyhow::Result<(Vec<ExtractedPrice>, BatchStats)> {
    let client = SaturnClient::new(
        &config.scraper_base_url,
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_request_delay_ms,
        config.scraper_max_retries,
        config.scraper_rate_limit_unit_secs,
        config.scraper_network_retry_unit_secs,
    )
    .context("building the storefront client")?;
    let extractor = Extractor::new(&config.supplier_prefix).context("compiling selectors")?;

    let workers = workers.unwrap_or(config.scraper_max_workers);
    Ok(run_batch(
        &client,
        &extractor,
        skus,
        workers,
        config.scraper_request_delay_ms,
    )
    .await)
}

/// Applies markup and writes every extracted price.
///
/// Rule loading is the only fallible step here that aborts: a destination
/// read failing at this point means the database went away mid-run.
async fn write_stage(
    pool: &sqlx::MySqlPool,
    config: &AppConfig,
    products: &[ProductRow],
    extracted: &[ExtractedPrice],
) -> anyhow::Result<UpdateTotals> {
    let rules = satsync_db::load_markup_rules(pool)
        .await
        .context("loading markup rules")?;
    let policy = DefaultMarkupPolicy {
        prefix_defaults: config.markup_prefix_defaults.clone(),
        generic_percent: config.markup_generic_default_percent,
    };

    let by_sku: HashMap<&str, &ProductRow> = products
        .iter()
        .map(|p| (bare_sku(&p.article, &config.supplier_prefix), p))
        .collect();

    let mut totals = UpdateTotals::default();

    for item in extracted {
        let Some(product) = by_sku.get(item.sku.as_str()) else {
            totals.unmatched += 1;
            tracing::warn!(sku = %item.sku, "no destination product for extracted article");
            continue;
        };

        let (final_price, percent) = apply_markup(
            &product.article,
            product.section_id,
            item.price,
            &rules,
            &policy,
        );

        match satsync_db::upsert_price(
            pool,
            product.id,
            config.price_type_id,
            final_price,
            &config.currency,
        )
        .await
        {
            Ok(()) => {
                totals.updated += 1;
                tracing::info!(
                    article = %product.article,
                    base = item.price,
                    final_price,
                    percent,
                    "price written"
                );
            }
            Err(e) => {
                totals.failed += 1;
                tracing::error!(
                    article = %product.article,
                    price = final_price,
                    error = %e,
                    "price write failed"
                );
            }
        }
    }

    Ok(totals)
}

/// Fire the dependent-tier recalculation; a failure here is logged and left
/// for a separate `recalc` invocation — prices already written stay written.
async fn trigger_recalc(pool: &sqlx::MySqlPool, config: &AppConfig) {
    match satsync_db::run_recalc(pool, config.recalc_batch_size).await {
        Ok(outcome) => {
            tracing::info!(
                processed = outcome.processed,
                updated = outcome.updated,
                "dependent tiers recalculated"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "recalculation failed; rerun with the recalc command");
        }
    }
}

fn resolve_skus(
    products: &[ProductRow],
    skus_file: Option<&Path>,
    config: &AppConfig,
    batch_size: Option<usize>,
) -> anyhow::Result<Vec<String>> {
    let skus = if let Some(file) = skus_file {
        load_file_skus(file)?
    } else {
        products
            .iter()
            .map(|p| bare_sku(&p.article, &config.supplier_prefix).to_string())
            .collect()
    };
    Ok(cap(skus, batch_size))
}

fn load_file_skus(file: &Path) -> anyhow::Result<Vec<String>> {
    let skus = load_skus_from_file(file)
        .with_context(|| format!("reading article list from {}", file.display()))?;
    tracing::info!(count = skus.len(), file = %file.display(), "articles loaded from file");
    Ok(skus)
}

fn cap(mut skus: Vec<String>, batch_size: Option<usize>) -> Vec<String> {
    if let Some(limit) = batch_size {
        if skus.len() > limit {
            tracing::info!(limit, total = skus.len(), "capping batch");
            skus.truncate(limit);
        }
    }
    skus
}

fn bare_sku<'a>(article: &'a str, prefix: &str) -> &'a str {
    article.strip_prefix(prefix).unwrap_or(article)
}

fn summarize(started: Instant, batch: BatchStats, totals: Option<UpdateTotals>) {
    let elapsed = started.elapsed();
    let rate = if elapsed.as_secs_f64() > 0.0 {
        #[allow(clippy::cast_precision_loss)]
        let processed = batch.processed as f64;
        processed / elapsed.as_secs_f64()
    } else {
        0.0
    };

    match totals {
        Some(totals) => tracing::info!(
            processed = batch.processed,
            found = batch.found,
            missing = batch.missing,
            failed_extraction = batch.failed,
            updated = totals.updated,
            failed_update = totals.failed,
            unmatched = totals.unmatched,
            elapsed_secs = elapsed.as_secs(),
            rate = format!("{rate:.1}/s"),
            "sync finished"
        ),
        None => tracing::info!(
            processed = batch.processed,
            found = batch.found,
            missing = batch.missing,
            failed_extraction = batch.failed,
            elapsed_secs = elapsed.as_secs(),
            rate = format!("{rate:.1}/s"),
            "extraction finished"
        ),
    }
}
