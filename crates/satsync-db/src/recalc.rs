//! Cross-tier price recalculation.
//!
//! After a sync writes base prices, dependent tiers (retail from base,
//! wholesale from purchasing, …) are recomputed from rules the shop
//! administrators maintain in a settings information block. The pass walks
//! products in id-cursor batches so it stays bounded on catalogs with tens
//! of thousands of rows; per-product failures are logged and skipped, never
//! fatal. The whole pass is independent of the price sync that triggered it
//! — its failure does not roll anything back.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::{prices, DbError};

/// Module id under which the recalculation settings iblock is registered in
/// `b_option`.
const SETTINGS_MODULE_ID: &str = "mcart.underprice";

/// Pseudo tier code meaning the purchasing price on `b_catalog_product`
/// rather than a `b_catalog_price` row.
const PURCHASING_TIER: &str = "P";

/// One recalculation rule: copy `from` tier into `to` tier with a percent
/// adjustment, optionally restricted to a catalog section.
#[derive(Debug, Clone)]
pub struct RecalcRule {
    pub id: i64,
    pub iblock_id: i64,
    pub section_id: Option<i64>,
    pub tier_from: String,
    pub tier_to: String,
    pub percent: f64,
    pub sort: i64,
}

/// Totals for one recalculation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecalcOutcome {
    pub processed: u64,
    pub updated: u64,
}

#[derive(Debug, Clone)]
struct RecalcProduct {
    id: i64,
    article: String,
}

/// Maps a tier code to its `b_catalog_group` id.
///
/// The mapping is fixed by convention on the destination install; tier
/// groups are created once and never renumbered.
fn price_group_by_code(code: &str) -> Option<i64> {
    match code {
        "BASE" => Some(1),
        "RETAIL" => Some(2),
        "WHOLESALE" => Some(3),
        "VIP" => Some(4),
        _ => None,
    }
}

/// Resolves a property-enum value id to its `XML_ID` tier code.
async fn enum_xml_id(pool: &MySqlPool, enum_id: Option<i64>) -> Result<Option<String>, DbError> {
    let Some(enum_id) = enum_id else {
        return Ok(None);
    };
    let xml_id = sqlx::query_scalar::<_, String>(
        "SELECT XML_ID FROM b_iblock_property_enum WHERE ID = ?",
    )
    .bind(enum_id)
    .fetch_optional(pool)
    .await?;
    Ok(xml_id)
}

/// Loads the recalculation rules from the settings iblock.
///
/// Rule rows reference tier codes through property enums; rows whose enums
/// cannot be resolved are skipped with a warning.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn load_recalc_rules(pool: &MySqlPool) -> Result<Vec<RecalcRule>, DbError> {
    let settings_iblock = sqlx::query_scalar::<_, String>(
        "SELECT VALUE FROM b_option WHERE MODULE_ID = ? AND NAME = 'SETTINGS_IBLOCK_ID'",
    )
    .bind(SETTINGS_MODULE_ID)
    .fetch_optional(pool)
    .await?;

    let Some(settings_iblock) = settings_iblock.and_then(|v| v.trim().parse::<i64>().ok()) else {
        tracing::warn!("recalculation settings iblock is not configured");
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<
        _,
        (
            i64,
            i64,
            Option<String>,
            Option<String>,
            Option<i64>,
            Option<i64>,
            Option<String>,
        ),
    >(
        "SELECT \
             CAST(e.ID AS SIGNED) AS id, \
             CAST(e.SORT AS SIGNED) AS sort, \
             p_iblock.VALUE AS iblock_id, \
             p_section.VALUE AS section_id, \
             CAST(p_from.VALUE AS SIGNED) AS tier_from_enum, \
             CAST(p_to.VALUE AS SIGNED) AS tier_to_enum, \
             p_percent.VALUE AS percent \
         FROM b_iblock_element e \
         LEFT JOIN b_iblock_element_property p_iblock ON ( \
             e.ID = p_iblock.IBLOCK_ELEMENT_ID \
             AND p_iblock.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property WHERE IBLOCK_ID = ? AND CODE = 'IBLOCK_ID' \
             ) \
         ) \
         LEFT JOIN b_iblock_element_property p_section ON ( \
             e.ID = p_section.IBLOCK_ELEMENT_ID \
             AND p_section.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property WHERE IBLOCK_ID = ? AND CODE = 'SECTION_ID' \
             ) \
         ) \
         LEFT JOIN b_iblock_element_property p_from ON ( \
             e.ID = p_from.IBLOCK_ELEMENT_ID \
             AND p_from.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property WHERE IBLOCK_ID = ? AND CODE = 'PRICE_CODE' \
             ) \
         ) \
         LEFT JOIN b_iblock_element_property p_to ON ( \
             e.ID = p_to.IBLOCK_ELEMENT_ID \
             AND p_to.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property WHERE IBLOCK_ID = ? AND CODE = 'PRICE_CODE_TO' \
             ) \
         ) \
         LEFT JOIN b_iblock_element_property p_percent ON ( \
             e.ID = p_percent.IBLOCK_ELEMENT_ID \
             AND p_percent.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property WHERE IBLOCK_ID = ? AND CODE = 'PERCENT' \
             ) \
         ) \
         WHERE e.IBLOCK_ID = ? AND e.ACTIVE = 'Y' \
         ORDER BY e.SORT, e.ID",
    )
    .bind(settings_iblock)
    .bind(settings_iblock)
    .bind(settings_iblock)
    .bind(settings_iblock)
    .bind(settings_iblock)
    .bind(settings_iblock)
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::new();
    for (id, sort, iblock_id, section_id, tier_from_enum, tier_to_enum, percent) in rows {
        let tier_from = enum_xml_id(pool, tier_from_enum).await?;
        let tier_to = enum_xml_id(pool, tier_to_enum).await?;

        let (Some(tier_from), Some(tier_to)) = (tier_from, tier_to) else {
            tracing::warn!(rule_id = id, "recalc rule has unresolved tier enums; skipped");
            continue;
        };
        let Some(iblock_id) = iblock_id.and_then(|v| v.trim().parse::<i64>().ok()) else {
            tracing::warn!(rule_id = id, "recalc rule has no target iblock; skipped");
            continue;
        };
        let percent = percent
            .as_deref()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .unwrap_or(0.0);

        rules.push(RecalcRule {
            id,
            iblock_id,
            section_id: section_id.and_then(|v| v.trim().parse::<i64>().ok()),
            tier_from,
            tier_to,
            percent,
            sort,
        });
    }

    tracing::info!(count = rules.len(), "loaded recalculation rules");
    Ok(rules)
}

/// Runs the full recalculation pass.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] only for failures that make the pass itself
/// impossible (rule/product reads); per-product write failures are logged
/// and counted out.
pub async fn run_recalc(pool: &MySqlPool, batch_size: i64) -> Result<RecalcOutcome, DbError> {
    let rules = load_recalc_rules(pool).await?;
    let mut outcome = RecalcOutcome::default();

    for rule in &rules {
        tracing::info!(
            rule_id = rule.id,
            from = %rule.tier_from,
            to = %rule.tier_to,
            percent = rule.percent,
            "applying recalculation rule"
        );

        let from_group = price_group_by_code(&rule.tier_from);
        let to_group = price_group_by_code(&rule.tier_to);
        if rule.tier_from != PURCHASING_TIER && from_group.is_none() {
            tracing::warn!(rule_id = rule.id, tier = %rule.tier_from, "unknown source tier; rule skipped");
            continue;
        }
        if rule.tier_to != PURCHASING_TIER && to_group.is_none() {
            tracing::warn!(rule_id = rule.id, tier = %rule.tier_to, "unknown target tier; rule skipped");
            continue;
        }

        let mut cursor: i64 = 0;
        loop {
            let batch = products_batch(pool, rule.iblock_id, rule.section_id, cursor, batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();

            for product in batch {
                cursor = product.id;
                outcome.processed += 1;

                let source_price = if rule.tier_from == PURCHASING_TIER {
                    purchasing_price(pool, product.id).await?
                } else {
                    tier_price(pool, product.id, from_group.unwrap_or(1)).await?
                };

                let Some(source_price) = source_price.filter(|p| *p > 0.0) else {
                    continue;
                };

                let new_price = source_price * (1.0 + rule.percent / 100.0);
                if new_price <= 0.0 {
                    continue;
                }

                let write = if rule.tier_to == PURCHASING_TIER {
                    update_purchasing_price(pool, product.id, new_price).await
                } else {
                    prices::upsert_price(pool, product.id, to_group.unwrap_or(1), new_price, "RUB")
                        .await
                };

                match write {
                    Ok(()) => {
                        outcome.updated += 1;
                        tracing::debug!(
                            article = %product.article,
                            source_price,
                            new_price,
                            "recalculated"
                        );
                    }
                    Err(e) => {
                        tracing::error!(
                            article = %product.article,
                            error = %e,
                            "recalculation write failed"
                        );
                    }
                }
            }

            if i64::try_from(batch_len).unwrap_or(i64::MAX) < batch_size {
                break;
            }
        }
    }

    tracing::info!(
        processed = outcome.processed,
        updated = outcome.updated,
        "recalculation pass finished"
    );
    Ok(outcome)
}

/// One id-cursor page of active products with a purchasing price.
async fn products_batch(
    pool: &MySqlPool,
    iblock_id: i64,
    section_id: Option<i64>,
    after_id: i64,
    limit: i64,
) -> Result<Vec<RecalcProduct>, DbError> {
    let section_filter = if section_id.is_some() {
        "AND e.IBLOCK_SECTION_ID = ?"
    } else {
        ""
    };
    let sql = format!(
        "SELECT \
             CAST(e.ID AS SIGNED) AS id, \
             COALESCE(prop.VALUE, '') AS article \
         FROM b_iblock_element e \
         LEFT JOIN b_iblock_element_property prop ON ( \
             e.ID = prop.IBLOCK_ELEMENT_ID \
             AND prop.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property \
                 WHERE IBLOCK_ID = e.IBLOCK_ID AND CODE = 'CML2_ARTICLE' \
             ) \
         ) \
         INNER JOIN b_catalog_product cat ON e.ID = cat.ID \
         WHERE e.ACTIVE = 'Y' AND e.IBLOCK_ID = ? AND e.ID > ? \
           AND cat.PURCHASING_PRICE IS NOT NULL \
           {section_filter} \
         ORDER BY e.ID ASC \
         LIMIT ?"
    );

    let mut query = sqlx::query_as::<_, (i64, String)>(&sql)
        .bind(iblock_id)
        .bind(after_id);
    if let Some(section_id) = section_id {
        query = query.bind(section_id);
    }
    let rows = query.bind(limit).fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(id, article)| RecalcProduct { id, article })
        .collect())
}

/// Current price on a tier, if any.
async fn tier_price(
    pool: &MySqlPool,
    product_id: i64,
    group_id: i64,
) -> Result<Option<f64>, DbError> {
    let price = sqlx::query_scalar::<_, Decimal>(
        "SELECT PRICE FROM b_catalog_price WHERE PRODUCT_ID = ? AND CATALOG_GROUP_ID = ?",
    )
    .bind(product_id)
    .bind(group_id)
    .fetch_optional(pool)
    .await?;

    Ok(price.and_then(|p| p.to_f64()))
}

/// Purchasing price off `b_catalog_product`, if set.
async fn purchasing_price(pool: &MySqlPool, product_id: i64) -> Result<Option<f64>, DbError> {
    let price = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT PURCHASING_PRICE FROM b_catalog_product WHERE ID = ?",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(price.flatten().and_then(|p| p.to_f64()))
}

async fn update_purchasing_price(
    pool: &MySqlPool,
    product_id: i64,
    new_price: f64,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE b_catalog_product \
         SET PURCHASING_PRICE = ?, TIMESTAMP_X = NOW() \
         WHERE ID = ?",
    )
    .bind(new_price)
    .bind(product_id)
    .execute(pool)
    .await?;

    Ok(())
}
