//! Catalog reads against the Bitrix information-block (EAV) schema.

use sqlx::MySqlPool;

use crate::DbError;

/// Property codes that different Bitrix installations use for the article
/// field, most common first. The first one present on the catalog iblock
/// wins.
const ARTICLE_PROPERTY_CANDIDATES: &[&str] =
    &["CML2_ARTICLE", "CML2_TRAIT_ARTIKUL", "ARTICLE", "SKU"];

/// A catalog product joined with its article property value.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub article: String,
    pub section_id: Option<i64>,
    pub active: bool,
}

/// Determines which property code holds article values on the catalog
/// iblock.
///
/// Installations migrated from different 1C exchange versions disagree on
/// the code; picking the most frequently defined candidate matches whatever
/// the exchange actually populated.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the lookup fails. An iblock with none of the
/// candidate properties falls back to `CML2_ARTICLE`.
pub async fn resolve_article_property(pool: &MySqlPool, iblock_id: i64) -> Result<String, DbError> {
    let placeholders = vec!["?"; ARTICLE_PROPERTY_CANDIDATES.len()].join(", ");
    let sql = format!(
        "SELECT p.CODE, COUNT(*) AS cnt \
         FROM b_iblock_property p \
         WHERE p.IBLOCK_ID = ? AND p.CODE IN ({placeholders}) \
         GROUP BY p.CODE \
         ORDER BY cnt DESC"
    );

    let mut query = sqlx::query_as::<_, (String, i64)>(&sql).bind(iblock_id);
    for candidate in ARTICLE_PROPERTY_CANDIDATES {
        query = query.bind(*candidate);
    }

    let rows = query.fetch_all(pool).await?;
    let code = rows
        .into_iter()
        .next()
        .map_or_else(|| "CML2_ARTICLE".to_string(), |(code, _)| code);

    tracing::debug!(iblock_id, article_property = %code, "resolved article property");
    Ok(code)
}

/// Loads active catalog products whose article starts with `prefix`.
///
/// The article lives in `b_iblock_element_property` under the property code
/// resolved by [`resolve_article_property`]; everything else comes off
/// `b_iblock_element` directly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_products_by_prefix(
    pool: &MySqlPool,
    iblock_id: i64,
    prefix: &str,
) -> Result<Vec<ProductRow>, DbError> {
    let article_property = resolve_article_property(pool, iblock_id).await?;

    let rows = sqlx::query_as::<_, (i64, String, String, Option<i64>, String)>(
        "SELECT \
             CAST(e.ID AS SIGNED) AS id, \
             e.NAME AS name, \
             p.VALUE AS article, \
             CAST(e.IBLOCK_SECTION_ID AS SIGNED) AS section_id, \
             e.ACTIVE AS active \
         FROM b_iblock_element e \
         INNER JOIN b_iblock_element_property p ON ( \
             e.ID = p.IBLOCK_ELEMENT_ID \
             AND p.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property \
                 WHERE IBLOCK_ID = ? AND CODE = ? \
             ) \
         ) \
         WHERE e.IBLOCK_ID = ? \
           AND e.ACTIVE = 'Y' \
           AND p.VALUE LIKE CONCAT(?, '%') \
         ORDER BY e.ID",
    )
    .bind(iblock_id)
    .bind(&article_property)
    .bind(iblock_id)
    .bind(prefix)
    .fetch_all(pool)
    .await?;

    let products: Vec<ProductRow> = rows
        .into_iter()
        .map(|(id, name, article, section_id, active)| ProductRow {
            id,
            name,
            article,
            section_id,
            active: active == "Y",
        })
        .collect();

    tracing::info!(count = products.len(), prefix, "loaded supplier products");
    Ok(products)
}
