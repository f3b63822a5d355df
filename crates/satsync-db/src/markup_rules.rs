//! Markup-rule reads from the destination CMS.
//!
//! Rules live in their own information block; there is no stable id for it
//! across installations, so it is discovered by name/code pattern the same
//! way the site administrators find it in the UI.

use sqlx::MySqlPool;

use satsync_core::MarkupRule;

use crate::DbError;

/// Locates the information block holding markup rules.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the lookup fails. `Ok(None)` means no
/// candidate iblock exists — the caller falls back to the default policy for
/// every product.
pub async fn find_markup_iblock(pool: &MySqlPool) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT CAST(ID AS SIGNED) FROM b_iblock \
         WHERE ACTIVE = 'Y' \
           AND (NAME LIKE '%наценк%' OR CODE LIKE '%markup%' OR CODE LIKE '%price%') \
         ORDER BY ID DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Loads all active markup rules, ordered by `(SORT, ID)`.
///
/// The percent property is stored as text in the EAV table; rows whose
/// percent does not parse are skipped with a warning rather than failing the
/// load — one mistyped rule must not take down a sync run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn load_markup_rules(pool: &MySqlPool) -> Result<Vec<MarkupRule>, DbError> {
    let Some(iblock_id) = find_markup_iblock(pool).await? else {
        tracing::warn!("no markup-rule iblock found; default policy applies to every product");
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, (i64, String, Option<i64>, i64, Option<String>)>(
        "SELECT \
             CAST(e.ID AS SIGNED) AS id, \
             e.NAME AS name, \
             CAST(e.IBLOCK_SECTION_ID AS SIGNED) AS section_id, \
             CAST(e.SORT AS SIGNED) AS sort, \
             p.VALUE AS percent \
         FROM b_iblock_element e \
         LEFT JOIN b_iblock_element_property p ON ( \
             e.ID = p.IBLOCK_ELEMENT_ID \
             AND p.IBLOCK_PROPERTY_ID = ( \
                 SELECT ID FROM b_iblock_property \
                 WHERE IBLOCK_ID = ? AND CODE = 'PERCENT' \
             ) \
         ) \
         WHERE e.IBLOCK_ID = ? AND e.ACTIVE = 'Y' \
         ORDER BY e.SORT, e.ID",
    )
    .bind(iblock_id)
    .bind(iblock_id)
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::new();
    for (id, name, section_id, sort, percent) in rows {
        let Some(percent) = percent.as_deref().and_then(|p| p.trim().parse::<f64>().ok()) else {
            tracing::warn!(rule_id = id, rule = %name, "markup rule has no parseable percent; skipped");
            continue;
        };
        rules.push(MarkupRule {
            id,
            name,
            section_id,
            percent,
            sort,
        });
    }

    tracing::info!(count = rules.len(), iblock_id, "loaded markup rules");
    Ok(rules)
}
