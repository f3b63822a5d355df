//! Price writes to `b_catalog_price`.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::DbError;

/// A row from `b_catalog_price`.
///
/// `TIMESTAMP_X` is `DATETIME` without timezone in the destination schema,
/// hence [`NaiveDateTime`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    pub id: i64,
    pub product_id: i64,
    pub catalog_group_id: i64,
    pub price: Decimal,
    pub currency: String,
    pub timestamp_x: Option<NaiveDateTime>,
}

/// Upserts one price keyed by `(PRODUCT_ID, CATALOG_GROUP_ID)`.
///
/// A single `INSERT … ON DUPLICATE KEY UPDATE` statement, so there is no
/// window between checking for an existing row and writing one, and no
/// input can leave the table untouched: every call either inserts or
/// updates exactly one row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_price(
    pool: &MySqlPool,
    product_id: i64,
    price_type_id: i64,
    price: f64,
    currency: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO b_catalog_price \
             (PRODUCT_ID, CATALOG_GROUP_ID, PRICE, PRICE_SCALE, CURRENCY, TIMESTAMP_X) \
         VALUES (?, ?, ?, ?, ?, NOW()) \
         ON DUPLICATE KEY UPDATE \
             PRICE = VALUES(PRICE), \
             PRICE_SCALE = VALUES(PRICE_SCALE), \
             CURRENCY = VALUES(CURRENCY), \
             TIMESTAMP_X = NOW()",
    )
    .bind(product_id)
    .bind(price_type_id)
    .bind(price)
    .bind(price)
    .bind(currency)
    .execute(pool)
    .await?;

    Ok(())
}

/// Reads back the price row for `(product_id, price_type_id)`, if present.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_price(
    pool: &MySqlPool,
    product_id: i64,
    price_type_id: i64,
) -> Result<Option<PriceRow>, DbError> {
    let row = sqlx::query_as::<_, PriceRow>(
        "SELECT \
             CAST(ID AS SIGNED) AS id, \
             CAST(PRODUCT_ID AS SIGNED) AS product_id, \
             CAST(CATALOG_GROUP_ID AS SIGNED) AS catalog_group_id, \
             PRICE AS price, \
             CURRENCY AS currency, \
             TIMESTAMP_X AS timestamp_x \
         FROM b_catalog_price \
         WHERE PRODUCT_ID = ? AND CATALOG_GROUP_ID = ?",
    )
    .bind(product_id)
    .bind(price_type_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
