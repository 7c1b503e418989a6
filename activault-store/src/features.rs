//! Product feature queries.

use activault_types::{Page, PageResult, ProductFeature};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{Conflict, StoreError, StoreResult};

const COLUMNS: &str = "id, product_id, feature_name, feature_code, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<ProductFeature> {
    Ok(ProductFeature {
        id: row.get(0)?,
        product_id: row.get(1)?,
        feature_name: row.get(2)?,
        feature_code: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<ProductFeature> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM product_features WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("feature"))
}

/// The subset of `ids` that exists and belongs to `product_id`, ordered
/// by id. Ids from other products are silently dropped, matching the
/// association update semantics.
pub fn get_in_product(
    conn: &Connection,
    ids: &[i64],
    product_id: i64,
) -> StoreResult<Vec<ProductFeature>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {COLUMNS} FROM product_features
         WHERE product_id = ? AND id IN ({placeholders}) ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let params = std::iter::once(product_id).chain(ids.iter().copied());
    let rows = stmt.query_map(params_from_iter(params), from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Inserts a feature with the same two-check pattern as license types:
/// name and code are validated independently, scoped by product.
pub fn insert(
    conn: &Connection,
    product_id: i64,
    feature_name: &str,
    feature_code: &str,
    now: DateTime<Utc>,
) -> StoreResult<ProductFeature> {
    let name_taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM product_features WHERE product_id = ?1 AND feature_name = ?2",
        params![product_id, feature_name],
        |row| row.get(0),
    )?;
    if name_taken > 0 {
        return Err(StoreError::Conflict(Conflict::FeatureName));
    }

    let code_taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM product_features WHERE product_id = ?1 AND feature_code = ?2",
        params![product_id, feature_code],
        |row| row.get(0),
    )?;
    if code_taken > 0 {
        return Err(StoreError::Conflict(Conflict::FeatureCode));
    }

    conn.execute(
        "INSERT INTO product_features (product_id, feature_name, feature_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![product_id, feature_name, feature_code, now],
    )?;
    get(conn, conn.last_insert_rowid())
}

/// Deletes a feature. Its membership is first cleared from every
/// license type and software version association.
pub fn delete(conn: &Connection, id: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM license_type_features WHERE feature_id = ?1",
        params![id],
    )?;
    conn.execute(
        "DELETE FROM software_version_features WHERE feature_id = ?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM product_features WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("feature"));
    }
    Ok(())
}

pub fn list(conn: &Connection, product_id: i64, page: Page) -> StoreResult<PageResult<ProductFeature>> {
    let page = page.normalized();
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM product_features WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM product_features WHERE product_id = ?1
         ORDER BY feature_name LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![product_id, page.limit(), page.offset()], from_row)?;
    let list = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(PageResult::new(total, page, list))
}
