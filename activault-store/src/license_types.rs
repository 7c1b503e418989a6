//! License type queries and the feature association (replace-all).

use activault_types::{LicenseType, Page, PageResult, ProductFeature};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Conflict, StoreError, StoreResult};
use crate::features;

const COLUMNS: &str = "id, product_id, type_name, license_code, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<LicenseType> {
    Ok(LicenseType {
        id: row.get(0)?,
        product_id: row.get(1)?,
        type_name: row.get(2)?,
        license_code: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<LicenseType> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM license_types WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("license type"))
}

/// True if the license type exists and belongs to `product_id`. Devices
/// may only reference license types of their own product.
pub fn exists_in_product(conn: &Connection, id: i64, product_id: i64) -> StoreResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM license_types WHERE id = ?1 AND product_id = ?2",
        params![id, product_id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// Inserts a license type after two independent per-product uniqueness
/// checks: the display name and the immutable license code each get
/// their own conflict kind.
pub fn insert(
    conn: &Connection,
    product_id: i64,
    type_name: &str,
    license_code: &str,
    now: DateTime<Utc>,
) -> StoreResult<LicenseType> {
    let name_taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM license_types WHERE product_id = ?1 AND type_name = ?2",
        params![product_id, type_name],
        |row| row.get(0),
    )?;
    if name_taken > 0 {
        return Err(StoreError::Conflict(Conflict::LicenseTypeName));
    }

    let code_taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM license_types WHERE product_id = ?1 AND license_code = ?2",
        params![product_id, license_code],
        |row| row.get(0),
    )?;
    if code_taken > 0 {
        return Err(StoreError::Conflict(Conflict::LicenseCode));
    }

    conn.execute(
        "INSERT INTO license_types (product_id, type_name, license_code, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![product_id, type_name, license_code, now],
    )?;
    get(conn, conn.last_insert_rowid())
}

/// Deletes a license type, clearing its feature associations first.
pub fn delete(conn: &Connection, id: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM license_type_features WHERE license_type_id = ?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM license_types WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("license type"));
    }
    Ok(())
}

/// Replaces the feature set of a license type: clear everything, then
/// insert the features from `feature_ids` that belong to the license
/// type's product. Never a diff. Returns the resulting set.
pub fn replace_features(
    conn: &Connection,
    license_type_id: i64,
    product_id: i64,
    feature_ids: &[i64],
) -> StoreResult<Vec<ProductFeature>> {
    conn.execute(
        "DELETE FROM license_type_features WHERE license_type_id = ?1",
        params![license_type_id],
    )?;

    let matched = features::get_in_product(conn, feature_ids, product_id)?;
    for feature in &matched {
        conn.execute(
            "INSERT INTO license_type_features (license_type_id, feature_id) VALUES (?1, ?2)",
            params![license_type_id, feature.id],
        )?;
    }

    features_of(conn, license_type_id)
}

/// The features currently bound to a license type, ordered by id.
pub fn features_of(conn: &Connection, license_type_id: i64) -> StoreResult<Vec<ProductFeature>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.product_id, f.feature_name, f.feature_code, f.created_at, f.updated_at
         FROM product_features f
         JOIN license_type_features ltf ON ltf.feature_id = f.id
         WHERE ltf.license_type_id = ?1
         ORDER BY f.id",
    )?;
    let rows = stmt.query_map(params![license_type_id], features::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// The ordered feature codes for a license type, as carried in
/// activation artifacts.
pub fn feature_codes(conn: &Connection, license_type_id: i64) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT f.feature_code
         FROM product_features f
         JOIN license_type_features ltf ON ltf.feature_id = f.id
         WHERE ltf.license_type_id = ?1
         ORDER BY f.id",
    )?;
    let rows = stmt.query_map(params![license_type_id], |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn list(conn: &Connection, product_id: i64, page: Page) -> StoreResult<PageResult<LicenseType>> {
    let page = page.normalized();
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM license_types WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM license_types WHERE product_id = ?1
         ORDER BY type_name LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![product_id, page.limit(), page.offset()], from_row)?;
    let list = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(PageResult::new(total, page, list))
}
