//! Software and firmware release versions and their associations.
//!
//! A software version carries two association sets, both maintained
//! with replace-all semantics like the license type feature set: the
//! features it supports and the firmware versions it pairs with.

use activault_types::{FirmwareVersion, Page, PageResult, ProductFeature, SoftwareVersion, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Conflict, StoreError, StoreResult};
use crate::features;

const SW_COLUMNS: &str = "id, product_id, version, release_date, remark, created_at, created_by";

fn software_from_row(row: &Row<'_>) -> rusqlite::Result<SoftwareVersion> {
    Ok(SoftwareVersion {
        id: row.get(0)?,
        product_id: row.get(1)?,
        version: row.get(2)?,
        release_date: row.get(3)?,
        remark: row.get(4)?,
        created_at: row.get(5)?,
        created_by: row.get(6)?,
    })
}

fn firmware_from_row(row: &Row<'_>) -> rusqlite::Result<FirmwareVersion> {
    Ok(FirmwareVersion {
        id: row.get(0)?,
        product_id: row.get(1)?,
        version: row.get(2)?,
        release_date: row.get(3)?,
        remark: row.get(4)?,
        created_at: row.get(5)?,
        created_by: row.get(6)?,
    })
}

pub fn get_software(conn: &Connection, id: i64) -> StoreResult<SoftwareVersion> {
    conn.query_row(
        &format!("SELECT {SW_COLUMNS} FROM software_versions WHERE id = ?1"),
        params![id],
        software_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("software version"))
}

pub fn get_firmware(conn: &Connection, id: i64) -> StoreResult<FirmwareVersion> {
    conn.query_row(
        &format!("SELECT {SW_COLUMNS} FROM firmware_versions WHERE id = ?1"),
        params![id],
        firmware_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("firmware version"))
}

pub fn insert_software(
    conn: &Connection,
    product_id: i64,
    version: &str,
    release_date: DateTime<Utc>,
    remark: &str,
    actor_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<SoftwareVersion> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM software_versions WHERE product_id = ?1 AND version = ?2",
        params![product_id, version],
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(StoreError::Conflict(Conflict::SoftwareVersion));
    }

    conn.execute(
        "INSERT INTO software_versions (product_id, version, release_date, remark, created_at, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![product_id, version, release_date, remark, now, actor_id],
    )?;
    get_software(conn, conn.last_insert_rowid())
}

pub fn insert_firmware(
    conn: &Connection,
    product_id: i64,
    version: &str,
    release_date: DateTime<Utc>,
    remark: &str,
    actor_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<FirmwareVersion> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM firmware_versions WHERE product_id = ?1 AND version = ?2",
        params![product_id, version],
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(StoreError::Conflict(Conflict::FirmwareVersion));
    }

    conn.execute(
        "INSERT INTO firmware_versions (product_id, version, release_date, remark, created_at, created_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![product_id, version, release_date, remark, now, actor_id],
    )?;
    get_firmware(conn, conn.last_insert_rowid())
}

/// Deletes a software version and both of its association sets.
pub fn delete_software(conn: &Connection, id: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM software_version_features WHERE software_version_id = ?1",
        params![id],
    )?;
    conn.execute(
        "DELETE FROM software_firmware_links WHERE software_version_id = ?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM software_versions WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("software version"));
    }
    Ok(())
}

/// Deletes a firmware version and its software links.
pub fn delete_firmware(conn: &Connection, id: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM software_firmware_links WHERE firmware_version_id = ?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM firmware_versions WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("firmware version"));
    }
    Ok(())
}

/// Replace-all update of the features a software version supports.
pub fn replace_software_features(
    conn: &Connection,
    software_version_id: i64,
    product_id: i64,
    feature_ids: &[i64],
) -> StoreResult<Vec<ProductFeature>> {
    conn.execute(
        "DELETE FROM software_version_features WHERE software_version_id = ?1",
        params![software_version_id],
    )?;

    let matched = features::get_in_product(conn, feature_ids, product_id)?;
    for feature in &matched {
        conn.execute(
            "INSERT INTO software_version_features (software_version_id, feature_id) VALUES (?1, ?2)",
            params![software_version_id, feature.id],
        )?;
    }
    Ok(matched)
}

/// Replace-all update of the firmware versions a software version pairs
/// with. Firmware ids from other products are dropped.
pub fn replace_software_firmware(
    conn: &Connection,
    software_version_id: i64,
    product_id: i64,
    firmware_ids: &[i64],
) -> StoreResult<Vec<FirmwareVersion>> {
    conn.execute(
        "DELETE FROM software_firmware_links WHERE software_version_id = ?1",
        params![software_version_id],
    )?;

    let mut linked = Vec::new();
    for id in firmware_ids {
        let fw = match get_firmware(conn, *id) {
            Ok(fw) if fw.product_id == product_id => fw,
            Ok(_) => continue,
            Err(StoreError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        conn.execute(
            "INSERT INTO software_firmware_links (software_version_id, firmware_version_id) VALUES (?1, ?2)",
            params![software_version_id, fw.id],
        )?;
        linked.push(fw);
    }
    Ok(linked)
}

pub fn software_features(conn: &Connection, software_version_id: i64) -> StoreResult<Vec<ProductFeature>> {
    let mut stmt = conn.prepare(
        "SELECT f.id, f.product_id, f.feature_name, f.feature_code, f.created_at, f.updated_at
         FROM product_features f
         JOIN software_version_features svf ON svf.feature_id = f.id
         WHERE svf.software_version_id = ?1
         ORDER BY f.id",
    )?;
    let rows = stmt.query_map(params![software_version_id], features::from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn list_software(conn: &Connection, product_id: i64, page: Page) -> StoreResult<PageResult<SoftwareVersion>> {
    let page = page.normalized();
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM software_versions WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {SW_COLUMNS} FROM software_versions WHERE product_id = ?1
         ORDER BY release_date DESC, id DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![product_id, page.limit(), page.offset()], software_from_row)?;
    Ok(PageResult::new(total, page, rows.collect::<rusqlite::Result<Vec<_>>>()?))
}

pub fn list_firmware(conn: &Connection, product_id: i64, page: Page) -> StoreResult<PageResult<FirmwareVersion>> {
    let page = page.normalized();
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM firmware_versions WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {SW_COLUMNS} FROM firmware_versions WHERE product_id = ?1
         ORDER BY release_date DESC, id DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![product_id, page.limit(), page.offset()], firmware_from_row)?;
    Ok(PageResult::new(total, page, rows.collect::<rusqlite::Result<Vec<_>>>()?))
}
