//! Device queries: single and batch creation, license reassignment,
//! filtered listing.

use activault_types::{Device, Page, PageResult, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{Conflict, StoreError, StoreResult};
use crate::{license_types, products};

const COLUMNS: &str =
    "id, sn, product_id, license_type_id, oem_tag, remark, created_at, created_by, updated_at, updated_by";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        sn: row.get(1)?,
        product_id: row.get(2)?,
        license_type_id: row.get(3)?,
        oem_tag: row.get(4)?,
        remark: row.get(5)?,
        created_at: row.get(6)?,
        created_by: row.get(7)?,
        updated_at: row.get(8)?,
        updated_by: row.get(9)?,
    })
}

/// Fields of a device to be created.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub sn: String,
    pub product_id: i64,
    pub license_type_id: i64,
    pub oem_tag: String,
    pub remark: String,
}

/// Filter for device listings. All fields are optional and combined
/// with AND; `sn` and `oem_tag` match substrings.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub product_id: Option<i64>,
    pub license_type_id: Option<i64>,
    pub sn: Option<String>,
    pub oem_tag: Option<String>,
}

pub fn get(conn: &Connection, id: i64) -> StoreResult<Device> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM devices WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("device"))
}

/// Resolves a device by its serial number, the durable identity used by
/// the artifact pipeline.
pub fn get_by_sn(conn: &Connection, sn: &str) -> StoreResult<Device> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM devices WHERE sn = ?1"),
        params![sn],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("device"))
}

pub fn get_many(conn: &Connection, ids: &[i64]) -> StoreResult<Vec<Device>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {COLUMNS} FROM devices WHERE id IN ({placeholders}) ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter().copied()), from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// The subset of `sns` already present, across all products. Serial
/// numbers are globally unique, not merely per-product.
pub fn existing_sns(conn: &Connection, sns: &[String]) -> StoreResult<Vec<String>> {
    if sns.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; sns.len()].join(", ");
    let sql = format!("SELECT sn FROM devices WHERE sn IN ({placeholders}) ORDER BY sn");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(sns.iter()), |row| row.get(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn validate_refs(conn: &Connection, product_id: i64, license_type_id: i64) -> StoreResult<()> {
    if !products::exists(conn, product_id)? {
        return Err(StoreError::NotFound("product"));
    }
    if !license_types::exists_in_product(conn, license_type_id, product_id)? {
        return Err(StoreError::NotFound("license type"));
    }
    Ok(())
}

/// Inserts one device. The product must exist, the license type must
/// belong to it, and the sn must be globally unused; all three are
/// checked before any write.
pub fn insert(
    conn: &Connection,
    device: &NewDevice,
    actor_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<Device> {
    validate_refs(conn, device.product_id, device.license_type_id)?;

    let taken = existing_sns(conn, std::slice::from_ref(&device.sn))?;
    if !taken.is_empty() {
        return Err(StoreError::Conflict(Conflict::DeviceSn { sns: taken }));
    }

    conn.execute(
        "INSERT INTO devices (sn, product_id, license_type_id, oem_tag, remark,
                              created_at, created_by, updated_at, updated_by)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, ?7)",
        params![
            device.sn,
            device.product_id,
            device.license_type_id,
            device.oem_tag,
            device.remark,
            now,
            actor_id
        ],
    )?;
    get(conn, conn.last_insert_rowid())
}

/// Inserts a batch of serial numbers under one product and license
/// type, all-or-nothing: any pre-existing sn among the candidates
/// aborts the whole batch with zero inserts.
pub fn insert_batch(
    conn: &Connection,
    sns: &[String],
    product_id: i64,
    license_type_id: i64,
    oem_tag: &str,
    remark: &str,
    actor_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<Vec<Device>> {
    validate_refs(conn, product_id, license_type_id)?;

    let taken = existing_sns(conn, sns)?;
    if !taken.is_empty() {
        return Err(StoreError::Conflict(Conflict::DeviceSn { sns: taken }));
    }

    let mut created = Vec::with_capacity(sns.len());
    for sn in sns {
        conn.execute(
            "INSERT INTO devices (sn, product_id, license_type_id, oem_tag, remark,
                                  created_at, created_by, updated_at, updated_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, ?7)",
            params![sn, product_id, license_type_id, oem_tag, remark, now, actor_id],
        )?;
        created.push(get(conn, conn.last_insert_rowid())?);
    }
    Ok(created)
}

/// Reassigns license type, oem tag and remark. The target license type
/// must belong to the device's own product. Returns (old, new).
pub fn update(
    conn: &Connection,
    id: i64,
    license_type_id: i64,
    oem_tag: &str,
    remark: &str,
    actor_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<(Device, Device)> {
    let old = get(conn, id)?;
    if !license_types::exists_in_product(conn, license_type_id, old.product_id)? {
        return Err(StoreError::NotFound("license type"));
    }
    conn.execute(
        "UPDATE devices SET license_type_id = ?1, oem_tag = ?2, remark = ?3,
                            updated_at = ?4, updated_by = ?5
         WHERE id = ?6",
        params![license_type_id, oem_tag, remark, now, actor_id, id],
    )?;
    let new = get(conn, id)?;
    Ok((old, new))
}

/// Reassigns only the license type (and remark), used by the batch
/// reassignment path after its per-product validation.
pub fn set_license_type(
    conn: &Connection,
    id: i64,
    license_type_id: i64,
    remark: &str,
    actor_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<(Device, Device)> {
    let old = get(conn, id)?;
    conn.execute(
        "UPDATE devices SET license_type_id = ?1, remark = ?2, updated_at = ?3, updated_by = ?4
         WHERE id = ?5",
        params![license_type_id, remark, now, actor_id, id],
    )?;
    let new = get(conn, id)?;
    Ok((old, new))
}

pub fn delete(conn: &Connection, id: i64) -> StoreResult<()> {
    let n = conn.execute("DELETE FROM devices WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("device"));
    }
    Ok(())
}

pub fn list(conn: &Connection, filter: &DeviceFilter, page: Page) -> StoreResult<PageResult<Device>> {
    let page = page.normalized();
    let sn_pattern = filter.sn.as_ref().map(|s| format!("%{s}%"));
    let oem_pattern = filter.oem_tag.as_ref().map(|s| format!("%{s}%"));

    let clause = "WHERE (?1 IS NULL OR product_id = ?1)
           AND (?2 IS NULL OR license_type_id = ?2)
           AND (?3 IS NULL OR sn LIKE ?3)
           AND (?4 IS NULL OR oem_tag LIKE ?4)";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM devices {clause}"),
        params![filter.product_id, filter.license_type_id, sn_pattern, oem_pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM devices {clause}
         ORDER BY created_at DESC, id DESC LIMIT ?5 OFFSET ?6"
    ))?;
    let rows = stmt.query_map(
        params![
            filter.product_id,
            filter.license_type_id,
            sn_pattern,
            oem_pattern,
            page.limit(),
            page.offset()
        ],
        from_row,
    )?;
    let list = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(PageResult::new(total, page, list))
}

pub fn count_for_product(conn: &Connection, product_id: i64) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM devices WHERE product_id = ?1",
        params![product_id],
        |row| row.get(0),
    )?)
}

/// How many devices still hold the given license type. A license type
/// with devices must not be deleted.
pub fn count_for_license_type(conn: &Connection, license_type_id: i64) -> StoreResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM devices WHERE license_type_id = ?1",
        params![license_type_id],
        |row| row.get(0),
    )?)
}
