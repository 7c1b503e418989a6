//! Product manager queries, including the linked two-row main transfer.

use activault_types::{ManagerPermission, ManagerRole, ProductManager, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Conflict, StoreError, StoreResult};

const COLUMNS: &str = "id, product_id, user_id, role, permission, remark, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<ProductManager> {
    let role: String = row.get(3)?;
    let permission: String = row.get(4)?;
    Ok(ProductManager {
        id: row.get(0)?,
        product_id: row.get(1)?,
        user_id: row.get(2)?,
        role: ManagerRole::parse(&role).unwrap_or(ManagerRole::Assistant),
        permission: ManagerPermission::parse(&permission).unwrap_or_default(),
        remark: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn get_by_id(conn: &Connection, id: i64) -> StoreResult<ProductManager> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM product_managers WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("manager"))
}

/// The manager record binding `user_id` to `product_id`, if any. This is
/// the lookup the authorization matrix decides on.
pub fn get(conn: &Connection, product_id: i64, user_id: UserId) -> StoreResult<Option<ProductManager>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM product_managers WHERE product_id = ?1 AND user_id = ?2"),
            params![product_id, user_id],
            from_row,
        )
        .optional()?)
}

pub fn main_manager(conn: &Connection, product_id: i64) -> StoreResult<ProductManager> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM product_managers WHERE product_id = ?1 AND role = 'main'"),
        params![product_id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("main manager"))
}

pub fn list(conn: &Connection, product_id: i64) -> StoreResult<Vec<ProductManager>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM product_managers WHERE product_id = ?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![product_id], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn insert(
    conn: &Connection,
    product_id: i64,
    user_id: UserId,
    role: ManagerRole,
    permission: ManagerPermission,
    remark: &str,
    now: DateTime<Utc>,
) -> StoreResult<ProductManager> {
    if get(conn, product_id, user_id)?.is_some() {
        return Err(StoreError::Conflict(Conflict::ManagerExists));
    }
    conn.execute(
        "INSERT INTO product_managers (product_id, user_id, role, permission, remark, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![product_id, user_id, role.as_str(), permission.as_str(), remark, now],
    )?;
    get_by_id(conn, conn.last_insert_rowid())
}

/// Updates an assistant's stored permission and/or remark.
pub fn update_assistant(
    conn: &Connection,
    id: i64,
    permission: Option<ManagerPermission>,
    remark: Option<&str>,
    now: DateTime<Utc>,
) -> StoreResult<ProductManager> {
    if let Some(permission) = permission {
        conn.execute(
            "UPDATE product_managers SET permission = ?1, updated_at = ?2 WHERE id = ?3",
            params![permission.as_str(), now, id],
        )?;
    }
    if let Some(remark) = remark {
        conn.execute(
            "UPDATE product_managers SET remark = ?1, updated_at = ?2 WHERE id = ?3",
            params![remark, now, id],
        )?;
    }
    get_by_id(conn, id)
}

/// Transfers the main role: demotes the current main to assistant with
/// the default (read) permission, promotes `new_user_id` to main with
/// full permission and a cleared remark. Both rows change inside the
/// caller's transaction; the single-main invariant holds at commit.
pub fn transfer_main(
    conn: &Connection,
    product_id: i64,
    new_user_id: UserId,
    now: DateTime<Utc>,
) -> StoreResult<(ProductManager, ProductManager)> {
    let current = main_manager(conn, product_id)?;
    let target =
        get(conn, product_id, new_user_id)?.ok_or(StoreError::NotFound("manager"))?;

    if current.user_id == target.user_id {
        return Ok((current.clone(), current));
    }

    conn.execute(
        "UPDATE product_managers SET role = 'assistant', permission = ?1, updated_at = ?2 WHERE id = ?3",
        params![ManagerPermission::default().as_str(), now, current.id],
    )?;
    conn.execute(
        "UPDATE product_managers SET role = 'main', permission = 'full', remark = '', updated_at = ?1 WHERE id = ?2",
        params![now, target.id],
    )?;

    Ok((get_by_id(conn, current.id)?, get_by_id(conn, target.id)?))
}

/// Removes a manager row. Refusing to remove the main manager is the
/// service layer's rule, not enforced here.
pub fn delete(conn: &Connection, id: i64) -> StoreResult<()> {
    let n = conn.execute("DELETE FROM product_managers WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("manager"));
    }
    Ok(())
}
