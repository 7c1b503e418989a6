//! Product queries.

use activault_types::{Page, PageResult, Product, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Conflict, StoreError, StoreResult};

fn from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        product_type: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

const COLUMNS: &str = "id, code, name, product_type, created_at, updated_at";

pub fn get(conn: &Connection, id: i64) -> StoreResult<Product> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("product"))
}

pub fn exists(conn: &Connection, id: i64) -> StoreResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// Inserts a product. Code and name are checked independently so the
/// caller can tell which one collided.
pub fn insert(
    conn: &Connection,
    code: &str,
    name: &str,
    product_type: &str,
    now: DateTime<Utc>,
) -> StoreResult<Product> {
    let code_taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE code = ?1",
        params![code],
        |row| row.get(0),
    )?;
    if code_taken > 0 {
        return Err(StoreError::Conflict(Conflict::ProductCode));
    }

    let name_taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM products WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    if name_taken > 0 {
        return Err(StoreError::Conflict(Conflict::ProductName));
    }

    conn.execute(
        "INSERT INTO products (code, name, product_type, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![code, name, product_type, now],
    )?;
    get(conn, conn.last_insert_rowid())
}

/// Updates name and/or type. A `None` field is left untouched.
pub fn update(
    conn: &Connection,
    id: i64,
    name: Option<&str>,
    product_type: Option<&str>,
    now: DateTime<Utc>,
) -> StoreResult<Product> {
    let current = get(conn, id)?;

    if let Some(name) = name {
        if name != current.name {
            let taken: i64 = conn.query_row(
                "SELECT COUNT(*) FROM products WHERE name = ?1 AND id <> ?2",
                params![name, id],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Err(StoreError::Conflict(Conflict::ProductName));
            }
            conn.execute(
                "UPDATE products SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, now, id],
            )?;
        }
    }

    if let Some(product_type) = product_type {
        if product_type != current.product_type {
            conn.execute(
                "UPDATE products SET product_type = ?1, updated_at = ?2 WHERE id = ?3",
                params![product_type, now, id],
            )?;
        }
    }

    get(conn, id)
}

/// True while any license type, feature, software version or firmware
/// version still references the product. Such a product must not be
/// deleted.
pub fn has_relations(conn: &Connection, id: i64) -> StoreResult<bool> {
    let n: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM license_types WHERE product_id = ?1)
              + (SELECT COUNT(*) FROM product_features WHERE product_id = ?1)
              + (SELECT COUNT(*) FROM software_versions WHERE product_id = ?1)
              + (SELECT COUNT(*) FROM firmware_versions WHERE product_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// Removes the product and its manager rows. Relation checks are the
/// caller's responsibility (see [`has_relations`]).
pub fn delete(conn: &Connection, id: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM product_managers WHERE product_id = ?1",
        params![id],
    )?;
    let n = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    if n == 0 {
        return Err(StoreError::NotFound("product"));
    }
    Ok(())
}

/// Lists products visible to a manager (`Some(user_id)`) or all products
/// (`None`, super-admin), optionally filtered by a substring of code,
/// name or type.
pub fn list_visible(
    conn: &Connection,
    manager: Option<UserId>,
    search: Option<&str>,
    page: Page,
) -> StoreResult<PageResult<Product>> {
    let page = page.normalized();
    let pattern = search.map(|s| format!("%{s}%"));

    let (filter, count_sql, list_sql);
    match manager {
        Some(_) => {
            filter = "JOIN product_managers pm ON pm.product_id = p.id AND pm.user_id = ?1 \
                      WHERE (?2 IS NULL OR p.code LIKE ?2 OR p.name LIKE ?2 OR p.product_type LIKE ?2)";
            count_sql = format!("SELECT COUNT(*) FROM products p {filter}");
            list_sql = format!(
                "SELECT p.id, p.code, p.name, p.product_type, p.created_at, p.updated_at
                 FROM products p {filter} ORDER BY p.id LIMIT ?3 OFFSET ?4"
            );
        }
        None => {
            filter = "WHERE (?2 IS NULL OR p.code LIKE ?2 OR p.name LIKE ?2 OR p.product_type LIKE ?2)";
            count_sql = format!("SELECT COUNT(*) FROM products p {filter}");
            list_sql = format!(
                "SELECT p.id, p.code, p.name, p.product_type, p.created_at, p.updated_at
                 FROM products p {filter} ORDER BY p.id LIMIT ?3 OFFSET ?4"
            );
        }
    }

    // ?1 is unused in the super-admin branch but kept so both branches
    // bind the same parameter list.
    let user_param = manager.unwrap_or(0);
    let total: i64 = conn.query_row(&count_sql, params![user_param, pattern], |row| row.get(0))?;

    let mut stmt = conn.prepare(&list_sql)?;
    let rows = stmt.query_map(
        params![user_param, pattern, page.limit(), page.offset()],
        from_row,
    )?;
    let list = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(PageResult::new(total, page, list))
}
