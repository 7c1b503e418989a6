//! Append-only audit ledger.
//!
//! Every mutating operation writes exactly one ledger row through
//! [`record`], on the same connection and inside the same transaction as
//! the mutation itself. If the ledger write fails the transaction is
//! rolled back: an unaudited mutation never commits.
//!
//! Entries are never updated or deleted; [`list`] is the only read path.

use activault_types::{AuditAction, AuditLogEntry, AuditModule, Page, PageResult, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

mod error;

pub use error::{AuditError, AuditResult};

/// One ledger entry to be recorded, before serialization.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub operator_id: UserId,
    pub module: AuditModule,
    pub action: AuditAction,
    pub product_id: Option<i64>,
    /// Free-form snapshot of the mutated state; shape is per
    /// module+action convention.
    pub details: serde_json::Value,
    pub ip: Option<String>,
}

/// Filter for ledger queries. All fields optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub module: Option<AuditModule>,
    pub action: Option<AuditAction>,
    pub operator_id: Option<UserId>,
    pub product_id: Option<i64>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: row.get(0)?,
        operator_id: row.get(1)?,
        module: row.get(2)?,
        action: row.get(3)?,
        product_id: row.get(4)?,
        details: row.get(5)?,
        ip: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const COLUMNS: &str = "id, operator_id, module, action, product_id, details, ip, created_at";

/// Appends one ledger row on the caller's connection.
///
/// Called inside the mutation's transaction so the entry commits and
/// rolls back together with the change it describes.
pub fn record(conn: &Connection, entry: &AuditRecord, now: DateTime<Utc>) -> AuditResult<()> {
    let details = serde_json::to_string(&entry.details)?;
    conn.execute(
        "INSERT INTO audit_logs (operator_id, module, action, product_id, details, ip, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.operator_id,
            entry.module.as_str(),
            entry.action.as_str(),
            entry.product_id,
            details,
            entry.ip.as_deref().unwrap_or(""),
            now,
        ],
    )?;
    tracing::debug!(
        operator = entry.operator_id,
        module = entry.module.as_str(),
        action = entry.action.as_str(),
        "audit entry recorded"
    );
    Ok(())
}

/// Queries the ledger, newest first.
pub fn list(
    conn: &Connection,
    filter: &AuditFilter,
    page: Page,
) -> AuditResult<PageResult<AuditLogEntry>> {
    let page = page.normalized();
    let module = filter.module.map(|m| m.as_str());
    let action = filter.action.map(|a| a.as_str());

    let clause = "WHERE (?1 IS NULL OR created_at >= ?1)
           AND (?2 IS NULL OR created_at <= ?2)
           AND (?3 IS NULL OR module = ?3)
           AND (?4 IS NULL OR action = ?4)
           AND (?5 IS NULL OR operator_id = ?5)
           AND (?6 IS NULL OR product_id = ?6)";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM audit_logs {clause}"),
        params![
            filter.start,
            filter.end,
            module,
            action,
            filter.operator_id,
            filter.product_id
        ],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM audit_logs {clause}
         ORDER BY created_at DESC, id DESC LIMIT ?7 OFFSET ?8"
    ))?;
    let rows = stmt.query_map(
        params![
            filter.start,
            filter.end,
            module,
            action,
            filter.operator_id,
            filter.product_id,
            page.limit(),
            page.offset()
        ],
        from_row,
    )?;
    let list = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(PageResult::new(total, page, list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use activault_store::Store;
    use serde_json::json;

    fn entry(operator: UserId, module: AuditModule, action: AuditAction) -> AuditRecord {
        AuditRecord {
            operator_id: operator,
            module,
            action,
            product_id: Some(1),
            details: json!({"name": "Gateway"}),
            ip: Some("10.0.0.1".into()),
        }
    }

    #[test]
    fn record_then_list_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();

        record(&conn, &entry(1, AuditModule::Product, AuditAction::Create), now).unwrap();

        let page = list(&conn, &AuditFilter::default(), Page::default()).unwrap();
        assert_eq!(page.total, 1);
        let row = &page.list[0];
        assert_eq!(row.operator_id, 1);
        assert_eq!(row.module, "product");
        assert_eq!(row.action, "create");
        assert_eq!(row.product_id, Some(1));
        assert_eq!(row.ip, "10.0.0.1");

        let details: serde_json::Value = serde_json::from_str(&row.details).unwrap();
        assert_eq!(details["name"], "Gateway");
    }

    #[test]
    fn filters_narrow_by_module_action_and_operator() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        let now = Utc::now();

        record(&conn, &entry(1, AuditModule::Product, AuditAction::Create), now).unwrap();
        record(&conn, &entry(1, AuditModule::Device, AuditAction::Delete), now).unwrap();
        record(&conn, &entry(2, AuditModule::Device, AuditAction::Create), now).unwrap();

        let by_module = list(
            &conn,
            &AuditFilter {
                module: Some(AuditModule::Device),
                ..Default::default()
            },
            Page::default(),
        )
        .unwrap();
        assert_eq!(by_module.total, 2);

        let by_both = list(
            &conn,
            &AuditFilter {
                module: Some(AuditModule::Device),
                action: Some(AuditAction::Create),
                operator_id: Some(2),
                ..Default::default()
            },
            Page::default(),
        )
        .unwrap();
        assert_eq!(by_both.total, 1);
    }

    #[test]
    fn time_window_bounds_are_inclusive() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock().unwrap();

        let early = Utc::now() - chrono::Duration::hours(2);
        let late = Utc::now();
        record(&conn, &entry(1, AuditModule::Product, AuditAction::Create), early).unwrap();
        record(&conn, &entry(1, AuditModule::Product, AuditAction::Update), late).unwrap();

        let windowed = list(
            &conn,
            &AuditFilter {
                start: Some(late - chrono::Duration::minutes(5)),
                ..Default::default()
            },
            Page::default(),
        )
        .unwrap();
        assert_eq!(windowed.total, 1);
        assert_eq!(windowed.list[0].action, "update");
    }

    #[test]
    fn newest_entries_come_first() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock().unwrap();

        let t0 = Utc::now() - chrono::Duration::minutes(1);
        let t1 = Utc::now();
        record(&conn, &entry(1, AuditModule::Product, AuditAction::Create), t0).unwrap();
        record(&conn, &entry(1, AuditModule::Product, AuditAction::Update), t1).unwrap();

        let page = list(&conn, &AuditFilter::default(), Page::default()).unwrap();
        assert_eq!(page.list[0].action, "update");
        assert_eq!(page.list[1].action, "create");
    }
}
