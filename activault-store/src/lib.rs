//! SQLite entitlement store for Activault.
//!
//! Persistent relations for products, license types, features, devices,
//! managers, release versions and the audit ledger. Query functions take
//! a plain `&Connection` so callers can run them standalone or inside a
//! transaction they control; [`Store`] owns the single write connection
//! behind a mutex, leaving concurrency control to SQLite itself.
//!
//! Uniqueness is pre-checked for precise error kinds and backed by
//! UNIQUE constraints in the schema.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

pub mod devices;
mod error;
pub mod features;
pub mod license_types;
pub mod managers;
pub mod products;
mod schema;
pub mod versions;

pub use error::{Conflict, StoreError, StoreResult};

/// The entitlement store: one SQLite connection behind a mutex.
///
/// Every mutation runs inside exactly one transaction on this
/// connection; concurrent callers serialize on the mutex.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens a file-backed store, creating the schema if needed.
    pub fn open(path: &Path) -> StoreResult<Self> {
        tracing::debug!(path = %path.display(), "opening entitlement store");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// Opens an in-memory store (tests).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Exclusive access to the connection. Callers open transactions on
    /// the guard; dropping an uncommitted transaction rolls it back.
    pub fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
