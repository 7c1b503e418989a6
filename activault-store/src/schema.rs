//! Relational schema, applied on open.
//!
//! Uniqueness the services check explicitly is also declared here as
//! UNIQUE constraints, so the storage engine is the authoritative
//! backstop for the check-then-insert window.

use rusqlite::Connection;

use crate::error::StoreResult;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    code          TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL UNIQUE,
    product_type  TEXT NOT NULL DEFAULT 'default',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS product_managers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id    INTEGER NOT NULL REFERENCES products(id),
    user_id       INTEGER NOT NULL,
    role          TEXT NOT NULL CHECK (role IN ('main', 'assistant')),
    permission    TEXT NOT NULL DEFAULT 'read' CHECK (permission IN ('read', 'full')),
    remark        TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (product_id, user_id)
);

CREATE TABLE IF NOT EXISTS license_types (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id    INTEGER NOT NULL REFERENCES products(id),
    type_name     TEXT NOT NULL,
    license_code  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (product_id, type_name),
    UNIQUE (product_id, license_code)
);

CREATE TABLE IF NOT EXISTS product_features (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id    INTEGER NOT NULL REFERENCES products(id),
    feature_name  TEXT NOT NULL,
    feature_code  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (product_id, feature_name),
    UNIQUE (product_id, feature_code)
);

CREATE TABLE IF NOT EXISTS license_type_features (
    license_type_id  INTEGER NOT NULL REFERENCES license_types(id),
    feature_id       INTEGER NOT NULL REFERENCES product_features(id),
    PRIMARY KEY (license_type_id, feature_id)
);

CREATE TABLE IF NOT EXISTS devices (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    sn               TEXT NOT NULL UNIQUE,
    product_id       INTEGER NOT NULL REFERENCES products(id),
    license_type_id  INTEGER NOT NULL REFERENCES license_types(id),
    oem_tag          TEXT NOT NULL DEFAULT '',
    remark           TEXT NOT NULL DEFAULT '',
    created_at       TEXT NOT NULL,
    created_by       INTEGER NOT NULL,
    updated_at       TEXT NOT NULL,
    updated_by       INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_devices_product ON devices (product_id);
CREATE INDEX IF NOT EXISTS idx_devices_license_type ON devices (license_type_id);

CREATE TABLE IF NOT EXISTS software_versions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id    INTEGER NOT NULL REFERENCES products(id),
    version       TEXT NOT NULL,
    release_date  TEXT NOT NULL,
    remark        TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    created_by    INTEGER NOT NULL,
    UNIQUE (product_id, version)
);

CREATE TABLE IF NOT EXISTS firmware_versions (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id    INTEGER NOT NULL REFERENCES products(id),
    version       TEXT NOT NULL,
    release_date  TEXT NOT NULL,
    remark        TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    created_by    INTEGER NOT NULL,
    UNIQUE (product_id, version)
);

CREATE TABLE IF NOT EXISTS software_version_features (
    software_version_id  INTEGER NOT NULL REFERENCES software_versions(id),
    feature_id           INTEGER NOT NULL REFERENCES product_features(id),
    PRIMARY KEY (software_version_id, feature_id)
);

CREATE TABLE IF NOT EXISTS software_firmware_links (
    software_version_id  INTEGER NOT NULL REFERENCES software_versions(id),
    firmware_version_id  INTEGER NOT NULL REFERENCES firmware_versions(id),
    PRIMARY KEY (software_version_id, firmware_version_id)
);

-- Append-only. product_id carries no foreign key on purpose: ledger
-- entries must outlive the products they describe.
CREATE TABLE IF NOT EXISTS audit_logs (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    operator_id   INTEGER NOT NULL,
    module        TEXT NOT NULL,
    action        TEXT NOT NULL,
    product_id    INTEGER,
    details       TEXT NOT NULL DEFAULT '',
    ip            TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_logs_created_at ON audit_logs (created_at);
CREATE INDEX IF NOT EXISTS idx_audit_logs_product ON audit_logs (product_id);
";

/// Creates all tables and indexes if they do not exist yet.
pub fn init(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
