//! Error types for the entitlement store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A uniqueness violation, one variant per constrained field so callers
/// can report exactly which value collided.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("product code already exists")]
    ProductCode,
    #[error("product name already exists")]
    ProductName,
    #[error("license type name already exists in this product")]
    LicenseTypeName,
    #[error("license code already exists in this product")]
    LicenseCode,
    #[error("feature name already exists in this product")]
    FeatureName,
    #[error("feature code already exists in this product")]
    FeatureCode,
    #[error("device sn already exists: {}", sns.join(", "))]
    DeviceSn { sns: Vec<String> },
    #[error("user is already a manager of this product")]
    ManagerExists,
    #[error("software version already exists for this product")]
    SoftwareVersion,
    #[error("firmware version already exists for this product")]
    FirmwareVersion,
}

/// Errors from the store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness check failed before the write.
    #[error("conflict: {0}")]
    Conflict(Conflict),

    /// Delete blocked because dependent records still reference the row.
    #[error("entity still has dependent records")]
    RelationsExist,

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Anything the storage engine itself reports.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
