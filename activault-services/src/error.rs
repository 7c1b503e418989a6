//! The error taxonomy callers see.
//!
//! Every operation fails with exactly one of these kinds; the kinds are
//! stable API, the messages are not. Internal detail (SQL text, key
//! material, row ids) stays in the logs.

use activault_artifact::ArtifactError;
use activault_audit::AuditError;
use activault_authz::AuthzError;
use activault_crypto::CryptoError;
use activault_store::{Conflict, StoreError};
use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The named entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(Conflict),

    /// The actor is not allowed to perform the operation.
    #[error("permission denied")]
    PermissionDenied,

    /// The request itself is malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Delete blocked because dependent records still exist.
    #[error("entity still has dependent records")]
    RelationsExist,

    /// The storage engine failed.
    #[error("storage failure: {0}")]
    StorageFailure(#[source] StoreError),

    /// The audit ledger write failed; the mutation was rolled back.
    #[error("audit ledger failure: {0}")]
    AuditFailure(#[source] AuditError),

    /// Signing or sealing failed while assembling an artifact.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(c) => Self::Conflict(c),
            StoreError::RelationsExist => Self::RelationsExist,
            other => Self::StorageFailure(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StorageFailure(StoreError::Sqlite(err))
    }
}

impl From<AuthzError> for ServiceError {
    fn from(_: AuthzError) -> Self {
        Self::PermissionDenied
    }
}

impl From<AuditError> for ServiceError {
    fn from(err: AuditError) -> Self {
        Self::AuditFailure(err)
    }
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        Self::CryptoFailure(err.to_string())
    }
}

impl From<ArtifactError> for ServiceError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Store(e) => e.into(),
            ArtifactError::Crypto(e) => e.into(),
            ArtifactError::Serialization(e) => Self::CryptoFailure(e.to_string()),
        }
    }
}
