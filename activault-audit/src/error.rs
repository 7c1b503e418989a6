use thiserror::Error;

pub type AuditResult<T> = Result<T, AuditError>;

/// Errors from the audit ledger. A failed `record` inside a mutation
/// transaction must abort the whole transaction; callers surface this
/// distinctly from ordinary storage errors.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to serialize audit details: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to write audit ledger: {0}")]
    Sqlite(#[from] rusqlite::Error),
}
