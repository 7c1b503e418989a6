use thiserror::Error;

pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Errors from the artifact pipeline.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Store(#[from] activault_store::StoreError),

    #[error(transparent)]
    Crypto(#[from] activault_crypto::CryptoError),

    #[error("failed to serialize activation data: {0}")]
    Serialization(#[from] serde_json::Error),
}
