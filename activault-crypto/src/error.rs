//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from sealing, opening, signing or key loading. All of these
/// are non-retryable.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material could not be loaded or parsed.
    #[error("key load failed: {0}")]
    KeyLoad(String),

    /// Invalid symmetric key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Signature generation failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Signature did not verify.
    #[error("signature invalid")]
    SignatureInvalid,
}
