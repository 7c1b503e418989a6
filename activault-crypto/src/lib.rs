//! Cryptographic primitives for activation artifacts.
//!
//! Two building blocks, composed by the artifact pipeline:
//! - [`cipher`]: AES-256-GCM authenticated encryption with the nonce
//!   prepended to the ciphertext (`nonce ‖ ciphertext ‖ tag`).
//! - [`signer`]: RSA PKCS#1 v1.5 signatures over a SHA-256 digest, with
//!   the private key loaded once at startup from a PEM file.

pub mod cipher;
mod error;
pub mod signer;

pub use cipher::{ArtifactKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use signer::{SigningKey, VerifyingKey};
