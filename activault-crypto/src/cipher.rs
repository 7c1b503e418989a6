//! Artifact encryption using AES-256-GCM.
//!
//! Output layout is `nonce ‖ ciphertext ‖ tag`: the 12-byte nonce is
//! prepended so a verifier needs nothing beyond the shared key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};

/// Size of the symmetric key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits for GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// The shared symmetric key protecting activation artifacts.
///
/// Provisioned from configuration (base64), never embedded in source.
#[derive(Clone)]
pub struct ArtifactKey([u8; KEY_SIZE]);

impl ArtifactKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Decodes a key from its base64 configuration form.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CryptoError::KeyLoad(format!("invalid base64 key: {e}")))?;
        let arr: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|v: Vec<u8>| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: v.len(),
                })?;
        Ok(Self(arr))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("ArtifactKey(..)")
    }
}

/// Encrypts plaintext, returning `nonce ‖ ciphertext ‖ tag` with a fresh
/// random nonce per call.
pub fn seal(key: &ArtifactKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Splits off the leading nonce and decrypts the remainder. Fails on a
/// bad tag, truncated input, or the wrong key.
pub fn open(key: &ArtifactKey, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Decryption("data too short".to_string()));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        CryptoError::Decryption("decryption failed (wrong key or tampered data)".to_string())
    })
}
