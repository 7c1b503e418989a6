//! RSA PKCS#1 v1.5 signing over a SHA-256 digest.
//!
//! The server holds one process-lifetime private key, loaded from a PEM
//! file at startup and never transmitted. Verification lives here too so
//! the issuing side can prove its own artifacts in tests and tooling.

use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};

/// The server-held RSA private key.
pub struct SigningKey(RsaPrivateKey);

/// The matching RSA public key, distributed to verifiers.
#[derive(Clone)]
pub struct VerifyingKey(RsaPublicKey);

impl SigningKey {
    /// Parses a private key from PEM text. Accepts both PKCS#8
    /// (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`).
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map(Self)
            .map_err(|e| CryptoError::KeyLoad(format!("invalid RSA private key PEM: {e}")))
    }

    /// Loads the key from a PEM file. A missing or unreadable key is a
    /// fatal configuration error at startup.
    pub fn from_pem_file(path: &Path) -> CryptoResult<Self> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            CryptoError::KeyLoad(format!("read {}: {e}", path.display()))
        })?;
        Self::from_pem(&pem)
    }

    /// Wraps an already-constructed key (tests generate one directly).
    pub fn from_key(key: RsaPrivateKey) -> Self {
        Self(key)
    }

    /// Signs `message`: SHA-256 digest, then PKCS#1 v1.5 padding.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<Vec<u8>> {
        let digest = Sha256::digest(message);
        self.0
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))
    }

    /// The public half of this key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(RsaPublicKey::from(&self.0))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

impl VerifyingKey {
    /// Verifies a PKCS#1 v1.5 signature over the SHA-256 digest of
    /// `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
        let digest = Sha256::digest(message);
        self.0
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
            .map_err(|_| CryptoError::SignatureInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> SigningKey {
        let mut rng = rand::thread_rng();
        SigningKey::from_key(RsaPrivateKey::new(&mut rng, 2048).unwrap())
    }

    #[test]
    fn sign_verify_roundtrip() {
        let key = test_key();
        let sig = key.sign(b"snapshot bytes").unwrap();
        assert!(key.verifying_key().verify(b"snapshot bytes", &sig).is_ok());
    }

    #[test]
    fn wrong_message_fails() {
        let key = test_key();
        let sig = key.sign(b"correct").unwrap();
        assert!(matches!(
            key.verifying_key().verify(b"wrong", &sig),
            Err(CryptoError::SignatureInvalid)
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let a = test_key();
        let b = test_key();
        let sig = a.sign(b"message").unwrap();
        assert!(b.verifying_key().verify(b"message", &sig).is_err());
    }

    #[test]
    fn load_from_pem_file() {
        use rsa::pkcs8::{EncodePrivateKey, LineEnding};

        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap();
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.pem");
        std::fs::write(&path, pem.as_bytes()).unwrap();

        let loaded = SigningKey::from_pem_file(&path).unwrap();
        let sig = loaded.sign(b"x").unwrap();
        assert!(loaded.verifying_key().verify(b"x", &sig).is_ok());
    }

    #[test]
    fn missing_key_file_is_key_load_error() {
        assert!(matches!(
            SigningKey::from_pem_file(Path::new("/nonexistent/server.pem")),
            Err(CryptoError::KeyLoad(_))
        ));
    }

    #[test]
    fn garbage_pem_rejected() {
        assert!(matches!(
            SigningKey::from_pem("not a key"),
            Err(CryptoError::KeyLoad(_))
        ));
    }
}
