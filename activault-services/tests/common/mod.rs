//! Shared fixtures for service tests.

use std::sync::OnceLock;

use activault_artifact::ArtifactIssuer;
use activault_crypto::{ArtifactKey, SigningKey, VerifyingKey};
use activault_services::Services;
use activault_store::Store;
use activault_types::{Actor, SUPER_ADMIN_ID};
use rsa::RsaPrivateKey;

pub const TEST_ARTIFACT_KEY: [u8; 32] = [42u8; 32];

/// One RSA key for the whole test binary; keygen is the slow part.
fn test_rsa() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("rsa keygen"))
}

pub fn services() -> Services {
    let store = Store::open_in_memory().expect("in-memory store");
    let issuer = ArtifactIssuer::new(
        SigningKey::from_key(test_rsa().clone()),
        ArtifactKey::from_bytes(TEST_ARTIFACT_KEY),
    );
    Services::new(store, issuer)
}

#[allow(dead_code)]
pub fn verifying_key() -> VerifyingKey {
    SigningKey::from_key(test_rsa().clone()).verifying_key()
}

pub fn admin() -> Actor {
    Actor::new(SUPER_ADMIN_ID)
}
