//! Assembly of an activation artifact from a stored device.
//!
//! The pipeline is snapshot, sign, seal: the device's entitlement state
//! is serialized to JSON, the JSON is signed (SHA-256 + RSA PKCS#1
//! v1.5), the signed envelope is serialized again and encrypted with
//! AES-256-GCM. The resulting bytes are what a device receives.

use activault_crypto::{cipher, ArtifactKey, SigningKey, VerifyingKey};
use activault_store::{devices, license_types};
use activault_types::Device;
use chrono::Utc;
use rusqlite::Connection;

use crate::error::ArtifactResult;
use crate::snapshot::{ActivationData, ActivationFile};

/// File extension of issued artifacts.
pub const ARTIFACT_EXTENSION: &str = "lic";

/// A finished artifact, ready to hand to the device.
#[derive(Debug, Clone)]
pub struct IssuedArtifact {
    /// Download name, derived from the serial number.
    pub filename: String,
    /// Encrypted artifact bytes.
    pub bytes: Vec<u8>,
}

/// Issues activation artifacts. Holds the process-lifetime signing key
/// and the shared artifact encryption key.
pub struct ArtifactIssuer {
    signing_key: SigningKey,
    artifact_key: ArtifactKey,
}

impl ArtifactIssuer {
    pub fn new(signing_key: SigningKey, artifact_key: ArtifactKey) -> Self {
        Self {
            signing_key,
            artifact_key,
        }
    }

    /// Issues an artifact for the device with serial number `sn`,
    /// snapshotting its current license type and feature grants.
    pub fn issue(&self, conn: &Connection, sn: &str) -> ArtifactResult<IssuedArtifact> {
        let device = devices::get_by_sn(conn, sn)?;
        let codes = license_types::feature_codes(conn, device.license_type_id)?;
        let bytes = self.build(&device, codes)?;
        tracing::info!(sn, product_id = device.product_id, "activation artifact issued");
        Ok(IssuedArtifact {
            filename: suggested_filename(sn),
            bytes,
        })
    }

    /// Builds the encrypted artifact bytes for a device snapshot,
    /// stamped with the current time.
    pub fn build(&self, device: &Device, feature_codes: Vec<String>) -> ArtifactResult<Vec<u8>> {
        let data = ActivationData::from_device(device, feature_codes, Utc::now());
        let payload = serde_json::to_vec(&data)?;
        let signature = self.signing_key.sign(&payload)?;

        let envelope = ActivationFile { data, signature };
        let plaintext = serde_json::to_vec(&envelope)?;
        Ok(cipher::seal(&self.artifact_key, &plaintext)?)
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

/// The download filename for a serial number.
#[must_use]
pub fn suggested_filename(sn: &str) -> String {
    format!("{sn}.{ARTIFACT_EXTENSION}")
}

/// Decrypts an artifact and checks its signature, returning the
/// envelope. This is the device side of the pipeline, used here by
/// tests and key rollover tooling.
pub fn open_artifact(
    verifying_key: &VerifyingKey,
    artifact_key: &ArtifactKey,
    bytes: &[u8],
) -> ArtifactResult<ActivationFile> {
    let plaintext = cipher::open(artifact_key, bytes)?;
    let envelope: ActivationFile = serde_json::from_slice(&plaintext)?;

    let payload = serde_json::to_vec(&envelope.data)?;
    verifying_key.verify(&payload, &envelope.signature)?;
    Ok(envelope)
}
