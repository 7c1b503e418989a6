//! The signed payload carried inside an activation artifact.
//!
//! Field names and declaration order are part of the wire format: the
//! signature covers the serialized JSON of [`ActivationData`], so any
//! reordering or renaming invalidates every artifact already issued.

use activault_types::Device;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The entitlement snapshot a device activates against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationData {
    pub sn: String,
    pub product_id: i64,
    /// The license type id at issue time.
    pub license_type: i64,
    pub oem_tag: String,
    /// Issue time, as epoch seconds. The one field that differs between
    /// repeated issues for the same device.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    /// Codes of the features granted by the license type, in stable
    /// (feature id) order.
    pub feature_codes: Vec<String>,
}

impl ActivationData {
    /// Snapshots a device and its granted feature codes, stamped with
    /// the issue time.
    pub fn from_device(device: &Device, feature_codes: Vec<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            sn: device.sn.clone(),
            product_id: device.product_id,
            license_type: device.license_type_id,
            oem_tag: device.oem_tag.clone(),
            created_at: issued_at,
            feature_codes,
        }
    }
}

/// The signed envelope: the snapshot plus the signature over its
/// serialized JSON. The signature travels as standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationFile {
    pub data: ActivationData,
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> Device {
        Device {
            id: 9,
            sn: "SN-0001".into(),
            product_id: 3,
            license_type_id: 7,
            oem_tag: "acme".into(),
            remark: "ignored".into(),
            created_at: "2026-01-15T08:30:00Z".parse().unwrap(),
            created_by: 1,
            updated_at: "2026-01-15T08:30:00Z".parse().unwrap(),
            updated_by: 1,
        }
    }

    #[test]
    fn wire_keys_and_order_are_stable() {
        let issued_at = "2026-02-01T12:00:00Z".parse().unwrap();
        let data = ActivationData::from_device(&sample_device(), vec!["exp".into()], issued_at);
        let json = serde_json::to_string(&data).unwrap();

        // Declaration order is serialization order.
        let sn = json.find("\"sn\"").unwrap();
        let product = json.find("\"product_id\"").unwrap();
        let license = json.find("\"license_type\"").unwrap();
        let oem = json.find("\"oem_tag\"").unwrap();
        let created = json.find("\"created_at\"").unwrap();
        let codes = json.find("\"feature_codes\"").unwrap();
        assert!(sn < product && product < license && license < oem);
        assert!(oem < created && created < codes);

        // The device's mutable remark and ids are not part of the snapshot.
        assert!(!json.contains("remark"));
        assert!(!json.contains("\"id\""));

        // The issue time travels as epoch seconds; the device's
        // registration time is not what gets stamped.
        assert!(json.contains("\"created_at\":1769947200"));
        assert!(!json.contains("1768465800"));
    }

    #[test]
    fn signature_travels_as_base64_string() {
        let file = ActivationFile {
            data: ActivationData::from_device(
                &sample_device(),
                vec![],
                "2026-02-01T12:00:00Z".parse().unwrap(),
            ),
            signature: vec![0xde, 0xad, 0xbe, 0xef],
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains("\"signature\":\"3q2+7w==\""));

        let back: ActivationFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, file);
    }
}
