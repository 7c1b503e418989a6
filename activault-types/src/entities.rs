//! The product hierarchy: products, managers, license tiers, features,
//! devices and release versions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::UserId;

/// A product owning license types, features, devices and managers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Short product code, globally unique, immutable once assigned.
    pub code: String,
    pub name: String,
    pub product_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Category assigned when the caller supplies none.
    pub const DEFAULT_TYPE: &'static str = "default";
}

/// Role of a manager within a product. Exactly one `Main` manager per
/// product is the intended invariant, enforced by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerRole {
    Main,
    Assistant,
}

impl ManagerRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "main" => Some(Self::Main),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Stored permission of a manager. A `Main` manager has full permission
/// regardless of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManagerPermission {
    Read,
    Full,
}

impl ManagerPermission {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Self::Read),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

impl Default for ManagerPermission {
    fn default() -> Self {
        Self::Read
    }
}

/// Membership of a user in a product's management team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductManager {
    pub id: i64,
    pub product_id: i64,
    pub user_id: UserId,
    pub role: ManagerRole,
    pub permission: ManagerPermission,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named license tier within a product, bundling a feature set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseType {
    pub id: i64,
    pub product_id: i64,
    /// Display name, unique within the product, mutable.
    pub type_name: String,
    /// Wire code, unique within the product, immutable.
    pub license_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A licensable capability of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFeature {
    pub id: i64,
    pub product_id: i64,
    pub feature_name: String,
    /// Wire code carried in activation artifacts; immutable and unique
    /// within the product, hence portable across deployments.
    pub feature_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A physical device bound to a product and a license tier. The serial
/// number is the durable identity; the license type may be reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    pub sn: String,
    pub product_id: i64,
    pub license_type_id: i64,
    pub oem_tag: String,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub updated_at: DateTime<Utc>,
    pub updated_by: UserId,
}

/// A released software version of a product, associated with the
/// features it supports and the firmware versions it pairs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareVersion {
    pub id: i64,
    pub product_id: i64,
    pub version: String,
    pub release_date: DateTime<Utc>,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}

/// A released firmware version of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub id: i64,
    pub product_id: i64,
    pub version: String,
    pub release_date: DateTime<Utc>,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
}
