//! Audit ledger vocabulary and the stored entry shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::UserId;

/// The subsystem an audited operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditModule {
    User,
    Auth,
    Product,
    Feature,
    LicenseType,
    FirmwareVersion,
    SoftwareVersion,
    Device,
}

impl AuditModule {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Auth => "auth",
            Self::Product => "product",
            Self::Feature => "feature",
            Self::LicenseType => "license_type",
            Self::FirmwareVersion => "firmware_version",
            Self::SoftwareVersion => "software_version",
            Self::Device => "device",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "auth" => Some(Self::Auth),
            "product" => Some(Self::Product),
            "feature" => Some(Self::Feature),
            "license_type" => Some(Self::LicenseType),
            "firmware_version" => Some(Self::FirmwareVersion),
            "software_version" => Some(Self::SoftwareVersion),
            "device" => Some(Self::Device),
            _ => None,
        }
    }
}

/// What was done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Login,
    Register,
}

impl AuditAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Login => "login",
            Self::Register => "register",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            _ => None,
        }
    }
}

/// One append-only row of the audit ledger.
///
/// `details` is a free-form JSON snapshot of the mutated state (old/new
/// entity states for updates, the deleted entity for deletes). Its shape
/// is stable per module+action but not schema-enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub operator_id: UserId,
    pub module: String,
    pub action: String,
    pub product_id: Option<i64>,
    pub details: String,
    pub ip: String,
    pub created_at: DateTime<Utc>,
}
