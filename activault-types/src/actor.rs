//! Caller identity as resolved by the (external) authentication layer.

use serde::{Deserialize, Serialize};

/// Row id of a user in the external identity store.
pub type UserId = i64;

/// The distinguished super-admin identity. Authorized for every
/// operation on every product without a manager record.
pub const SUPER_ADMIN_ID: UserId = 1;

/// Reserved identity for pre-auth audit entries (failed logins and the
/// like) where no authenticated user exists yet.
pub const ANONYMOUS_ID: UserId = 100_000_000;

/// The identity performing an operation, plus the client address it
/// arrived from (recorded on audit entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub ip: Option<String>,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, ip: None }
    }

    pub fn with_ip(user_id: UserId, ip: impl Into<String>) -> Self {
        Self {
            user_id,
            ip: Some(ip.into()),
        }
    }

    /// The anonymous/system actor used for pre-auth audit entries.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_ID)
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.user_id == SUPER_ADMIN_ID
    }
}
