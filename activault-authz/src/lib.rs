//! Product-scoped authorization matrix.
//!
//! A pure decision with no side effects: given the acting user, the
//! manager record binding that user to the product (if any), and the
//! level an operation requires, either grant access or deny with
//! [`AuthzError::PermissionDenied`]. There is no partial authorization.
//!
//! Priority rules:
//! 1. The super-admin identity is authorized for everything.
//! 2. Without a manager record for (product, actor), deny.
//! 3. `Mutate` requires full permission or the main role; `Administer`
//!    (managing other managers, deleting the product) requires the main
//!    role.
//! 4. The main role implies full permission regardless of the stored
//!    permission value.

use activault_types::{Actor, ManagerPermission, ManagerRole, ProductManager};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access level an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Viewing product-scoped data.
    Read,
    /// Creating, updating or deleting entities under the product.
    Mutate,
    /// Managing the management team or the product itself.
    Administer,
}

/// A granted authorization, carrying the manager record the grant was
/// derived from (absent for the super-admin).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    SuperAdmin,
    Manager(ProductManager),
}

impl Grant {
    /// The manager record behind this grant, if any.
    #[must_use]
    pub fn manager(&self) -> Option<&ProductManager> {
        match self {
            Self::SuperAdmin => None,
            Self::Manager(m) => Some(m),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("permission denied")]
    PermissionDenied,
}

/// Effective permission of a manager: the main role implies full.
#[must_use]
pub fn effective_permission(manager: &ProductManager) -> ManagerPermission {
    match manager.role {
        ManagerRole::Main => ManagerPermission::Full,
        ManagerRole::Assistant => manager.permission,
    }
}

/// Decides whether `actor` may perform an operation at `level` on the
/// product the `manager` record is scoped to. The caller is responsible
/// for looking up the record for the right (product, actor) pair.
pub fn authorize(
    actor: &Actor,
    manager: Option<&ProductManager>,
    level: AccessLevel,
) -> Result<Grant, AuthzError> {
    if actor.is_super_admin() {
        return Ok(Grant::SuperAdmin);
    }

    let manager = match manager {
        Some(m) if m.user_id == actor.user_id => m,
        _ => return Err(AuthzError::PermissionDenied),
    };

    let allowed = match level {
        AccessLevel::Read => true,
        AccessLevel::Mutate => effective_permission(manager) == ManagerPermission::Full,
        AccessLevel::Administer => manager.role == ManagerRole::Main,
    };

    if allowed {
        Ok(Grant::Manager(manager.clone()))
    } else {
        Err(AuthzError::PermissionDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use activault_types::SUPER_ADMIN_ID;
    use chrono::Utc;

    fn manager(user_id: i64, role: ManagerRole, permission: ManagerPermission) -> ProductManager {
        let now = Utc::now();
        ProductManager {
            id: 1,
            product_id: 7,
            user_id,
            role,
            permission,
            remark: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn super_admin_allowed_everywhere() {
        let actor = Actor::new(SUPER_ADMIN_ID);
        for level in [AccessLevel::Read, AccessLevel::Mutate, AccessLevel::Administer] {
            assert_eq!(authorize(&actor, None, level), Ok(Grant::SuperAdmin));
        }
    }

    #[test]
    fn no_record_denies() {
        let actor = Actor::new(42);
        assert_eq!(
            authorize(&actor, None, AccessLevel::Read),
            Err(AuthzError::PermissionDenied)
        );
    }

    #[test]
    fn record_for_other_user_denies() {
        let actor = Actor::new(42);
        let m = manager(43, ManagerRole::Main, ManagerPermission::Full);
        assert_eq!(
            authorize(&actor, Some(&m), AccessLevel::Read),
            Err(AuthzError::PermissionDenied)
        );
    }

    #[test]
    fn read_assistant_denied_mutate() {
        let actor = Actor::new(42);
        let m = manager(42, ManagerRole::Assistant, ManagerPermission::Read);
        assert!(authorize(&actor, Some(&m), AccessLevel::Read).is_ok());
        assert_eq!(
            authorize(&actor, Some(&m), AccessLevel::Mutate),
            Err(AuthzError::PermissionDenied)
        );
    }

    #[test]
    fn full_assistant_can_mutate_not_administer() {
        let actor = Actor::new(42);
        let m = manager(42, ManagerRole::Assistant, ManagerPermission::Full);
        assert!(authorize(&actor, Some(&m), AccessLevel::Mutate).is_ok());
        assert_eq!(
            authorize(&actor, Some(&m), AccessLevel::Administer),
            Err(AuthzError::PermissionDenied)
        );
    }

    #[test]
    fn main_implies_full_even_with_stored_read() {
        let actor = Actor::new(42);
        let m = manager(42, ManagerRole::Main, ManagerPermission::Read);
        assert_eq!(effective_permission(&m), ManagerPermission::Full);
        assert!(authorize(&actor, Some(&m), AccessLevel::Mutate).is_ok());
        assert!(authorize(&actor, Some(&m), AccessLevel::Administer).is_ok());
    }
}
