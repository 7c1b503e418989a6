//! Shared identifiers and domain entities for the Activault core.
//!
//! Every other crate in the workspace builds on these types: row
//! identifiers, the reserved actor ids, the product hierarchy entities,
//! and the audit module/action vocabulary.

mod actor;
mod audit;
mod entities;
mod page;

pub use actor::{Actor, UserId, ANONYMOUS_ID, SUPER_ADMIN_ID};
pub use audit::{AuditAction, AuditLogEntry, AuditModule};
pub use entities::{
    Device, FirmwareVersion, LicenseType, ManagerPermission, ManagerRole, Product,
    ProductFeature, ProductManager, SoftwareVersion,
};
pub use page::{Page, PageResult};
