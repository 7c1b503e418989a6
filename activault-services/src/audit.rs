//! Read side of the audit ledger.

use activault_audit::AuditFilter;
use activault_authz::AccessLevel;
use activault_types::{Actor, AuditLogEntry, Page, PageResult};

use crate::context::{require_access, Services};
use crate::error::{ServiceError, ServiceResult};

impl Services {
    /// Queries the ledger. The super-admin sees everything; managers
    /// must scope the query to a product they can read.
    pub fn list_audit_logs(
        &self,
        actor: &Actor,
        filter: &AuditFilter,
        page: Page,
    ) -> ServiceResult<PageResult<AuditLogEntry>> {
        let conn = self.store.lock()?;
        if !actor.is_super_admin() {
            let product_id = filter.product_id.ok_or_else(|| {
                ServiceError::InvalidInput("a product filter is required".into())
            })?;
            require_access(&conn, actor, product_id, AccessLevel::Read)?;
        }
        Ok(activault_audit::list(&conn, filter, page)?)
    }
}
