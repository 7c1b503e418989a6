//! Product lifecycle and management team operations.

use activault_audit::AuditRecord;
use activault_authz::AccessLevel;
use activault_store::{managers, products};
use activault_types::{
    Actor, AuditAction, AuditModule, ManagerPermission, ManagerRole, Page, PageResult, Product,
    ProductManager, UserId, ANONYMOUS_ID,
};
use chrono::Utc;
use serde_json::json;

use crate::context::{require_access, Services};
use crate::error::{ServiceError, ServiceResult};

/// Changes applied by [`Services::modify_product`] in one transaction.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub product_type: Option<String>,
    /// Transfer the main role to this (already managing) user.
    pub new_main_user: Option<UserId>,
    pub assistant_updates: Vec<AssistantUpdate>,
}

impl ProductChanges {
    fn touches_team(&self) -> bool {
        self.new_main_user.is_some() || !self.assistant_updates.is_empty()
    }
}

/// Stored permission and/or remark change for one assistant.
#[derive(Debug, Clone)]
pub struct AssistantUpdate {
    pub manager_id: i64,
    pub permission: Option<ManagerPermission>,
    pub remark: Option<String>,
}

impl Services {
    /// Creates a product; the creator becomes its main manager in the
    /// same transaction.
    pub fn create_product(
        &self,
        actor: &Actor,
        code: &str,
        name: &str,
        product_type: Option<&str>,
    ) -> ServiceResult<Product> {
        if actor.user_id == ANONYMOUS_ID {
            return Err(ServiceError::PermissionDenied);
        }
        if code.trim().is_empty() || name.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "product code and name must not be empty".into(),
            ));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let product = products::insert(
            &tx,
            code,
            name,
            product_type.unwrap_or(Product::DEFAULT_TYPE),
            now,
        )?;
        managers::insert(
            &tx,
            product.id,
            actor.user_id,
            ManagerRole::Main,
            ManagerPermission::Full,
            "",
            now,
        )?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Product,
                action: AuditAction::Create,
                product_id: Some(product.id),
                details: json!({ "product": product }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;

        tracing::info!(product_id = product.id, code, "product created");
        Ok(product)
    }

    pub fn get_product(&self, actor: &Actor, id: i64) -> ServiceResult<Product> {
        let conn = self.store.lock()?;
        require_access(&conn, actor, id, AccessLevel::Read)?;
        Ok(products::get(&conn, id)?)
    }

    /// Products visible to the actor: everything for the super-admin,
    /// managed products for everyone else.
    pub fn list_products(
        &self,
        actor: &Actor,
        search: Option<&str>,
        page: Page,
    ) -> ServiceResult<PageResult<Product>> {
        let conn = self.store.lock()?;
        let scope = if actor.is_super_admin() {
            None
        } else {
            Some(actor.user_id)
        };
        Ok(products::list_visible(&conn, scope, search, page)?)
    }

    /// Applies name/type changes, an optional main-role transfer and
    /// assistant updates atomically. Team changes require the main role;
    /// plain renames require mutate access.
    pub fn modify_product(
        &self,
        actor: &Actor,
        id: i64,
        changes: &ProductChanges,
    ) -> ServiceResult<Product> {
        let level = if changes.touches_team() {
            AccessLevel::Administer
        } else {
            AccessLevel::Mutate
        };

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let old = products::get(&tx, id)?;
        require_access(&tx, actor, id, level)?;

        products::update(
            &tx,
            id,
            changes.name.as_deref(),
            changes.product_type.as_deref(),
            now,
        )?;

        if let Some(new_main) = changes.new_main_user {
            managers::transfer_main(&tx, id, new_main, now)?;
        }
        for update in &changes.assistant_updates {
            let target = managers::get_by_id(&tx, update.manager_id)?;
            if target.product_id != id {
                return Err(ServiceError::NotFound("manager"));
            }
            if target.role == ManagerRole::Main {
                return Err(ServiceError::InvalidInput(
                    "the main manager cannot be updated as an assistant".into(),
                ));
            }
            managers::update_assistant(
                &tx,
                update.manager_id,
                update.permission,
                update.remark.as_deref(),
                now,
            )?;
        }

        let new = products::get(&tx, id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Product,
                action: AuditAction::Update,
                product_id: Some(id),
                details: json!({
                    "old": old,
                    "new": new,
                    "main_transferred_to": changes.new_main_user,
                }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(new)
    }

    /// Deletes a product with no remaining license types, features or
    /// versions. Requires the main role.
    pub fn delete_product(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let product = products::get(&tx, id)?;
        require_access(&tx, actor, id, AccessLevel::Administer)?;
        if products::has_relations(&tx, id)? {
            return Err(ServiceError::RelationsExist);
        }

        products::delete(&tx, id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Product,
                action: AuditAction::Delete,
                product_id: Some(id),
                details: json!({ "product": product }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;

        tracing::info!(product_id = id, "product deleted");
        Ok(())
    }

    /// Adds a user to the management team, always as an assistant with
    /// read permission. Requires the main role.
    pub fn add_manager(
        &self,
        actor: &Actor,
        product_id: i64,
        user_id: UserId,
        remark: &str,
    ) -> ServiceResult<ProductManager> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        products::get(&tx, product_id)?;
        require_access(&tx, actor, product_id, AccessLevel::Administer)?;

        let manager = managers::insert(
            &tx,
            product_id,
            user_id,
            ManagerRole::Assistant,
            ManagerPermission::default(),
            remark,
            now,
        )?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Product,
                action: AuditAction::Update,
                product_id: Some(product_id),
                details: json!({ "added_manager": manager }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(manager)
    }

    /// Removes an assistant from the team. The main manager can only
    /// leave by transferring the role first.
    pub fn remove_manager(
        &self,
        actor: &Actor,
        product_id: i64,
        manager_id: i64,
    ) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let target = managers::get_by_id(&tx, manager_id)?;
        if target.product_id != product_id {
            return Err(ServiceError::NotFound("manager"));
        }
        require_access(&tx, actor, product_id, AccessLevel::Administer)?;
        if target.role == ManagerRole::Main {
            return Err(ServiceError::PermissionDenied);
        }

        managers::delete(&tx, manager_id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Product,
                action: AuditAction::Update,
                product_id: Some(product_id),
                details: json!({ "removed_manager": target }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_managers(&self, actor: &Actor, product_id: i64) -> ServiceResult<Vec<ProductManager>> {
        let conn = self.store.lock()?;
        require_access(&conn, actor, product_id, AccessLevel::Read)?;
        Ok(managers::list(&conn, product_id)?)
    }
}
