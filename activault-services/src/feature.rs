//! Product feature operations.

use activault_audit::AuditRecord;
use activault_authz::AccessLevel;
use activault_store::{features, products};
use activault_types::{Actor, AuditAction, AuditModule, Page, PageResult, ProductFeature};
use chrono::Utc;
use serde_json::json;

use crate::context::{require_access, Services};
use crate::error::{ServiceError, ServiceResult};

impl Services {
    pub fn create_feature(
        &self,
        actor: &Actor,
        product_id: i64,
        feature_name: &str,
        feature_code: &str,
    ) -> ServiceResult<ProductFeature> {
        if feature_name.trim().is_empty() || feature_code.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "feature name and code must not be empty".into(),
            ));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        products::get(&tx, product_id)?;
        require_access(&tx, actor, product_id, AccessLevel::Mutate)?;

        let feature = features::insert(&tx, product_id, feature_name, feature_code, now)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Feature,
                action: AuditAction::Create,
                product_id: Some(product_id),
                details: json!({ "feature": feature }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(feature)
    }

    /// Deletes a feature. Its membership in license types and software
    /// versions is cleared in the same transaction; devices keep their
    /// already-issued artifacts untouched.
    pub fn delete_feature(&self, actor: &Actor, feature_id: i64) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let feature = features::get(&tx, feature_id)?;
        require_access(&tx, actor, feature.product_id, AccessLevel::Mutate)?;

        features::delete(&tx, feature_id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Feature,
                action: AuditAction::Delete,
                product_id: Some(feature.product_id),
                details: json!({ "feature": feature }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_features(
        &self,
        actor: &Actor,
        product_id: i64,
        page: Page,
    ) -> ServiceResult<PageResult<ProductFeature>> {
        let conn = self.store.lock()?;
        require_access(&conn, actor, product_id, AccessLevel::Read)?;
        Ok(features::list(&conn, product_id, page)?)
    }
}
