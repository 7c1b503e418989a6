//! License type operations.

use activault_audit::AuditRecord;
use activault_authz::AccessLevel;
use activault_store::{devices, license_types, products};
use activault_types::{Actor, AuditAction, AuditModule, LicenseType, Page, PageResult, ProductFeature};
use chrono::Utc;
use serde_json::json;

use crate::context::{require_access, Services};
use crate::error::{ServiceError, ServiceResult};

/// A license type together with its granted features.
#[derive(Debug, Clone)]
pub struct LicenseTypeDetail {
    pub license_type: LicenseType,
    pub features: Vec<ProductFeature>,
}

impl Services {
    /// Creates a license type, optionally with an initial feature set.
    pub fn create_license_type(
        &self,
        actor: &Actor,
        product_id: i64,
        type_name: &str,
        license_code: &str,
        feature_ids: &[i64],
    ) -> ServiceResult<LicenseTypeDetail> {
        if type_name.trim().is_empty() || license_code.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "type name and license code must not be empty".into(),
            ));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        products::get(&tx, product_id)?;
        require_access(&tx, actor, product_id, AccessLevel::Mutate)?;

        let license_type = license_types::insert(&tx, product_id, type_name, license_code, now)?;
        let features =
            license_types::replace_features(&tx, license_type.id, product_id, feature_ids)?;

        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::LicenseType,
                action: AuditAction::Create,
                product_id: Some(product_id),
                details: json!({
                    "license_type": license_type,
                    "feature_codes": features.iter().map(|f| &f.feature_code).collect::<Vec<_>>(),
                }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(LicenseTypeDetail {
            license_type,
            features,
        })
    }

    /// Replaces the feature set of a license type wholesale.
    pub fn update_license_type_features(
        &self,
        actor: &Actor,
        license_type_id: i64,
        feature_ids: &[i64],
    ) -> ServiceResult<Vec<ProductFeature>> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let license_type = license_types::get(&tx, license_type_id)?;
        require_access(&tx, actor, license_type.product_id, AccessLevel::Mutate)?;

        let old_codes = license_types::feature_codes(&tx, license_type_id)?;
        let features = license_types::replace_features(
            &tx,
            license_type_id,
            license_type.product_id,
            feature_ids,
        )?;

        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::LicenseType,
                action: AuditAction::Update,
                product_id: Some(license_type.product_id),
                details: json!({
                    "license_type_id": license_type_id,
                    "old_feature_codes": old_codes,
                    "new_feature_codes": features.iter().map(|f| &f.feature_code).collect::<Vec<_>>(),
                }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(features)
    }

    /// Deletes a license type no device still holds.
    pub fn delete_license_type(&self, actor: &Actor, license_type_id: i64) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let license_type = license_types::get(&tx, license_type_id)?;
        require_access(&tx, actor, license_type.product_id, AccessLevel::Mutate)?;
        if devices::count_for_license_type(&tx, license_type_id)? > 0 {
            return Err(ServiceError::RelationsExist);
        }

        license_types::delete(&tx, license_type_id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::LicenseType,
                action: AuditAction::Delete,
                product_id: Some(license_type.product_id),
                details: json!({ "license_type": license_type }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    /// License types of a product, each with its feature set.
    pub fn list_license_types(
        &self,
        actor: &Actor,
        product_id: i64,
        page: Page,
    ) -> ServiceResult<PageResult<LicenseTypeDetail>> {
        let conn = self.store.lock()?;
        require_access(&conn, actor, product_id, AccessLevel::Read)?;

        let types = license_types::list(&conn, product_id, page)?;
        let mut list = Vec::with_capacity(types.list.len());
        for license_type in types.list {
            let features = license_types::features_of(&conn, license_type.id)?;
            list.push(LicenseTypeDetail {
                license_type,
                features,
            });
        }
        Ok(PageResult {
            total: types.total,
            page: types.page,
            page_size: types.page_size,
            list,
        })
    }
}
