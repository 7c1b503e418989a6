//! Software and firmware version operations.

use activault_audit::AuditRecord;
use activault_authz::AccessLevel;
use activault_store::{products, versions};
use activault_types::{
    Actor, AuditAction, AuditModule, FirmwareVersion, Page, PageResult, SoftwareVersion,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::context::{require_access, Services};
use crate::error::{ServiceError, ServiceResult};

impl Services {
    pub fn create_software_version(
        &self,
        actor: &Actor,
        product_id: i64,
        version: &str,
        release_date: DateTime<Utc>,
        remark: &str,
    ) -> ServiceResult<SoftwareVersion> {
        if version.trim().is_empty() {
            return Err(ServiceError::InvalidInput("version must not be empty".into()));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        products::get(&tx, product_id)?;
        require_access(&tx, actor, product_id, AccessLevel::Mutate)?;

        let created = versions::insert_software(
            &tx,
            product_id,
            version,
            release_date,
            remark,
            actor.user_id,
            now,
        )?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::SoftwareVersion,
                action: AuditAction::Create,
                product_id: Some(product_id),
                details: json!({ "software_version": created }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(created)
    }

    pub fn create_firmware_version(
        &self,
        actor: &Actor,
        product_id: i64,
        version: &str,
        release_date: DateTime<Utc>,
        remark: &str,
    ) -> ServiceResult<FirmwareVersion> {
        if version.trim().is_empty() {
            return Err(ServiceError::InvalidInput("version must not be empty".into()));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        products::get(&tx, product_id)?;
        require_access(&tx, actor, product_id, AccessLevel::Mutate)?;

        let created = versions::insert_firmware(
            &tx,
            product_id,
            version,
            release_date,
            remark,
            actor.user_id,
            now,
        )?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::FirmwareVersion,
                action: AuditAction::Create,
                product_id: Some(product_id),
                details: json!({ "firmware_version": created }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(created)
    }

    /// Replaces the feature and firmware association sets of a software
    /// version wholesale.
    pub fn update_software_associations(
        &self,
        actor: &Actor,
        software_version_id: i64,
        feature_ids: &[i64],
        firmware_ids: &[i64],
    ) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let software = versions::get_software(&tx, software_version_id)?;
        require_access(&tx, actor, software.product_id, AccessLevel::Mutate)?;

        let features = versions::replace_software_features(
            &tx,
            software_version_id,
            software.product_id,
            feature_ids,
        )?;
        let firmware = versions::replace_software_firmware(
            &tx,
            software_version_id,
            software.product_id,
            firmware_ids,
        )?;

        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::SoftwareVersion,
                action: AuditAction::Update,
                product_id: Some(software.product_id),
                details: json!({
                    "software_version_id": software_version_id,
                    "feature_codes": features.iter().map(|f| &f.feature_code).collect::<Vec<_>>(),
                    "firmware_versions": firmware.iter().map(|f| &f.version).collect::<Vec<_>>(),
                }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_software_version(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let software = versions::get_software(&tx, id)?;
        require_access(&tx, actor, software.product_id, AccessLevel::Mutate)?;

        versions::delete_software(&tx, id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::SoftwareVersion,
                action: AuditAction::Delete,
                product_id: Some(software.product_id),
                details: json!({ "software_version": software }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_firmware_version(&self, actor: &Actor, id: i64) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let firmware = versions::get_firmware(&tx, id)?;
        require_access(&tx, actor, firmware.product_id, AccessLevel::Mutate)?;

        versions::delete_firmware(&tx, id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::FirmwareVersion,
                action: AuditAction::Delete,
                product_id: Some(firmware.product_id),
                details: json!({ "firmware_version": firmware }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_software_versions(
        &self,
        actor: &Actor,
        product_id: i64,
        page: Page,
    ) -> ServiceResult<PageResult<SoftwareVersion>> {
        let conn = self.store.lock()?;
        require_access(&conn, actor, product_id, AccessLevel::Read)?;
        Ok(versions::list_software(&conn, product_id, page)?)
    }

    pub fn list_firmware_versions(
        &self,
        actor: &Actor,
        product_id: i64,
        page: Page,
    ) -> ServiceResult<PageResult<FirmwareVersion>> {
        let conn = self.store.lock()?;
        require_access(&conn, actor, product_id, AccessLevel::Read)?;
        Ok(versions::list_firmware(&conn, product_id, page)?)
    }
}
