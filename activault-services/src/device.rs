//! Device registration, license reassignment and artifact issuance.

use std::collections::BTreeMap;

use activault_artifact::IssuedArtifact;
use activault_audit::AuditRecord;
use activault_authz::AccessLevel;
use activault_store::devices::{self, DeviceFilter, NewDevice};
use activault_store::license_types;
use activault_types::{Actor, AuditAction, AuditModule, Device, Page, PageResult};
use chrono::Utc;
use serde_json::json;

use crate::context::{require_access, Services};
use crate::error::{ServiceError, ServiceResult};

impl Services {
    pub fn add_device(&self, actor: &Actor, device: &NewDevice) -> ServiceResult<Device> {
        if device.sn.trim().is_empty() {
            return Err(ServiceError::InvalidInput("sn must not be empty".into()));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        require_access(&tx, actor, device.product_id, AccessLevel::Mutate)?;

        let created = devices::insert(&tx, device, actor.user_id, now)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Device,
                action: AuditAction::Create,
                product_id: Some(created.product_id),
                details: json!({ "device": created }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(created)
    }

    /// Registers a batch of serial numbers under one product and license
    /// type. All-or-nothing: one rejected sn means zero devices and zero
    /// ledger entries.
    pub fn add_devices_batch(
        &self,
        actor: &Actor,
        sns: &[String],
        product_id: i64,
        license_type_id: i64,
        oem_tag: &str,
        remark: &str,
    ) -> ServiceResult<Vec<Device>> {
        if sns.is_empty() {
            return Err(ServiceError::InvalidInput("empty sn batch".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for sn in sns {
            if sn.trim().is_empty() {
                return Err(ServiceError::InvalidInput("sn must not be empty".into()));
            }
            if !seen.insert(sn.as_str()) {
                return Err(ServiceError::InvalidInput(format!("duplicate sn in batch: {sn}")));
            }
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        require_access(&tx, actor, product_id, AccessLevel::Mutate)?;

        let created = devices::insert_batch(
            &tx,
            sns,
            product_id,
            license_type_id,
            oem_tag,
            remark,
            actor.user_id,
            now,
        )?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Device,
                action: AuditAction::Create,
                product_id: Some(product_id),
                details: json!({ "count": created.len(), "sns": sns }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;

        tracing::info!(product_id, count = created.len(), "device batch registered");
        Ok(created)
    }

    /// Reassigns a device's license type, oem tag and remark.
    pub fn update_device(
        &self,
        actor: &Actor,
        device_id: i64,
        license_type_id: i64,
        oem_tag: &str,
        remark: &str,
    ) -> ServiceResult<Device> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let current = devices::get(&tx, device_id)?;
        require_access(&tx, actor, current.product_id, AccessLevel::Mutate)?;

        let (old, new) = devices::update(
            &tx,
            device_id,
            license_type_id,
            oem_tag,
            remark,
            actor.user_id,
            now,
        )?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Device,
                action: AuditAction::Update,
                product_id: Some(new.product_id),
                details: json!({ "old_device": old, "new_device": new }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(new)
    }

    /// Removes a device. Requires the main role on its product.
    pub fn delete_device(&self, actor: &Actor, device_id: i64) -> ServiceResult<()> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let device = devices::get(&tx, device_id)?;
        require_access(&tx, actor, device.product_id, AccessLevel::Administer)?;

        devices::delete(&tx, device_id)?;
        activault_audit::record(
            &tx,
            &AuditRecord {
                operator_id: actor.user_id,
                module: AuditModule::Device,
                action: AuditAction::Delete,
                product_id: Some(device.product_id),
                details: json!({ "device": device }),
                ip: actor.ip.clone(),
            },
            now,
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Moves a set of devices onto another license type of their own
    /// product, all-or-nothing. Devices are grouped by product; the
    /// actor needs mutate access to every product touched, and the
    /// target license type must belong to each device's product.
    pub fn reassign_license(
        &self,
        actor: &Actor,
        device_ids: &[i64],
        license_type_id: i64,
        remark: &str,
    ) -> ServiceResult<Vec<Device>> {
        if device_ids.is_empty() {
            return Err(ServiceError::InvalidInput("empty device batch".into()));
        }

        let mut conn = self.store.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        let license_type = license_types::get(&tx, license_type_id)?;
        let found = devices::get_many(&tx, device_ids)?;
        if found.len() != device_ids.len() {
            return Err(ServiceError::NotFound("device"));
        }

        let mut by_product: BTreeMap<i64, Vec<&Device>> = BTreeMap::new();
        for device in &found {
            by_product.entry(device.product_id).or_default().push(device);
        }

        for (&product_id, group) in &by_product {
            require_access(&tx, actor, product_id, AccessLevel::Mutate)?;
            if product_id != license_type.product_id {
                return Err(ServiceError::InvalidInput(format!(
                    "license type {license_type_id} does not belong to product {product_id}"
                )));
            }

            // One ledger entry per device, old and new snapshots each.
            for device in group {
                let (old, new) = devices::set_license_type(
                    &tx,
                    device.id,
                    license_type_id,
                    remark,
                    actor.user_id,
                    now,
                )?;
                activault_audit::record(
                    &tx,
                    &AuditRecord {
                        operator_id: actor.user_id,
                        module: AuditModule::Device,
                        action: AuditAction::Update,
                        product_id: Some(product_id),
                        details: json!({ "old_device": old, "new_device": new }),
                        ip: actor.ip.clone(),
                    },
                    now,
                )?;
            }
        }

        let ids: Vec<i64> = found.iter().map(|d| d.id).collect();
        let updated = devices::get_many(&tx, &ids)?;
        tx.commit()?;
        Ok(updated)
    }

    pub fn get_device_by_sn(&self, actor: &Actor, sn: &str) -> ServiceResult<Device> {
        let conn = self.store.lock()?;
        let device = devices::get_by_sn(&conn, sn)?;
        require_access(&conn, actor, device.product_id, AccessLevel::Read)?;
        Ok(device)
    }

    /// Filtered device listing. Non-admin actors must scope the query to
    /// a product they can read.
    pub fn list_devices(
        &self,
        actor: &Actor,
        filter: &DeviceFilter,
        page: Page,
    ) -> ServiceResult<PageResult<Device>> {
        let conn = self.store.lock()?;
        if !actor.is_super_admin() {
            let product_id = filter.product_id.ok_or_else(|| {
                ServiceError::InvalidInput("a product filter is required".into())
            })?;
            require_access(&conn, actor, product_id, AccessLevel::Read)?;
        }
        Ok(devices::list(&conn, filter, page)?)
    }

    /// Issues the activation artifact for a serial number.
    ///
    /// Deliberately unauthorized: this is the device-facing operation,
    /// and the artifact only restates state the device is entitled to.
    pub fn issue_activation_artifact(&self, sn: &str) -> ServiceResult<IssuedArtifact> {
        let conn = self.store.lock()?;
        Ok(self.issuer.issue(&conn, sn)?)
    }
}
