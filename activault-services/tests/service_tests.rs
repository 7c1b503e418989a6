//! End-to-end service tests: authorization, audit coupling, batches and
//! artifact issuance against an in-memory store.

mod common;

use activault_artifact::open_artifact;
use activault_crypto::ArtifactKey;
use activault_services::{
    AssistantUpdate, AuditFilter, DeviceFilter, NewDevice, ProductChanges, ServiceError, Services,
};
use activault_store::Conflict;
use activault_types::{Actor, ManagerPermission, ManagerRole, Page, Product};
use chrono::Utc;

use common::{admin, services, verifying_key, TEST_ARTIFACT_KEY};

fn seed_product(svc: &Services, owner: &Actor, code: &str, name: &str) -> Product {
    svc.create_product(owner, code, name, None).unwrap()
}

fn audit_total(svc: &Services) -> i64 {
    svc.list_audit_logs(&admin(), &AuditFilter::default(), Page::default())
        .unwrap()
        .total
}

#[test]
fn creator_becomes_main_manager() {
    let svc = services();
    let owner = Actor::with_ip(7, "10.0.0.1");
    let product = seed_product(&svc, &owner, "GW", "Gateway");

    let team = svc.list_managers(&owner, product.id).unwrap();
    assert_eq!(team.len(), 1);
    assert_eq!(team[0].user_id, 7);
    assert_eq!(team[0].role, ManagerRole::Main);
    assert_eq!(team[0].permission, ManagerPermission::Full);

    assert_eq!(audit_total(&svc), 1);
}

#[test]
fn anonymous_cannot_create_products() {
    let svc = services();
    let err = svc
        .create_product(&Actor::anonymous(), "GW", "Gateway", None)
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[test]
fn duplicate_product_code_surfaces_as_conflict() {
    let svc = services();
    seed_product(&svc, &admin(), "GW", "Gateway");
    let err = svc
        .create_product(&admin(), "GW", "Other", None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(Conflict::ProductCode)
    ));
    // The failed attempt left no ledger entry.
    assert_eq!(audit_total(&svc), 1);
}

#[test]
fn managers_of_one_product_have_no_rights_on_another() {
    let svc = services();
    let alice = Actor::new(7);
    let bob = Actor::new(8);
    let theirs = seed_product(&svc, &alice, "A", "Alpha");
    let others = seed_product(&svc, &bob, "B", "Beta");

    assert!(svc.create_feature(&alice, theirs.id, "Export", "exp").is_ok());
    let err = svc
        .create_feature(&alice, others.id, "Export", "exp")
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));

    let err = svc.get_product(&alice, others.id).unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[test]
fn assistant_rights_follow_stored_permission() {
    let svc = services();
    let owner = Actor::new(7);
    let reader = Actor::new(8);
    let writer = Actor::new(9);
    let product = seed_product(&svc, &owner, "A", "Alpha");

    let added = svc.add_manager(&owner, product.id, 8, "readonly").unwrap();
    assert_eq!(added.role, ManagerRole::Assistant);
    assert_eq!(added.permission, ManagerPermission::Read);

    let writer_row = svc.add_manager(&owner, product.id, 9, "").unwrap();
    svc.modify_product(
        &owner,
        product.id,
        &ProductChanges {
            assistant_updates: vec![AssistantUpdate {
                manager_id: writer_row.id,
                permission: Some(ManagerPermission::Full),
                remark: None,
            }],
            ..Default::default()
        },
    )
    .unwrap();

    // Read assistant: list yes, mutate no.
    assert!(svc.list_features(&reader, product.id, Page::default()).is_ok());
    assert!(matches!(
        svc.create_feature(&reader, product.id, "Export", "exp"),
        Err(ServiceError::PermissionDenied)
    ));

    // Full assistant: mutate yes, administer no.
    assert!(svc.create_feature(&writer, product.id, "Export", "exp").is_ok());
    assert!(matches!(
        svc.add_manager(&writer, product.id, 10, ""),
        Err(ServiceError::PermissionDenied)
    ));
    assert!(matches!(
        svc.delete_product(&writer, product.id),
        Err(ServiceError::PermissionDenied)
    ));
}

#[test]
fn main_transfer_keeps_exactly_one_main() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    svc.add_manager(&owner, product.id, 8, "").unwrap();

    svc.modify_product(
        &owner,
        product.id,
        &ProductChanges {
            new_main_user: Some(8),
            ..Default::default()
        },
    )
    .unwrap();

    let successor = Actor::new(8);
    let team = svc.list_managers(&successor, product.id).unwrap();
    let mains: Vec<_> = team.iter().filter(|m| m.role == ManagerRole::Main).collect();
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0].user_id, 8);

    // The old main is now a read assistant and cannot transfer back.
    let err = svc
        .modify_product(
            &owner,
            product.id,
            &ProductChanges {
                new_main_user: Some(7),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));
}

#[test]
fn main_manager_cannot_be_removed() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let team = svc.list_managers(&owner, product.id).unwrap();

    let err = svc
        .remove_manager(&owner, product.id, team[0].id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::PermissionDenied));

    let assistant = svc.add_manager(&owner, product.id, 8, "").unwrap();
    svc.remove_manager(&owner, product.id, assistant.id).unwrap();
    assert_eq!(svc.list_managers(&owner, product.id).unwrap().len(), 1);
}

#[test]
fn product_delete_blocked_by_relations() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let lt = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[])
        .unwrap();

    assert!(matches!(
        svc.delete_product(&owner, product.id),
        Err(ServiceError::RelationsExist)
    ));

    svc.delete_license_type(&owner, lt.license_type.id).unwrap();
    svc.delete_product(&owner, product.id).unwrap();
}

#[test]
fn license_type_delete_blocked_while_devices_hold_it() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let lt = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[])
        .unwrap();
    let device = svc
        .add_device(
            &owner,
            &NewDevice {
                sn: "SN-1".into(),
                product_id: product.id,
                license_type_id: lt.license_type.id,
                oem_tag: String::new(),
                remark: String::new(),
            },
        )
        .unwrap();

    assert!(matches!(
        svc.delete_license_type(&owner, lt.license_type.id),
        Err(ServiceError::RelationsExist)
    ));

    svc.delete_device(&owner, device.id).unwrap();
    svc.delete_license_type(&owner, lt.license_type.id).unwrap();
}

#[test]
fn feature_set_update_is_replace_all() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let f1 = svc.create_feature(&owner, product.id, "Export", "exp").unwrap();
    let f2 = svc.create_feature(&owner, product.id, "Sync", "sync").unwrap();
    let f3 = svc.create_feature(&owner, product.id, "Audit", "aud").unwrap();

    let lt = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[f1.id, f2.id])
        .unwrap();
    assert_eq!(lt.features.len(), 2);

    let updated = svc
        .update_license_type_features(&owner, lt.license_type.id, &[f3.id])
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].feature_code, "aud");

    let listed = svc
        .list_license_types(&owner, product.id, Page::default())
        .unwrap();
    assert_eq!(listed.list[0].features.len(), 1);
}

#[test]
fn batch_with_duplicate_sn_leaves_no_trace() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let lt = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[])
        .unwrap();

    svc.add_device(
        &owner,
        &NewDevice {
            sn: "SN-0042".into(),
            product_id: product.id,
            license_type_id: lt.license_type.id,
            oem_tag: String::new(),
            remark: String::new(),
        },
    )
    .unwrap();
    let before = audit_total(&svc);

    let sns: Vec<String> = (1..=50).map(|i| format!("SN-{i:04}")).collect();
    let err = svc
        .add_devices_batch(&owner, &sns, product.id, lt.license_type.id, "", "")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(Conflict::DeviceSn { .. })
    ));

    // Zero devices inserted, zero ledger entries written.
    let listing = svc
        .list_devices(
            &owner,
            &DeviceFilter {
                product_id: Some(product.id),
                ..Default::default()
            },
            Page::default(),
        )
        .unwrap();
    assert_eq!(listing.total, 1);
    assert_eq!(audit_total(&svc), before);

    // The clean batch lands whole, with one ledger entry.
    let sns: Vec<String> = (100..150).map(|i| format!("SN-{i:04}")).collect();
    let created = svc
        .add_devices_batch(&owner, &sns, product.id, lt.license_type.id, "", "")
        .unwrap();
    assert_eq!(created.len(), 50);
    assert_eq!(audit_total(&svc), before + 1);
}

#[test]
fn failed_audit_write_rolls_the_mutation_back() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");

    {
        let conn = svc.store().lock().unwrap();
        conn.execute_batch("DROP TABLE audit_logs").unwrap();
    }

    let err = svc
        .create_feature(&owner, product.id, "Export", "exp")
        .unwrap_err();
    assert!(matches!(err, ServiceError::AuditFailure(_)));

    // The feature itself must not have been committed.
    let listing = svc.list_features(&owner, product.id, Page::default()).unwrap();
    assert_eq!(listing.total, 0);
}

#[test]
fn each_mutation_writes_one_ledger_entry() {
    let svc = services();
    let owner = Actor::with_ip(7, "192.0.2.9");

    let product = seed_product(&svc, &owner, "A", "Alpha");
    assert_eq!(audit_total(&svc), 1);

    let feature = svc.create_feature(&owner, product.id, "Export", "exp").unwrap();
    assert_eq!(audit_total(&svc), 2);

    svc.delete_feature(&owner, feature.id).unwrap();
    assert_eq!(audit_total(&svc), 3);

    let logs = svc
        .list_audit_logs(&admin(), &AuditFilter::default(), Page::default())
        .unwrap();
    assert!(logs.list.iter().all(|e| e.operator_id == 7));
    assert!(logs.list.iter().all(|e| e.ip == "192.0.2.9"));
}

#[test]
fn issued_artifact_round_trips_via_services() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let f = svc.create_feature(&owner, product.id, "Export", "exp").unwrap();
    let lt = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[f.id])
        .unwrap();
    svc.add_device(
        &owner,
        &NewDevice {
            sn: "SN-0001".into(),
            product_id: product.id,
            license_type_id: lt.license_type.id,
            oem_tag: "acme".into(),
            remark: String::new(),
        },
    )
    .unwrap();

    // Issuance needs no actor at all.
    let artifact = svc.issue_activation_artifact("SN-0001").unwrap();
    assert_eq!(artifact.filename, "SN-0001.lic");

    let envelope = open_artifact(
        &verifying_key(),
        &ArtifactKey::from_bytes(TEST_ARTIFACT_KEY),
        &artifact.bytes,
    )
    .unwrap();
    assert_eq!(envelope.data.sn, "SN-0001");
    assert_eq!(envelope.data.product_id, product.id);
    assert_eq!(envelope.data.license_type, lt.license_type.id);
    assert_eq!(envelope.data.feature_codes, vec!["exp"]);

    assert!(matches!(
        svc.issue_activation_artifact("SN-MISSING"),
        Err(ServiceError::NotFound("device"))
    ));
}

#[test]
fn license_reassignment_moves_the_whole_batch() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let basic = svc
        .create_license_type(&owner, product.id, "Basic", "basic", &[])
        .unwrap();
    let pro = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[])
        .unwrap();

    let sns: Vec<String> = (1..=5).map(|i| format!("SN-{i}")).collect();
    let created = svc
        .add_devices_batch(&owner, &sns, product.id, basic.license_type.id, "", "")
        .unwrap();
    let ids: Vec<i64> = created.iter().map(|d| d.id).collect();
    let before = audit_total(&svc);

    let moved = svc
        .reassign_license(&owner, &ids, pro.license_type.id, "tier bump")
        .unwrap();
    assert_eq!(moved.len(), 5);
    assert!(moved.iter().all(|d| d.license_type_id == pro.license_type.id));

    // One ledger entry per reassigned device, each with both snapshots.
    assert_eq!(audit_total(&svc), before + 5);
    let logs = svc
        .list_audit_logs(&admin(), &AuditFilter::default(), Page::default())
        .unwrap();
    let entry: serde_json::Value = serde_json::from_str(&logs.list[0].details).unwrap();
    assert_eq!(
        entry["old_device"]["license_type_id"],
        basic.license_type.id
    );
    assert_eq!(entry["new_device"]["license_type_id"], pro.license_type.id);
}

#[test]
fn license_reassignment_rejects_foreign_license_type() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let other = seed_product(&svc, &owner, "B", "Beta");
    let home = svc
        .create_license_type(&owner, product.id, "Basic", "basic", &[])
        .unwrap();
    let foreign = svc
        .create_license_type(&owner, other.id, "Pro", "pro", &[])
        .unwrap();

    let device = svc
        .add_device(
            &owner,
            &NewDevice {
                sn: "SN-1".into(),
                product_id: product.id,
                license_type_id: home.license_type.id,
                oem_tag: String::new(),
                remark: String::new(),
            },
        )
        .unwrap();

    let err = svc
        .reassign_license(&owner, &[device.id], foreign.license_type.id, "")
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    // Unchanged.
    let fetched = svc.get_device_by_sn(&owner, "SN-1").unwrap();
    assert_eq!(fetched.license_type_id, home.license_type.id);
}

#[test]
fn device_listing_requires_a_readable_product_scope() {
    let svc = services();
    let owner = Actor::new(7);
    let outsider = Actor::new(8);
    let product = seed_product(&svc, &owner, "A", "Alpha");

    let err = svc
        .list_devices(&owner, &DeviceFilter::default(), Page::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let scoped = DeviceFilter {
        product_id: Some(product.id),
        ..Default::default()
    };
    assert!(svc.list_devices(&owner, &scoped, Page::default()).is_ok());
    assert!(matches!(
        svc.list_devices(&outsider, &scoped, Page::default()),
        Err(ServiceError::PermissionDenied)
    ));

    // The super-admin may query globally.
    assert!(svc
        .list_devices(&admin(), &DeviceFilter::default(), Page::default())
        .is_ok());
}

#[test]
fn audit_listing_scope_mirrors_read_access() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");

    let err = svc
        .list_audit_logs(&owner, &AuditFilter::default(), Page::default())
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let scoped = AuditFilter {
        product_id: Some(product.id),
        ..Default::default()
    };
    let logs = svc.list_audit_logs(&owner, &scoped, Page::default()).unwrap();
    assert_eq!(logs.total, 1);
}

#[test]
fn device_delete_requires_the_main_role() {
    let svc = services();
    let owner = Actor::new(7);
    let writer = Actor::new(9);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let lt = svc
        .create_license_type(&owner, product.id, "Pro", "pro", &[])
        .unwrap();
    let writer_row = svc.add_manager(&owner, product.id, 9, "").unwrap();
    svc.modify_product(
        &owner,
        product.id,
        &ProductChanges {
            assistant_updates: vec![AssistantUpdate {
                manager_id: writer_row.id,
                permission: Some(ManagerPermission::Full),
                remark: None,
            }],
            ..Default::default()
        },
    )
    .unwrap();

    let device = svc
        .add_device(
            &writer,
            &NewDevice {
                sn: "SN-1".into(),
                product_id: product.id,
                license_type_id: lt.license_type.id,
                oem_tag: String::new(),
                remark: String::new(),
            },
        )
        .unwrap();

    assert!(matches!(
        svc.delete_device(&writer, device.id),
        Err(ServiceError::PermissionDenied)
    ));
    svc.delete_device(&owner, device.id).unwrap();
}

#[test]
fn version_lifecycle_with_associations() {
    let svc = services();
    let owner = Actor::new(7);
    let product = seed_product(&svc, &owner, "A", "Alpha");
    let f = svc.create_feature(&owner, product.id, "Export", "exp").unwrap();
    let now = Utc::now();

    let sw = svc
        .create_software_version(&owner, product.id, "1.2.0", now, "GA")
        .unwrap();
    let fw = svc
        .create_firmware_version(&owner, product.id, "fw-7", now, "")
        .unwrap();

    assert!(matches!(
        svc.create_software_version(&owner, product.id, "1.2.0", now, ""),
        Err(ServiceError::Conflict(Conflict::SoftwareVersion))
    ));

    svc.update_software_associations(&owner, sw.id, &[f.id], &[fw.id])
        .unwrap();

    let listed = svc
        .list_software_versions(&owner, product.id, Page::default())
        .unwrap();
    assert_eq!(listed.total, 1);

    svc.delete_software_version(&owner, sw.id).unwrap();
    svc.delete_firmware_version(&owner, fw.id).unwrap();
    assert_eq!(
        svc.list_firmware_versions(&owner, product.id, Page::default())
            .unwrap()
            .total,
        0
    );
}
