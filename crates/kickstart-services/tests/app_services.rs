// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end: prefs loading, a save/reload/restore cycle, and registrar-driven steps.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use kickstart_app_core::{FormMetaData, KickstartPrefs};
use kickstart_config_fs::FsStorage;
use kickstart_dry_tests::{FakeClock, InMemoryStorage};
use kickstart_registrar::{EventType, FetchError, StepHandle};
use kickstart_services::AppServices;
use kickstart_user_data::{
    FeatureFlags, FieldMapping, FormGroup, ObjectRetrievalMap, StepMapping, UserDataIdentifier,
};
use serde_json::{json, Value};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{timeout, Duration};

fn services(storage: &InMemoryStorage, clock: &FakeClock) -> AppServices<InMemoryStorage> {
    AppServices::load(storage.clone(), Arc::new(clock.clone()), FeatureFlags::new())
}

fn provider_mapping() -> StepMapping {
    StepMapping::new(vec![
        FieldMapping::new("vcenterAddress").with_label("VCENTER SERVER").required(),
        FieldMapping::new("username").with_label("USERNAME"),
        FieldMapping::masked("password").with_label("PASSWORD"),
        FieldMapping::new("datacenter").primary_trigger(),
        FieldMapping::map("labels"),
    ])
}

fn password_display(app: &AppServices<InMemoryStorage>) -> Result<Option<String>> {
    let entry = app
        .user_data()
        .retrieve(&UserDataIdentifier::new("vsphere", "provider", "password"))?;
    Ok(entry.map(|e| e.display))
}

#[test]
fn load_persists_default_prefs_once() -> Result<()> {
    let storage = InMemoryStorage::new();
    let app = services(&storage, &FakeClock::new());
    assert_eq!(app.prefs(), &KickstartPrefs::default());
    let raw = storage.raw_string("kickstart_prefs").unwrap_or_default();
    assert!(raw.contains("\"stale_after_minutes\": 30"));

    app.save_prefs(&KickstartPrefs {
        stale_after_minutes: 5,
    })?;
    let reloaded = services(&storage, &FakeClock::new());
    assert_eq!(reloaded.prefs().stale_after_minutes, 5);
    Ok(())
}

#[test]
fn unreadable_prefs_fall_back_without_overwriting() {
    let storage = InMemoryStorage::with_data(HashMap::from([(
        "kickstart_prefs".to_owned(),
        b"not json".to_vec(),
    )]));
    let app = services(&storage, &FakeClock::new());
    assert_eq!(app.prefs(), &KickstartPrefs::default());
    assert_eq!(storage.raw_string("kickstart_prefs").as_deref(), Some("not json"));
}

#[test]
fn prefs_drive_staleness() -> Result<()> {
    let storage = InMemoryStorage::new();
    let clock = FakeClock::new();
    services(&storage, &clock).save_prefs(&KickstartPrefs {
        stale_after_minutes: 5,
    })?;
    let app = services(&storage, &clock);

    app.user_data().update_wizard_timestamp("vsphere")?;
    app.metadata().update_last_saved_timestamp()?;
    clock.advance_minutes(5);
    assert!(!app.user_data().is_wizard_data_old("vsphere")?);
    assert!(!app.metadata().should_prompt_clear_local_storage()?);
    clock.advance_millis(1);
    assert!(app.user_data().is_wizard_data_old("vsphere")?);
    assert!(app.metadata().should_prompt_clear_local_storage()?);
    Ok(())
}

#[test]
fn saved_step_restores_after_reload() -> Result<()> {
    let storage = InMemoryStorage::new();
    let clock = FakeClock::new();
    let mapping = provider_mapping();
    {
        let app = services(&storage, &clock);
        let form = FormGroup::new()
            .with_value("vcenterAddress", json!("vc.corp.local"))
            .with_value("username", json!("admin"))
            .with_value("password", json!("hunter2"))
            .with_value("datacenter", json!("/dc0"))
            .with_value("labels", json!({"env": "lab"}));
        let report = app
            .form_service()
            .store_from_mapping("vsphere", "provider", &mapping, &form)?;
        assert!(report.is_clean());
        app.metadata().save_meta_data_entry(
            "provider",
            "vcenterAddress",
            FormMetaData {
                label: "VCENTER SERVER".into(),
                display_value: "vc.corp.local".into(),
                key: None,
            },
        )?;
        app.metadata().update_form_list("provider")?;
    }

    let app = services(&storage, &clock);
    assert_eq!(app.metadata().get_form_list()?, vec!["provider"]);
    assert!(!app.user_data().is_wizard_data_old("vsphere")?);

    let mut form = FormGroup::new();
    app.form_service().build_form(
        &mut form,
        "vsphere",
        "provider",
        &mapping,
        &ObjectRetrievalMap::new(),
    )?;
    assert_eq!(form.value_of("vcenterAddress"), Some(&json!("vc.corp.local")));
    assert_eq!(form.value_of("password"), Some(&json!("")));
    assert_eq!(form.value_of("datacenter"), Some(&json!("")));
    assert_eq!(password_display(&app)?.as_deref(), Some("********"));

    app.form_service().restore_form(
        "vsphere",
        "provider",
        &mut form,
        &mapping,
        &ObjectRetrievalMap::new(),
    )?;
    assert_eq!(form.value_of("datacenter"), Some(&json!("/dc0")));
    assert_eq!(form.value_of("labels"), Some(&json!({"env": "lab"})));

    let labeled = app
        .form_service()
        .labeled_fields_with_stored_data("vsphere", "provider", &mapping)?;
    assert_eq!(labeled, vec!["vcenterAddress", "username"]);
    // the restored secret control is empty, so the mask no longer claims a value
    assert_eq!(password_display(&app)?.as_deref(), Some(""));
    Ok(())
}

#[test]
fn delete_all_saved_data_keeps_prefs() -> Result<()> {
    let storage = InMemoryStorage::new();
    let app = services(&storage, &FakeClock::new());
    app.user_data().update_wizard_timestamp("aws")?;
    app.metadata().update_form_list("vpc")?;

    app.delete_all_saved_data()?;

    assert!(!storage.contains_key("awsStorage"));
    assert!(app.metadata().get_form_list()?.is_empty());
    assert!(storage.contains_key("kickstart_prefs"));
    Ok(())
}

#[test]
fn filesystem_backend_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let clock = FakeClock::new();
    let id = UserDataIdentifier::new("aws", "vpc", "vpcCidr");
    {
        let app = AppServices::load(
            FsStorage::at(dir.path())?,
            Arc::new(clock.clone()),
            FeatureFlags::new(),
        );
        let form = FormGroup::new().with_value("vpcCidr", json!("10.0.0.0/16"));
        app.form_service().store_from_mapping(
            "aws",
            "vpc",
            &StepMapping::new(vec![FieldMapping::new("vpcCidr")]),
            &form,
        )?;
    }
    let app = AppServices::load(
        FsStorage::at(dir.path())?,
        Arc::new(clock),
        FeatureFlags::new(),
    );
    assert_eq!(
        app.user_data().retrieve(&id)?.map(|e| e.value),
        Some(json!("10.0.0.0/16"))
    );
    assert!(dir.path().join("kickstart_prefs.json").exists());
    Ok(())
}

#[tokio::test]
async fn step_reacts_to_region_change() -> Result<()> {
    let storage = InMemoryStorage::new();
    let app = services(&storage, &FakeClock::new());
    let registrar = app.registrar();
    registrar.register(
        EventType::AwsGetExistingVpcs,
        |payload: Value| async move {
            match payload["region"].as_str() {
                Some("us-east-1") => Ok(vec!["vpc-a".to_owned(), "vpc-b".to_owned()]),
                Some(other) => Err(FetchError::message_only(format!("no access to {other}"))),
                None => Err(FetchError::new(Value::Null)),
            }
        },
        Some("Failed to retrieve VPCs:"),
    )?;

    let step = StepHandle::new("vpcForm");
    let (tx, mut rx) = unbounded_channel();
    registrar.step_subscribe(
        &step,
        EventType::AwsGetExistingVpcs,
        move |vpcs: &[String]| {
            let _ = tx.send(vpcs.to_vec());
        },
        None,
    )?;

    registrar.trigger(
        &[EventType::AwsGetExistingVpcs],
        Some(json!({"region": "us-east-1"})),
    );
    let vpcs = timeout(Duration::from_secs(1), rx.recv()).await?;
    assert_eq!(vpcs, Some(vec!["vpc-a".to_owned(), "vpc-b".to_owned()]));

    registrar.trigger(
        &[EventType::AwsGetExistingVpcs],
        Some(json!({"region": "ap-south-1"})),
    );
    let vpcs = timeout(Duration::from_secs(1), rx.recv()).await?;
    assert_eq!(vpcs, Some(Vec::new()));
    for _ in 0..100 {
        if !step.error_notification().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        step.error_notification(),
        "Failed to retrieve VPCs: no access to ap-south-1"
    );
    Ok(())
}
