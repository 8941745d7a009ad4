// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Form metadata store: entries, lists and the resume prompt.

use std::sync::Arc;

use kickstart_app_core::metadata::{FORM_LIST, LAST_SAVED_TIMESTAMP};
use kickstart_app_core::{
    FormMetaData, FormMetaDataStore, KickstartPrefs, PersistentStore, StepDescriptor,
};
use kickstart_dry_tests::{FakeClock, InMemoryStorage, FAKE_EPOCH_MILLIS};
use serde_json::json;

fn fixture() -> (FormMetaDataStore<InMemoryStorage>, InMemoryStorage, FakeClock) {
    let storage = InMemoryStorage::new();
    let clock = FakeClock::new();
    let store = FormMetaDataStore::new(
        PersistentStore::new(storage.clone()),
        Arc::new(clock.clone()),
        &KickstartPrefs::default(),
    );
    (store, storage, clock)
}

fn entry(label: &str, value: &str) -> FormMetaData {
    FormMetaData {
        label: label.into(),
        display_value: value.into(),
        key: None,
    }
}

#[test]
fn save_and_delete_entries_update_timestamp() {
    let (store, _storage, clock) = fixture();

    store
        .save_meta_data_entry("network", "cidr", entry("CIDR", "100.96.0.0/11"))
        .unwrap();
    assert_eq!(store.last_saved_timestamp().unwrap(), Some(FAKE_EPOCH_MILLIS));

    store
        .save_meta_data_entry("network", "proxy", entry("PROXY", "no"))
        .unwrap();
    clock.advance_millis(10);
    store.delete_meta_data_entry("network", "proxy").unwrap();

    let data = store.get_meta_data("network").unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data["cidr"].display_value, "100.96.0.0/11");
    assert_eq!(
        store.last_saved_timestamp().unwrap(),
        Some(FAKE_EPOCH_MILLIS + 10)
    );
}

#[test]
fn metadata_uses_camel_case_on_the_wire() {
    let (store, storage, _clock) = fixture();
    let mut e = entry("Region", "US East");
    e.key = Some("us-east-1".into());
    store.save_meta_data_entry("provider", "region", e).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&storage.raw_string("provider_metadata").unwrap()).unwrap();
    assert_eq!(
        raw,
        json!({"region": {"label": "Region", "displayValue": "US East", "key": "us-east-1"}})
    );
}

#[test]
fn form_list_append_is_idempotent() {
    let (store, storage, _clock) = fixture();
    store.update_form_list("provider").unwrap();
    store.update_form_list("network").unwrap();
    store.update_form_list("provider").unwrap();

    assert_eq!(store.get_form_list().unwrap(), vec!["provider", "network"]);
    store.reset_form_list().unwrap();
    assert!(store.get_form_list().unwrap().is_empty());
    assert!(storage.contains_key(FORM_LIST));
}

#[test]
fn step_list_keeps_order() {
    let (store, _storage, _clock) = fixture();
    let steps = vec![
        StepDescriptor {
            title: "IaaS Provider".into(),
            description: "Validate the vSphere provider account".into(),
        },
        StepDescriptor {
            title: "Network".into(),
            description: "Cluster service and pod CIDRs".into(),
        },
    ];
    store.set_step_list(&steps).unwrap();
    assert_eq!(store.get_step_list().unwrap(), steps);

    store.reset_step_list().unwrap();
    assert!(store.get_step_list().unwrap().is_empty());
}

#[test]
fn form_data_snapshot_round_trips() {
    let (store, _storage, _clock) = fixture();
    assert_eq!(store.get_form_data("vpc").unwrap(), None);
    store.set_form_data("vpc", &json!({"vpc": "10.0.0.0/16"})).unwrap();
    assert_eq!(
        store.get_form_data("vpc").unwrap(),
        Some(json!({"vpc": "10.0.0.0/16"}))
    );
}

#[test]
fn prompt_requires_an_old_timestamp() {
    let (store, _storage, clock) = fixture();
    assert!(!store.should_prompt_clear_local_storage().unwrap());

    store.update_last_saved_timestamp().unwrap();
    clock.advance_minutes(29);
    assert!(!store.should_prompt_clear_local_storage().unwrap());

    clock.advance_minutes(1);
    assert!(!store.should_prompt_clear_local_storage().unwrap());
    clock.advance_millis(1);
    assert!(store.should_prompt_clear_local_storage().unwrap());
}

#[test]
fn delete_all_saved_data_clears_and_restamps() {
    let (store, storage, clock) = fixture();
    store
        .save_meta_data_entry("provider", "host", entry("Host", "vc.local"))
        .unwrap();
    store.update_form_list("provider").unwrap();
    clock.advance_minutes(45);

    store.delete_all_saved_data().unwrap();

    assert!(store.get_meta_data("provider").unwrap().is_empty());
    assert!(store.get_form_list().unwrap().is_empty());
    assert!(storage.contains_key(LAST_SAVED_TIMESTAMP));
    assert!(!store.should_prompt_clear_local_storage().unwrap());
}

#[test]
fn concurrent_entry_saves_keep_every_field() {
    let (store, _storage, _clock) = fixture();

    std::thread::scope(|scope| {
        for writer in 0..4 {
            let store = &store;
            scope.spawn(move || {
                for n in 0..25 {
                    let field = format!("w{writer}-f{n}");
                    store
                        .save_meta_data_entry("awsForm", &field, entry("Label", "v"))
                        .unwrap();
                    store.update_form_list(&format!("form{writer}")).unwrap();
                }
            });
        }
    });

    assert_eq!(store.get_meta_data("awsForm").unwrap().len(), 100);
    assert_eq!(store.get_form_list().unwrap().len(), 4);
}
