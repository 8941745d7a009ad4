// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Key index and clear semantics of the durable store.

use std::collections::HashMap;

use kickstart_app_core::store::ALL_KEYS;
use kickstart_app_core::{ConfigService, KickstartPrefs, PersistentStore, StoreError};
use kickstart_dry_tests::InMemoryStorage;
use serde_json::json;

#[test]
fn set_and_get_round_trip_json_values() {
    let store = PersistentStore::new(InMemoryStorage::new());
    store.set_item("a", &json!({"x": [1, 2], "y": true})).unwrap();

    let value: Option<serde_json::Value> = store.get_item("a").unwrap();
    assert_eq!(value, Some(json!({"x": [1, 2], "y": true})));
    assert_eq!(store.get_item::<serde_json::Value>("missing").unwrap(), None);
}

#[test]
fn index_records_each_key_once() {
    let storage = InMemoryStorage::new();
    let store = PersistentStore::new(storage.clone());

    store.set_item("first", &1).unwrap();
    store.set_item("second", &2).unwrap();
    store.set_item("first", &3).unwrap();

    assert_eq!(store.keys().unwrap(), vec!["first", "second"]);
    assert_eq!(store.get_item::<i32>("first").unwrap(), Some(3));
    assert!(storage.contains_key(ALL_KEYS));
}

#[test]
fn remove_item_drops_key_from_index_and_tolerates_missing() {
    let store = PersistentStore::new(InMemoryStorage::new());
    store.set_item("gone", &"x").unwrap();

    store.remove_item("gone").unwrap();
    store.remove_item("never-written").unwrap();

    assert!(store.keys().unwrap().is_empty());
    assert_eq!(store.get_item::<String>("gone").unwrap(), None);
}

#[test]
fn clear_only_removes_owned_keys() {
    let mut foreign = HashMap::new();
    foreign.insert("someone_else".to_string(), b"\"keep me\"".to_vec());
    let storage = InMemoryStorage::with_data(foreign);
    let store = PersistentStore::new(storage.clone());

    store.set_item("vsphereStorage", &json!({})).unwrap();
    store.set_item("awsStorage", &json!({})).unwrap();
    store.clear().unwrap();

    assert_eq!(storage.keys(), vec!["someone_else".to_string()]);
    assert!(store.keys().unwrap().is_empty());
}

#[test]
fn storage_failures_propagate() {
    let storage = InMemoryStorage::new();
    let store = PersistentStore::new(storage.clone());
    storage.set_fail_on_save(true);

    let err = store.set_item("k", &1).unwrap_err();
    assert!(matches!(err, StoreError::Other(_)));

    storage.set_fail_on_save(false);
    storage.set_fail_on_load(true);
    assert!(store.get_item::<i32>("k").is_err());
}

#[test]
fn corrupt_json_is_a_serde_error() {
    let mut data = HashMap::new();
    data.insert("bad".to_string(), b"{not json".to_vec());
    let store = PersistentStore::new(InMemoryStorage::with_data(data));

    let err = store.get_item::<serde_json::Value>("bad").unwrap_err();
    assert!(matches!(err, StoreError::Serde(_)));
}

#[test]
fn config_service_loads_defaults_when_absent() {
    let storage = InMemoryStorage::new();
    let config = ConfigService::new(storage.clone());

    assert_eq!(config.load::<KickstartPrefs>("kickstart_prefs").unwrap(), None);

    let prefs = KickstartPrefs {
        stale_after_minutes: 5,
    };
    config.save("kickstart_prefs", &prefs).unwrap();
    assert_eq!(
        config.load::<KickstartPrefs>("kickstart_prefs").unwrap(),
        Some(prefs)
    );
    assert_eq!(storage.save_count(), 1);
}

#[test]
fn config_service_writes_stay_out_of_the_store_index() {
    let storage = InMemoryStorage::new();
    let config = ConfigService::new(storage.clone());
    let store = PersistentStore::new(storage.clone());
    config.save("kickstart_prefs", &KickstartPrefs::default()).unwrap();
    store.set_item("wizardStorage", &json!({})).unwrap();

    store.clear().unwrap();
    assert!(config.backend().contains_key("kickstart_prefs"));
    assert!(!storage.contains_key("wizardStorage"));

    config.remove("kickstart_prefs").unwrap();
    config.remove("kickstart_prefs").unwrap();
    assert_eq!(config.load::<KickstartPrefs>("kickstart_prefs").unwrap(), None);
    assert!(config.into_inner().keys().is_empty());
}

#[test]
fn concurrent_writers_keep_every_key_indexed() {
    let storage = InMemoryStorage::new();
    let store = PersistentStore::new(storage.clone());

    std::thread::scope(|scope| {
        for writer in 0..4 {
            let store = store.clone();
            scope.spawn(move || {
                for n in 0..50 {
                    store.set_item(&format!("w{writer}-k{n}"), &n).unwrap();
                }
            });
        }
    });

    assert_eq!(store.keys().unwrap().len(), 200);
    store.clear().unwrap();
    assert!(storage.keys().is_empty());
}

#[test]
fn update_item_skips_the_write_when_closure_returns_none() {
    let storage = InMemoryStorage::new();
    let store = PersistentStore::new(storage.clone());

    let wrote = store
        .update_item("forms", |forms: Option<Vec<String>>| {
            let mut forms = forms.unwrap_or_default();
            forms.push("aws".into());
            Some(forms)
        })
        .unwrap();
    assert!(wrote);

    let saves = storage.save_count();
    let wrote = store
        .update_item("forms", |_: Option<Vec<String>>| None)
        .unwrap();
    assert!(!wrote);
    assert_eq!(storage.save_count(), saves);
    assert_eq!(store.get_item::<Vec<String>>("forms").unwrap(), Some(vec!["aws".to_string()]));
}
