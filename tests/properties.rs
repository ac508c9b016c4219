// Facade behaviour tests
// Exercise the public API against SQLite and in-memory backends

use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tierkv::entry::Entry;
use tierkv::{
    Backend, FacadeConfig, ManualClock, MemoryBackend, SetOptions, SqliteBackend, SqliteTable,
    StorageFacade, Tier,
};

fn memory_facade() -> (StorageFacade, MemoryBackend, MemoryBackend, ManualClock) {
    let durable = MemoryBackend::new();
    let ephemeral = MemoryBackend::new();
    let clock = ManualClock::new(1_700_000_000_000);
    let facade = StorageFacade::builder(durable.clone(), ephemeral.clone())
        .clock(clock.clone())
        .build();
    (facade, durable, ephemeral, clock)
}

fn versioned(version: &str) -> FacadeConfig {
    FacadeConfig {
        schema_version: version.to_string(),
        ..FacadeConfig::default()
    }
}

// ============================================================================
// ROUND TRIP
// ============================================================================

#[test]
fn test_roundtrip_small_and_large_values() {
    let (facade, _, _, _) = memory_facade();

    let small = json!({"courses": ["CS101", "MA201"], "gpa": 3.7, "active": true});
    let history: Vec<Value> = (0..200).map(|i| json!({"week": i, "score": i * 3})).collect();
    let large = json!({ "history": history });

    assert!(facade.set_durable("small", &small, SetOptions::new()).unwrap());
    assert!(facade.set_durable("large", &large, SetOptions::new()).unwrap());

    assert_eq!(facade.get_durable("small", Value::Null), small);
    assert_eq!(facade.get_durable("large", Value::Null), large);
}

#[test]
fn test_roundtrip_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    let value = json!({"dashboard": {"widgets": ["grades", "calendar"]}});

    {
        let facade = StorageFacade::new(
            SqliteBackend::open(&path, SqliteTable::Durable).unwrap(),
            SqliteBackend::open(&path, SqliteTable::Session).unwrap(),
        );
        facade.set_durable("layout", &value, SetOptions::new()).unwrap();
        facade.set_ephemeral("scratch", &1, SetOptions::new()).unwrap();
    }

    let facade = StorageFacade::new(
        SqliteBackend::open(&path, SqliteTable::Durable).unwrap(),
        SqliteBackend::open(&path, SqliteTable::Session).unwrap(),
    );
    assert_eq!(facade.get_durable("layout", Value::Null), value);
    assert_eq!(facade.get_ephemeral("scratch", 0), 1);
    assert_eq!(facade.get_durable("scratch", 0), 0);
}

// ============================================================================
// EXPIRY AND VERSIONING
// ============================================================================

#[test]
fn test_expired_entry_reads_as_default_and_is_deleted() {
    let (facade, _, ephemeral, clock) = memory_facade();

    facade
        .set_ephemeral("k", "v", SetOptions::new().expires_in(Duration::from_secs(1)))
        .unwrap();
    clock.advance(Duration::from_millis(1_001));

    assert_eq!(facade.get_ephemeral("k", "D".to_string()), "D");
    assert!(!ephemeral.contains("adb_io_k"));
}

#[test]
fn test_version_mismatch_reads_as_default_and_is_deleted() {
    let durable = MemoryBackend::new();

    let v1 = StorageFacade::builder(durable.clone(), MemoryBackend::new())
        .config(versioned("1.0"))
        .build();
    v1.set_durable("k", "written by 1.0", SetOptions::new()).unwrap();

    let v2 = StorageFacade::builder(durable.clone(), MemoryBackend::new())
        .config(versioned("2.0"))
        .build();
    assert_eq!(v2.get_durable("k", "default".to_string()), "default");
    assert!(!durable.contains("adb_io_k"));
}

// ============================================================================
// NAMESPACE ISOLATION
// ============================================================================

#[test]
fn test_foreign_keys_are_never_touched() {
    let (facade, durable, ephemeral, _) = memory_facade();
    durable.write("other_app_token", "secret").unwrap();
    ephemeral.write("other_app_state", "{broken").unwrap();

    facade.set_durable("mine", &1, SetOptions::new()).unwrap();

    let exported = facade.export_namespace();
    assert!(!exported.contains("other_app_token"));

    let usage = facade.usage();
    assert_eq!(usage.durable.item_count, 1);
    assert_eq!(usage.ephemeral.item_count, 0);

    facade.sweep_expired();
    facade.clear_all();

    assert_eq!(durable.read("other_app_token").unwrap(), Some("secret".to_string()));
    assert_eq!(ephemeral.read("other_app_state").unwrap(), Some("{broken".to_string()));
    assert!(!durable.contains("adb_io_mine"));
}

#[test]
fn test_custom_namespace() {
    let durable = MemoryBackend::new();
    let facade = StorageFacade::builder(durable.clone(), MemoryBackend::new())
        .config(FacadeConfig {
            namespace: "portal:".to_string(),
            ..FacadeConfig::default()
        })
        .build();

    facade.set_durable("k", &1, SetOptions::new()).unwrap();
    assert!(durable.contains("portal:k"));
}

// ============================================================================
// TIER PRECEDENCE
// ============================================================================

#[test]
fn test_ephemeral_wins_and_remove_clears_both() {
    let (facade, durable, ephemeral, _) = memory_facade();

    facade.set_durable("k", "A", SetOptions::new()).unwrap();
    facade.set_ephemeral("k", "B", SetOptions::new()).unwrap();
    assert_eq!(facade.get::<Option<String>>("k", None), Some("B".to_string()));

    assert!(facade.remove("k"));
    assert_eq!(facade.get::<Option<String>>("k", None), None);
    assert!(!durable.contains("adb_io_k"));
    assert!(!ephemeral.contains("adb_io_k"));
}

#[test]
fn test_generic_get_falls_back_when_ephemeral_is_stale() {
    let (facade, _, _, clock) = memory_facade();

    facade.set_durable("k", "durable", SetOptions::new()).unwrap();
    facade
        .set_ephemeral("k", "override", SetOptions::new().expires_in(Duration::from_secs(10)))
        .unwrap();
    assert_eq!(facade.get("k", String::new()), "override");

    clock.advance(Duration::from_secs(11));
    assert_eq!(facade.get("k", String::new()), "durable");
}

#[test]
fn test_null_session_value_falls_back_to_durable() {
    let (facade, _, ephemeral, _) = memory_facade();

    facade.set_durable("k", "durable", SetOptions::new()).unwrap();
    facade.set_ephemeral("k", &Value::Null, SetOptions::new()).unwrap();

    assert_eq!(facade.get::<Option<String>>("k", None), Some("durable".to_string()));
    assert_eq!(facade.get("k", Value::Null), json!("durable"));
    // The session entry itself is live and stays put
    assert!(ephemeral.contains("adb_io_k"));
    assert_eq!(facade.get_ephemeral("k", json!("default")), Value::Null);
}

// ============================================================================
// FAILURE RESILIENCE
// ============================================================================

#[test]
fn test_corrupt_entry_returns_default_and_is_removed() {
    let (facade, durable, _, _) = memory_facade();
    durable.write("adb_io_k", "this is not json").unwrap();

    assert_eq!(facade.get_durable("k", 42), 42);
    assert!(!durable.contains("adb_io_k"));
}

#[test]
fn test_oversized_write_leaves_prior_value() {
    let (facade, _, _, _) = memory_facade();
    facade.set_durable("k", "prior", SetOptions::new()).unwrap();

    let huge = "h".repeat(6 * 1024 * 1024);
    assert!(!facade.set_durable("k", &huge, SetOptions::new()).unwrap());
    assert_eq!(facade.get_durable("k", String::new()), "prior");
}

#[test]
fn test_both_tiers_unavailable() {
    let facade = StorageFacade::new(MemoryBackend::unavailable(), MemoryBackend::unavailable());

    assert!(!facade.is_available(Tier::Durable));
    assert!(!facade.is_available(Tier::Ephemeral));
    assert!(!facade.set_cache("k", &1).unwrap());
    assert_eq!(facade.get("k", 3), 3);
    assert_eq!(facade.clear_all(), 0);
    assert_eq!(facade.export_namespace(), "{}");
    assert!(!facade.import_namespace("{}"));
}

// ============================================================================
// PREFERENCES AND SWEEP
// ============================================================================

#[test]
fn test_preferences_share_one_durable_entry() {
    let (facade, durable, _, _) = memory_facade();

    facade.set_preference("a", &1).unwrap();
    facade.set_preference("b", &2).unwrap();

    let all = facade.get_all_preferences();
    assert_eq!(all.get("a"), Some(&json!(1)));
    assert_eq!(all.get("b"), Some(&json!(2)));
    assert_eq!(durable.keys().unwrap(), vec!["adb_io_user_preferences".to_string()]);
}

#[test]
fn test_sweep_keeps_only_valid_entries() {
    let durable = MemoryBackend::new();
    let clock = ManualClock::new(50_000);

    let expired = Entry::new(json!("old"), 0, "1.0").with_expiry(10_000);
    let valid = Entry::new(json!("fresh"), 0, "1.0");
    durable.write("adb_io_expired", &expired.to_json().unwrap()).unwrap();
    durable.write("adb_io_valid", &valid.to_json().unwrap()).unwrap();
    durable.write("adb_io_corrupt", "<<garbage>>").unwrap();

    let facade = StorageFacade::builder(durable.clone(), MemoryBackend::new())
        .config(FacadeConfig {
            sweep_on_start: false,
            ..FacadeConfig::default()
        })
        .clock(clock)
        .build();

    let report = facade.sweep_expired();
    assert_eq!(report.expired, 1);
    assert_eq!(report.corrupt, 1);
    assert_eq!(durable.keys().unwrap(), vec!["adb_io_valid".to_string()]);
    assert_eq!(facade.get_durable("valid", String::new()), "fresh");
}
