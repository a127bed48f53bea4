//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle of one client's record:
//! 1. Nothing exists for a new identity
//! 2. Write, read, check and update keys
//! 3. Store every supported value type
//! 4. Count failed logins
//! 5. Delete the record
//! 6. Switch to flat mode, then wipe everything

use std::collections::BTreeMap;
use std::path::Path;

use ipstore::{FixedClock, IpStore, JsonFileEngine, Lookup, StoreConfig, Value};

const TEST_IP: &str = "192.168.1.100";

fn open(root: &Path, rotation: bool) -> IpStore<JsonFileEngine, FixedClock> {
    let config = StoreConfig::new(root).with_rotation(rotation);
    let clock = FixedClock::ymd(2025, 8, 7).unwrap();
    IpStore::with_parts(config, TEST_IP, JsonFileEngine::new(), clock).unwrap()
}

#[test]
fn full_workflow_write_read_delete_wipe() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("test_ip_storage");
    let store = open(&root, true);

    // ── Step 1: Fresh identity ──────────────────────────────────────────
    assert!(!store.file_exists(), "no record should exist initially");
    assert_eq!(store.read_key("test_key").unwrap(), Lookup::RecordMissing);
    assert!(!store.check_key("test_key").unwrap());

    // ── Step 2: Basic key operations ────────────────────────────────────
    store.write_key("test_key", "test_value").unwrap();
    assert!(store.file_exists(), "first write should create the record");
    assert_eq!(
        store.read_key("test_key").unwrap(),
        Lookup::Found(Value::from("test_value"))
    );
    assert!(store.check_key("test_key").unwrap());
    assert!(!store.check_key("nonexistent_key").unwrap());
    assert_eq!(store.read_key("nonexistent_key").unwrap(), Lookup::KeyMissing);

    store.write_key("test_key", "updated_value").unwrap();
    assert_eq!(
        store.read_key("test_key").unwrap(),
        Lookup::Found(Value::from("updated_value"))
    );

    // ── Step 3: Value types ─────────────────────────────────────────────
    let mut assoc = BTreeMap::new();
    assoc.insert("name", Value::from("John"));
    assoc.insert("age", Value::from(30));

    let data: Vec<(&str, Value)> = vec![
        ("string_key", Value::from("Hello World")),
        ("int_key", Value::from(42)),
        ("float_key", Value::from(3.14159)),
        ("bool_true_key", Value::from(true)),
        ("bool_false_key", Value::from(false)),
        ("null_key", Value::Null),
        ("array_key", Value::from(vec!["apple", "banana", "cherry"])),
        ("assoc_array_key", Value::from(assoc)),
        (
            "nested_array_key",
            Value::from_iter([(
                "users",
                Value::from(vec![
                    Value::from_iter([("id", Value::from(1)), ("name", Value::from("Alice"))]),
                    Value::from_iter([("id", Value::from(2)), ("name", Value::from("Bob"))]),
                ]),
            )]),
        ),
    ];
    for (key, value) in &data {
        store.write_key(key, value.clone()).unwrap();
        assert_eq!(
            store.read_key(key).unwrap(),
            Lookup::Found(value.clone()),
            "data mismatch for key '{key}'"
        );
    }

    // ── Step 4: Rate limiting counter ───────────────────────────────────
    store.write_key("login_failures", 0).unwrap();
    for _ in 0..5 {
        let current = store
            .read_key("login_failures")
            .unwrap()
            .into_value()
            .and_then(|v| v.as_i64())
            .expect("counter should be an integer");
        store.write_key("login_failures", current + 1).unwrap();
    }
    assert_eq!(
        store.read_key("login_failures").unwrap(),
        Lookup::Found(Value::Int(5))
    );

    // ── Step 5: Delete ──────────────────────────────────────────────────
    assert!(store.delete_record());
    assert!(!store.file_exists());
    assert_eq!(store.read_key("test_key").unwrap(), Lookup::RecordMissing);
    assert!(store.delete_record(), "second delete should also succeed");

    // ── Step 6: Flat mode and full wipe ─────────────────────────────────
    let flat = open(&root, false);
    flat.write_key("undated_test", "undated_value").unwrap();
    assert!(root.join("undated").join("192.168.1.100.db").is_file());
    assert_eq!(
        flat.read_key("undated_test").unwrap(),
        Lookup::Found(Value::from("undated_value"))
    );

    let report = flat.wipe_all_buckets();
    assert!(report.is_clean());
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    assert!(!flat.file_exists());
}

#[test]
fn full_workflow_rotation_across_days() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();

    for day in 1..=5 {
        let clock = FixedClock::ymd(2025, 8, day).unwrap();
        let config = StoreConfig::new(root);
        let store = IpStore::with_parts(config, TEST_IP, JsonFileEngine::new(), clock).unwrap();

        // Yesterday's counter never carries over.
        assert_eq!(store.read_key("hits").unwrap(), Lookup::RecordMissing);
        store.write_key("hits", day).unwrap();

        let buckets: Vec<String> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(buckets, vec![format!("2025-08-{day:02}")]);
    }
}

#[test]
fn full_workflow_from_request() {
    let tmp = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(tmp.path()).with_identity_source(
        ipstore::IdentitySource::ForwardedChain("X-Forwarded-For".to_string()),
    );
    let meta = ipstore::RequestMeta::new("10.0.0.1")
        .with_header("X-Forwarded-For", "203.0.113.50, 10.0.0.1");

    let store = IpStore::from_request(config, &meta).unwrap();
    assert_eq!(store.token().as_str(), "203.0.113.50");

    store.write_key("seen", true).unwrap();
    assert!(store.check_key("seen").unwrap());
}
