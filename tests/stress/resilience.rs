//! Resilience tests: corrupted record files, failed cleanup.

use ipstore::{FixedClock, IpStore, JsonFileEngine, Lookup, StoreConfig, StoreError, Value};

fn open(root: &std::path::Path) -> IpStore<JsonFileEngine, FixedClock> {
    let clock = FixedClock::ymd(2025, 8, 7).unwrap();
    IpStore::with_parts(StoreConfig::new(root), "192.0.2.44", JsonFileEngine::new(), clock).unwrap()
}

#[test]
fn resilience_corrupted_record_detected() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open(tmp.path());
    store.write_key("k", "v").unwrap();

    let path = store.record_path().record_file;
    let mut data = std::fs::read(&path).unwrap();
    data.truncate(data.len() / 2);
    std::fs::write(&path, data).unwrap();

    assert!(matches!(
        store.read_key("k"),
        Err(StoreError::InvalidFileFormat(_))
    ));
    assert!(store.check_key("k").is_err());
    assert!(store.write_key("k", "again").is_err());
}

#[test]
fn resilience_delete_recovers_from_corruption() {
    let tmp = tempfile::tempdir().unwrap();
    let store = open(tmp.path());
    store.write_key("k", "v").unwrap();
    std::fs::write(store.record_path().record_file, b"garbage").unwrap();

    assert!(store.delete_record());
    store.write_key("k", "fresh").unwrap();
    assert_eq!(
        store.read_key("k").unwrap(),
        Lookup::Found(Value::from("fresh"))
    );
}

#[cfg(unix)]
#[test]
fn resilience_failed_prune_does_not_fail_write() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let stale = tmp.path().join("2025-08-01");
    std::fs::create_dir_all(&stale).unwrap();
    std::fs::write(stale.join("old.db"), b"{}").unwrap();
    std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o555)).unwrap();

    // Root ignores directory permissions; nothing to assert in that case.
    let locked_down = std::fs::write(stale.join("canary"), b"").is_err();

    let store = open(tmp.path());
    store.write_key("k", 1).expect("write must succeed despite cleanup failure");
    assert_eq!(store.read_key("k").unwrap(), Lookup::Found(Value::Int(1)));

    if locked_down {
        assert!(stale.join("old.db").exists());
        let report = store.prune_stale_buckets();
        assert!(!report.is_clean());
    }

    std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o755)).unwrap();
    let report = store.prune_stale_buckets();
    assert!(report.is_clean());
    assert!(!stale.exists());
}
