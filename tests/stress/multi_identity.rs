//! Stress test: 100 identities sharing one storage root.

use std::collections::HashSet;

use ipstore::{sanitize, FixedClock, IpStore, JsonFileEngine, Lookup, StoreConfig, Value};

fn identity(i: usize) -> String {
    match i % 3 {
        0 => format!("10.0.{}.{}", i / 256, i % 256),
        1 => format!("2001:db8::{i:x}"),
        _ => format!("client-{i}.example.com"),
    }
}

#[test]
fn stress_100_unique_tokens() {
    let tokens: HashSet<String> = (0..100).map(|i| sanitize(&identity(i)).0).collect();
    assert_eq!(tokens.len(), 100);
}

#[test]
fn stress_100_identities_isolated() {
    let tmp = tempfile::tempdir().unwrap();
    let clock = FixedClock::ymd(2025, 8, 7).unwrap();

    let stores: Vec<_> = (0..100)
        .map(|i| {
            IpStore::with_parts(
                StoreConfig::new(tmp.path()),
                identity(i),
                JsonFileEngine::new(),
                clock,
            )
            .unwrap()
        })
        .collect();

    for (i, store) in stores.iter().enumerate() {
        store.write_key("owner", identity(i)).unwrap();
    }

    let bucket = tmp.path().join("2025-08-07");
    assert_eq!(std::fs::read_dir(&bucket).unwrap().count(), 100);

    for (i, store) in stores.iter().enumerate() {
        assert_eq!(
            store.read_key("owner").unwrap(),
            Lookup::Found(Value::from(identity(i)))
        );
    }

    // Deleting one record leaves the others alone.
    assert!(stores[0].delete_record());
    assert_eq!(stores[0].read_key("owner").unwrap(), Lookup::RecordMissing);
    assert!(stores[1].file_exists());
    assert_eq!(std::fs::read_dir(&bucket).unwrap().count(), 99);
}
