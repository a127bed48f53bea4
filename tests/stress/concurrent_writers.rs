//! Concurrency test: parallel writers on shared and separate records.
//!
//! Validates that record locking keeps read-modify-write sequences intact
//! and that directory creation races are harmless.

use std::sync::{Arc, Barrier};
use std::thread;

use ipstore::{FixedClock, IpStore, JsonFileEngine, Lookup, StoreConfig, Value};

fn open(root: &std::path::Path, identity: &str) -> IpStore<JsonFileEngine, FixedClock> {
    let clock = FixedClock::ymd(2025, 8, 7).unwrap();
    IpStore::with_parts(StoreConfig::new(root), identity, JsonFileEngine::new(), clock).unwrap()
}

#[test]
fn stress_20_threads_distinct_keys_same_identity() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Arc::new(tmp.path().to_path_buf());
    let barrier = Arc::new(Barrier::new(20));

    let mut handles = Vec::new();
    for thread_id in 0..20 {
        let root = Arc::clone(&root);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let store = open(&root, "198.51.100.1");
            barrier.wait();
            for i in 0..10 {
                store
                    .write_key(&format!("t{thread_id}_k{i}"), i)
                    .expect("write should succeed");
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let store = open(&root, "198.51.100.1");
    for thread_id in 0..20 {
        for i in 0..10 {
            assert_eq!(
                store.read_key(&format!("t{thread_id}_k{i}")).unwrap(),
                Lookup::Found(Value::from(i)),
                "lost write t{thread_id}_k{i}"
            );
        }
    }
}

#[test]
fn stress_50_threads_distinct_identities() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Arc::new(tmp.path().to_path_buf());
    let barrier = Arc::new(Barrier::new(50));

    let mut handles = Vec::new();
    for thread_id in 0..50 {
        let root = Arc::clone(&root);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            let store = open(&root, &format!("10.1.0.{thread_id}"));
            barrier.wait();
            store.write_key("n", thread_id).expect("write should succeed");
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    for thread_id in 0..50 {
        let store = open(&root, &format!("10.1.0.{thread_id}"));
        assert_eq!(
            store.read_key("n").unwrap(),
            Lookup::Found(Value::from(thread_id))
        );
    }
}

#[test]
fn stress_readers_during_writes() {
    let tmp = tempfile::tempdir().unwrap();
    let root = Arc::new(tmp.path().to_path_buf());
    open(&root, "203.0.113.7").write_key("n", 0).unwrap();

    let writer = {
        let root = Arc::clone(&root);
        thread::spawn(move || {
            let store = open(&root, "203.0.113.7");
            for i in 1..=100 {
                store.write_key("n", i).unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let root = Arc::clone(&root);
        readers.push(thread::spawn(move || {
            let store = open(&root, "203.0.113.7");
            for _ in 0..100 {
                match store.read_key("n").unwrap() {
                    Lookup::Found(Value::Int(n)) => assert!((0..=100).contains(&n)),
                    other => panic!("unexpected read result {other:?}"),
                }
            }
        }));
    }

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }

    assert_eq!(
        open(&root, "203.0.113.7").read_key("n").unwrap(),
        Lookup::Found(Value::Int(100))
    );
}
