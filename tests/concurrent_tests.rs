// Concurrent Access Tests for blockstore
// These tests verify that a shared store serializes callers correctly

use blockstore::{Error, Options, Store};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn open_shared(dir: &TempDir) -> Arc<Store> {
    let options = Options::default().block_size(64).initial_size(64 * 16);
    Arc::new(Store::open(dir.path().join("data.blk"), options).unwrap())
}

/// Test concurrent appends from multiple threads
#[test]
fn test_concurrent_appends() {
    let dir = TempDir::new().unwrap();
    let store = open_shared(&dir);

    let num_threads = 8;
    let appends_per_thread = 50;
    let mut handles = vec![];

    for thread_id in 0..num_threads {
        let store_clone = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            let mut offsets = Vec::new();
            for i in 0..appends_per_thread {
                let payload = format!("thread_{}_record_{}", thread_id, i);
                offsets.push((store_clone.append(payload.as_bytes()).unwrap(), payload));
            }
            offsets
        }));
    }

    let mut written = Vec::new();
    for handle in handles {
        written.extend(handle.join().unwrap());
    }

    assert_eq!(written.len(), num_threads * appends_per_thread);
    for (offset, payload) in &written {
        assert_eq!(store.read_at_offset(*offset).unwrap(), payload.as_bytes());
    }

    let mut offsets: Vec<u64> = written.iter().map(|(o, _)| *o).collect();
    offsets.sort_unstable();
    offsets.dedup();
    assert_eq!(offsets.len(), written.len());
    assert_eq!(store.stats().unwrap().active_records, written.len() as u64);
}

/// Test readers running while a writer appends and deletes
#[test]
fn test_readers_during_writes() {
    let dir = TempDir::new().unwrap();
    let store = open_shared(&dir);
    for i in 0..20u32 {
        store.append(&i.to_le_bytes()).unwrap();
    }

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = vec![];

    {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for i in 20..120u32 {
                store.append(&i.to_le_bytes()).unwrap();
                if i % 10 == 0 {
                    store.delete((i / 10) as u64).unwrap();
                }
            }
        }));
    }

    for _ in 0..3 {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..50 {
                for payload in store.records().unwrap() {
                    assert_eq!(payload.len(), 4);
                }
                match store.read_at(15) {
                    Ok(Some(payload)) => assert_eq!(payload, 15u32.to_le_bytes()),
                    other => panic!("unexpected read_at(15): {:?}", other),
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = store.stats().unwrap();
    assert_eq!(stats.active_records, 110);
    // Appends that wrapped around may have reused some tombstones
    assert!(stats.tombstones <= 10);
}

/// Test that closing from one thread stops all others cleanly
#[test]
fn test_close_while_shared() {
    let dir = TempDir::new().unwrap();
    let store = open_shared(&dir);
    store.append(b"before close").unwrap();

    store.close().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || matches!(store.append(b"late"), Err(Error::StoreClosed)))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}
