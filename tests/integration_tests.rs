// End-to-End Integration Tests for blockstore
// These tests verify complete append/scan/delete flows against real files

use blockstore::{Error, HeaderFormat, Options, Store};
use std::fs;
use tempfile::TempDir;

fn small_options(initial_blocks: u64) -> Options {
    Options::default().block_size(64).initial_size(initial_blocks * 64)
}

/// A single small record fits in one block and reads back intact
#[test]
fn test_single_record_round_trip() {
    env_logger::try_init().ok();
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("data.blk"), small_options(4)).unwrap();

    store.append(b"hello").unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.active_records, 1);
    assert_eq!(stats.free_blocks, 3);

    store.rewind().unwrap();
    assert_eq!(store.read_sequential().unwrap(), Some(b"hello".to_vec()));
    assert_eq!(store.read_sequential().unwrap(), None);
}

/// Records of 10, 70 and 5 bytes take 1, 2 and 1 blocks
#[test]
fn test_mixed_sizes_block_counts() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("data.blk"), small_options(8)).unwrap();

    let payloads = [vec![0xA1u8; 10], vec![0xB2u8; 70], vec![0xC3u8; 5]];
    for payload in &payloads {
        store.append(payload).unwrap();
    }

    assert_eq!(store.scan_all_offsets().unwrap(), vec![0, 64, 192]);

    store.rewind().unwrap();
    let mut scanned = Vec::new();
    while let Some(payload) = store.read_sequential().unwrap() {
        scanned.push(payload);
    }
    assert_eq!(scanned.len(), 3);
    assert_eq!(scanned, payloads.to_vec());
}

/// Delete returns the payload and leaves the file size and other ordinals alone
#[test]
fn test_delete_middle_record() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.blk");
    let store = Store::open(&path, small_options(8)).unwrap();

    store.append(&[1u8; 10]).unwrap();
    store.append(&[2u8; 70]).unwrap();
    store.append(&[3u8; 5]).unwrap();
    store.sync().unwrap();
    let size_before = fs::metadata(&path).unwrap().len();

    assert_eq!(store.delete(1).unwrap(), vec![2u8; 70]);
    store.sync().unwrap();

    assert_eq!(store.read_at(0).unwrap(), Some(vec![1u8; 10]));
    assert_eq!(store.read_at(2).unwrap(), Some(vec![3u8; 5]));
    assert_eq!(fs::metadata(&path).unwrap().len(), size_before);

    let stats = store.stats().unwrap();
    assert_eq!(stats.active_records, 2);
    assert_eq!(stats.tombstones, 1);
}

/// Appending to a full region doubles it and places the record at the old end
#[test]
fn test_growth_when_full() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.blk");
    let store = Store::open(&path, small_options(4)).unwrap();

    for i in 0..4u8 {
        store.append(&[i; 40]).unwrap();
    }
    assert_eq!(store.stats().unwrap().free_blocks, 0);

    let offset = store.append(b"after growth").unwrap();
    assert_eq!(offset, 4 * 64);
    assert_eq!(store.read_at_offset(offset).unwrap(), b"after growth".to_vec());

    let stats = store.stats().unwrap();
    assert_eq!(stats.region_size, 8 * 64);
    assert_eq!(stats.growth_events, 1);
    store.sync().unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 8 * 64);

    // Everything written before growth is still intact
    for i in 0..4u8 {
        assert_eq!(store.read_at(i as u64).unwrap(), Some(vec![i; 40]));
    }
}

/// Records survive close and reopen
#[test]
fn test_reopen_persists_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.blk");

    {
        let store = Store::open(&path, small_options(2)).unwrap();
        for i in 0..20u32 {
            store.append(format!("record_{:04}", i).as_bytes()).unwrap();
        }
        store.delete(5).unwrap();
        store.close().unwrap();
    }

    let store = Store::open(&path, small_options(2)).unwrap();
    let records = store.records().unwrap();
    assert_eq!(records.len(), 19);
    assert_eq!(store.read_at(4).unwrap(), Some(b"record_0004".to_vec()));
    assert!(matches!(store.read_at(5), Err(Error::RecordDeleted { ordinal: 5 })));
    assert_eq!(store.read_at(19).unwrap(), Some(b"record_0019".to_vec()));

    // The freed slot is reused before the region grows again
    let size = store.stats().unwrap().region_size;
    store.append(b"reuse").unwrap();
    assert_eq!(store.stats().unwrap().region_size, size);
}

/// The persisted format wins over the options passed on reopen
#[test]
fn test_reopen_keeps_persisted_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.blk");

    {
        let options = small_options(4).header_format(HeaderFormat::Wide);
        let store = Store::open(&path, options).unwrap();
        store.append(&[9u8; 50]).unwrap();
        store.close().unwrap();
    }

    let options = Options::default().block_size(512);
    let store = Store::open(&path, options).unwrap();
    assert_eq!(store.block_size(), 64);
    assert_eq!(store.header_format(), HeaderFormat::Wide);
    assert_eq!(store.read_at(0).unwrap(), Some(vec![9u8; 50]));
}

/// Wide headers leave less room per block
#[test]
fn test_wide_header_format() {
    let dir = TempDir::new().unwrap();
    let options = small_options(4).header_format(HeaderFormat::Wide);
    let store = Store::open(dir.path().join("data.blk"), options).unwrap();

    // 48 + 16 fits one block; 49 + 16 needs two
    store.append(&[1u8; 48]).unwrap();
    store.append(&[2u8; 49]).unwrap();
    assert_eq!(store.scan_all_offsets().unwrap(), vec![0, 64]);
    assert_eq!(store.stats().unwrap().free_blocks, 1);
}

/// The memory-mapped backend behaves like the file backend
#[cfg(feature = "mmap")]
#[test]
fn test_mmap_backend() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.blk");

    {
        let options = small_options(2).backend(blockstore::Backend::Mmap);
        let store = Store::open(&path, options).unwrap();
        for i in 0..10u8 {
            store.append(&vec![i; 30 + i as usize * 10]).unwrap();
        }
        assert_eq!(store.delete(3).unwrap(), vec![3u8; 60]);
        store.close().unwrap();
    }

    // Read back through the plain file backend
    let store = Store::open(&path, small_options(2)).unwrap();
    let records = store.records().unwrap();
    assert_eq!(records.len(), 9);
    assert_eq!(store.read_at(9).unwrap(), Some(vec![9u8; 120]));
}

/// Ordinal lookups agree with and without the offset cache
#[test]
fn test_offset_cache_matches_linear_scan() {
    let dir = TempDir::new().unwrap();
    let cached = Store::open(dir.path().join("cached.blk"), small_options(4)).unwrap();
    let uncached =
        Store::open(dir.path().join("uncached.blk"), small_options(4).offset_cache(false))
            .unwrap();

    for store in [&cached, &uncached] {
        for i in 0..30u32 {
            store.append(&vec![i as u8; (i as usize * 7) % 150]).unwrap();
        }
        store.delete(7).unwrap();
        store.delete(12).unwrap();
        store.append(b"late append").unwrap();
    }

    assert_eq!(cached.scan_all_offsets().unwrap(), uncached.scan_all_offsets().unwrap());
    for ordinal in 0..32 {
        let a = cached.read_at(ordinal);
        let b = uncached.read_at(ordinal);
        match (a, b) {
            (Ok(x), Ok(y)) => assert_eq!(x, y, "ordinal {}", ordinal),
            (Err(Error::RecordDeleted { .. }), Err(Error::RecordDeleted { .. })) => {}
            (x, y) => panic!("ordinal {}: {:?} vs {:?}", ordinal, x, y),
        }
    }
}

/// Empty payloads still occupy a block and read back as empty
#[test]
fn test_empty_payload() {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("data.blk"), small_options(2)).unwrap();

    store.append(b"").unwrap();
    store.append(b"after").unwrap();

    assert_eq!(store.read_at(0).unwrap(), Some(Vec::new()));
    assert_eq!(store.read_at(1).unwrap(), Some(b"after".to_vec()));
}

/// Parent directories are created on demand
#[test]
fn test_open_creates_parent_dirs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("data.blk");
    let store = Store::open(&path, small_options(1)).unwrap();
    store.append(b"x").unwrap();
    assert_eq!(store.path(), Some(path.as_path()));
    assert!(path.exists());
}
