//! Basic usage example for blockstore
//!
//! This example demonstrates the fundamental operations:
//! - Opening a store
//! - Appending records
//! - Scanning and reading by ordinal
//! - Deleting records and reusing their space

use blockstore::{Options, Store};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    // Configure store options
    let options = Options::default()
        .block_size(64)
        .initial_size(4 * 64); // 4 blocks, so growth shows up quickly

    // Start from scratch on every run
    let _ = std::fs::remove_dir_all("./example_data");

    // Open store (will be created if it doesn't exist)
    let store = Store::open("./example_data/records.blk", options)?;
    println!("Store opened successfully");

    // Append some records
    println!("Appending data...");
    for payload in ["hello", "a somewhat longer record that spans two blocks", "world"] {
        let offset = store.append(payload.as_bytes())?;
        println!("  {:?} => offset {}", payload, offset);
    }

    // Scan everything
    println!("Scanning...");
    store.rewind()?;
    while let Some(payload) = store.read_sequential()? {
        println!("  {}", String::from_utf8_lossy(&payload));
    }

    // Delete a record; the others keep their ordinals
    println!("Deleting ordinal 1...");
    let removed = store.delete(1)?;
    println!("  removed {:?}", String::from_utf8_lossy(&removed));
    if let Some(payload) = store.read_at(2)? {
        println!("  ordinal 2 is still {:?}", String::from_utf8_lossy(&payload));
    }

    // Fill the store past its initial size
    for i in 0..8 {
        store.append(format!("filler {}", i).as_bytes())?;
    }

    let stats = store.stats()?;
    println!("Stats: {:?}", stats);

    // Close store
    store.close()?;
    println!("Store closed");

    Ok(())
}
