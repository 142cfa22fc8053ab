//! # blockstore - A Block-Aligned Record Store
//!
//! blockstore keeps variable-length binary records in a single file. Every
//! record is padded to a whole number of fixed-size blocks and starts with a
//! small header, so the file can be scanned front to back, addressed by
//! ordinal position, edited in place by delete, and grown without moving
//! existing data.
//!
//! ## Architecture
//!
//! The store is built from a few small layers:
//!
//! - **Codec**: fixed-width scalars, varints and length-prefixed blobs
//! - **Layout**: block-aligned sizes and record header encoding
//! - **Region**: the backing bytes (plain file, memory map, or `Vec`)
//! - **Allocator**: first-fit search for runs of free blocks
//! - **Store**: append, scan, ordinal lookup, delete and growth
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use blockstore::{Options, Store};
//!
//! # fn main() -> Result<(), blockstore::Error> {
//! // Open or create a store with 64-byte blocks
//! let options = Options::default().block_size(64);
//! let store = Store::open("./data/records.blk", options)?;
//!
//! // Append records
//! store.append(b"hello")?;
//! store.append(b"world")?;
//!
//! // Read by ordinal
//! if let Some(payload) = store.read_at(0)? {
//!     println!("Found: {:?}", payload);
//! }
//!
//! // Delete in place
//! store.delete(0)?;
//!
//! store.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod allocator;
pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod meta;
pub mod region;
pub mod store;

// Re-exports
pub use allocator::{Allocation, Allocator};
pub use codec::{BinaryReader, BinaryWriter};
pub use config::{Backend, HeaderFormat, Options};
pub use error::{Error, Result};
pub use layout::{Layout, RecordHeader, RecordStatus};
pub use logging::Logger;
pub use meta::FormatMeta;
pub use region::{FileRegion, MemoryRegion, Region};
#[cfg(feature = "mmap")]
pub use region::MmapRegion;
pub use store::{Store, StoreStats};

/// Current version of blockstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
