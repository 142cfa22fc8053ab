//! Backing storage for the record region.
//!
//! The allocator and store only ever see a [`Region`]: a flat, fixed-length
//! byte range that supports positional reads and writes, resizing, and
//! syncing. Whether the bytes live in a plain file, a memory mapping or a
//! `Vec` is decided once, at open time.
//!
//! # Invariants
//!
//! - `read_at` outside `[0, len())` fails with `UnexpectedEndOfStream`; a
//!   short read from the backing medium is an `Io` error
//! - `write_at` never writes past `len()`; the region only grows via `set_len`
//! - bytes added by `set_len` read back as zero
//! - after `sync` returns, every prior write is on durable storage

mod file;
mod memory;
#[cfg(feature = "mmap")]
mod mmap;

pub use file::FileRegion;
pub use memory::MemoryRegion;
#[cfg(feature = "mmap")]
pub use mmap::MmapRegion;

use crate::config::Backend;
use crate::error::{Error, Result};
use std::path::Path;

/// A resizable byte region addressed by offset.
pub trait Region: Send {
    /// Current size of the region in bytes.
    fn len(&self) -> u64;

    /// True when the region holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes `data` at `offset`. The write must lie inside the region.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()>;

    /// Resizes the region; new bytes are zero.
    fn set_len(&mut self, len: u64) -> Result<()>;

    /// Pushes buffered writes to the operating system.
    fn flush(&mut self) -> Result<()>;

    /// Flushes and forces all data to durable storage.
    fn sync(&mut self) -> Result<()>;
}

/// Opens (creating if absent) the region file at `path` with `backend`.
pub fn open_region(path: &Path, backend: Backend) -> Result<Box<dyn Region>> {
    match backend {
        Backend::File => Ok(Box::new(FileRegion::open(path)?)),
        #[cfg(feature = "mmap")]
        Backend::Mmap => Ok(Box::new(MmapRegion::open(path)?)),
    }
}

/// Fails with `UnexpectedEndOfStream` unless `[offset, offset + n)` lies
/// inside a region of `len` bytes.
pub(crate) fn check_read(offset: u64, n: usize, len: u64) -> Result<()> {
    match offset.checked_add(n as u64) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::UnexpectedEndOfStream),
    }
}

/// Rejects writes that would extend the region implicitly.
pub(crate) fn check_write(offset: u64, n: usize, len: u64) -> Result<()> {
    match offset.checked_add(n as u64) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::invalid_argument(format!(
            "write of {} bytes at offset {} exceeds region size {}",
            n, offset, len
        ))),
    }
}
