//! Region backed by a writable memory mapping.

use super::{check_read, check_write, Region};
use crate::error::{Error, Result};
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// A region whose bytes are mapped straight into the address space.
///
/// Resizing unmaps, resizes the file and maps it again. If any step fails
/// the file and mapping are put back at the previous length. An empty file
/// has no mapping at all.
pub struct MmapRegion {
    file: File,
    map: Option<MmapMut>,
    len: u64,
}

impl MmapRegion {
    /// Open and map the region file, creating it if it doesn't exist.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
        let len = file.metadata()?.len();
        let map = Self::map(&file, len)?;
        Ok(Self { file, map, len })
    }

    fn map(file: &File, len: u64) -> Result<Option<MmapMut>> {
        if len == 0 {
            return Ok(None);
        }
        // SAFETY: the store owns this file exclusively for its lifetime, so
        // no other process or mapping mutates it underneath us.
        let map = unsafe { MmapMut::map_mut(file)? };
        Ok(Some(map))
    }

    fn bytes(&self) -> Result<&[u8]> {
        match &self.map {
            Some(map) => Ok(&map[..]),
            None if self.len == 0 => Ok(&[]),
            None => Err(unmapped()),
        }
    }

    fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.map {
            Some(map) => Ok(&mut map[..]),
            None if self.len == 0 => Ok(&mut []),
            None => Err(unmapped()),
        }
    }

    fn resize(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.map = Self::map(&self.file, len)?;
        Ok(())
    }

    /// Puts the file and mapping back at `self.len` after a failed resize.
    fn restore(&mut self) {
        if let Err(e) = self.resize(self.len) {
            log::error!("Failed to remap region at {} bytes: {}", self.len, e);
        }
    }
}

fn unmapped() -> Error {
    Error::Io(io::Error::other("region mapping was lost"))
}

impl Region for MmapRegion {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_read(offset, buf.len(), self.len)?;
        let start = offset as usize;
        buf.copy_from_slice(&self.bytes()?[start..start + buf.len()]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        check_write(offset, data.len(), self.len)?;
        let start = offset as usize;
        self.bytes_mut()?[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        if let Some(map) = &self.map {
            map.flush()?;
        }
        self.map = None;
        if let Err(e) = self.resize(len) {
            self.restore();
            return Err(e);
        }
        self.len = len;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(map) = &self.map {
            map.flush_async()?;
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        if let Some(map) = &self.map {
            map.flush()?;
        }
        self.file.sync_all()?;
        Ok(())
    }
}
