//! Format metadata file.
//!
//! Block size and header format are fixed when a store is created. They are
//! recorded in a small sibling file (`<data path>.meta`) so a reopen decodes
//! the region the same way it was written, whatever options the caller
//! passes the second time.
//!
//! Format (16 bytes, little-endian):
//! ```text
//! [magic: "BLKS"][version: u16][header_format: u8][reserved: u8]
//! [block_size: u32][crc32: u32]
//! ```
//! The checksum covers the first 12 bytes.

use crate::codec::{BinaryReader, BinaryWriter};
use crate::config::{HeaderFormat, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{Error, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Encoded size of the metadata file
pub const META_SIZE: usize = 16;

/// Leading bytes of every metadata file
pub const META_MAGIC: [u8; 4] = *b"BLKS";

/// Current metadata version
pub const META_VERSION: u16 = 1;

/// Persisted format of one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatMeta {
    /// Block size in bytes
    pub block_size: usize,
    /// Record header layout
    pub header_format: HeaderFormat,
}

impl FormatMeta {
    /// Create a new FormatMeta
    pub fn new(block_size: usize, header_format: HeaderFormat) -> Self {
        Self { block_size, header_format }
    }

    /// Path of the metadata file that belongs to `data_path`
    pub fn path_for(data_path: &Path) -> PathBuf {
        let mut name = OsString::from(data_path.as_os_str());
        name.push(".meta");
        PathBuf::from(name)
    }

    /// Encode to exactly `META_SIZE` bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        let block_size = u32::try_from(self.block_size)
            .map_err(|_| Error::invalid_argument("block_size does not fit in u32"))?;

        let mut w = BinaryWriter::new(Vec::with_capacity(META_SIZE));
        w.write_raw(&META_MAGIC)?;
        w.write_u16(META_VERSION)?;
        w.write_u8(self.header_format as u8)?;
        w.write_u8(0)?;
        w.write_u32(block_size)?;

        let crc = crc32fast::hash(w.get_ref());
        w.write_u32(crc)?;

        let buf = w.into_inner();
        debug_assert_eq!(buf.len(), META_SIZE);
        Ok(buf)
    }

    /// Decode and validate
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != META_SIZE {
            return Err(Error::corruption(format!(
                "Metadata size mismatch: expected {}, got {}",
                META_SIZE,
                data.len()
            )));
        }

        let mut r = BinaryReader::new(data);
        let mut magic = [0u8; 4];
        r.read_raw(&mut magic)?;
        if magic != META_MAGIC {
            return Err(Error::corruption(format!("Invalid metadata magic: {:?}", magic)));
        }

        let version = r.read_u16()?;
        let format = r.read_u8()?;
        let _reserved = r.read_u8()?;
        let block_size = r.read_u32()?;
        let stored_crc = r.read_u32()?;

        let computed_crc = crc32fast::hash(&data[..META_SIZE - 4]);
        if stored_crc != computed_crc {
            return Err(Error::ChecksumMismatch { expected: stored_crc, actual: computed_crc });
        }

        if version != META_VERSION {
            return Err(Error::corruption(format!("Unsupported metadata version {}", version)));
        }

        let header_format = HeaderFormat::from_u8(format)
            .ok_or_else(|| Error::corruption(format!("Unknown header format {}", format)))?;

        let block_size = block_size as usize;
        if !block_size.is_power_of_two()
            || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size)
            || block_size < header_format.header_size()
        {
            return Err(Error::corruption(format!("Invalid block size {}", block_size)));
        }

        Ok(Self { block_size, header_format })
    }

    /// Read the metadata file at `path`. A missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read(path) {
            Ok(data) => Self::decode(&data).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the metadata file at `path` and sync it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self.encode()?;
        let mut file = File::create(path)?;
        file.write_all(&data)?;
        file.sync_all()?;
        Ok(())
    }
}
