//! Binary writer for primitive values.

use super::varint::{encode_uvarint, zigzag_encode, MAX_VARINT_LEN};
use crate::error::Result;
use std::io::Write;

/// Writes fixed-width little-endian scalars, varints and length-prefixed
/// blobs to any `Write`.
///
/// The writer does no buffering of its own; wrap the sink in a
/// `BufWriter` when writing to a file.
pub struct BinaryWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new writer over `inner`
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Write a u8
    pub fn write_u8(&mut self, x: u8) -> Result<()> {
        self.put(&[x])
    }

    /// Write an i8
    pub fn write_i8(&mut self, x: i8) -> Result<()> {
        self.write_u8(x as u8)
    }

    /// Write a u16
    pub fn write_u16(&mut self, x: u16) -> Result<()> {
        self.put(&x.to_le_bytes())
    }

    /// Write an i16
    pub fn write_i16(&mut self, x: i16) -> Result<()> {
        self.put(&x.to_le_bytes())
    }

    /// Write a u32
    pub fn write_u32(&mut self, x: u32) -> Result<()> {
        self.put(&x.to_le_bytes())
    }

    /// Write an i32
    pub fn write_i32(&mut self, x: i32) -> Result<()> {
        self.put(&x.to_le_bytes())
    }

    /// Write a u64
    pub fn write_u64(&mut self, x: u64) -> Result<()> {
        self.put(&x.to_le_bytes())
    }

    /// Write an i64
    pub fn write_i64(&mut self, x: i64) -> Result<()> {
        self.put(&x.to_le_bytes())
    }

    /// Write an f32 as its IEEE-754 bit pattern
    pub fn write_f32(&mut self, x: f32) -> Result<()> {
        self.write_u32(x.to_bits())
    }

    /// Write an f64 as its IEEE-754 bit pattern
    pub fn write_f64(&mut self, x: f64) -> Result<()> {
        self.write_u64(x.to_bits())
    }

    /// Write a bool as a single 0 or 1 byte
    pub fn write_bool(&mut self, x: bool) -> Result<()> {
        self.write_u8(x as u8)
    }

    /// Write an unsigned varint
    pub fn write_uvarint(&mut self, x: u64) -> Result<()> {
        let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
        encode_uvarint(&mut buf, x);
        self.put(&buf)
    }

    /// Write a signed (zig-zag) varint
    pub fn write_varint(&mut self, x: i64) -> Result<()> {
        self.write_uvarint(zigzag_encode(x))
    }

    /// Write a blob as `<uvarint length><raw bytes>`
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_uvarint(data.len() as u64)?;
        self.put(data)
    }

    /// Write a blob as `<u64 length><raw bytes>`, for readers that want to
    /// know the prefix width up front
    pub fn write_binary(&mut self, data: &[u8]) -> Result<()> {
        self.write_u64(data.len() as u64)?;
        self.put(data)
    }

    /// Write a string as a length-prefixed blob of its UTF-8 bytes
    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    /// Write raw bytes with no length prefix
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.put(data)
    }

    /// Total bytes written through this writer
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Flush the underlying sink
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Get a reference to the underlying sink
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the writer, returning the underlying sink
    pub fn into_inner(self) -> W {
        self.inner
    }
}
