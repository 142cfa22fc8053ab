//! Binary reader mirroring [`BinaryWriter`](super::BinaryWriter).

use super::varint::{zigzag_decode, UvarintDecoder};
use crate::error::{Error, Result};
use std::io::{BufRead, Read};

/// Reads values written by `BinaryWriter` from any `Read`.
///
/// A read that needs more bytes than the stream has left fails with
/// `UnexpectedEndOfStream`; nothing is ever zero-padded.
pub struct BinaryReader<R: Read> {
    inner: R,
    consumed: u64,
}

impl<R: Read> BinaryReader<R> {
    /// Create a new reader over `inner`
    pub fn new(inner: R) -> Self {
        Self { inner, consumed: 0 }
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(Error::from_read)?;
        self.consumed += N as u64;
        Ok(buf)
    }

    /// Read a u8
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read an i8
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a u16
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read an i16
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    /// Read a u32
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read an i32
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    /// Read a u64
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read an i64
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    /// Read an f32
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    /// Read an f64
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Read a bool; any non-zero byte is `true`
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an unsigned varint
    pub fn read_uvarint(&mut self) -> Result<u64> {
        let mut decoder = UvarintDecoder::default();
        loop {
            if let Some(value) = decoder.push(self.read_u8()?)? {
                return Ok(value);
            }
        }
    }

    /// Read a signed (zig-zag) varint
    pub fn read_varint(&mut self) -> Result<i64> {
        Ok(zigzag_decode(self.read_uvarint()?))
    }

    /// Read a length-prefixed blob
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_uvarint()?;
        self.read_blob(len)
    }

    /// Read a blob written by `write_binary`
    pub fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u64()?;
        self.read_blob(len)
    }

    fn read_blob(&mut self, len: u64) -> Result<Vec<u8>> {
        // Grow the buffer as bytes arrive rather than trusting the prefix.
        let mut data = Vec::new();
        let n = (&mut self.inner).take(len).read_to_end(&mut data)?;
        self.consumed += n as u64;
        if (n as u64) < len {
            return Err(Error::UnexpectedEndOfStream);
        }
        Ok(data)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> Result<String> {
        let data = self.read_bytes()?;
        String::from_utf8(data)
            .map_err(|e| Error::corruption(format!("Invalid UTF-8 string: {}", e)))
    }

    /// Fill `buf` with raw bytes
    pub fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(Error::from_read)?;
        self.consumed += buf.len() as u64;
        Ok(())
    }

    /// Skip `n` bytes
    pub fn skip(&mut self, n: u64) -> Result<()> {
        let skipped = std::io::copy(&mut (&mut self.inner).take(n), &mut std::io::sink())?;
        self.consumed += skipped;
        if skipped < n {
            return Err(Error::UnexpectedEndOfStream);
        }
        Ok(())
    }

    /// Total bytes consumed through this reader
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Unwrap the reader, returning the underlying source
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> BinaryReader<R> {
    /// Look at the next `n` bytes without consuming them.
    ///
    /// Only bytes already buffered by the source are visible; fewer than `n`
    /// of them fails with `UnexpectedEndOfStream`.
    pub fn peek(&mut self, n: usize) -> Result<&[u8]> {
        let buf = self.inner.fill_buf()?;
        if buf.len() < n {
            return Err(Error::UnexpectedEndOfStream);
        }
        Ok(&buf[..n])
    }
}
