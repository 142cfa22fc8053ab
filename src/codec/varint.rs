//! Base-128 varint helpers over byte slices.
//!
//! Each byte carries seven value bits, least significant group first; the
//! high bit marks that another byte follows. A `u64` needs at most ten bytes
//! and the tenth may only contribute its lowest bit.

use crate::error::{Error, Result};
use bytes::BufMut;

/// Maximum encoded length of a `u64` varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Appends `x` to `buf` as an unsigned varint, returning the bytes written.
pub fn encode_uvarint<B: BufMut>(buf: &mut B, mut x: u64) -> usize {
    let mut n = 1;
    while x >= 0x80 {
        buf.put_u8((x as u8) | 0x80);
        x >>= 7;
        n += 1;
    }
    buf.put_u8(x as u8);
    n
}

/// Decodes an unsigned varint from the front of `data`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_uvarint(data: &[u8]) -> Result<(u64, usize)> {
    let mut decoder = UvarintDecoder::default();
    for (i, &byte) in data.iter().enumerate() {
        if let Some(value) = decoder.push(byte)? {
            return Ok((value, i + 1));
        }
    }
    Err(Error::UnexpectedEndOfStream)
}

/// Maps a signed value onto an unsigned one so small magnitudes stay short.
pub fn zigzag_encode(x: i64) -> u64 {
    ((x << 1) ^ (x >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(x: u64) -> i64 {
    ((x >> 1) as i64) ^ -((x & 1) as i64)
}

/// Incremental varint decoder shared by the slice and stream readers.
#[derive(Debug, Default)]
pub(crate) struct UvarintDecoder {
    value: u64,
    shift: u32,
    count: usize,
}

impl UvarintDecoder {
    /// Feeds one byte; yields the value once the final byte arrives.
    pub(crate) fn push(&mut self, byte: u8) -> Result<Option<u64>> {
        if self.count == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(Error::MalformedVarint);
        }
        self.count += 1;

        if byte < 0x80 {
            return Ok(Some(self.value | (byte as u64) << self.shift));
        }
        self.value |= ((byte & 0x7f) as u64) << self.shift;
        self.shift += 7;
        Ok(None)
    }
}
