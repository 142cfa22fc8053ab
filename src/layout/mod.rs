//! Block-aligned record framing.
//!
//! Every record occupies a whole number of blocks:
//!
//! ```text
//! ┌──────────┬───────────────────┬──────────────┐
//! │  Header  │  Payload (length) │ Zero padding │
//! └──────────┴───────────────────┴──────────────┘
//! |<------------ block_count * block_size ------>|
//! ```
//!
//! Header layouts (little-endian):
//!
//! ```text
//! Compact (8 bytes):  [status: u8][reserved: u8][block_count: u16][length: u32]
//! Wide   (16 bytes):  [status: u8][reserved: u8][block_count: u16][length: u64]
//!                     [padding: u16][reserved: u16]
//! ```
//!
//! Everything here is pure: sizes are computed and frames are built in
//! memory. Nothing touches the backing region.

pub mod header;

pub use header::{RecordHeader, RecordStatus};

use crate::codec::{BinaryReader, BinaryWriter};
use crate::config::HeaderFormat;
use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Largest number of blocks one record can span.
pub const MAX_BLOCK_COUNT: u64 = u16::MAX as u64;

/// Size arithmetic and header codec for one store's fixed format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    block_size: u64,
    format: HeaderFormat,
}

impl Layout {
    /// Create a layout. `block_size` must already be validated.
    pub fn new(block_size: usize, format: HeaderFormat) -> Self {
        Self { block_size: block_size as u64, format }
    }

    /// Block size in bytes
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Header format
    pub fn format(&self) -> HeaderFormat {
        self.format
    }

    /// Encoded header size in bytes
    pub fn header_size(&self) -> u64 {
        self.format.header_size() as u64
    }

    /// Bytes a record with `payload_len` bytes of payload occupies on disk.
    ///
    /// Always a positive multiple of the block size, so an empty payload
    /// still reserves one block.
    pub fn aligned_size(&self, payload_len: u64) -> u64 {
        let raw = self.header_size().saturating_add(payload_len);
        raw.div_ceil(self.block_size).max(1).saturating_mul(self.block_size)
    }

    /// Blocks a record with `payload_len` bytes of payload occupies.
    pub fn block_count(&self, payload_len: u64) -> u64 {
        self.aligned_size(payload_len) / self.block_size
    }

    /// Zero bytes written after a payload of `payload_len` bytes.
    pub fn padding(&self, payload_len: u64) -> u64 {
        self.aligned_size(payload_len) - self.header_size() - payload_len
    }

    /// Largest payload the header fields can describe.
    pub fn max_payload(&self) -> u64 {
        let by_blocks = MAX_BLOCK_COUNT * self.block_size - self.header_size();
        by_blocks.min(self.format.max_length())
    }

    /// Rejects payloads that do not fit the header fields.
    pub fn check_fits(&self, payload_len: u64) -> Result<()> {
        let max = self.max_payload();
        if payload_len > max {
            return Err(Error::RecordTooLarge { len: payload_len, max });
        }
        Ok(())
    }

    /// Header for a new live record carrying `payload_len` bytes.
    pub fn header_for(&self, payload_len: u64) -> Result<RecordHeader> {
        self.check_fits(payload_len)?;
        Ok(RecordHeader::active(self.block_count(payload_len) as u16, payload_len))
    }

    /// Encode a header into exactly `header_size()` bytes.
    pub fn encode_header(&self, header: &RecordHeader) -> Result<Vec<u8>> {
        let mut w = BinaryWriter::new(Vec::with_capacity(self.format.header_size()));
        w.write_u8(header.status as u8)?;
        w.write_u8(0)?;
        w.write_u16(header.block_count)?;
        match self.format {
            HeaderFormat::Compact => {
                let length = u32::try_from(header.length).map_err(|_| Error::RecordTooLarge {
                    len: header.length,
                    max: u32::MAX as u64,
                })?;
                w.write_u32(length)?;
            }
            HeaderFormat::Wide => {
                w.write_u64(header.length)?;
                w.write_u16(self.stored_padding(header) as u16)?;
                w.write_u16(0)?;
            }
        }
        Ok(w.into_inner())
    }

    /// Decode and validate a header read from byte `offset` of the region.
    pub fn decode_header(&self, bytes: &[u8], offset: u64) -> Result<RecordHeader> {
        let mut r = BinaryReader::new(bytes);
        let status = RecordStatus::from_u8(r.read_u8()?, offset)?;
        let _reserved = r.read_u8()?;
        let block_count = r.read_u16()?;
        let (length, stored_padding) = match self.format {
            HeaderFormat::Compact => (r.read_u32()? as u64, None),
            HeaderFormat::Wide => {
                let length = r.read_u64()?;
                let padding = r.read_u16()?;
                let _reserved = r.read_u16()?;
                (length, Some(padding))
            }
        };

        let header = RecordHeader { status, block_count, length };
        self.validate(&header, offset)?;

        if let Some(stored) = stored_padding {
            let derived = self.stored_padding(&header);
            if stored as u64 != derived {
                return Err(Error::corrupt_header(
                    offset,
                    format!("stored padding {} disagrees with derived {}", stored, derived),
                ));
            }
        }

        Ok(header)
    }

    fn validate(&self, header: &RecordHeader, offset: u64) -> Result<()> {
        if header.is_free() {
            if header.length != 0 {
                return Err(Error::corrupt_header(offset, "free block with non-zero length"));
            }
            return Ok(());
        }

        if header.block_count == 0 {
            return Err(Error::corrupt_header(offset, "record spans zero blocks"));
        }
        if header.length > self.max_payload() {
            return Err(Error::corrupt_header(
                offset,
                format!("length {} exceeds maximum payload", header.length),
            ));
        }
        let expected = self.block_count(header.length);
        if header.block_count as u64 != expected {
            return Err(Error::corrupt_header(
                offset,
                format!(
                    "block count {} does not match length {} (expected {})",
                    header.block_count, header.length, expected
                ),
            ));
        }
        Ok(())
    }

    /// Padding as written into a `Wide` header. Free headers store zero.
    fn stored_padding(&self, header: &RecordHeader) -> u64 {
        if header.is_free() {
            0
        } else {
            self.padding(header.length)
        }
    }

    /// Build the full frame for `payload`: header, payload, zero padding.
    pub fn build_frame(&self, payload: &[u8]) -> Result<Bytes> {
        let header = self.header_for(payload.len() as u64)?;
        let span = header.block_count as u64 * self.block_size;

        let mut buf = BytesMut::with_capacity(span as usize);
        buf.put_slice(&self.encode_header(&header)?);
        buf.put_slice(payload);
        buf.put_bytes(0, self.padding(payload.len() as u64) as usize);

        debug_assert_eq!(buf.len() as u64, span);
        Ok(buf.freeze())
    }

    /// Build the zero-filled span a delete leaves behind.
    pub fn tombstone_frame(&self, block_count: u16) -> Result<Bytes> {
        let span = block_count as u64 * self.block_size;
        let mut buf = BytesMut::zeroed(span as usize);
        let header = self.encode_header(&RecordHeader::tombstone(block_count))?;
        buf[..header.len()].copy_from_slice(&header);
        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout64() -> Layout {
        Layout::new(64, HeaderFormat::Compact)
    }

    #[test]
    fn test_aligned_size() {
        let layout = layout64();
        assert_eq!(layout.header_size(), 8);
        assert_eq!(layout.aligned_size(0), 64);
        assert_eq!(layout.aligned_size(5), 64);
        assert_eq!(layout.aligned_size(56), 64);
        assert_eq!(layout.aligned_size(57), 128);
        assert_eq!(layout.aligned_size(70), 128);
        assert_eq!(layout.padding(5), 51);
        assert_eq!(layout.padding(56), 0);
    }

    #[test]
    fn test_block_counts() {
        let layout = layout64();
        assert_eq!(layout.block_count(10), 1);
        assert_eq!(layout.block_count(70), 2);
        assert_eq!(layout.block_count(5), 1);
        assert_eq!(layout.block_count(0), 1);
    }

    #[test]
    fn test_header_round_trip() {
        for format in [HeaderFormat::Compact, HeaderFormat::Wide] {
            let layout = Layout::new(64, format);
            let header = layout.header_for(70).unwrap();
            let bytes = layout.encode_header(&header).unwrap();
            assert_eq!(bytes.len() as u64, layout.header_size());
            assert_eq!(layout.decode_header(&bytes, 0).unwrap(), header);
        }
    }

    #[test]
    fn test_compact_header_bytes() {
        let layout = layout64();
        let bytes = layout.encode_header(&RecordHeader::active(2, 70)).unwrap();
        assert_eq!(bytes, vec![1, 0, 2, 0, 70, 0, 0, 0]);
    }

    #[test]
    fn test_zero_block_is_virgin() {
        for format in [HeaderFormat::Compact, HeaderFormat::Wide] {
            let layout = Layout::new(64, format);
            let zeros = vec![0u8; format.header_size()];
            assert_eq!(layout.decode_header(&zeros, 0).unwrap(), RecordHeader::VIRGIN);
        }
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        let layout = layout64();
        let bytes = [0xC1, 0, 1, 0, 5, 0, 0, 0];
        assert!(matches!(layout.decode_header(&bytes, 64), Err(Error::CorruptHeader { .. })));
    }

    #[test]
    fn test_inconsistent_headers_are_corrupt() {
        let layout = layout64();

        // Active record spanning zero blocks
        let bytes = [1, 0, 0, 0, 5, 0, 0, 0];
        assert!(matches!(layout.decode_header(&bytes, 0), Err(Error::CorruptHeader { .. })));

        // 70-byte payload claiming a single block
        let bytes = [1, 0, 1, 0, 70, 0, 0, 0];
        assert!(matches!(layout.decode_header(&bytes, 0), Err(Error::CorruptHeader { .. })));

        // Free block carrying a length
        let bytes = [0, 0, 0, 0, 9, 0, 0, 0];
        assert!(matches!(layout.decode_header(&bytes, 0), Err(Error::CorruptHeader { .. })));
    }

    #[test]
    fn test_wide_padding_mismatch() {
        let layout = Layout::new(64, HeaderFormat::Wide);
        let mut bytes = layout.encode_header(&RecordHeader::active(1, 5)).unwrap();
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 43);
        bytes[12] = 7;
        assert!(matches!(layout.decode_header(&bytes, 0), Err(Error::CorruptHeader { .. })));
    }

    #[test]
    fn test_short_header() {
        let layout = layout64();
        assert!(matches!(layout.decode_header(&[1, 0, 1], 0), Err(Error::UnexpectedEndOfStream)));
    }

    #[test]
    fn test_build_frame() {
        let layout = layout64();
        let frame = layout.build_frame(b"hello").unwrap();
        assert_eq!(frame.len(), 64);
        assert_eq!(&frame[..8], &[1, 0, 1, 0, 5, 0, 0, 0]);
        assert_eq!(&frame[8..13], b"hello");
        assert!(frame[13..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_payload_reserves_a_block() {
        let layout = layout64();
        let frame = layout.build_frame(b"").unwrap();
        assert_eq!(frame.len(), 64);
        let header = layout.decode_header(&frame, 0).unwrap();
        assert!(header.is_active());
        assert_eq!(header.block_count, 1);
        assert_eq!(header.length, 0);
    }

    #[test]
    fn test_tombstone_frame() {
        let layout = layout64();
        let frame = layout.tombstone_frame(2).unwrap();
        assert_eq!(frame.len(), 128);
        let header = layout.decode_header(&frame, 0).unwrap();
        assert_eq!(header, RecordHeader::tombstone(2));
        assert!(frame[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_record_too_large() {
        let layout = Layout::new(16, HeaderFormat::Compact);
        let max = layout.max_payload();
        assert_eq!(max, 65535 * 16 - 8);
        assert!(layout.check_fits(max).is_ok());
        assert!(matches!(
            layout.check_fits(max + 1),
            Err(Error::RecordTooLarge { .. })
        ));
        assert!(matches!(
            layout.build_frame(&vec![0u8; max as usize + 1]),
            Err(Error::RecordTooLarge { .. })
        ));
    }
}
