//! Record header fields.

use crate::error::{Error, Result};

/// Lifecycle state stored in the first byte of every record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordStatus {
    /// Unused space, or a tombstone left behind by delete
    Free = 0,
    /// A live record
    Active = 1,
    /// A record marked dead without being zeroed
    Deleted = 2,
}

impl RecordStatus {
    /// Convert from u8 to RecordStatus
    pub fn from_u8(value: u8, offset: u64) -> Result<Self> {
        match value {
            0 => Ok(RecordStatus::Free),
            1 => Ok(RecordStatus::Active),
            2 => Ok(RecordStatus::Deleted),
            _ => Err(Error::corrupt_header(offset, format!("unknown status {:#04x}", value))),
        }
    }
}

/// Decoded header of one record span.
///
/// `padding` is never stored authoritatively; it is derived from
/// `block_count` and `length` by [`Layout`](super::Layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record state
    pub status: RecordStatus,
    /// Blocks covered by header, payload and padding
    pub block_count: u16,
    /// Exact payload length in bytes
    pub length: u64,
}

impl RecordHeader {
    /// Header of an all-zero block that has never held a record.
    pub const VIRGIN: RecordHeader =
        RecordHeader { status: RecordStatus::Free, block_count: 0, length: 0 };

    /// Header of a live record.
    pub fn active(block_count: u16, length: u64) -> Self {
        Self { status: RecordStatus::Active, block_count, length }
    }

    /// Header left at the start of a deleted record's zeroed span.
    pub fn tombstone(block_count: u16) -> Self {
        Self { status: RecordStatus::Free, block_count, length: 0 }
    }

    /// True for a live record.
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    /// True when the block can be handed out by the allocator.
    pub fn is_free(&self) -> bool {
        self.status == RecordStatus::Free
    }

    /// True for a free block that was never part of a record.
    pub fn is_virgin(&self) -> bool {
        self.is_free() && self.block_count == 0
    }

    /// True for a span that holds an ordinal slot but no readable payload.
    pub fn is_tombstone(&self) -> bool {
        match self.status {
            RecordStatus::Free => self.block_count > 0,
            RecordStatus::Deleted => true,
            RecordStatus::Active => false,
        }
    }

    /// Number of blocks a scan steps over after reading this header.
    pub fn span_blocks(&self) -> u64 {
        if self.block_count == 0 {
            1
        } else {
            self.block_count as u64
        }
    }
}
