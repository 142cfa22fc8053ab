//! Error types for the blockstore record store.

use std::io;
use thiserror::Error;

/// The result type used throughout blockstore.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for blockstore operations.
///
/// Reaching the end of the written records is not an error; read operations
/// report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error from the backing file, passed through unchanged.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A read needed more bytes than the stream had left.
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,

    /// A varint used more bytes than a 64-bit value can occupy.
    #[error("Malformed varint: encoding overflows 64 bits")]
    MalformedVarint,

    /// A record header could not be decoded.
    #[error("Corrupt header at offset {offset}: {reason}")]
    CorruptHeader {
        /// Byte offset of the header in the region.
        offset: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// The payload does not fit the header's length or block-count fields.
    #[error("Record too large: {len} bytes (max {max})")]
    RecordTooLarge {
        /// Payload length that was rejected.
        len: u64,
        /// Largest payload the store's header format can describe.
        max: u64,
    },

    /// The read cursor drifted off a block boundary.
    #[error("Misaligned cursor: offset {offset} is not a multiple of block size {block_size}")]
    MisalignedCursor {
        /// Cursor offset at the time of the check.
        offset: u64,
        /// Block size of the store.
        block_size: u64,
    },

    /// The store has been closed.
    #[error("Store is closed")]
    StoreClosed,

    /// The record at this ordinal has been deleted.
    #[error("Record {ordinal} has been deleted")]
    RecordDeleted {
        /// Ordinal that was addressed.
        ordinal: u64,
    },

    /// No record exists at this ordinal.
    #[error("No record at ordinal {ordinal}")]
    OrdinalOutOfRange {
        /// Ordinal that was addressed.
        ordinal: u64,
    },

    /// Data corruption was detected outside a record header.
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// A checksum mismatch was detected.
    #[error("Checksum mismatch: expected {expected:#x}, got {actual:#x}")]
    ChecksumMismatch {
        /// The expected checksum value.
        expected: u32,
        /// The actual checksum value.
        actual: u32,
    },

    /// An invalid argument was provided.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The store file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The store file already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl Error {
    /// Creates a new corruption error.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Creates a new corrupt header error.
    pub fn corrupt_header(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptHeader { offset, reason: reason.into() }
    }

    /// Maps a short read to `UnexpectedEndOfStream`, leaving other I/O
    /// errors untouched.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEndOfStream
        } else {
            Error::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::corruption("bad magic");
        assert_eq!(err.to_string(), "Data corruption: bad magic");

        let err = Error::ChecksumMismatch { expected: 0x12345678, actual: 0x87654321 };
        assert!(err.to_string().contains("0x12345678"));
        assert!(err.to_string().contains("0x87654321"));

        let err = Error::MisalignedCursor { offset: 70, block_size: 64 };
        assert!(err.to_string().contains("70"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_short_read_mapping() {
        let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(Error::from_read(eof), Error::UnexpectedEndOfStream));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from_read(denied), Error::Io(_)));
    }
}
