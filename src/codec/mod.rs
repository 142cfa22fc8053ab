//! Binary codec for primitive values.
//!
//! The codec knows nothing about records or blocks; it turns scalars and
//! blobs into bytes and back over any `std::io` stream.
//!
//! ## Encodings
//!
//! - Fixed-width integers and floats: little-endian, `size_of::<T>()` bytes
//! - `bool`: one byte, 0 or 1
//! - Unsigned varint: base-128, at most 10 bytes
//! - Signed varint: zig-zag mapped, then unsigned varint
//! - Blob: `<uvarint length><raw bytes>`
//! - Fixed-width blob: `<u64 length><raw bytes>`
//!
//! ## Usage
//!
//! ```rust
//! use blockstore::codec::{BinaryReader, BinaryWriter};
//!
//! # fn main() -> Result<(), blockstore::Error> {
//! let mut writer = BinaryWriter::new(Vec::new());
//! writer.write_u32(42)?;
//! writer.write_bytes(b"hello")?;
//! let buf = writer.into_inner();
//!
//! let mut reader = BinaryReader::new(buf.as_slice());
//! assert_eq!(reader.read_u32()?, 42);
//! assert_eq!(reader.read_bytes()?, b"hello".to_vec());
//! # Ok(())
//! # }
//! ```

pub mod reader;
pub mod varint;
pub mod writer;

pub use reader::BinaryReader;
pub use varint::{decode_uvarint, encode_uvarint, MAX_VARINT_LEN};
pub use writer::BinaryWriter;
