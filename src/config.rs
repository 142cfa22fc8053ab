//! Configuration options for opening a store.

use std::fmt;
use std::sync::Arc;

/// Smallest block size a store accepts.
pub const MIN_BLOCK_SIZE: usize = 16;

/// Largest block size a store accepts; padding must fit a `u16`.
pub const MAX_BLOCK_SIZE: usize = 64 * 1024;

/// Layout of the fixed header that precedes every record.
///
/// The choice is made when a store is created and recorded in its metadata
/// file; it never changes for the life of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum HeaderFormat {
    /// 8-byte header: status, reserved, block count (u16), length (u32).
    #[default]
    Compact = 1,

    /// 16-byte header: status, reserved, block count (u16), length (u64),
    /// padding (u16), reserved (u16).
    Wide = 2,
}

impl HeaderFormat {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(HeaderFormat::Compact),
            2 => Some(HeaderFormat::Wide),
            _ => None,
        }
    }

    /// Size of the encoded header in bytes.
    pub fn header_size(self) -> usize {
        match self {
            HeaderFormat::Compact => 8,
            HeaderFormat::Wide => 16,
        }
    }

    /// Largest value the length field can hold.
    pub fn max_length(self) -> u64 {
        match self {
            HeaderFormat::Compact => u32::MAX as u64,
            HeaderFormat::Wide => u64::MAX,
        }
    }
}

/// Backing storage strategy for the record region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Buffered positional file I/O.
    #[default]
    File,

    /// Memory-mapped file region.
    #[cfg(feature = "mmap")]
    Mmap,
}

/// Configuration options for opening a store.
#[derive(Clone)]
pub struct Options {
    /// Size of one allocation block in bytes.
    /// Must be a power of two between 16 bytes and 64KB.
    /// Default: 4KB
    pub block_size: usize,

    /// Record header layout.
    /// Default: HeaderFormat::Compact
    pub header_format: HeaderFormat,

    /// Region size of a freshly created store (rounded up to a block multiple).
    /// Default: 1MB
    pub initial_size: u64,

    /// Backing storage strategy.
    /// Default: Backend::File
    pub backend: Backend,

    /// Capacity of the sequential read buffer (in bytes).
    /// Default: 64KB
    pub read_buffer_size: usize,

    /// Keep an in-memory ordinal-to-offset cache.
    /// Default: true
    pub offset_cache: bool,

    /// Sync the backing file after every append and delete.
    /// Default: false
    pub sync_on_write: bool,

    /// Create the store if it doesn't exist.
    /// Default: true
    pub create_if_missing: bool,

    /// Error if the store already exists.
    /// Default: false
    pub error_if_exists: bool,

    /// Sink for diagnostic messages.
    /// Default: None (forward to the process-wide `log` logger)
    pub logger: Option<Arc<dyn log::Log>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            block_size: 4 * 1024, // 4KB
            header_format: HeaderFormat::Compact,
            initial_size: 1024 * 1024, // 1MB
            backend: Backend::File,
            read_buffer_size: 64 * 1024, // 64KB
            offset_cache: true,
            sync_on_write: false,
            create_if_missing: true,
            error_if_exists: false,
            logger: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("block_size", &self.block_size)
            .field("header_format", &self.header_format)
            .field("initial_size", &self.initial_size)
            .field("backend", &self.backend)
            .field("read_buffer_size", &self.read_buffer_size)
            .field("offset_cache", &self.offset_cache)
            .field("sync_on_write", &self.sync_on_write)
            .field("create_if_missing", &self.create_if_missing)
            .field("error_if_exists", &self.error_if_exists)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the block size.
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Sets the record header format.
    pub fn header_format(mut self, format: HeaderFormat) -> Self {
        self.header_format = format;
        self
    }

    /// Sets the initial region size for new stores.
    pub fn initial_size(mut self, size: u64) -> Self {
        self.initial_size = size;
        self
    }

    /// Sets the backing storage strategy.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the read buffer capacity.
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Enables or disables the offset cache.
    pub fn offset_cache(mut self, value: bool) -> Self {
        self.offset_cache = value;
        self
    }

    /// Enables or disables syncing after every mutation.
    pub fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets whether to create the store if it doesn't exist.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether opening an existing store is an error.
    pub fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Routes diagnostics to `logger` instead of the global logger.
    pub fn logger(mut self, logger: Arc<dyn log::Log>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.block_size.is_power_of_two() {
            return Err(crate::Error::invalid_argument("block_size must be a power of two"));
        }
        if self.block_size < MIN_BLOCK_SIZE || self.block_size > MAX_BLOCK_SIZE {
            return Err(crate::Error::invalid_argument(format!(
                "block_size must be between {} and {}",
                MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
            )));
        }
        if self.block_size < self.header_format.header_size() {
            return Err(crate::Error::invalid_argument(
                "block_size must hold at least one record header",
            ));
        }
        if self.read_buffer_size < self.block_size {
            return Err(crate::Error::invalid_argument(
                "read_buffer_size must be >= block_size",
            ));
        }
        Ok(())
    }
}
