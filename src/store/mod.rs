//! The record store.
//!
//! A [`Store`] owns one [`Region`] and ties the other pieces together:
//! [`Layout`] frames records, the [`Allocator`] picks where they go, and a
//! buffered block cursor walks them back. Every public method takes `&self`
//! and runs under one mutex, so a store can be shared through an `Arc`.
//!
//! # Ordinals
//!
//! Ordinals number record spans in file order. Deleting a record leaves a
//! tombstone in its place, so every other record keeps its ordinal. Blocks
//! that never held a record are not counted.

mod cursor;
mod offsets;

use crate::allocator::{Allocation, Allocator};
use crate::config::{HeaderFormat, Options};
use crate::error::{Error, Result};
use crate::layout::{Layout, RecordHeader};
use crate::logging::{emit, Logger};
use crate::meta::FormatMeta;
use crate::region::{open_region, Region};
use cursor::BlockCursor;
use offsets::OffsetCache;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};

/// Point-in-time counters for a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Region size in bytes
    pub region_size: u64,
    /// Region size in blocks
    pub total_blocks: u64,
    /// Live records
    pub active_records: u64,
    /// Deleted records still holding an ordinal
    pub tombstones: u64,
    /// Blocks the allocator may hand out
    pub free_blocks: u64,
    /// Times this handle grew the region
    pub growth_events: u64,
}

/// A block-aligned record store.
///
/// # Example
///
/// ```rust,no_run
/// use blockstore::{Options, Store};
///
/// # fn main() -> Result<(), blockstore::Error> {
/// let store = Store::open("./records.blk", Options::default())?;
///
/// store.append(b"first")?;
/// store.append(b"second")?;
///
/// assert_eq!(store.read_at(1)?, Some(b"second".to_vec()));
/// store.delete(0)?;
///
/// store.rewind()?;
/// while let Some(payload) = store.read_sequential()? {
///     println!("{:?}", payload);
/// }
///
/// store.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Store {
    /// Data file path; `None` for stores over a caller-supplied region
    path: Option<PathBuf>,
    /// Fixed for the life of the store
    layout: Layout,
    /// `None` once closed
    inner: Mutex<Option<StoreInner>>,
}

/// Record span found by a scan.
#[derive(Debug, Clone, Copy)]
struct Span {
    offset: u64,
    header: RecordHeader,
}

struct StoreInner {
    region: Box<dyn Region>,
    layout: Layout,
    allocator: Allocator,
    cursor: BlockCursor,
    offsets: OffsetCache,
    logger: Logger,
    sync_on_write: bool,
    growth_events: u64,
}

impl Store {
    /// Open the store at `path`, creating it if allowed.
    ///
    /// The block size and header format of an existing store come from its
    /// metadata file; the values in `options` only apply to new stores.
    pub fn open<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        options.validate()?;
        let logger = options.logger.clone().map(Logger::new).unwrap_or_default();

        if !path.exists() {
            if !options.create_if_missing {
                return Err(Error::NotFound(format!("Store file does not exist: {:?}", path)));
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        } else if options.error_if_exists {
            return Err(Error::AlreadyExists(format!("Store already exists: {:?}", path)));
        }

        let region = open_region(&path, options.backend)?;
        let meta_path = FormatMeta::path_for(&path);

        let meta = match FormatMeta::load(&meta_path)? {
            Some(meta) => {
                if meta.block_size != options.block_size
                    || meta.header_format != options.header_format
                {
                    emit!(
                        logger,
                        Warn,
                        "store {:?} was created with block size {} and {:?} headers; \
                         ignoring requested block size {} and {:?} headers",
                        path,
                        meta.block_size,
                        meta.header_format,
                        options.block_size,
                        options.header_format
                    );
                }
                meta
            }
            None => {
                if !region.is_empty() {
                    return Err(Error::corruption(format!(
                        "Missing metadata file {:?} for non-empty store",
                        meta_path
                    )));
                }
                let meta = FormatMeta::new(options.block_size, options.header_format);
                meta.save(&meta_path)?;
                meta
            }
        };

        let layout = Layout::new(meta.block_size, meta.header_format);
        let store = Self::build(Some(path), region, layout, &options, logger)?;
        Ok(store)
    }

    /// Open a store over an arbitrary region. No metadata file is involved;
    /// the caller is responsible for using the same options every time.
    pub fn with_region(region: Box<dyn Region>, options: Options) -> Result<Self> {
        options.validate()?;
        let logger = options.logger.clone().map(Logger::new).unwrap_or_default();
        let layout = Layout::new(options.block_size, options.header_format);
        Self::build(None, region, layout, &options, logger)
    }

    fn build(
        path: Option<PathBuf>,
        mut region: Box<dyn Region>,
        layout: Layout,
        options: &Options,
        logger: Logger,
    ) -> Result<Self> {
        let block_size = layout.block_size();
        if region.len() % block_size != 0 {
            return Err(Error::corruption(format!(
                "Region size {} is not a multiple of block size {}",
                region.len(),
                block_size
            )));
        }

        let fresh = region.is_empty();
        if fresh {
            let initial = options.initial_size.div_ceil(block_size).saturating_mul(block_size);
            if initial > 0 {
                region.set_len(initial)?;
            }
        }

        emit!(
            logger,
            Info,
            "opened store {:?}: {} bytes, block size {}, {:?} headers{}",
            path.as_deref().unwrap_or_else(|| Path::new("<region>")),
            region.len(),
            block_size,
            layout.format(),
            if fresh { " (new)" } else { "" }
        );

        let buffer_size = options.read_buffer_size.max(block_size as usize);
        let inner = StoreInner {
            region,
            layout,
            allocator: Allocator::new(),
            cursor: BlockCursor::new(buffer_size),
            offsets: OffsetCache::new(options.offset_cache, fresh),
            logger,
            sync_on_write: options.sync_on_write,
            growth_events: 0,
        };

        Ok(Self { path, layout, inner: Mutex::new(Some(inner)) })
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut StoreInner) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.lock();
        let inner = guard.as_mut().ok_or(Error::StoreClosed)?;
        f(inner)
    }

    /// Append `payload` as a new record and return its byte offset.
    ///
    /// Grows the region when no free run is large enough. Nothing is
    /// written if the payload is too large or growth fails.
    pub fn append(&self, payload: &[u8]) -> Result<u64> {
        self.with_inner(|inner| inner.append(payload))
    }

    /// Read the next live record at the sequential cursor.
    ///
    /// Returns `Ok(None)` at the end of the region.
    pub fn read_sequential(&self) -> Result<Option<Vec<u8>>> {
        self.with_inner(|inner| inner.read_sequential())
    }

    /// Move the sequential cursor back to the start of the region.
    pub fn rewind(&self) -> Result<()> {
        self.with_inner(|inner| {
            inner.cursor.seek(0);
            Ok(())
        })
    }

    /// Move the sequential cursor to the start of block `block`.
    ///
    /// The block must start a record span or be unused; anything else is
    /// reported as corruption by the next read.
    pub fn seek_block(&self, block: u64) -> Result<()> {
        self.with_inner(|inner| {
            let offset = block
                .checked_mul(inner.layout.block_size())
                .filter(|&o| o <= inner.region.len())
                .ok_or_else(|| {
                    Error::invalid_argument(format!("block {} is past the end of the region", block))
                })?;
            inner.cursor.seek(offset);
            Ok(())
        })
    }

    /// Read the record at `ordinal`.
    ///
    /// Returns `Ok(None)` past the last record and `RecordDeleted` for a
    /// deleted one. Leaves the sequential cursor after the record.
    pub fn read_at(&self, ordinal: u64) -> Result<Option<Vec<u8>>> {
        self.with_inner(|inner| inner.read_at(ordinal))
    }

    /// Read the live record that starts at byte `offset`, as returned by
    /// [`append`](Self::append).
    pub fn read_at_offset(&self, offset: u64) -> Result<Vec<u8>> {
        self.with_inner(|inner| inner.read_at_offset(offset))
    }

    /// Delete the record at `ordinal` and return its payload.
    ///
    /// The record's blocks are zeroed and left as a tombstone; the region
    /// never shrinks.
    pub fn delete(&self, ordinal: u64) -> Result<Vec<u8>> {
        self.with_inner(|inner| inner.delete(ordinal))
    }

    /// Byte offsets of every record span, tombstones included, in ordinal
    /// order.
    pub fn scan_all_offsets(&self) -> Result<Vec<u64>> {
        self.with_inner(|inner| {
            let offsets: Vec<u64> = inner.spans()?.iter().map(|s| s.offset).collect();
            inner.offsets.fill(&offsets);
            Ok(offsets)
        })
    }

    /// Payloads of every live record in file order.
    ///
    /// Does not move the sequential cursor.
    pub fn records(&self) -> Result<Vec<Vec<u8>>> {
        self.with_inner(|inner| {
            let saved = inner.cursor.position();
            let spans = inner.spans()?;

            let mut records = Vec::new();
            let mut read = Ok(());
            for span in spans.iter().filter(|s| s.header.is_active()) {
                inner.cursor.seek(span.offset + inner.layout.header_size());
                match inner.read_payload(span) {
                    Ok(payload) => records.push(payload),
                    Err(e) => {
                        read = Err(e);
                        break;
                    }
                }
            }

            inner.cursor.seek(saved);
            read.map(|()| records)
        })
    }

    /// Collect usage counters with a full scan.
    pub fn stats(&self) -> Result<StoreStats> {
        self.with_inner(|inner| {
            let spans = inner.spans()?;
            let region_size = inner.region.len();
            let total_blocks = region_size / inner.layout.block_size();

            let mut stats = StoreStats {
                region_size,
                total_blocks,
                growth_events: inner.growth_events,
                ..StoreStats::default()
            };
            let mut occupied = 0;
            for span in &spans {
                if span.header.is_active() {
                    stats.active_records += 1;
                } else {
                    stats.tombstones += 1;
                }
                if !span.header.is_free() {
                    occupied += span.header.span_blocks();
                }
            }
            stats.free_blocks = total_blocks - occupied;
            Ok(stats)
        })
    }

    /// Flush buffered writes and sync the region to durable storage.
    pub fn sync(&self) -> Result<()> {
        self.with_inner(|inner| inner.region.sync())
    }

    /// Flush, sync and release the region.
    ///
    /// The store is closed even if the sync fails; the error is still
    /// returned. Every later call fails with `StoreClosed`.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().take().ok_or(Error::StoreClosed)?;
        inner.region.sync()?;
        emit!(inner.logger, Info, "closed store ({} bytes)", inner.region.len());
        inner.logger.flush();
        Ok(())
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Data file path, if the store was opened from one.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Block size in bytes
    pub fn block_size(&self) -> u64 {
        self.layout.block_size()
    }

    /// Record header format
    pub fn header_format(&self) -> HeaderFormat {
        self.layout.format()
    }

    #[cfg(test)]
    fn inner_mut<T>(&self, f: impl FnOnce(&mut StoreInner) -> T) -> T {
        let mut guard = self.inner.lock();
        f(guard.as_mut().expect("store open"))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        // Best effort flush on drop
        if let Some(inner) = self.inner.get_mut().as_mut() {
            let _ = inner.region.flush();
        }
    }
}

impl StoreInner {
    fn span_end(&self, span: &Span) -> u64 {
        span.offset + span.header.span_blocks() * self.layout.block_size()
    }

    /// Decode headers from the cursor until a record span turns up.
    ///
    /// Unused blocks are stepped over. On success the cursor sits just past
    /// the span's header. On failure it is put back on the offending block,
    /// so retrying reports the same error.
    fn next_span(&mut self) -> Result<Option<Span>> {
        let block_size = self.layout.block_size();
        let header_size = self.layout.header_size();

        loop {
            let offset = self.cursor.position();
            if offset >= self.region.len() {
                return Ok(None);
            }
            self.cursor.check_aligned(block_size)?;

            let header = match self.read_header(offset) {
                Ok(header) => header,
                Err(e) => {
                    self.cursor.seek(offset);
                    return Err(e);
                }
            };

            if header.is_virgin() {
                self.cursor.advance(block_size - header_size);
                continue;
            }

            let span = Span { offset, header };
            if self.span_end(&span) > self.region.len() {
                self.cursor.seek(offset);
                return Err(Error::corrupt_header(
                    offset,
                    "record extends past the end of the region",
                ));
            }
            return Ok(Some(span));
        }
    }

    fn read_header(&mut self, offset: u64) -> Result<RecordHeader> {
        let mut raw = [0u8; 16];
        let header_buf = &mut raw[..self.layout.header_size() as usize];
        self.cursor.read_exact(self.region.as_mut(), header_buf)?;
        self.layout.decode_header(header_buf, offset)
    }

    /// Move the cursor to the end of `span`, discarding whatever is left.
    fn finish_span(&mut self, span: &Span) {
        let end = self.span_end(span);
        let pos = self.cursor.position();
        if pos < end {
            self.cursor.advance(end - pos);
        }
    }

    /// Read the payload of `span`; the cursor must sit right after its
    /// header. A failed read leaves the cursor at the span's start.
    fn read_payload(&mut self, span: &Span) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; span.header.length as usize];
        if let Err(e) = self.cursor.read_exact(self.region.as_mut(), &mut payload) {
            self.cursor.seek(span.offset);
            return Err(e);
        }
        self.finish_span(span);
        Ok(payload)
    }

    /// Every span from the start of the region. The cursor is restored,
    /// whether or not the walk succeeds.
    fn spans(&mut self) -> Result<Vec<Span>> {
        let saved = self.cursor.position();
        self.cursor.seek(0);

        let mut spans = Vec::new();
        let walked = loop {
            match self.next_span() {
                Ok(Some(span)) => {
                    self.finish_span(&span);
                    spans.push(span);
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        self.cursor.seek(saved);
        walked.map(|()| spans)
    }

    fn read_sequential(&mut self) -> Result<Option<Vec<u8>>> {
        while let Some(span) = self.next_span()? {
            if span.header.is_active() {
                return self.read_payload(&span).map(Some);
            }
            self.finish_span(&span);
        }
        Ok(None)
    }

    /// Position the cursor just after the header of span `ordinal`.
    fn locate(&mut self, ordinal: u64) -> Result<Option<Span>> {
        if let Some(offset) = self.offsets.get(ordinal) {
            self.cursor.seek(offset);
            if let Some(span) = self.next_span()? {
                if span.offset == offset {
                    return Ok(Some(span));
                }
            }
            emit!(
                self.logger,
                Warn,
                "offset cache disagrees with region at ordinal {}; rescanning",
                ordinal
            );
            self.offsets.invalidate();
        } else if self.offsets.len().is_some_and(|n| ordinal >= n) {
            return Ok(None);
        }

        self.cursor.seek(0);
        for _ in 0..ordinal {
            match self.next_span()? {
                Some(span) => self.finish_span(&span),
                None => return Ok(None),
            }
        }
        self.next_span()
    }

    fn read_at(&mut self, ordinal: u64) -> Result<Option<Vec<u8>>> {
        match self.locate(ordinal)? {
            None => Ok(None),
            Some(span) if span.header.is_active() => self.read_payload(&span).map(Some),
            Some(span) => {
                self.finish_span(&span);
                Err(Error::RecordDeleted { ordinal })
            }
        }
    }

    fn read_at_offset(&mut self, offset: u64) -> Result<Vec<u8>> {
        let block_size = self.layout.block_size();
        if offset % block_size != 0 || offset >= self.region.len() {
            return Err(Error::invalid_argument(format!(
                "offset {} is not a block boundary inside the region",
                offset
            )));
        }

        self.cursor.seek(offset);
        match self.next_span()? {
            Some(span) if span.offset == offset && span.header.is_active() => {
                self.read_payload(&span)
            }
            _ => Err(Error::NotFound(format!("No live record at offset {}", offset))),
        }
    }

    fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let frame = self.layout.build_frame(payload)?;
        let blocks = frame.len() as u64 / self.layout.block_size();

        let offset = self.allocate(blocks)?;
        self.region.write_at(offset, &frame)?;
        self.cursor.invalidate();
        self.offsets.record_append(offset);

        if self.sync_on_write {
            self.region.sync()?;
        }
        emit!(
            self.logger,
            Debug,
            "appended {} bytes at offset {} ({} blocks)",
            payload.len(),
            offset,
            blocks
        );
        Ok(offset)
    }

    /// Find room for `blocks` blocks, growing the region once if needed.
    fn allocate(&mut self, blocks: u64) -> Result<u64> {
        let trailing_free =
            match self.allocator.allocate(self.region.as_mut(), &self.layout, blocks)? {
                Allocation::Found(offset) => return Ok(offset),
                Allocation::NotFound { trailing_free } => trailing_free,
            };

        let old_len = self.region.len();
        self.grow(blocks, trailing_free)?;
        self.allocator.set_cursor(old_len - trailing_free * self.layout.block_size());

        match self.allocator.allocate(self.region.as_mut(), &self.layout, blocks)? {
            Allocation::Found(offset) => Ok(offset),
            Allocation::NotFound { .. } => {
                Err(Error::corruption("No free run after growing the region"))
            }
        }
    }

    /// Double the region until the free run at its end can hold `blocks`
    /// blocks.
    fn grow(&mut self, blocks: u64, trailing_free: u64) -> Result<()> {
        let block_size = self.layout.block_size();
        let old_len = self.region.len();
        let have = trailing_free * block_size;
        let need = blocks * block_size;

        let double = |n: u64| {
            n.checked_mul(2)
                .ok_or_else(|| Error::invalid_argument("region size would overflow"))
        };
        let mut new_len = if old_len == 0 { block_size } else { double(old_len)? };
        while new_len - old_len + have < need {
            new_len = double(new_len)?;
        }
        let new_len = new_len.div_ceil(block_size) * block_size;

        self.region.set_len(new_len)?;
        self.cursor.invalidate();
        self.growth_events += 1;

        emit!(self.logger, Info, "grew region from {} to {} bytes", old_len, new_len);
        Ok(())
    }

    fn delete(&mut self, ordinal: u64) -> Result<Vec<u8>> {
        let span = self.locate(ordinal)?.ok_or(Error::OrdinalOutOfRange { ordinal })?;
        if !span.header.is_active() {
            self.finish_span(&span);
            return Err(Error::RecordDeleted { ordinal });
        }

        let payload = self.read_payload(&span)?;
        let tombstone = self.layout.tombstone_frame(span.header.block_count)?;
        self.region.write_at(span.offset, &tombstone)?;
        let end = self.span_end(&span);
        self.cursor.seek(end);
        self.region.flush()?;

        if self.sync_on_write {
            self.region.sync()?;
        }
        emit!(
            self.logger,
            Debug,
            "deleted ordinal {} at offset {} ({} blocks)",
            ordinal,
            span.offset,
            span.header.block_count
        );
        Ok(payload)
    }
}
