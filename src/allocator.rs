//! First-fit block allocator.
//!
//! The allocator walks the region block by block, reading only record
//! headers. Free blocks extend the current run; an occupied record resets the
//! run and is skipped as a whole. The first run long enough wins.
//!
//! Scanning resumes from where the previous allocation ended, so repeated
//! appends do not rescan the head of the file. If nothing fits between the
//! saved cursor and the end of the region, one more pass runs from offset 0
//! before giving up. Giving up is not an error: the caller grows the region
//! and asks again.

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::region::Region;

/// Outcome of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// A run of free blocks starts at this byte offset.
    Found(u64),
    /// No run was long enough. `trailing_free` counts the free blocks that
    /// end exactly at the region end; growing the region extends that run.
    NotFound {
        /// Free blocks touching the region end
        trailing_free: u64,
    },
}

/// First-fit allocator with a resumable scan cursor.
#[derive(Debug, Default)]
pub struct Allocator {
    /// Byte offset the next scan starts from (always block aligned)
    cursor: u64,
}

impl Allocator {
    /// Create an allocator that starts scanning at offset 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next scan starts from
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Move the scan cursor. `offset` must be block aligned and sit on a
    /// record boundary.
    pub fn set_cursor(&mut self, offset: u64) {
        self.cursor = offset;
    }

    /// Find `blocks` contiguous free blocks.
    ///
    /// On success the cursor moves to the end of the returned run.
    pub fn allocate(
        &mut self,
        region: &mut dyn Region,
        layout: &Layout,
        blocks: u64,
    ) -> Result<Allocation> {
        let start = if self.cursor <= region.len() { self.cursor } else { 0 };

        let mut outcome = scan(region, layout, start, blocks)?;
        if matches!(outcome, Allocation::NotFound { .. }) && start > 0 {
            outcome = scan(region, layout, 0, blocks)?;
        }

        if let Allocation::Found(offset) = outcome {
            self.cursor = offset + blocks * layout.block_size();
        }
        Ok(outcome)
    }
}

/// One forward pass from `from` to the end of the region.
fn scan(region: &mut dyn Region, layout: &Layout, from: u64, blocks: u64) -> Result<Allocation> {
    let block_size = layout.block_size();
    let end = region.len();
    let mut header_buf = vec![0u8; layout.header_size() as usize];

    let mut run_start = from;
    let mut run_len = 0u64;
    let mut pos = from;

    while pos < end {
        if run_len == blocks {
            return Ok(Allocation::Found(run_start));
        }

        region.read_at(pos, &mut header_buf)?;
        let header = layout.decode_header(&header_buf, pos)?;

        if header.is_free() {
            if run_len == 0 {
                run_start = pos;
            }
            run_len += 1;
            pos += block_size;
        } else {
            run_len = 0;
            pos += header.span_blocks() * block_size;
            if pos > end {
                return Err(Error::corrupt_header(
                    pos - header.span_blocks() * block_size,
                    "record extends past the end of the region",
                ));
            }
        }
    }

    if run_len >= blocks {
        return Ok(Allocation::Found(run_start));
    }
    Ok(Allocation::NotFound { trailing_free: run_len })
}
