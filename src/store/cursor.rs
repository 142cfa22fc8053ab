//! Buffered sequential cursor over a region.

use crate::error::{Error, Result};
use crate::region::Region;

/// Read position plus a window of region bytes starting at `buf_start`.
///
/// The window is only a cache of what the region held when it was filled.
/// Anything that writes to the region or moves the cursor out of band must
/// call [`BlockCursor::seek`] or [`BlockCursor::invalidate`].
#[derive(Debug)]
pub(crate) struct BlockCursor {
    /// Logical read position in the region
    pos: u64,
    /// Read buffer, allocated once at `capacity` bytes
    buf: Vec<u8>,
    /// Region offset of `buf[0]`
    buf_start: u64,
    /// Valid bytes in `buf`
    filled: usize,
}

impl BlockCursor {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { pos: 0, buf: vec![0u8; capacity], buf_start: 0, filled: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.pos
    }

    /// Move to `pos` and drop the buffered window.
    pub(crate) fn seek(&mut self, pos: u64) {
        self.pos = pos;
        self.invalidate();
    }

    pub(crate) fn invalidate(&mut self) {
        self.buf_start = 0;
        self.filled = 0;
    }

    /// Fails with `MisalignedCursor` unless the position is on a block
    /// boundary.
    pub(crate) fn check_aligned(&self, block_size: u64) -> Result<()> {
        if self.pos % block_size != 0 {
            return Err(Error::MisalignedCursor { offset: self.pos, block_size });
        }
        Ok(())
    }

    /// Skip `n` bytes without reading them. The window stays valid.
    pub(crate) fn advance(&mut self, n: u64) {
        self.pos += n;
    }

    /// Read exactly `out.len()` bytes at the cursor and advance past them.
    pub(crate) fn read_exact(&mut self, region: &mut dyn Region, out: &mut [u8]) -> Result<()> {
        let mut done = 0;
        while done < out.len() {
            let wanted = out.len() - done;
            if !self.is_buffered(self.pos) {
                if wanted >= self.buf.len() {
                    // Larger than the whole window: read straight through.
                    region.read_at(self.pos, &mut out[done..])?;
                    self.pos += wanted as u64;
                    return Ok(());
                }
                self.fill(region)?;
            }

            let start = (self.pos - self.buf_start) as usize;
            let n = (self.filled - start).min(wanted);
            out[done..done + n].copy_from_slice(&self.buf[start..start + n]);
            done += n;
            self.pos += n as u64;
        }
        Ok(())
    }

    fn is_buffered(&self, pos: u64) -> bool {
        self.filled > 0 && pos >= self.buf_start && pos < self.buf_start + self.filled as u64
    }

    fn fill(&mut self, region: &mut dyn Region) -> Result<()> {
        let remaining = region.len().saturating_sub(self.pos);
        if remaining == 0 {
            return Err(Error::UnexpectedEndOfStream);
        }
        let n = remaining.min(self.buf.len() as u64) as usize;
        region.read_at(self.pos, &mut self.buf[..n])?;
        self.buf_start = self.pos;
        self.filled = n;
        Ok(())
    }
}
