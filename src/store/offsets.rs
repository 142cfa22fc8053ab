//! In-memory ordinal to offset cache.

/// Byte offsets of every record span in file order.
///
/// `None` means unknown: the next lookup falls back to a linear scan. The
/// cache is never the source of truth; lookups through it are verified
/// against the header found at the cached offset.
#[derive(Debug)]
pub(crate) struct OffsetCache {
    enabled: bool,
    offsets: Option<Vec<u64>>,
}

impl OffsetCache {
    /// `known_empty` marks a region with no spans yet, so the cache starts
    /// complete.
    pub(crate) fn new(enabled: bool, known_empty: bool) -> Self {
        let offsets = (enabled && known_empty).then(Vec::new);
        Self { enabled, offsets }
    }

    pub(crate) fn get(&self, ordinal: u64) -> Option<u64> {
        let offsets = self.offsets.as_ref()?;
        usize::try_from(ordinal).ok().and_then(|i| offsets.get(i).copied())
    }

    /// Number of spans, when known.
    pub(crate) fn len(&self) -> Option<u64> {
        self.offsets.as_ref().map(|o| o.len() as u64)
    }

    /// Replace the contents with a fresh full scan.
    pub(crate) fn fill(&mut self, offsets: &[u64]) {
        if self.enabled {
            self.offsets = Some(offsets.to_vec());
        }
    }

    /// Record a new span at `offset`.
    ///
    /// A span past the last known one is a pure tail append. Anything else
    /// reused freed space and may have renumbered later spans.
    pub(crate) fn record_append(&mut self, offset: u64) {
        let is_tail = match &self.offsets {
            Some(offsets) => offsets.last().map_or(true, |&last| offset > last),
            None => return,
        };
        if is_tail {
            if let Some(offsets) = self.offsets.as_mut() {
                offsets.push(offset);
            }
        } else {
            self.offsets = None;
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.offsets = None;
    }
}
