//! Byte ranges and the clamping rules for kernel read requests.

/// A byte range `[start, end)` (half-open) within the remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ByteRange {
    /// Clamps a read of `length` bytes at `offset` to a resource of `size` bytes.
    ///
    /// Returns `None` when nothing is left to read: `offset >= size` or
    /// `length == 0`. A read that runs past the end is shortened, not rejected.
    pub fn clamped(offset: u64, length: u32, size: u64) -> Option<ByteRange> {
        if offset >= size || length == 0 {
            return None;
        }
        let end = offset.saturating_add(length as u64).min(size);
        Some(ByteRange { start: offset, end })
    }

    /// Range covered by block `index` of `block_size` bytes, cut at `size`.
    pub fn block(index: u64, block_size: u64, size: u64) -> ByteRange {
        let start = (index * block_size).min(size);
        let end = start.saturating_add(block_size).min(size);
        ByteRange { start, end }
    }

    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Indices of the `block_size` blocks this range touches (inclusive).
    pub fn block_span(&self, block_size: u64) -> std::ops::RangeInclusive<u64> {
        let first = self.start / block_size;
        let last = self.end.saturating_sub(1).max(self.start) / block_size;
        first..=last
    }

    /// HTTP Range header value (inclusive end): `bytes=start-(end-1)`.
    pub fn header_value(&self) -> String {
        format!("bytes={}", self.curl_range())
    }

    /// The form libcurl's `CURLOPT_RANGE` expects: `start-(end-1)` without the unit.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }
}
