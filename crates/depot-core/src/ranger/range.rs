//! Range type and planning.

use thiserror::Error;

/// A single byte range `[lower, upper]` (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// First byte offset covered by this range.
    pub lower: u64,
    /// Last byte offset covered by this range.
    pub upper: u64,
}

impl Range {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.upper - self.lower + 1
    }

    /// HTTP Range header value: `bytes=lower-upper`.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.lower, self.upper)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("content length cannot be negative: {0}")]
    NegativeContentLength(i64),
}

/// Builds the range plan for `content_length` bytes split across at most
/// `chunk_count` ranges.
///
/// Ranges are as equal as possible; the remainder is spread one byte at a
/// time across the leading ranges. Content shorter than `chunk_count`
/// produces fewer, single-byte ranges rather than empty ones. A zero
/// content length yields one whole-file range (`bytes=0-0`), which a
/// server answers with the (empty or single-byte) body.
pub fn build_range(content_length: i64, chunk_count: usize) -> Result<Vec<Range>, RangeError> {
    if content_length < 0 {
        return Err(RangeError::NegativeContentLength(content_length));
    }
    let total = content_length as u64;
    if total == 0 {
        return Ok(vec![Range { lower: 0, upper: 0 }]);
    }

    let count = (chunk_count.max(1) as u64).min(total);
    let base = total / count;
    let remainder = total % count;

    let mut ranges = Vec::with_capacity(count as usize);
    let mut offset = 0u64;
    for i in 0..count {
        let len = base + if i < remainder { 1 } else { 0 };
        ranges.push(Range {
            lower: offset,
            upper: offset + len - 1,
        });
        offset += len;
    }
    Ok(ranges)
}
