//! Byte-range planning.
//!
//! Splits a remote file into contiguous, non-overlapping byte ranges, each
//! carrying the header value for an HTTP Range request. One range maps to
//! exactly one chunk file for the whole life of a download.

mod range;

pub use range::{build_range, Range, RangeError};
