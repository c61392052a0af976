//! Curl error and status-line classification for the chunk retry loop.

use super::error::ChunkError;

/// Maps a curl-level failure to a chunk error, using the attempt's byte
/// counts when curl reports a short body.
pub(super) fn classify_curl_error(e: curl::Error, expected: u64, received: u64) -> ChunkError {
    if e.is_aborted_by_callback() {
        return ChunkError::Cancelled;
    }
    if e.is_recv_error() {
        return ChunkError::Reset(e);
    }
    if e.is_partial_file() {
        return ChunkError::Truncated { expected, received };
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_send_error()
        || e.is_operation_timedout()
        || e.is_got_nothing()
    {
        return ChunkError::Transient(e);
    }
    ChunkError::Curl(e)
}

/// Parses the status code out of the most recent `HTTP/…` status line.
pub(super) fn parse_http_status(lines: &[String]) -> Option<u32> {
    let line = lines.iter().rev().find(|l| l.starts_with("HTTP/"))?;
    line.split_whitespace().nth(1)?.parse().ok()
}
