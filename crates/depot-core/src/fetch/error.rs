//! Chunk fetch error type, classified for the retry loop.

use std::fmt;
use std::io;

/// Error from one chunk fetch attempt.
///
/// Recoverable variants loop back to a fresh request inside the fetcher;
/// the rest are fatal for the chunk and mark the whole batch non-retryable.
#[derive(Debug)]
pub enum ChunkError {
    /// Response status other than 206 (and not 403).
    Status(u32),
    /// HTTP 403: the download link expired; refresh it and retry.
    ExpiredLink,
    /// Transient network failure (connect, resolve, send).
    Transient(curl::Error),
    /// Connection reset while copying the body.
    Reset(curl::Error),
    /// Body ended before the full range arrived.
    Truncated { expected: u64, received: u64 },
    /// Transfer cancelled cooperatively (stall detector).
    Cancelled,
    /// Chunk file write failed.
    Write(io::Error),
    /// Fetching a fresh download link failed.
    Link(anyhow::Error),
    /// Any other curl-level failure.
    Curl(curl::Error),
}

impl ChunkError {
    /// True when the fetcher should roll back the attempt and go again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChunkError::ExpiredLink
                | ChunkError::Transient(_)
                | ChunkError::Reset(_)
                | ChunkError::Truncated { .. }
        )
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::Status(code) => {
                write!(f, "unexpected status code was returned: {}", code)
            }
            ChunkError::ExpiredLink => write!(f, "download link expired (HTTP 403)"),
            ChunkError::Transient(e) => write!(f, "temporary network error: {}", e),
            ChunkError::Reset(e) => write!(f, "connection reset: {}", e),
            ChunkError::Truncated { expected, received } => write!(
                f,
                "body ended early: received {} of {} bytes",
                received, expected
            ),
            ChunkError::Cancelled => write!(f, "transfer cancelled"),
            ChunkError::Write(e) => write!(f, "failed to write chunk file: {}", e),
            ChunkError::Link(e) => write!(f, "failed to fetch new download link: {}", e),
            ChunkError::Curl(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ChunkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChunkError::Transient(e) | ChunkError::Reset(e) | ChunkError::Curl(e) => Some(e),
            ChunkError::Write(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_variants() {
        assert!(ChunkError::ExpiredLink.is_recoverable());
        assert!(ChunkError::Truncated {
            expected: 15,
            received: 4
        }
        .is_recoverable());
        assert!(!ChunkError::Status(500).is_recoverable());
        assert!(!ChunkError::Cancelled.is_recoverable());
        assert!(!ChunkError::Write(io::Error::new(io::ErrorKind::Other, "x")).is_recoverable());
    }

    #[test]
    fn display_mentions_status_code() {
        let e = ChunkError::Status(500);
        assert!(e.to_string().contains("500"));
    }
}
