//! Per-chunk retryable fetcher.
//!
//! One ranged GET per attempt, written into the chunk's dedicated file from
//! offset 0. Recoverable failures (transient network errors, expired links,
//! truncated bodies, connection resets) loop back to a fresh request after
//! rolling back the partial attempt's progress; anything else is fatal for
//! the chunk and surfaces to the batch coordinator.

mod classify;
mod error;

pub use error::ChunkError;

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str;
use std::time::Duration;

use crate::ranger::Range;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transfer::ChunkTransfer;

/// Returns a fresh, possibly time-limited download URL. Called once up
/// front by the client and again whenever a chunk GET is answered with 403.
pub trait DownloadLinkFetcher: Send + Sync {
    fn new_download_link(&self) -> anyhow::Result<String>;
}

/// Link fetcher for a direct URL that never expires.
pub struct StaticLink {
    url: String,
}

impl StaticLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl DownloadLinkFetcher for StaticLink {
    fn new_download_link(&self) -> anyhow::Result<String> {
        Ok(self.url.clone())
    }
}

/// One ranged GET to perform: URL, byte range, and the chunk file it owns.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub url: String,
    pub range: Range,
    pub chunk_path: PathBuf,
}

/// Downloads one chunk, retrying recoverable failures in place.
///
/// The loop is bounded by `policy`; the batch-level stall detector remains
/// the backstop for an attempt stuck on a silent connection. Cancellation is
/// honored between attempts and, via the transfer's progress callback,
/// inside one.
pub fn fetch_chunk(
    request: &ChunkRequest,
    handle: &ChunkTransfer,
    link_fetcher: &dyn DownloadLinkFetcher,
    policy: &RetryPolicy,
    referer: &str,
) -> Result<(), ChunkError> {
    handle.mark_downloading();
    let mut url = request.url.clone();
    let mut attempt: u32 = 1;

    loop {
        if handle.is_cancelled() {
            return Err(ChunkError::Cancelled);
        }
        let err = match run_attempt(&url, request, handle, referer) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_recoverable() => e,
            Err(e) => return Err(e),
        };
        match policy.decide(attempt) {
            RetryDecision::GiveUp => return Err(err),
            RetryDecision::RetryAfter(delay) => {
                if matches!(err, ChunkError::ExpiredLink) {
                    url = link_fetcher
                        .new_download_link()
                        .map_err(ChunkError::Link)?;
                }
                tracing::debug!(
                    chunk = %request.chunk_path.display(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying chunk after recoverable error: {}",
                    err
                );
                sleep_unless_cancelled(handle, delay);
                attempt += 1;
            }
        }
    }
}

/// Backoff sleep that wakes early when the coordinator cancels the chunk.
fn sleep_unless_cancelled(handle: &ChunkTransfer, delay: Duration) {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = delay;
    while !remaining.is_zero() {
        if handle.is_cancelled() {
            return;
        }
        let step = remaining.min(SLICE);
        std::thread::sleep(step);
        remaining -= step;
    }
}

/// One GET attempt. Writes only 206 bodies into the chunk file; bodies of
/// any other status are consumed and discarded so an error page can never
/// corrupt the chunk. On a recoverable failure the attempt's bytes are
/// rolled back from the handle before returning.
fn run_attempt(
    url: &str,
    request: &ChunkRequest,
    handle: &ChunkTransfer,
    referer: &str,
) -> Result<(), ChunkError> {
    let expected = request.range.len();
    let file = File::create(&request.chunk_path).map_err(ChunkError::Write)?;
    let mut out = BufWriter::new(file);

    let headers: RefCell<Vec<String>> = RefCell::new(Vec::new());
    let write_gate: Cell<Option<bool>> = Cell::new(None);
    let write_error: RefCell<Option<io::Error>> = RefCell::new(None);
    let attempt_bytes: Cell<u64> = Cell::new(0);

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(ChunkError::Curl)?;
    easy.follow_location(true).map_err(ChunkError::Curl)?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(ChunkError::Curl)?;
    easy.referer(referer).map_err(ChunkError::Curl)?;
    let mut list = curl::easy::List::new();
    list.append(&format!("Range: {}", request.range.header_value()))
        .map_err(ChunkError::Curl)?;
    easy.http_headers(list).map_err(ChunkError::Curl)?;
    // Progress callback doubles as the cancellation hook: returning false
    // aborts the transfer and unblocks the pending read.
    easy.progress(true).map_err(ChunkError::Curl)?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    if line.starts_with("HTTP/") {
                        headers.borrow_mut().clear();
                    }
                    headers.borrow_mut().push(line.to_string());
                }
                true
            })
            .map_err(ChunkError::Curl)?;
        transfer
            .progress_function(|_, _, _, _| !handle.is_cancelled())
            .map_err(ChunkError::Curl)?;
        transfer
            .write_function(|data| {
                if write_gate.get().is_none() {
                    let status = classify::parse_http_status(&headers.borrow());
                    write_gate.set(Some(status == Some(206)));
                }
                if write_gate.get() == Some(false) {
                    return Ok(data.len());
                }
                match out.write_all(data) {
                    Ok(()) => {
                        attempt_bytes.set(attempt_bytes.get() + data.len() as u64);
                        handle.record_bytes(data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_error.borrow_mut().replace(e);
                        Ok(0)
                    }
                }
            })
            .map_err(ChunkError::Curl)?;
        transfer.perform()
    };

    let result = settle_attempt(
        perform_result,
        &mut easy,
        &mut out,
        handle,
        write_error.borrow_mut().take(),
        expected,
        attempt_bytes.get(),
    );
    if let Err(ref e) = result {
        if e.is_recoverable() {
            handle.rollback_bytes(attempt_bytes.get());
        }
    }
    result
}

fn settle_attempt(
    perform_result: Result<(), curl::Error>,
    easy: &mut curl::easy::Easy,
    out: &mut BufWriter<File>,
    handle: &ChunkTransfer,
    write_error: Option<io::Error>,
    expected: u64,
    received: u64,
) -> Result<(), ChunkError> {
    if let Err(e) = perform_result {
        if let Some(io_err) = write_error {
            return Err(ChunkError::Write(io_err));
        }
        if handle.is_cancelled() || e.is_aborted_by_callback() {
            return Err(ChunkError::Cancelled);
        }
        return Err(classify::classify_curl_error(e, expected, received));
    }

    out.flush().map_err(ChunkError::Write)?;
    let code = easy.response_code().map_err(ChunkError::Curl)?;
    match code {
        206 => {
            if received != expected {
                Err(ChunkError::Truncated { expected, received })
            } else {
                Ok(())
            }
        }
        403 => Err(ChunkError::ExpiredLink),
        _ => Err(ChunkError::Status(code)),
    }
}
