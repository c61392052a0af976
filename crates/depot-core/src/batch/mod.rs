//! Batch coordinator for one set of concurrent chunk transfers.
//!
//! One worker thread per chunk runs the retryable fetcher; the coordinator
//! thread owns the handle slice, polls rates on a fixed tick, cancels
//! stalled transfers after a debounce window, renders progress lines, and
//! folds the terminal states into a [`BatchOutcome`]. Workers report
//! completion over an mpsc channel in arbitrary order; range order is
//! reimposed later by the assembler, never assumed here.

mod outcome;
mod stall;

pub use outcome::{map_to_outcome, report, BatchOutcome, ChunkReport};
pub use stall::StallTracker;

use std::io::Write;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::fetch::{fetch_chunk, ChunkRequest, DownloadLinkFetcher};
use crate::progress;
use crate::retry::RetryPolicy;
use crate::transfer::{ChunkTransfer, Transfer};

/// Drives one batch attempt of N concurrent chunk transfers.
pub struct BatchCoordinator {
    poll_interval: Duration,
    stall_ticks: u32,
    retry: RetryPolicy,
    referer: String,
}

impl BatchCoordinator {
    pub fn new(
        poll_interval: Duration,
        stall_ticks: u32,
        retry: RetryPolicy,
        referer: impl Into<String>,
    ) -> Self {
        Self {
            poll_interval,
            stall_ticks,
            retry,
            referer: referer.into(),
        }
    }

    /// Runs every request to a terminal state and returns the batch decision.
    ///
    /// Never partially retries: the caller decides whether to run one more
    /// attempt over `BatchOutcome::failed`.
    pub fn run(
        &self,
        requests: &[ChunkRequest],
        link_fetcher: Arc<dyn DownloadLinkFetcher>,
        progress_sink: &mut dyn Write,
    ) -> BatchOutcome {
        let handles: Vec<Arc<ChunkTransfer>> = requests
            .iter()
            .map(|r| Arc::new(ChunkTransfer::new(r.chunk_path.clone(), r.range.len())))
            .collect();

        let (done_tx, done_rx) = mpsc::channel::<usize>();
        let mut workers = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let request = request.clone();
            let handle = Arc::clone(&handles[index]);
            let fetcher = Arc::clone(&link_fetcher);
            let policy = self.retry;
            let referer = self.referer.clone();
            let tx = done_tx.clone();
            workers.push(thread::spawn(move || {
                match fetch_chunk(&request, &handle, fetcher.as_ref(), &policy, &referer) {
                    Ok(()) => {
                        handle.mark_complete();
                    }
                    Err(e) => {
                        // A cancelled worker loses the settle race to the
                        // coordinator's timed-out marking; that's the point.
                        handle.mark_failed(e.to_string());
                    }
                }
                let _ = tx.send(index);
            }));
        }
        drop(done_tx);

        self.monitor(&handles, &done_rx, progress_sink);

        for worker in workers {
            let _ = worker.join();
        }

        let reports = requests
            .iter()
            .zip(&handles)
            .map(|(request, handle)| report(request, handle.as_ref()))
            .collect();
        map_to_outcome(reports)
    }

    /// Blocks until every handle is terminal, ticking on `poll_interval`.
    fn monitor(
        &self,
        handles: &[Arc<ChunkTransfer>],
        done_rx: &mpsc::Receiver<usize>,
        progress_sink: &mut dyn Write,
    ) {
        let mut stall = StallTracker::new(handles.len(), self.stall_ticks);
        let mut open = handles.len();
        let mut next_tick = Instant::now() + self.poll_interval;

        while open > 0 {
            let now = Instant::now();
            if now >= next_tick {
                self.tick(handles, &mut stall, progress_sink);
                next_tick = now + self.poll_interval;
                continue;
            }
            match done_rx.recv_timeout(next_tick - now) {
                Ok(index) => {
                    open -= 1;
                    report_finished(handles[index].as_ref(), progress_sink);
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn tick(
        &self,
        handles: &[Arc<ChunkTransfer>],
        stall: &mut StallTracker,
        progress_sink: &mut dyn Write,
    ) {
        for (index, handle) in handles.iter().enumerate() {
            if handle.is_terminal() {
                continue;
            }
            let rate = handle.bytes_per_second();
            if stall.observe(index, rate) {
                tracing::debug!(
                    chunk = %handle.chunk_path().display(),
                    "zero throughput across the debounce window, cancelling transfer"
                );
                handle.mark_timed_out();
                continue;
            }
            let snapshot = progress::snapshot(handle.as_ref());
            let _ = writeln!(progress_sink, "{}", progress::downloading_line(&snapshot));
        }
    }
}

/// Per finished chunk: an error line or a `Finished` line.
fn report_finished(handle: &dyn Transfer, progress_sink: &mut dyn Write) {
    let snapshot = progress::snapshot(handle);
    let line = match handle.failure() {
        Some(_) => progress::error_line(&snapshot),
        None => progress::finished_line(&snapshot),
    };
    let _ = writeln!(progress_sink, "{}", line);
}
