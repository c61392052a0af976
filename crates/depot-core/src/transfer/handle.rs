//! Network-backed transfer handle shared between one worker and the coordinator.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

use super::rate::RateMeter;
use super::Transfer;

/// Lifecycle of one chunk transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkState {
    Pending = 0,
    Downloading = 1,
    Complete = 2,
    Failed = 3,
    TimedOut = 4,
}

impl ChunkState {
    fn from_u8(v: u8) -> ChunkState {
        match v {
            0 => ChunkState::Pending,
            1 => ChunkState::Downloading,
            2 => ChunkState::Complete,
            3 => ChunkState::Failed,
            _ => ChunkState::TimedOut,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            ChunkState::Complete | ChunkState::Failed | ChunkState::TimedOut
        )
    }
}

/// Shared state of one chunk transfer.
///
/// The worker increments bytes as the body arrives and settles the terminal
/// state; the coordinator polls rate/completion and may cancel. All
/// transitions go through compare-and-swap so a terminal state is settled
/// exactly once, whichever side gets there first.
pub struct ChunkTransfer {
    chunk_path: PathBuf,
    total_size: u64,
    bytes: AtomicU64,
    state: AtomicU8,
    cancelled: AtomicBool,
    error: Mutex<Option<String>>,
    rate: RateMeter,
}

impl ChunkTransfer {
    pub fn new(chunk_path: PathBuf, total_size: u64) -> Self {
        Self {
            chunk_path,
            total_size,
            bytes: AtomicU64::new(0),
            state: AtomicU8::new(ChunkState::Pending as u8),
            cancelled: AtomicBool::new(false),
            error: Mutex::new(None),
            rate: RateMeter::new(),
        }
    }

    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once `cancel` has been requested; the worker checks this between
    /// and during attempts.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Worker: transition `Pending → Downloading`. No-op from any other state.
    pub fn mark_downloading(&self) {
        let _ = self.state.compare_exchange(
            ChunkState::Pending as u8,
            ChunkState::Downloading as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Worker: count `n` body bytes as confirmed.
    pub fn record_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::AcqRel);
    }

    /// Worker: un-count bytes from an abandoned partial attempt so aggregate
    /// progress never double-counts when the attempt is replayed.
    pub fn rollback_bytes(&self, n: u64) {
        let mut current = self.bytes.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(n);
            match self.bytes.compare_exchange(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    /// Worker: settle `Complete`. Loses to an earlier terminal transition.
    pub fn mark_complete(&self) -> bool {
        self.settle(ChunkState::Complete, None)
    }

    /// Worker: settle `Failed` with the terminal cause.
    pub fn mark_failed(&self, cause: String) -> bool {
        self.settle(ChunkState::Failed, Some(cause))
    }

    /// Coordinator: settle `TimedOut` after the stall debounce fired. Also
    /// requests cancellation so the worker's in-flight read unblocks.
    pub fn mark_timed_out(&self) -> bool {
        self.cancelled.store(true, Ordering::Release);
        let cause = format!(
            "a download timed out for chunk: {}",
            self.chunk_path.display()
        );
        self.settle(ChunkState::TimedOut, Some(cause))
    }

    fn settle(&self, terminal: ChunkState, cause: Option<String>) -> bool {
        debug_assert!(terminal.is_terminal());
        for from in [ChunkState::Downloading, ChunkState::Pending] {
            if self
                .state
                .compare_exchange(
                    from as u8,
                    terminal as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                if let Some(cause) = cause {
                    *self.error.lock().unwrap() = Some(cause);
                }
                return true;
            }
        }
        false
    }
}

impl Transfer for ChunkTransfer {
    fn chunk_path(&self) -> &Path {
        &self.chunk_path
    }

    fn total_size(&self) -> u64 {
        self.total_size
    }

    fn bytes_complete(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    fn bytes_per_second(&self) -> f64 {
        self.rate.sample(self.bytes_complete())
    }

    fn is_complete(&self) -> bool {
        self.state() == ChunkState::Complete
    }

    fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    fn did_timeout(&self) -> bool {
        self.state() == ChunkState::TimedOut
    }

    fn failure(&self) -> Option<String> {
        self.error.lock().unwrap().clone()
    }

    fn eta_secs(&self) -> Option<u64> {
        let remaining = self.total_size.saturating_sub(self.bytes_complete());
        if remaining == 0 {
            return Some(0);
        }
        let rate = self.bytes_per_second();
        if rate <= 0.0 {
            return None;
        }
        Some((remaining as f64 / rate).ceil() as u64)
    }

    fn cancel(&self) {
        if self.is_terminal() {
            return;
        }
        self.cancelled.store(true, Ordering::Release);
    }
}
