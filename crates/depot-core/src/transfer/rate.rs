//! Sampled throughput estimation for a single transfer.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sampling window. Rates are recomputed once this much time has passed
/// since the previous sample.
const WINDOW: Duration = Duration::from_millis(500);

struct Sample {
    at: Instant,
    bytes: u64,
    rate: f64,
}

/// Byte-rate meter fed by the coordinator's polls.
///
/// `sample(bytes)` is called with the handle's current byte count; the rate
/// is the delta over the sampling window. A byte count that moved backwards
/// (attempt rollback) reads as zero throughput for that window.
pub struct RateMeter {
    inner: Mutex<Sample>,
}

impl RateMeter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Sample {
                at: Instant::now(),
                bytes: 0,
                rate: 0.0,
            }),
        }
    }

    /// Record the current byte count and return the estimated rate in
    /// bytes per second.
    pub fn sample(&self, bytes: u64) -> f64 {
        let mut s = self.inner.lock().unwrap();
        let elapsed = s.at.elapsed();
        if elapsed >= WINDOW {
            let delta = bytes.saturating_sub(s.bytes) as f64;
            s.rate = delta / elapsed.as_secs_f64();
            s.at = Instant::now();
            s.bytes = bytes;
        } else if bytes > s.bytes && s.rate == 0.0 {
            // First bytes of a transfer: report progress before a full
            // window has elapsed so the stall detector sees movement.
            s.rate = (bytes - s.bytes) as f64 / elapsed.as_secs_f64().max(1e-3);
        }
        s.rate
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new()
    }
}
