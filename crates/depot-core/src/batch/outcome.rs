//! Aggregation of per-chunk terminal states into a batch decision.

use crate::fetch::ChunkRequest;
use crate::transfer::Transfer;

/// Terminal summary of one chunk, taken after its handle settled.
#[derive(Debug, Clone)]
pub struct ChunkReport {
    pub request: ChunkRequest,
    /// Terminal error message, `None` on success.
    pub failure: Option<String>,
    /// True when the terminal cause was a coordinator-detected stall.
    pub timed_out: bool,
}

/// Decision for one batch attempt, consumed by the orchestrator.
#[derive(Debug)]
pub struct BatchOutcome {
    /// True iff every failed chunk timed out; the caller may then run one
    /// more batch attempt over `failed`.
    pub should_retry: bool,
    /// Aggregated failure, `None` when every chunk completed.
    pub error: Option<anyhow::Error>,
    /// Requests whose chunks failed, in range order.
    pub failed: Vec<ChunkRequest>,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Snapshot a terminal transfer into a report.
pub fn report(request: &ChunkRequest, transfer: &dyn Transfer) -> ChunkReport {
    ChunkReport {
        request: request.clone(),
        failure: transfer.failure(),
        timed_out: transfer.did_timeout(),
    }
}

/// Folds chunk reports into the batch decision.
///
/// A single failure that was not a stall makes the whole batch
/// non-retryable; the caller never partially retries.
pub fn map_to_outcome(reports: Vec<ChunkReport>) -> BatchOutcome {
    let mut failed = Vec::new();
    let mut messages = Vec::new();
    let mut all_timed_out = true;

    for report in reports {
        let Some(failure) = report.failure else {
            continue;
        };
        messages.push(format!(
            "Error for {}: {}",
            report.request.chunk_path.display(),
            failure
        ));
        if !report.timed_out {
            all_timed_out = false;
        }
        failed.push(report.request);
    }

    if failed.is_empty() {
        return BatchOutcome {
            should_retry: false,
            error: None,
            failed,
        };
    }
    BatchOutcome {
        should_retry: all_timed_out,
        error: Some(anyhow::anyhow!(messages.join("\n"))),
        failed,
    }
}
