//! Progress lines for the download sink.
//!
//! Snapshotting and formatting are pure so they can be tested without a
//! live transfer; rendering is just line-buffered writes to the caller's
//! sink. No terminal control codes here; an in-place redrawing UI can be
//! layered on top by a consumer.

use crate::transfer::Transfer;

/// Point-in-time view of one chunk transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkProgress {
    pub file: String,
    pub bytes_complete: u64,
    pub total: u64,
    pub bytes_per_second: f64,
    pub eta_secs: Option<u64>,
    pub failure: Option<String>,
}

impl ChunkProgress {
    /// Whole percent complete, 100 for an empty chunk.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        (self.bytes_complete.min(self.total) * 100) / self.total
    }
}

/// Reads one handle into a snapshot.
pub fn snapshot(transfer: &dyn Transfer) -> ChunkProgress {
    ChunkProgress {
        file: transfer.chunk_path().display().to_string(),
        bytes_complete: transfer.bytes_complete(),
        total: transfer.total_size(),
        bytes_per_second: transfer.bytes_per_second(),
        eta_secs: transfer.eta_secs(),
        failure: transfer.failure(),
    }
}

/// `Downloading <file> <bytes>/<total> (<pct>%) - <rate>KB/s ETA: <secs>s`
pub fn downloading_line(p: &ChunkProgress) -> String {
    let eta = match p.eta_secs {
        Some(secs) => secs.to_string(),
        None => "?".to_string(),
    };
    format!(
        "Downloading {} {}/{} ({}%) - {:.2}KB/s ETA: {}s",
        p.file,
        p.bytes_complete,
        p.total,
        p.percent(),
        p.bytes_per_second / 1024.0,
        eta
    )
}

/// `Finished <file> <bytes>/<total> (<pct>%)`
pub fn finished_line(p: &ChunkProgress) -> String {
    format!(
        "Finished {} {}/{} ({}%)",
        p.file,
        p.bytes_complete,
        p.total,
        p.percent()
    )
}

/// `Error downloading <file>: <cause>`
pub fn error_line(p: &ChunkProgress) -> String {
    let cause = p.failure.as_deref().unwrap_or("unknown error");
    format!("Error downloading {}: {}", p.file, cause)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress() -> ChunkProgress {
        ChunkProgress {
            file: "pkg.tar_0".into(),
            bytes_complete: 512,
            total: 2048,
            bytes_per_second: 2048.0,
            eta_secs: Some(3),
            failure: None,
        }
    }

    #[test]
    fn downloading_line_format() {
        assert_eq!(
            downloading_line(&progress()),
            "Downloading pkg.tar_0 512/2048 (25%) - 2.00KB/s ETA: 3s"
        );
    }

    #[test]
    fn downloading_line_unknown_eta() {
        let mut p = progress();
        p.eta_secs = None;
        p.bytes_per_second = 0.0;
        assert_eq!(
            downloading_line(&p),
            "Downloading pkg.tar_0 512/2048 (25%) - 0.00KB/s ETA: ?s"
        );
    }

    #[test]
    fn finished_line_format() {
        let mut p = progress();
        p.bytes_complete = 2048;
        assert_eq!(finished_line(&p), "Finished pkg.tar_0 2048/2048 (100%)");
    }

    #[test]
    fn error_line_format() {
        let mut p = progress();
        p.failure = Some("connection reset".into());
        assert_eq!(
            error_line(&p),
            "Error downloading pkg.tar_0: connection reset"
        );
    }

    #[test]
    fn percent_of_empty_chunk_is_complete() {
        let p = ChunkProgress {
            file: "x_0".into(),
            bytes_complete: 0,
            total: 0,
            bytes_per_second: 0.0,
            eta_secs: Some(0),
            failure: None,
        };
        assert_eq!(p.percent(), 100);
    }
}
