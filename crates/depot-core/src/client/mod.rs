//! Client orchestration for one logical download.
//!
//! `Client::get` runs the full pipeline: fresh download link, HEAD probe,
//! range plan, free-space check, the concurrent batch (with one bounded
//! retry of chunks that only stalled), then assembly and cleanup. Every
//! step before the batch is a hard failure point that aborts the whole
//! operation.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::assemble;
use crate::batch::BatchCoordinator;
use crate::config::DepotConfig;
use crate::disk::{DiskProbe, StatvfsProbe};
use crate::fetch::{ChunkRequest, DownloadLinkFetcher};
use crate::head;
use crate::ranger;

/// Fixed Referer identifying this client to the distribution network.
pub const REFERER: &str = "https://depot.distribution.network";

/// Orchestrates segmented downloads against a distribution endpoint.
pub struct Client {
    config: DepotConfig,
    disk: Box<dyn DiskProbe>,
}

impl Client {
    pub fn new(config: DepotConfig) -> Self {
        Self {
            config,
            disk: Box::new(StatvfsProbe),
        }
    }

    /// Replace the free-space probe (tests inject exhaustion here).
    pub fn with_disk_probe(mut self, probe: Box<dyn DiskProbe>) -> Self {
        self.disk = probe;
        self
    }

    /// Downloads the file behind `link_fetcher` into `destination`,
    /// streaming human-readable progress lines into `progress_sink`.
    ///
    /// Chunk files from a failed batch are left in place for diagnosis;
    /// cleanup only runs after a successful assembly.
    pub fn get(
        &self,
        destination: &Path,
        link_fetcher: Arc<dyn DownloadLinkFetcher>,
        progress_sink: &mut dyn Write,
    ) -> Result<()> {
        let content_url = link_fetcher.new_download_link()?;
        url::Url::parse(&content_url)
            .with_context(|| format!("failed to construct HEAD request: {}", content_url))?;

        let probe = head::probe(&content_url, REFERER).context("failed to make HEAD request")?;
        // Unknown length maps to -1, which the planner rejects.
        let content_length = probe.content_length.map(|n| n as i64).unwrap_or(-1);
        tracing::debug!(
            url = %probe.effective_url,
            content_length,
            "HEAD probe complete"
        );

        if !probe.accept_ranges {
            tracing::debug!("server did not advertise Accept-Ranges: bytes; ranged GETs may fail");
        }

        let ranges = ranger::build_range(content_length, self.config.chunk_count)
            .context("failed to construct range")?;

        let free = self
            .disk
            .free_bytes(destination)
            .context("failed to get disk free space")?;
        if free < content_length as u64 {
            bail!("file is too big to fit on this drive");
        }

        let chunk_files = assemble::chunk_file_names(destination, &ranges);
        let requests: Vec<ChunkRequest> = ranges
            .iter()
            .zip(&chunk_files)
            .map(|(range, path)| ChunkRequest {
                url: probe.effective_url.clone(),
                range: *range,
                chunk_path: path.clone(),
            })
            .collect();

        let coordinator = BatchCoordinator::new(
            self.config.poll_interval(),
            self.config.stall_ticks(),
            self.config.retry_policy(),
            REFERER,
        );

        let mut outcome = coordinator.run(&requests, Arc::clone(&link_fetcher), progress_sink);
        if outcome.error.is_some() && outcome.should_retry {
            tracing::debug!(
                failed = outcome.failed.len(),
                "all failures were stalls, retrying failed chunks once"
            );
            let failed = std::mem::take(&mut outcome.failed);
            outcome = coordinator.run(&failed, link_fetcher, progress_sink);
        }
        if let Some(err) = outcome.error {
            return Err(err.context("download failed"));
        }

        tracing::debug!("assembling chunks");
        assemble::combine(destination, &chunk_files).context("failed to combine file chunks")?;
        tracing::debug!("cleaning up chunks");
        assemble::cleanup(&chunk_files).context("failed to cleanup file chunks")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticLink;

    struct FixedProbe(u64);

    impl DiskProbe for FixedProbe {
        fn free_bytes(&self, _path: &Path) -> Result<u64> {
            Ok(self.0)
        }
    }

    #[test]
    fn invalid_url_fails_before_any_request() {
        let client = Client::new(DepotConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Vec::new();
        let err = client
            .get(
                &dir.path().join("out.bin"),
                Arc::new(StaticLink::new("%%%")),
                &mut sink,
            )
            .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to construct HEAD request"));
    }

    #[test]
    fn link_fetcher_error_propagates() {
        struct Broken;
        impl DownloadLinkFetcher for Broken {
            fn new_download_link(&self) -> Result<String> {
                bail!("no link available")
            }
        }
        let client = Client::new(DepotConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut sink = Vec::new();
        let err = client
            .get(&dir.path().join("out.bin"), Arc::new(Broken), &mut sink)
            .unwrap_err();
        assert!(err.to_string().contains("no link available"));
    }

    #[test]
    fn fixed_probe_is_injectable() {
        let client =
            Client::new(DepotConfig::default()).with_disk_probe(Box::new(FixedProbe(42)));
        let free = client.disk.free_bytes(Path::new("/tmp")).unwrap();
        assert_eq!(free, 42);
    }
}
