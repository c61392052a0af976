//! Get command: segmented download of a direct URL.

use anyhow::Result;
use depot_core::client::{Client, REFERER};
use depot_core::config::DepotConfig;
use depot_core::fetch::StaticLink;
use depot_core::{checksum, filename, head};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// Download `url` into `output` (or a URL-derived name), verifying an
/// optional SHA-256 digest afterwards.
pub fn run_get(
    cfg: DepotConfig,
    url: &str,
    output: Option<PathBuf>,
    sha256: Option<&str>,
) -> Result<()> {
    let destination = match output {
        Some(path) => path,
        None => {
            // Probe once for a Content-Disposition hint before the client
            // runs its own HEAD.
            let probe = head::probe(url, REFERER)?;
            PathBuf::from(filename::derive_output_name(
                url,
                probe.content_disposition.as_deref(),
            ))
        }
    };

    let client = Client::new(cfg);
    let stdout = std::io::stdout();
    let mut progress = stdout.lock();
    client.get(&destination, Arc::new(StaticLink::new(url)), &mut progress)?;
    progress.flush()?;

    if let Some(expected) = sha256 {
        checksum::verify_sha256(&destination, expected)?;
        println!("checksum OK");
    }
    println!("saved to {}", destination.display());
    Ok(())
}
