//! Chunk file naming, assembly, and cleanup.
//!
//! Chunk files are named `<destination>_<lower>` and map 1:1, in order, to
//! the range list used to build the batch. Assembly concatenates in range
//! order (never completion order) and cleanup removes the chunk files
//! afterwards, stopping at the first deletion failure.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::ranger::Range;

/// Chunk file paths for `destination`, one per range, in range order.
pub fn chunk_file_names(destination: &Path, ranges: &[Range]) -> Vec<PathBuf> {
    ranges
        .iter()
        .map(|r| {
            let mut name = destination.as_os_str().to_owned();
            name.push(format!("_{}", r.lower));
            PathBuf::from(name)
        })
        .collect()
}

/// Concatenates the chunk files into `destination` by streaming copy, in
/// list order. The first open/read/copy error aborts; bytes already written
/// remain in place and the cause is attached to the error.
pub fn combine(destination: &Path, chunk_files: &[PathBuf]) -> Result<()> {
    let mut out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(destination)
        .with_context(|| format!("failed to open file for writing: {}", destination.display()))?;

    for chunk in chunk_files {
        let mut input = File::open(chunk)
            .with_context(|| format!("failed to open chunk file: {}", chunk.display()))?;
        io::copy(&mut input, &mut out)
            .with_context(|| format!("failed to append chunk file: {}", chunk.display()))?;
    }
    out.sync_all()
        .with_context(|| format!("failed to sync output file: {}", destination.display()))?;
    Ok(())
}

/// Deletes every chunk file. The first deletion error aborts remaining
/// cleanup; orphaned chunk files are acceptable on that path.
pub fn cleanup(chunk_files: &[PathBuf]) -> Result<()> {
    for chunk in chunk_files {
        std::fs::remove_file(chunk)
            .with_context(|| format!("failed to remove chunk file: {}", chunk.display()))?;
    }
    Ok(())
}
