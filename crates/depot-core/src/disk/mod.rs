//! Free-space probing for the destination filesystem.

use anyhow::{Context, Result};
use std::path::Path;

/// Capability interface over the disk-usage probe so orchestration tests
/// can simulate exhaustion.
pub trait DiskProbe: Send + Sync {
    /// Free bytes on the filesystem holding `path` (or its parent when the
    /// file does not exist yet).
    fn free_bytes(&self, path: &Path) -> Result<u64>;
}

/// statvfs-backed probe.
pub struct StatvfsProbe;

impl DiskProbe for StatvfsProbe {
    #[cfg(unix)]
    fn free_bytes(&self, path: &Path) -> Result<u64> {
        use std::os::unix::ffi::OsStrExt;

        let dir = if path.is_dir() {
            path
        } else {
            path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
        };
        let c_path = std::ffi::CString::new(dir.as_os_str().as_bytes())
            .context("destination path contains NUL")?;
        let mut stats: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stats) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error())
                .with_context(|| format!("statvfs failed for {}", dir.display()));
        }
        Ok(stats.f_bavail as u64 * stats.f_frsize as u64)
    }

    /// Stub for non-Unix: reports unlimited space, disabling the pre-check.
    #[cfg(not(unix))]
    fn free_bytes(&self, _path: &Path) -> Result<u64> {
        Ok(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reports_space_for_tempdir() {
        let dir = tempfile::tempdir().unwrap();
        let free = StatvfsProbe.free_bytes(dir.path()).unwrap();
        assert!(free > 0);
    }

    #[test]
    fn probe_falls_back_to_parent_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created-yet.bin");
        let free = StatvfsProbe.free_bytes(&missing).unwrap();
        assert!(free > 0);
    }
}
