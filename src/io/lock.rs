//! Lock file management for single-instance enforcement.
//!
//! Only one reminder daemon may run per user, otherwise every alarm would
//! ring twice. The lock file in the runtime directory holds the PID of the
//! running daemon, which `dosewatch reload` uses to signal it.

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::common::utils::{private_path, runtime_dir};

/// Held for the lifetime of the daemon. Dropping it releases the lock and
/// removes the file.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn lock_path() -> PathBuf {
    runtime_dir().join(LOCK_FILE_NAME)
}

/// Acquire the daemon lock at the default location.
pub fn acquire_lock() -> Result<InstanceLock> {
    acquire_lock_at(lock_path())
}

/// Acquire an exclusive lock on `path`, clearing a stale lock left behind by
/// a process that no longer exists.
pub fn acquire_lock_at(path: PathBuf) -> Result<InstanceLock> {
    if let Some(lock) = try_lock(&path)? {
        return Ok(lock);
    }

    match read_pid(&path) {
        Some(pid) if is_process_running(pid) => {
            bail!("dosewatch is already running (PID: {pid})");
        }
        Some(pid) => {
            log_warning!("Removing stale lock file (process {pid} no longer running)");
        }
        None => {
            log_warning!("Lock file format invalid, removing");
        }
    }
    let _ = std::fs::remove_file(&path);

    try_lock(&path)?.with_context(|| {
        format!("Failed to acquire lock {} after cleanup", private_path(&path))
    })
}

fn try_lock(path: &Path) -> Result<Option<InstanceLock>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", private_path(parent)))?;
    }

    // Open without truncating so a running daemon's PID stays readable
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", private_path(path)))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(InstanceLock {
        file,
        path: path.to_path_buf(),
    }))
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .lines()
        .next()?
        .trim()
        .parse()
        .ok()
}

/// PID of the running daemon, if any.
pub fn running_instance_pid() -> Option<u32> {
    read_pid(&lock_path()).filter(|pid| is_process_running(*pid))
}

pub fn is_process_running(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    kill(Pid::from_raw(raw), None).is_ok()
}

/// Ask the running daemon to reload its configuration.
pub fn signal_reload(pid: u32) -> Result<()> {
    let raw = i32::try_from(pid).context("PID out of range")?;
    kill(Pid::from_raw(raw), Signal::SIGUSR2)
        .with_context(|| format!("Failed to signal dosewatch (PID: {pid})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_lock_fails_while_held() {
        crate::common::logger::Log::set_enabled(false);
        let dir = tempdir().unwrap();
        let path = dir.path().join("dosewatch.lock");

        let lock = acquire_lock_at(path.clone()).unwrap();
        assert_eq!(read_pid(&path), Some(std::process::id()));

        let err = acquire_lock_at(path.clone()).unwrap_err();
        assert!(err.to_string().contains("already running"));

        drop(lock);
        assert!(!path.exists());
        assert!(acquire_lock_at(path).is_ok());
    }

    #[test]
    fn test_current_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }
}
