use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SnapvaultError};

/// Pid lock file, removed on drop if it still belongs to this process.
#[derive(Debug)]
pub struct VaultLock {
    path: PathBuf,
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        let _ = unlock_file(&self.path);
    }
}

enum LockAttempt {
    Acquired,
    HeldBy(u32),
}

fn pid_is_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

fn lock_file(path: &Path) -> io::Result<LockAttempt> {
    for _ in 0..3 {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut f) => {
                writeln!(f, "{}", std::process::id())?;
                return Ok(LockAttempt::Acquired);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let pid = match fs::read_to_string(path) {
                    Ok(text) => text.trim().parse::<u32>().ok(),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                };
                if let Some(pid) = pid {
                    if pid_is_alive(pid) {
                        return Ok(LockAttempt::HeldBy(pid));
                    }
                }
                debug!(path = %path.display(), "reclaim stale lock");
                match fs::remove_file(path) {
                    Ok(()) => continue,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                    Err(err) => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(io::Error::other("lock contention did not settle"))
}

fn unlock_file(path: &Path) -> io::Result<()> {
    let pid = fs::read_to_string(path).ok();
    if let Some(pid) = pid {
        if pid.trim() == std::process::id().to_string() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

pub fn acquire(path: &Path) -> Result<VaultLock> {
    match lock_file(path) {
        Ok(LockAttempt::Acquired) => Ok(VaultLock {
            path: path.to_path_buf(),
        }),
        Ok(LockAttempt::HeldBy(pid)) => Err(SnapvaultError::Locked {
            path: path.parent().unwrap_or(path).to_path_buf(),
            pid,
        }),
        Err(e) => Err(SnapvaultError::message(format!(
            "failed to lock {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(".snapvault.lock");
        let guard = acquire(&path).expect("lock");
        assert!(path.exists());

        // Our own pid is alive, so a second attempt must fail.
        let err = acquire(&path).unwrap_err();
        assert!(matches!(err, SnapvaultError::Locked { .. }));
        assert_eq!(err.exit_code(), 3);

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn stale_lock_is_reclaimed() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(".snapvault.lock");
        // Larger than any pid_max, so never alive.
        fs::write(&path, "4294967295\n").unwrap();
        let _guard = acquire(&path).expect("lock");
        let owner = fs::read_to_string(&path).unwrap();
        assert_eq!(owner.trim(), std::process::id().to_string());
    }
}
