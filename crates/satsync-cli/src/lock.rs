//! Single-instance guard for sync runs.
//!
//! An OS advisory lock (`flock`-style) on a well-known path. The owning PID
//! is written into the file as decimal text for operator diagnostics, but
//! acquisition is decided solely by the OS lock: it cannot race between
//! check and write, and it disappears with the owning process, so a crash
//! never leaves a stale lock behind. The file itself is left on disk after
//! release — removing it would reopen the window where a waiter holds the
//! old inode while a newcomer locks a fresh one.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another sync is already running (lock held at {path})")]
    AlreadyRunning { path: String },

    #[error("lock file error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Exclusive run lock, released on drop (any exit path, including panic
/// unwind).
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Acquires the run lock, failing fast if another process holds it.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyRunning`] — the lock is held elsewhere.
    /// - [`LockError::Io`] — the lock file cannot be created or written.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let io_err = |source: std::io::Error| LockError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        file.try_lock_exclusive().map_err(|e| {
            if e.kind() == fs2::lock_contended_error().kind() {
                LockError::AlreadyRunning {
                    path: path.display().to_string(),
                }
            } else {
                LockError::Io {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        file.set_len(0).map_err(io_err)?;
        file.write_all(std::process::id().to_string().as_bytes())
            .map_err(io_err)?;
        file.flush().map_err(io_err)?;

        tracing::debug!(path = %path.display(), pid = std::process::id(), "run lock acquired");
        Ok(Self {
            file,
            path: path.to_owned(),
        })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        } else {
            tracing::debug!(path = %self.path.display(), "run lock released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("satsync-lock-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn acquire_writes_the_owning_pid() {
        let path = lock_path("pid");
        let lock = RunLock::acquire(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, std::process::id().to_string());
        drop(lock);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let path = lock_path("contention");
        let first = RunLock::acquire(&path).unwrap();
        let second = RunLock::acquire(&path);
        assert!(matches!(second, Err(LockError::AlreadyRunning { .. })));
        drop(first);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn lock_is_reacquirable_after_release() {
        let path = lock_path("reacquire");
        let first = RunLock::acquire(&path).unwrap();
        drop(first);
        let second = RunLock::acquire(&path);
        assert!(second.is_ok());
        drop(second);
        std::fs::remove_file(&path).ok();
    }
}
