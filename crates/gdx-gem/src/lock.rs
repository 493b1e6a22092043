//! Per-(name, version) materialization lock.
//!
//! Ownership is an exclusive advisory lock (`flock`) on `<version>.lock`, so a
//! crashed owner releases it with its file descriptors and there is no stale
//! state to reclaim. The file itself is never removed. Tasks in this process
//! are serialized by an in-process mutex per path first, since advisory locks
//! are not a reliable exclusion between handles of one process on every
//! platform.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use fs2::FileExt;
use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;

use crate::GemError;

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Holds the lock until dropped.
#[derive(Debug)]
pub struct MaterializeLock {
    file: File,
    path: PathBuf,
    _local: OwnedMutexGuard<()>,
}

impl Drop for MaterializeLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl MaterializeLock {
    /// Wait up to `timeout` for exclusive ownership of `lock_path`, creating
    /// the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`GemError::LockTimeout`] if another owner keeps the lock for
    /// longer than `timeout`, and [`GemError::Io`] if the file cannot be
    /// opened or locked.
    pub async fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self, GemError> {
        let deadline = Instant::now() + timeout;
        let timed_out = || GemError::LockTimeout {
            path: lock_path.to_path_buf(),
        };

        let local = tokio::time::timeout_at(deadline, local_mutex(lock_path).lock_owned())
            .await
            .map_err(|_| timed_out())?;

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(lock_path)?;

        let mut logged_wait = false;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if is_contended(&err) => {
                    if Instant::now() >= deadline {
                        return Err(timed_out());
                    }
                    if !logged_wait {
                        tracing::info!(
                            path = %lock_path.display(),
                            owner_pid = ?recorded_pid(&mut file),
                            "waiting for in-flight materialization"
                        );
                        logged_wait = true;
                    }
                    tokio::time::sleep(LOCK_RETRY_DELAY).await;
                }
                Err(err) => return Err(err.into()),
            }
        }

        // The pid is informational only; ownership is the advisory lock.
        if let Err(error) = record_pid(&mut file) {
            tracing::debug!(path = %lock_path.display(), %error, "could not record lock owner");
        }

        Ok(Self {
            file,
            path: lock_path.to_path_buf(),
            _local: local,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn local_mutex(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    static LOCAL_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> =
        OnceLock::new();

    let mut locks = LOCAL_LOCKS
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(path.to_path_buf()).or_default())
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn record_pid(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

fn recorded_pid(file: &mut File) -> Option<u32> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut contents).ok()?;
    contents.trim().parse().ok()
}
