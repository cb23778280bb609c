use std::fs::File;
use std::path::Path;
use std::time::Duration;

use rustix::fs::{flock, FlockOperation};

use crate::error::AccountError;

/// Process-wide serialisation so the control plane never races itself on
/// `/etc/passwd` (§4.B point 1). A separate, fixed lock file under
/// `/var/lock` — never `/etc/passwd` itself, which the host agent also
/// touches.
pub struct ProcessLock {
    _file: File,
}

impl ProcessLock {
    /// Blocks until the lock is held, polling at `check_interval` up to
    /// `max_wait`; per §4.B point 3, proceeds anyway on timeout rather
    /// than failing the whole operation.
    pub async fn acquire(
        path: &Path,
        check_interval: Duration,
        max_wait: Duration,
    ) -> Result<Self, AccountError> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(path)
            .map_err(AccountError::Io)?;

        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            match flock(&file, FlockOperation::NonBlockingLockExclusive) {
                Ok(()) => return Ok(ProcessLock { _file: file }),
                Err(_) if tokio::time::Instant::now() < deadline => {
                    tokio::time::sleep(check_interval).await;
                }
                Err(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        "lock file still held after max_wait, proceeding anyway"
                    );
                    return Ok(ProcessLock { _file: file });
                }
            }
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = flock(&self._file, FlockOperation::Unlock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_lock_on_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("containarium.lock");
        let lock = ProcessLock::acquire(&path, Duration::from_millis(10), Duration::from_millis(100))
            .await
            .unwrap();
        drop(lock);
    }
}
