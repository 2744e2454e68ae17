use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use tracing::debug;

use crate::error::RecordStoreError;

const POLL_INITIAL: Duration = Duration::from_millis(5);
const POLL_MAX: Duration = Duration::from_millis(200);

/// Advisory exclusive lock on a dedicated lock file, shared across processes.
///
/// The lock is tied to the open file handle; dropping the handle releases it.
#[derive(Debug)]
pub struct InterProcessLock {
    path: PathBuf,
    file: Option<File>,
}

impl InterProcessLock {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Block until no other holder has the lock.
    pub fn acquire(&mut self) -> Result<(), RecordStoreError> {
        if self.is_held() {
            return Ok(());
        }
        let file = self.open_lock_file()?;
        file.lock_exclusive()
            .map_err(|source| RecordStoreError::lock(&self.path, source))?;
        debug!(path = %self.path.display(), "acquired lock");
        self.file = Some(file);
        Ok(())
    }

    /// Like [`acquire`](Self::acquire), but gives up once `timeout` has elapsed.
    pub fn acquire_timeout(&mut self, timeout: Duration) -> Result<(), RecordStoreError> {
        if self.is_held() {
            return Ok(());
        }
        let file = self.open_lock_file()?;
        let deadline = Instant::now() + timeout;
        let mut delay = POLL_INITIAL;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(error) if is_contended(&error) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RecordStoreError::LockTimeout {
                            path: self.path.clone(),
                            timeout,
                        });
                    }
                    thread::sleep(delay.min(deadline - now));
                    delay = (delay * 2).min(POLL_MAX);
                }
                Err(source) => return Err(RecordStoreError::lock(&self.path, source)),
            }
        }
        debug!(path = %self.path.display(), "acquired lock");
        self.file = Some(file);
        Ok(())
    }

    /// Release the lock. Releasing a lock that is not held is a no-op.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            debug!(path = %self.path.display(), "release requested for lock that is not held");
            return;
        };
        if let Err(error) = FileExt::unlock(&file) {
            // Closing the handle below drops the lock regardless.
            debug!(path = %self.path.display(), %error, "unlock failed");
        }
        debug!(path = %self.path.display(), "released lock");
    }

    fn open_lock_file(&self) -> Result<File, RecordStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                RecordStoreError::io("creating lock directory", parent, source)
            })?;
        }
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| RecordStoreError::io("opening lock file", &self.path, source))
    }
}

impl Drop for InterProcessLock {
    fn drop(&mut self) {
        if self.is_held() {
            self.release();
        }
    }
}

fn is_contended(error: &std::io::Error) -> bool {
    error.kind() == fs2::lock_contended_error().kind()
}
