use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use crate::codec::{decode_records, encode_records};
use crate::config::StoreConfig;
use crate::error::RecordStoreError;
use crate::lock::InterProcessLock;
use crate::paths;
use crate::schema::Record;
use crate::store::{PutOutcome, RecordStore};
use crate::table;

/// A record file on disk together with the settings used to read and write it.
///
/// Opening a [`RecordSession`] is the only way to read or change the records.
#[derive(Debug, Clone)]
pub struct RecordFile {
    path: PathBuf,
    config: StoreConfig,
}

impl RecordFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, config: StoreConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        paths::lock_path(&self.path)
    }

    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        paths::table_path(&self.path)
    }

    /// Take the lock and load the current records.
    ///
    /// Blocks while another session holds the lock, unless a lock timeout is
    /// configured. A missing file starts an empty session; an undecodable one
    /// is logged and also starts empty.
    pub fn open(&self) -> Result<RecordSession<'_>, RecordStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                RecordStoreError::io("creating record directory", parent, source)
            })?;
        }

        let mut lock = InterProcessLock::new(self.lock_path());
        match self.config.lock_timeout {
            Some(timeout) => lock.acquire_timeout(timeout)?,
            None => lock.acquire()?,
        }

        // On error the lock is released when `lock` drops.
        let records = self.load()?;
        debug!(path = %self.path.display(), records = records.len(), "opened record session");

        Ok(RecordSession {
            file: self,
            lock,
            store: RecordStore::with_records(self.config.identity_keys.clone(), records),
            closed: false,
        })
    }

    /// Run `body` inside a session and close it afterwards, whatever `body`
    /// returned. Changes made before an error are still written back. An error
    /// from `body` takes precedence over an error from closing.
    pub fn with_session<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut RecordSession<'_>) -> Result<T, E>,
        E: From<RecordStoreError>,
    {
        let mut session = self.open()?;
        let outcome = body(&mut session);
        let closed = session.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    fn load(&self) -> Result<Vec<Record>, RecordStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RecordStoreError::io("reading record file", &self.path, source))
            }
        };
        Ok(decode_records(
            &self.path,
            &bytes,
            &self.config.header,
            &self.config.footer,
        ))
    }

    fn store(&self, records: &[Record]) -> Result<(), RecordStoreError> {
        let bytes = encode_records(records, &self.config.header, &self.config.footer)
            .map_err(|source| RecordStoreError::serialize(&self.path, source))?;
        fs::write(&self.path, bytes)
            .map_err(|source| RecordStoreError::io("writing record file", &self.path, source))?;
        debug!(path = %self.path.display(), records = records.len(), "wrote record file");
        Ok(())
    }
}

/// Exclusive, scoped access to a [`RecordFile`].
///
/// Closing (explicitly or by drop) writes the records back if any put changed
/// them, then releases the lock. Prefer [`close`](Self::close): a write error
/// during drop can only be logged.
#[derive(Debug)]
pub struct RecordSession<'a> {
    file: &'a RecordFile,
    lock: InterProcessLock,
    store: RecordStore,
    closed: bool,
}

impl RecordSession<'_> {
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn put(&mut self, record: Record) -> PutOutcome {
        self.store.put(record)
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        self.store.records()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Render the current records to the sibling table file.
    pub fn export_table(&self) -> Result<PathBuf, RecordStoreError> {
        table::export_table(
            self.file.path(),
            self.store.records(),
            self.store.identity_keys(),
        )
    }

    pub fn close(mut self) -> Result<(), RecordStoreError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), RecordStoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let written = if self.store.is_dirty() {
            self.file.store(self.store.records())
        } else {
            Ok(())
        };
        self.lock.release();
        written
    }
}

impl Drop for RecordSession<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            error!(path = %self.file.path().display(), error = %err, "failed to write back records");
        }
    }
}
