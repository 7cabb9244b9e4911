//! Reconciles the in-memory value with the backing file.

use crate::core::ValueStore;
use crate::error::{ErrorSink, Result};
use crate::notify::NotificationHub;
use crate::sources::{ConfigFile, canonical_eq};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// State shared by writers, guarded by the loader's lock.
#[derive(Default)]
struct WriterState {
    /// Contents of the last file read that failed to decode.
    ///
    /// Duplicate reports are keyed on contents: rereading the same broken
    /// bytes stays silent until a read sees anything else (valid, empty or
    /// missing) or a save rewrites the file.
    rejected: Option<Vec<u8>>,
}

/// Reads, decodes and writes the configuration file, and publishes accepted
/// values to the store.
///
/// Every file read and every write-then-reread runs under one writer lock, so
/// the last reconcile always observes the last write. Readers of the store
/// never take this lock.
pub(crate) struct Loader<T> {
    file: ConfigFile,
    store: Arc<ValueStore<T>>,
    hub: NotificationHub,
    sink: ErrorSink,
    writer: Mutex<WriterState>,
}

impl<T> Loader<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        file: ConfigFile,
        store: Arc<ValueStore<T>>,
        hub: NotificationHub,
        sink: ErrorSink,
    ) -> Self {
        Self {
            file,
            store,
            hub,
            sink,
            writer: Mutex::new(WriterState::default()),
        }
    }

    pub fn file(&self) -> &ConfigFile {
        &self.file
    }

    /// Re-read the file and publish its value if it differs from the current one.
    ///
    /// - missing or unreadable: report, then recreate the file from the current value
    /// - empty: populate the file from the current value
    /// - malformed: report once until the contents change, keep the current value
    /// - valid and different: store and broadcast
    pub fn load(&self) {
        let mut state = self.writer.lock();
        self.reconcile(&mut state);
    }

    /// Persist `value`, then re-derive the in-memory value from the file.
    ///
    /// # Errors
    ///
    /// Returns the encode or write failure; it is also sent to the error sink.
    pub fn save(&self, value: &T) -> Result<()> {
        let mut state = self.writer.lock();
        let bytes = self.file.encode(value).inspect_err(|e| self.sink.report(e.clone()))?;
        self.file
            .write(&bytes)
            .inspect_err(|e| self.sink.report(e.clone()))?;
        state.rejected = None;
        self.reconcile(&mut state);
        Ok(())
    }

    /// Persist `value` without re-reading it.
    ///
    /// Used to recreate a missing file or populate an empty one.
    pub fn write_default(&self, value: &T) -> Result<()> {
        let bytes = self.file.encode(value).inspect_err(|e| self.sink.report(e.clone()))?;
        self.file
            .write(&bytes)
            .inspect_err(|e| self.sink.report(e.clone()))
    }

    fn reconcile(&self, state: &mut WriterState) {
        let current = self.store.get();

        let bytes = match self.file.read() {
            Ok(bytes) => bytes,
            Err(err) => {
                state.rejected = None;
                self.sink.report(err);
                tracing::debug!(path = %self.file.path().display(), "recreating configuration file");
                let _ = self.write_default(&current);
                return;
            }
        };

        if bytes.is_empty() {
            state.rejected = None;
            tracing::debug!(path = %self.file.path().display(), "populating empty configuration file");
            let _ = self.write_default(&current);
            return;
        }

        let value: T = match self.file.decode(&bytes) {
            Ok(value) => value,
            Err(err) => {
                if state.rejected.as_deref() != Some(bytes.as_slice()) {
                    self.sink.report(err);
                    state.rejected = Some(bytes);
                }
                return;
            }
        };
        state.rejected = None;

        if canonical_eq(current.as_ref(), &value) {
            tracing::trace!(path = %self.file.path().display(), "configuration unchanged");
            return;
        }

        self.store.store(value);
        tracing::debug!(path = %self.file.path().display(), "configuration changed");
        self.hub.broadcast();
    }
}
