//! The main watcher handle providing lock-free access to a file-backed value.

use crate::core::{ConfigWatcherBuilder, Loader, ValueStore};
use crate::error::Result;
use crate::notify::{NotificationHub, Subscription};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A typed configuration value kept in sync with a backing file.
///
/// On construction the file is loaded, or created from the default if it is
/// missing or empty. The watcher then follows external edits of the file,
/// persists values passed to [`save`](Self::save), and pulses subscribers
/// whenever the value changes.
///
/// The watcher is either active or closed. [`close`](Self::close) stops the
/// file monitor and ends every subscription; [`get`](Self::get) and
/// [`save`](Self::save) keep working afterwards, but external edits are no
/// longer observed and subscribers are no longer notified. A closed watcher
/// cannot be reopened.
///
/// # Examples
///
/// ```rust,no_run
/// use config_watcher::prelude::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct AppConfig {
///     name: String,
///     port: u16,
/// }
///
/// # async fn example() -> Result<()> {
/// let default = AppConfig { name: "myapp".to_string(), port: 8080 };
/// let watcher = ConfigWatcher::new(default, "app-config.json");
///
/// let mut updates = watcher.subscribe(CancellationToken::new());
///
/// let mut cfg = (*watcher.get()).clone();
/// cfg.port = 9090;
/// watcher.save(cfg)?;
///
/// updates.recv().await;
/// assert_eq!(watcher.get().port, 9090);
///
/// watcher.close().await;
/// # Ok(())
/// # }
/// ```
pub struct ConfigWatcher<T> {
    store: Arc<ValueStore<T>>,
    loader: Arc<Loader<T>>,
    hub: NotificationHub,
    shutdown: CancellationToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl<T> ConfigWatcher<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a watcher for `path` with no error sink.
    ///
    /// Spawns the file monitor on the current tokio runtime, if there is one.
    /// Use [`builder`](Self::builder) to attach an error sink or pick a runtime.
    pub fn new(default: T, path: impl Into<PathBuf>) -> Self {
        Self::builder(default, path).build()
    }

    /// Create a builder for a watcher of `path` starting from `default`.
    pub fn builder(default: T, path: impl Into<PathBuf>) -> ConfigWatcherBuilder<T> {
        ConfigWatcherBuilder::new(default, path)
    }

    pub(crate) fn from_parts(
        store: Arc<ValueStore<T>>,
        loader: Arc<Loader<T>>,
        hub: NotificationHub,
        shutdown: CancellationToken,
        monitor: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            store,
            loader,
            hub,
            shutdown,
            monitor: Mutex::new(monitor),
        }
    }

    /// Get a reference-counted handle to the current value.
    ///
    /// Lock-free and never blocks, in either state.
    pub fn get(&self) -> Arc<T> {
        self.store.get()
    }

    /// Write `value` to the file and re-derive the current value from disk.
    ///
    /// Blocks on file I/O. After a successful return, [`get`](Self::get)
    /// reflects this write or a later one: under concurrent writers the last
    /// reconciled file contents win. Subscribers get a pulse only if the
    /// value actually changed.
    ///
    /// On a closed watcher the value is still persisted and reconciled, but
    /// no pulse is sent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializationError`](crate::error::ConfigError::SerializationError)
    /// if the value cannot be encoded, or [`ConfigError::IoError`](crate::error::ConfigError::IoError)
    /// if the file cannot be written. The error is also sent to the error sink.
    pub fn save(&self, value: T) -> Result<()> {
        self.loader.save(&value)
    }

    /// Subscribe to change pulses until `scope` is cancelled.
    ///
    /// Each pulse means the value may have changed; call [`get`](Self::get)
    /// for the latest one.
    pub fn subscribe(&self, scope: CancellationToken) -> Subscription {
        self.hub.subscribe(scope)
    }

    /// Absolute path of the backing file.
    pub fn path(&self) -> &Path {
        self.loader.file().path()
    }

    /// Stop the file monitor, end all subscriptions, and wait for the monitor
    /// task to exit.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.hub.close();

        let monitor = self.monitor.lock().take();
        if let Some(monitor) = monitor {
            if let Err(e) = monitor.await {
                tracing::debug!(error = %e, "file monitor did not exit cleanly");
            }
        }
        tracing::debug!(path = %self.path().display(), "watcher closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Whether a file monitor was started for this watcher.
    pub fn is_watching(&self) -> bool {
        !self.is_closed() && self.monitor.lock().is_some()
    }
}

impl<T> Drop for ConfigWatcher<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.hub.close();
        if let Some(monitor) = self.monitor.get_mut().take() {
            monitor.abort();
        }
    }
}
