//! Builder for constructing ConfigWatcher instances.

use crate::core::{ConfigWatcher, Loader, ValueStore};
use crate::error::{ConfigError, ErrorSink};
use crate::notify::{FsMonitor, NotificationHub};
use crate::sources::{ConfigFile, Format};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Builder for constructing a [`ConfigWatcher`].
///
/// # Examples
///
/// ```rust,no_run
/// use config_watcher::prelude::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// # async fn example() {
/// let (errors_tx, mut errors_rx) = tokio::sync::mpsc::channel(10);
///
/// let watcher = ConfigWatcher::builder(AppConfig { port: 8080 }, "config.json")
///     .with_error_sink(errors_tx)
///     .build();
///
/// tokio::spawn(async move {
///     while let Some(err) = errors_rx.recv().await {
///         eprintln!("config error: {err}");
///     }
/// });
/// # }
/// ```
pub struct ConfigWatcherBuilder<T> {
    default: T,
    path: PathBuf,
    sink: ErrorSink,
    format: Option<Format>,
    runtime: Option<Handle>,
}

impl<T> ConfigWatcherBuilder<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a builder for `path` starting from `default`.
    pub fn new(default: T, path: impl Into<PathBuf>) -> Self {
        Self {
            default,
            path: path.into(),
            sink: ErrorSink::none(),
            format: None,
            runtime: None,
        }
    }

    /// Send background failures to `tx`.
    ///
    /// Errors are sent with `try_send`; if the channel is full they are dropped.
    pub fn with_error_sink(mut self, tx: mpsc::Sender<ConfigError>) -> Self {
        self.sink = ErrorSink::new(tx);
        self
    }

    /// Use `format` instead of detecting it from the file extension.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Spawn the file monitor on `runtime` instead of the current one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the watcher.
    ///
    /// Starts the file monitor, then loads the file: a missing or empty file
    /// is written from the default, a malformed one is reported and the
    /// default kept. Never fails; problems go to the error sink.
    ///
    /// The sink is attached before the initial load, so construction-time
    /// failures reach it too: building over a missing file reports an
    /// [`IoError`](ConfigError::IoError) before the file is recreated.
    pub fn build(self) -> ConfigWatcher<T> {
        let path = resolve_path(&self.path);
        let format = self.format.unwrap_or_else(|| Format::from_path(&path));
        let runtime = self.runtime.or_else(|| Handle::try_current().ok());

        let store = Arc::new(ValueStore::new(self.default));
        let hub = NotificationHub::new(runtime.clone());
        let loader = Arc::new(Loader::new(
            ConfigFile::new(path.clone(), format),
            Arc::clone(&store),
            hub.clone(),
            self.sink.clone(),
        ));

        let shutdown = CancellationToken::new();
        let monitor = match &runtime {
            Some(runtime) => {
                let reload_loader = Arc::clone(&loader);
                FsMonitor::new(path)
                    .spawn(
                        runtime,
                        shutdown.child_token(),
                        self.sink.clone(),
                        Arc::new(move || reload_loader.load()),
                    )
                    .inspect_err(|e| self.sink.report(e.clone()))
                    .ok()
            }
            None => {
                self.sink.report(ConfigError::WatchError(
                    "No tokio runtime available; file changes will not be observed".to_string(),
                ));
                None
            }
        };

        // Loaded after the monitor starts so no edit falls between the two.
        loader.load();

        ConfigWatcher::from_parts(store, loader, hub, shutdown, monitor)
    }
}

/// Make `path` absolute, resolving symlinks in its directory so it compares
/// equal to paths reported by the notification backend.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    match (absolute.parent(), absolute.file_name()) {
        (Some(dir), Some(name)) => dir
            .canonicalize()
            .map(|dir| dir.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}
