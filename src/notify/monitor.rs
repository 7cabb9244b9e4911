//! Directory watching for the backing file.

use crate::error::{ConfigError, ErrorSink, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Callback run on the blocking pool for every relevant event.
pub type Reload = Arc<dyn Fn() + Send + Sync>;

/// Watches the directory containing a file and reloads when the file is
/// written or created.
///
/// The directory is watched rather than the file so that editors and
/// deployment tools that replace the file by rename or delete-and-recreate
/// are still observed.
///
/// # Examples
///
/// ```rust,no_run
/// use config_watcher::error::ErrorSink;
/// use config_watcher::notify::FsMonitor;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> config_watcher::error::Result<()> {
/// let shutdown = CancellationToken::new();
/// let task = FsMonitor::new("/etc/myapp/config.json").spawn(
///     &tokio::runtime::Handle::current(),
///     shutdown.clone(),
///     ErrorSink::none(),
///     Arc::new(|| println!("config file changed")),
/// )?;
///
/// shutdown.cancel();
/// let _ = task.await;
/// # Ok(())
/// # }
/// ```
pub struct FsMonitor {
    target: PathBuf,
}

impl FsMonitor {
    /// Create a monitor for `target`. The path should be absolute.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// The file this monitor reacts to.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Start watching and spawn the event loop on `runtime`.
    ///
    /// The loop stops when `shutdown` is cancelled or the event channel
    /// closes. Backend errors are reported to `sink` and do not stop it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WatchError`] if the watcher cannot be created or
    /// the parent directory cannot be watched.
    pub fn spawn(
        self,
        runtime: &Handle,
        shutdown: CancellationToken,
        sink: ErrorSink,
        reload: Reload,
    ) -> Result<JoinHandle<()>> {
        let dir = self
            .target
            .parent()
            .ok_or_else(|| {
                ConfigError::WatchError(format!(
                    "{} has no parent directory",
                    self.target.display()
                ))
            })?
            .to_path_buf();

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Receiver gone means the loop has exited.
            let _ = event_tx.send(res);
        })
        .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        watcher.watch(&dir, RecursiveMode::NonRecursive).map_err(|e| {
            ConfigError::WatchError(format!("Failed to watch {}: {}", dir.display(), e))
        })?;

        tracing::debug!(path = %self.target.display(), "file monitor started");
        Ok(runtime.spawn(run(
            watcher,
            event_rx,
            self.target,
            shutdown,
            sink,
            reload,
        )))
    }
}

async fn run(
    // Dropping the watcher deregisters the OS watch, so it lives as long as the loop.
    _watcher: RecommendedWatcher,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    target: PathBuf,
    shutdown: CancellationToken,
    sink: ErrorSink,
    reload: Reload,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = events.recv() => match received {
                None => break,
                Some(Err(e)) => sink.report(ConfigError::watch(e)),
                Some(Ok(event)) if is_relevant(&event, &target) => {
                    tracing::trace!(kind = ?event.kind, "configuration file event");
                    let reload = Arc::clone(&reload);
                    if let Err(e) = tokio::task::spawn_blocking(move || reload()).await {
                        tracing::debug!(error = %e, "reload did not complete");
                    }
                }
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(path = %target.display(), "file monitor stopped");
}

/// Writes and creates of exactly the target path.
///
/// A rename counts only when the target is its destination. Renaming the
/// file away, removing it, or touching its metadata does not reload.
/// Undirected renames count only while the target exists.
fn is_relevant(event: &Event, target: &Path) -> bool {
    match event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().any(|path| path == target)
        }
        // paths are [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.last().is_some_and(|path| path == target)
        }
        // Backends that cannot tell the direction: only if the file is there now
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().any(|path| path == target) && target.exists()
        }
        _ => false,
    }
}
