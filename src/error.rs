//! Error types for config-watcher.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Result type alias for config-watcher operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while keeping a configuration in sync with its file.
///
/// The error is `Clone` so a single failure can be returned to the caller of
/// [`save`](crate::core::ConfigWatcher::save) and mirrored to the error sink.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written.
    #[error("IO error on {}: {}", .path.display(), .source)]
    IoError {
        /// The file the operation was performed on
        path: PathBuf,
        /// The underlying IO failure
        #[source]
        source: Arc<io::Error>,
    },

    /// The file contents could not be decoded, or a value could not be encoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The filesystem notification backend failed.
    #[error("File watching error: {0}")]
    WatchError(String),
}

impl ConfigError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::IoError {
            path: path.to_path_buf(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn serialization(err: impl std::fmt::Display) -> Self {
        Self::SerializationError(err.to_string())
    }

    pub(crate) fn watch(err: impl std::fmt::Display) -> Self {
        Self::WatchError(err.to_string())
    }
}

/// Non-blocking outlet for background failures.
///
/// Wraps a caller-owned bounded channel. Reporting never waits: if the
/// channel is full, closed, or no sender was attached, the error is dropped.
/// Every reported error is also logged with `tracing` at warn level.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    tx: Option<mpsc::Sender<ConfigError>>,
}

impl ErrorSink {
    /// Create a sink that forwards into `tx`.
    pub fn new(tx: mpsc::Sender<ConfigError>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Create a sink that only logs.
    pub fn none() -> Self {
        Self { tx: None }
    }

    /// Whether a channel is attached.
    pub fn is_attached(&self) -> bool {
        self.tx.is_some()
    }

    /// Report an error without blocking.
    pub fn report(&self, err: ConfigError) {
        tracing::warn!(error = %err, "configuration error");
        if let Some(tx) = &self.tx {
            // Full or closed: drop.
            let _ = tx.try_send(err);
        }
    }
}

impl From<mpsc::Sender<ConfigError>> for ErrorSink {
    fn from(tx: mpsc::Sender<ConfigError>) -> Self {
        Self::new(tx)
    }
}
