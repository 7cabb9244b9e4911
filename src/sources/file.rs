//! The backing configuration file.

use super::Format;
use crate::error::{ConfigError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Permissions for newly created configuration files (owner read/write).
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// A configuration file on disk with a fixed encoding.
///
/// # Examples
///
/// ```rust,no_run
/// use config_watcher::sources::{ConfigFile, Format};
///
/// let file = ConfigFile::new("/etc/myapp/config.json", Format::Json);
/// let bytes = file.read().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    format: Format,
}

impl ConfigFile {
    /// Create a handle for `path` encoded as `format`.
    pub fn new(path: impl Into<PathBuf>, format: Format) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encoding of the file.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Read the raw file contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file is missing or unreadable.
    pub fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| ConfigError::io(&self.path, e))
    }

    /// Decode file bytes with this file's format.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        self.format.decode(bytes)
    }

    /// Encode a value with this file's format.
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        self.format.encode(value)
    }

    /// Replace the file contents, creating the file owner-only if needed.
    ///
    /// The write truncates in place; it is not atomic with respect to
    /// concurrent readers in other processes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be opened or written.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(FILE_MODE);

        let mut file = options
            .open(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e))?;
        file.write_all(bytes)
            .map_err(|e| ConfigError::io(&self.path, e))
    }
}
