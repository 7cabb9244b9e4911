//! Encodings for the backing file and the canonical form used for change detection.

use crate::error::{ConfigError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// On-disk encoding of a configuration file.
///
/// JSON is always available. YAML and TOML are enabled with the `yaml` and
/// `toml` features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Pretty-printed JSON with 2-space indentation.
    #[default]
    Json,
    /// YAML document.
    #[cfg(feature = "yaml")]
    Yaml,
    /// TOML document.
    #[cfg(feature = "toml")]
    Toml,
}

impl Format {
    /// Detect the format from a file extension.
    ///
    /// - `.yaml`, `.yml` -> YAML (with the `yaml` feature)
    /// - `.toml` -> TOML (with the `toml` feature)
    /// - anything else -> JSON
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => Self::Yaml,
            #[cfg(feature = "toml")]
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }

    /// Serialize a value into file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializationError`] if the value cannot be
    /// represented in this format.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Json => serde_json::to_vec_pretty(value).map_err(ConfigError::serialization),
            #[cfg(feature = "yaml")]
            Self::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(ConfigError::serialization),
            #[cfg(feature = "toml")]
            Self::Toml => toml::to_string_pretty(value)
                .map(String::into_bytes)
                .map_err(ConfigError::serialization),
        }
    }

    /// Deserialize file bytes into a value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SerializationError`] if the bytes are malformed
    /// or do not match the shape of `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(ConfigError::serialization),
            #[cfg(feature = "yaml")]
            Self::Yaml => serde_yaml::from_slice(bytes).map_err(ConfigError::serialization),
            #[cfg(feature = "toml")]
            Self::Toml => {
                let text = std::str::from_utf8(bytes).map_err(ConfigError::serialization)?;
                toml::from_str(text).map_err(ConfigError::serialization)
            }
        }
    }
}

/// Deterministic byte encoding of a value, used as its equality proxy.
///
/// The value goes through `serde_json::Value`, whose maps are ordered by key,
/// so two values differing only in map iteration order encode identically.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let tree = serde_json::to_value(value).map_err(ConfigError::serialization)?;
    serde_json::to_vec(&tree).map_err(ConfigError::serialization)
}

/// Whether two values have the same canonical encoding.
///
/// A value that cannot be encoded is never equal to anything.
pub fn canonical_eq<T: Serialize>(a: &T, b: &T) -> bool {
    match (canonical_bytes(a), canonical_bytes(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
