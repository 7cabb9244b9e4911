//! Backing file access and encodings.

mod file;
mod format;

pub use file::ConfigFile;
pub use format::{Format, canonical_bytes, canonical_eq};
