//! # config-watcher
//!
//! Typed configuration values kept in sync with a backing file.
//!
//! ## Overview
//!
//! `config-watcher` holds a strongly-typed configuration value in memory and
//! reconciles it with a file on disk:
//! - Lock-free reads using `arc-swap`
//! - A missing or empty file is created from the default value
//! - External edits are picked up by watching the file's directory
//! - Malformed edits are reported and the last good value is kept
//! - Subscribers receive a pulse whenever the value changes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use config_watcher::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct AppConfig {
//!     app_name: String,
//!     port: u16,
//! }
//!
//! # async fn example() -> Result<()> {
//! let default = AppConfig { app_name: "myapp".to_string(), port: 8080 };
//! let (errors_tx, _errors_rx) = tokio::sync::mpsc::channel(10);
//!
//! let watcher = ConfigWatcher::builder(default, "app-config.json")
//!     .with_error_sink(errors_tx)
//!     .build();
//!
//! // Zero-cost reads (no locks!)
//! println!("Port: {}", watcher.get().port);
//!
//! // React to changes from save() or from edits of the file
//! let mut updates = watcher.subscribe(CancellationToken::new());
//! tokio::spawn(async move {
//!     while updates.recv().await.is_some() {
//!         println!("configuration changed");
//!     }
//! });
//!
//! let mut cfg = (*watcher.get()).clone();
//! cfg.port = 9090;
//! watcher.save(cfg)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Change detection
//!
//! Two values are considered equal when their canonical encodings match (see
//! [`sources::canonical_bytes`]). Map keys are sorted in the canonical form,
//! so `HashMap` fields do not cause spurious notifications.
//!
//! ## Feature Flags
//!
//! JSON is always supported. Enable other file formats in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! config-watcher = { version = "0.1", features = ["yaml", "toml"] }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod sources;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{ConfigWatcher, ConfigWatcherBuilder};
    pub use crate::error::{ConfigError, Result};
    pub use crate::notify::Subscription;
    pub use crate::sources::Format;
    pub use tokio_util::sync::CancellationToken;
}
