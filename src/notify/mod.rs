//! Change notification.
//!
//! Provides directory watching for the backing file and pulse broadcast to
//! subscribers when the value changes.

pub mod hub;
pub mod monitor;

pub use hub::{NotificationHub, Subscription};
pub use monitor::{FsMonitor, Reload};
