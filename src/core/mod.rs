//! Core reconciliation types.

mod builder;
mod loader;
mod store;
mod watcher;

pub use builder::ConfigWatcherBuilder;
pub(crate) use loader::Loader;
pub use store::ValueStore;
pub use watcher::ConfigWatcher;
