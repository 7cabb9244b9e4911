//! Lock-free holder for the current configuration value.

use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holds the current value with lock-free reads and atomic replacement.
///
/// Readers always observe a complete value, either the one before or the one
/// after a concurrent [`store`](Self::store).
pub struct ValueStore<T> {
    current: ArcSwap<T>,
}

impl<T> ValueStore<T> {
    /// Create a store holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    /// Get a reference-counted handle to the current value.
    ///
    /// Never blocks. Writers never block readers.
    pub fn get(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Atomically replace the current value.
    pub fn store(&self, value: T) {
        self.current.store(Arc::new(value));
    }
}
