//! Pulse broadcast to cancellable subscribers.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Pulses buffered per subscriber. Further broadcasts coalesce into it.
const PULSE_CAPACITY: usize = 1;

/// Receiving end of a subscription.
///
/// Each pulse means "the value may have changed, call `get()`". Pulses are
/// level-triggered: broadcasts that arrive while a pulse is still pending
/// are merged into it, so the latest state is never missed but individual
/// changes may be.
///
/// The subscription ends when its scope is cancelled, when the hub is closed,
/// or when this handle is dropped.
pub struct Subscription {
    rx: mpsc::Receiver<()>,
    scope: CancellationToken,
    _guard: DropGuard,
}

impl Subscription {
    /// Wait for the next pulse.
    ///
    /// Returns `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<()> {
        tokio::select! {
            biased;
            _ = self.scope.cancelled() => {
                self.rx.close();
                None
            }
            pulse = self.rx.recv() => pulse,
        }
    }

    /// Take a pending pulse without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TryRecvError::Empty`] if no pulse is pending and
    /// [`TryRecvError::Disconnected`] once the subscription has ended.
    pub fn try_recv(&mut self) -> Result<(), TryRecvError> {
        if self.scope.is_cancelled() {
            self.rx.close();
            return Err(TryRecvError::Disconnected);
        }
        self.rx.try_recv()
    }
}

struct Slot {
    tx: mpsc::Sender<()>,
    scope: CancellationToken,
}

struct HubInner {
    subscribers: Mutex<HashMap<u64, Slot>>,
    next_id: AtomicU64,
    closed: CancellationToken,
}

impl HubInner {
    fn remove(&self, id: u64) {
        if self.subscribers.lock().remove(&id).is_some() {
            tracing::debug!(id, "subscription removed");
        }
    }
}

impl Drop for HubInner {
    fn drop(&mut self) {
        // Releases any reaper still waiting.
        self.closed.cancel();
    }
}

/// Registry of subscriptions receiving change pulses.
///
/// Broadcasting never waits on a subscriber. Registrations are removed as
/// soon as their scope is cancelled when a runtime is available to run the
/// reaper; otherwise they are pruned on the next broadcast.
///
/// # Examples
///
/// ```rust
/// use config_watcher::notify::NotificationHub;
/// use tokio_util::sync::CancellationToken;
///
/// let hub = NotificationHub::new(None);
/// let scope = CancellationToken::new();
/// let mut subscription = hub.subscribe(scope.clone());
///
/// hub.broadcast();
/// hub.broadcast();
///
/// // Both broadcasts coalesced into one pulse
/// assert!(subscription.try_recv().is_ok());
/// assert!(subscription.try_recv().is_err());
///
/// scope.cancel();
/// hub.broadcast();
/// assert_eq!(hub.subscriber_count(), 0);
/// ```
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
    runtime: Option<Handle>,
}

impl NotificationHub {
    /// Create a hub. Reaper tasks are spawned on `runtime` when given.
    pub fn new(runtime: Option<Handle>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                closed: CancellationToken::new(),
            }),
            runtime,
        }
    }

    /// Register a subscription that lives until `scope` is cancelled.
    ///
    /// Subscribing to a closed hub returns an already-ended subscription.
    pub fn subscribe(&self, scope: CancellationToken) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(PULSE_CAPACITY);

        // Cancelled by the caller's scope, or by dropping the Subscription.
        let local = scope.child_token();
        let subscription = Subscription {
            rx,
            scope: local.clone(),
            _guard: local.clone().drop_guard(),
        };

        if self.inner.closed.is_cancelled() {
            return subscription;
        }

        self.inner.subscribers.lock().insert(
            id,
            Slot {
                tx,
                scope: local.clone(),
            },
        );
        tracing::debug!(id, "subscription registered");

        // A concurrent close may have cleared the registry before the insert.
        if self.inner.closed.is_cancelled() {
            self.inner.remove(id);
            return subscription;
        }

        if let Some(runtime) = &self.runtime {
            let inner = Arc::downgrade(&self.inner);
            let closed = self.inner.closed.clone();
            runtime.spawn(async move {
                tokio::select! {
                    _ = local.cancelled() => {}
                    _ = closed.cancelled() => {}
                }
                if let Some(inner) = inner.upgrade() {
                    inner.remove(id);
                }
            });
        }

        subscription
    }

    /// Deliver one pulse to every active subscription.
    ///
    /// Returns the number of subscriptions still registered. Does nothing
    /// once the hub is closed.
    pub fn broadcast(&self) -> usize {
        if self.inner.closed.is_cancelled() {
            return 0;
        }

        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|_, slot| {
            if slot.scope.is_cancelled() {
                return false;
            }
            match slot.tx.try_send(()) {
                // Full: a pulse is already pending.
                Ok(()) | Err(TrySendError::Full(())) => true,
                Err(TrySendError::Closed(())) => false,
            }
        });
        tracing::trace!(subscribers = subscribers.len(), "broadcast");
        subscribers.len()
    }

    /// Get the number of registered subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// End every subscription and stop accepting broadcasts.
    ///
    /// Pulses already queued are still delivered before the subscriptions
    /// report their end.
    pub fn close(&self) {
        self.inner.closed.cancel();
        self.inner.subscribers.lock().clear();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(Handle::try_current().ok())
    }
}
