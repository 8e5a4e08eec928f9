//! Subscriber registry for message and lifecycle events.
//!
//! Subscriptions are explicit handle tokens rather than closure identity;
//! registries are lock-guarded because subscribers may live on any
//! thread. Delivery order follows registration order, and a panicking
//! handler is isolated so the remaining handlers still run.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::warn;

use giglink_core::InboundEvent;

type MessageHandler = Arc<dyn Fn(&InboundEvent) + Send + Sync>;
type LifecycleHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum SubscriptionKind {
    Message,
    Connect,
    Disconnect,
}

/// Handle returned from a subscribe call; pass it back to
/// [`SubscriberRegistry::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: SubscriptionKind,
    id: u64,
}

/// Registries for the three event kinds a connection surfaces.
///
/// There is no replay buffer: a handler registered before an event fires
/// receives it, late subscribers miss earlier events.
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    message: RwLock<BTreeMap<u64, MessageHandler>>,
    connect: RwLock<BTreeMap<u64, LifecycleHandler>>,
    disconnect: RwLock<BTreeMap<u64, LifecycleHandler>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            message: RwLock::new(BTreeMap::new()),
            connect: RwLock::new(BTreeMap::new()),
            disconnect: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a handler for inbound events.
    pub fn on_message(
        &self,
        handler: impl Fn(&InboundEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.next_id();
        let _ = self.message.write().insert(id, Arc::new(handler));
        Subscription {
            kind: SubscriptionKind::Message,
            id,
        }
    }

    /// Register a handler for successful connections.
    pub fn on_connect(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.next_id();
        let _ = self.connect.write().insert(id, Arc::new(handler));
        Subscription {
            kind: SubscriptionKind::Connect,
            id,
        }
    }

    /// Register a handler for disconnections.
    pub fn on_disconnect(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        let id = self.next_id();
        let _ = self.disconnect.write().insert(id, Arc::new(handler));
        Subscription {
            kind: SubscriptionKind::Disconnect,
            id,
        }
    }

    /// Drop a subscription. Unknown tokens are a no-op.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let _ = match subscription.kind {
            SubscriptionKind::Message => self.message.write().remove(&subscription.id).is_some(),
            SubscriptionKind::Connect => self.connect.write().remove(&subscription.id).is_some(),
            SubscriptionKind::Disconnect => {
                self.disconnect.write().remove(&subscription.id).is_some()
            }
        };
    }

    /// Deliver an inbound event to every message handler.
    pub fn emit_message(&self, event: &InboundEvent) {
        for (id, handler) in self.handlers(&self.message) {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!(subscriber = id, "message handler panicked");
            }
        }
    }

    /// Deliver a connect transition to every connect handler.
    pub fn emit_connect(&self) {
        self.emit_lifecycle(&self.connect, "connect");
    }

    /// Deliver a disconnect transition to every disconnect handler.
    pub fn emit_disconnect(&self) {
        self.emit_lifecycle(&self.disconnect, "disconnect");
    }

    fn emit_lifecycle(&self, registry: &RwLock<BTreeMap<u64, LifecycleHandler>>, label: &str) {
        for (id, handler) in self.handlers(registry) {
            if std::panic::catch_unwind(AssertUnwindSafe(|| handler())).is_err() {
                warn!(subscriber = id, "{label} handler panicked");
            }
        }
    }

    // Handlers are cloned out before invocation so a handler may
    // subscribe or unsubscribe reentrantly without deadlocking.
    fn handlers<H: Clone>(&self, registry: &RwLock<BTreeMap<u64, H>>) -> Vec<(u64, H)> {
        registry
            .read()
            .iter()
            .map(|(id, handler)| (*id, handler.clone()))
            .collect()
    }

    /// Number of registered message handlers.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.message.read().len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
