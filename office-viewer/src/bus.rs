//! Typed publish/subscribe for network events.
//!
//! Each topic is its own [`Channel`] with a concrete payload type, so a
//! handler for `agent_update` can only ever see `Vec<AgentRecord>`. The bus is
//! constructed once by the composition root and handed to every component
//! that needs it.

use pixel_office::agent::{AgentRecord, WorldState};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Token returned by [`Channel::subscribe`]; pass it to `unsubscribe`.
///
/// Ids are unique across every channel in the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

/// One topic with a fixed payload type
pub struct Channel<T> {
    name: &'static str,
    handlers: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
}

impl<T> Channel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .expect("channel lock poisoned")
            .push((id, Arc::new(handler)));
        id
    }

    /// Returns false if the id was not subscribed here.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().expect("channel lock poisoned");
        let before = handlers.len();
        handlers.retain(|(sub, _)| *sub != id);
        handlers.len() != before
    }

    /// Deliver to every handler in subscription order. Returns how many ran.
    ///
    /// Handlers are invoked outside the lock, so a handler may subscribe or
    /// unsubscribe without deadlocking.
    pub fn publish(&self, payload: &T) -> usize {
        let handlers: Vec<Handler<T>> = self
            .handlers
            .lock()
            .expect("channel lock poisoned")
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();

        debug!(topic = self.name, handlers = handlers.len(), "Publishing event");
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().expect("channel lock poisoned").len()
    }
}

/// All network-facing topics plus the live-connection flag.
pub struct NetEvents {
    pub world_state: Channel<WorldState>,
    pub agent_update: Channel<Vec<AgentRecord>>,
    /// Payload is the removed agent id
    pub agent_remove: Channel<String>,
    pub connected: Channel<()>,
    /// Payload is the disconnect reason
    pub disconnected: Channel<String>,
    connected_flag: AtomicBool,
}

impl NetEvents {
    pub fn new() -> Self {
        Self {
            world_state: Channel::new("world_state"),
            agent_update: Channel::new("agent_update"),
            agent_remove: Channel::new("agent_remove"),
            connected: Channel::new("connected"),
            disconnected: Channel::new("disconnected"),
            connected_flag: AtomicBool::new(false),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected_flag.load(Ordering::SeqCst)
    }

    /// Flag the live connection as up, then notify subscribers.
    pub fn mark_connected(&self) {
        self.connected_flag.store(true, Ordering::SeqCst);
        self.connected.publish(&());
    }

    /// Flag the live connection as down, then notify subscribers.
    pub fn mark_disconnected(&self, reason: impl Into<String>) {
        self.connected_flag.store(false, Ordering::SeqCst);
        self.disconnected.publish(&reason.into());
    }
}

impl Default for NetEvents {
    fn default() -> Self {
        Self::new()
    }
}
