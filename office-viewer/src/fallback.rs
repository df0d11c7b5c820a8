//! Switches between the live connection and a local fallback producer.
//!
//! Driven only by bus connection events: the fallback starts once a grace
//! period passes with no live connection, and stops as soon as one appears.

use crate::bus::{NetEvents, SubscriptionId};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

pub const STARTUP_GRACE: Duration = Duration::from_secs(2);
pub const RECONNECT_GRACE: Duration = Duration::from_secs(3);

/// A local producer of agent events that can be switched on and off.
pub trait Fallback: Send + Sync {
    /// Returns false if already running.
    fn start(&self) -> bool;
    /// Returns false if not running.
    fn stop(&self) -> bool;
    fn is_running(&self) -> bool;
}

type PendingTimer = Arc<Mutex<Option<JoinHandle<()>>>>;

pub struct FallbackController {
    bus: Arc<NetEvents>,
    fallback: Arc<dyn Fallback>,
    startup_grace: Duration,
    reconnect_grace: Duration,
    pending: PendingTimer,
    subscriptions: Vec<SubscriptionId>,
}

impl FallbackController {
    pub fn new(bus: Arc<NetEvents>, fallback: Arc<dyn Fallback>) -> Self {
        Self::with_grace(bus, fallback, STARTUP_GRACE, RECONNECT_GRACE)
    }

    pub fn with_grace(
        bus: Arc<NetEvents>,
        fallback: Arc<dyn Fallback>,
        startup_grace: Duration,
        reconnect_grace: Duration,
    ) -> Self {
        Self {
            bus,
            fallback,
            startup_grace,
            reconnect_grace,
            pending: Arc::new(Mutex::new(None)),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to connection events and arm the startup timer.
    ///
    /// Must be called from within a tokio runtime. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if !self.subscriptions.is_empty() {
            return;
        }
        let runtime = Handle::current();

        let fallback = Arc::clone(&self.fallback);
        let pending = Arc::clone(&self.pending);
        let connected = self.bus.connected.subscribe(move |_| {
            cancel(&pending);
            if fallback.is_running() && fallback.stop() {
                info!("Server connected, fallback simulation stopped");
            }
        });

        let bus = Arc::clone(&self.bus);
        let fallback = Arc::clone(&self.fallback);
        let pending = Arc::clone(&self.pending);
        let grace = self.reconnect_grace;
        let rt = runtime.clone();
        let disconnected = self.bus.disconnected.subscribe(move |reason| {
            info!(reason = %reason, grace_ms = grace.as_millis() as u64, "Server lost");
            arm(&rt, &pending, &bus, &fallback, grace, "Server lost, resuming fallback simulation");
        });

        self.subscriptions = vec![connected, disconnected];
        arm(
            &runtime,
            &self.pending,
            &self.bus,
            &self.fallback,
            self.startup_grace,
            "No server connection, starting fallback simulation",
        );
    }

    /// Unsubscribe and cancel any pending timer. A running fallback is left as is.
    pub fn shutdown(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.bus.connected.unsubscribe(id);
            self.bus.disconnected.unsubscribe(id);
        }
        cancel(&self.pending);
    }
}

impl Drop for FallbackController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn cancel(pending: &PendingTimer) {
    if let Some(timer) = pending.lock().expect("fallback lock poisoned").take() {
        timer.abort();
    }
}

/// Replace any pending timer with one that starts the fallback after `grace`
/// unless a live connection showed up in the meantime.
fn arm(
    runtime: &Handle,
    pending: &PendingTimer,
    bus: &Arc<NetEvents>,
    fallback: &Arc<dyn Fallback>,
    grace: Duration,
    message: &'static str,
) {
    let bus = Arc::clone(bus);
    let fallback = Arc::clone(fallback);
    let timer = runtime.spawn(async move {
        tokio::time::sleep(grace).await;
        if !bus.is_connected() && fallback.start() {
            info!("{}", message);
        }
    });

    if let Some(previous) = pending.lock().expect("fallback lock poisoned").replace(timer) {
        previous.abort();
    }
}
