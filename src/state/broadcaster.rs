use crate::agent::{AgentRecord, WorldState};
use crate::scheduler::ScheduledTask;
use crate::state::AgentRegistry;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::trace;

/// One coalesced broadcast: the full agent set plus ids removed since the previous one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentBroadcast {
    pub tick: u64,
    pub agents: Vec<AgentRecord>,
    pub removed: Vec<String>,
}

/// Fixed-interval broadcast loop.
///
/// Network sends are decoupled from mutation frequency: each tick sends the
/// whole registry only if it changed since the previous tick, and nothing
/// otherwise.
pub struct Broadcaster {
    registry: Arc<AgentRegistry>,

    /// Incremented on every tick, dirty or not
    tick: AtomicU64,

    tx: broadcast::Sender<AgentBroadcast>,
}

impl Broadcaster {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            registry,
            tick: AtomicU64::new(0),
            tx,
        }
    }

    /// Run one iteration of the loop. Returns the broadcast if one was sent.
    pub fn tick(&self) -> Option<AgentBroadcast> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.registry.take_dirty() {
            return None;
        }

        let update = AgentBroadcast {
            tick,
            agents: self.registry.get_all(),
            removed: self.registry.take_removed(),
        };

        // No receivers is fine: nobody is watching yet
        let receivers = self.tx.send(update.clone()).unwrap_or(0);
        trace!(
            tick = tick,
            agents = update.agents.len(),
            removed = update.removed.len(),
            receivers = receivers,
            "Broadcast agent update"
        );

        Some(update)
    }

    /// Current registry contents with the current tick counter
    pub fn snapshot(&self) -> WorldState {
        WorldState {
            agents: self.registry.get_all(),
            tick: self.current_tick(),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentBroadcast> {
        self.tx.subscribe()
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Start the loop on a scheduled task ticking every `period`.
    pub fn spawn(self: Arc<Self>, period: Duration) -> ScheduledTask {
        let mut task = ScheduledTask::new("broadcast", period);
        task.start(move || {
            self.tick();
        });
        task
    }
}
