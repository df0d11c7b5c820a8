use crate::agent::AgentRecord;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Authoritative in-memory store of all active agents.
///
/// Every mutation of agent state goes through here. The dirty bit coalesces
/// any number of mutations between two broadcast ticks into one broadcast.
pub struct AgentRegistry {
    /// Concurrent map: agent id -> record
    agents: DashMap<String, AgentRecord>,

    /// Set when state changed since the last broadcast
    dirty: AtomicBool,

    /// Ids removed since the last broadcast
    removed: DashSet<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
            dirty: AtomicBool::new(false),
            removed: DashSet::new(),
        }
    }

    /// Insert or fully replace the record stored under `agent.id`.
    ///
    /// No validation happens here; ingestion normalizes before calling.
    pub fn upsert(&self, agent: AgentRecord) {
        self.removed.remove(&agent.id);
        self.agents.insert(agent.id.clone(), agent);
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Delete a record. Returns whether it existed; only a real deletion marks dirty.
    pub fn remove(&self, id: &str) -> bool {
        let existed = self.agents.remove(id).is_some();
        if existed {
            self.removed.insert(id.to_string());
            self.dirty.store(true, Ordering::SeqCst);
            debug!(agent_id = %id, "Agent removed");
        }
        existed
    }

    /// Mutate a stored record in place. Returns false if the id is absent.
    ///
    /// Unlike `upsert`, a missing id is never reinserted and a pending
    /// removal stays queued.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut AgentRecord)) -> bool {
        match self.agents.get_mut(id) {
            Some(mut agent) => {
                f(agent.value_mut());
                self.dirty.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<AgentRecord> {
        self.agents.get(id).map(|a| a.clone())
    }

    /// All current records, sorted by id so payloads are stable.
    pub fn get_all(&self) -> Vec<AgentRecord> {
        let mut agents: Vec<AgentRecord> = self.agents.iter().map(|a| a.value().clone()).collect();
        agents.sort_by(|a, b| a.id.cmp(&b.id));
        agents
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    /// Read and clear the dirty bit in one step.
    ///
    /// A mutation landing after this call re-marks the registry, so it is
    /// picked up by the next tick instead of being lost.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// Drain the ids removed since the previous call.
    pub fn take_removed(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.removed.iter().map(|id| id.key().clone()).collect();
        for id in &ids {
            self.removed.remove(id);
        }
        ids.sort();
        ids
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
