//! Keeps the local id -> view map in step with the server's event stream.
//!
//! Snapshots replace everything. Updates create unseen ids and sync known ones
//! in place. Removals dispose and drop the view along with its hit targets.

use crate::bus::{NetEvents, SubscriptionId};
use crate::view::{AgentView, ViewFactory};
use pixel_office::agent::{AgentRecord, AgentState, WorldState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Seconds between work sparkles for WORKING agents
const SPARKLE_INTERVAL_SECS: f64 = 0.3;

/// One-shot visual requests raised by reconciliation, drained by the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Agent just transitioned into ERROR
    ErrorBurst { id: String },
    /// Periodic cue for an agent that is WORKING
    WorkSparkle { id: String },
}

struct Tracked<V> {
    view: V,
    state: AgentState,
}

pub struct Reconciler<F: ViewFactory> {
    factory: F,
    agents: HashMap<String, Tracked<F::View>>,
    hit_targets: Vec<String>,
    effects: Vec<Effect>,
    sparkle_timer: f64,
}

impl<F: ViewFactory> Reconciler<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            agents: HashMap::new(),
            hit_targets: Vec::new(),
            effects: Vec::new(),
            sparkle_timer: 0.0,
        }
    }

    /// Authoritative replace-all: every tracked view is disposed, then the
    /// snapshot is rebuilt from scratch.
    pub fn apply_world_state(&mut self, snapshot: &WorldState) {
        self.dispose_all();

        for record in &snapshot.agents {
            self.upsert(record);
        }
        debug!(tick = snapshot.tick, agents = self.agents.len(), "Applied world state");
    }

    pub fn apply_agent_update(&mut self, records: &[AgentRecord]) {
        for record in records {
            self.upsert(record);
        }
    }

    /// Returns false if the id was not tracked.
    pub fn apply_agent_remove(&mut self, id: &str) -> bool {
        let Some(mut tracked) = self.agents.remove(id) else {
            return false;
        };

        let targets = tracked.view.hit_targets();
        self.hit_targets.retain(|t| !targets.contains(t));
        tracked.view.dispose();
        debug!(agent_id = %id, "Removed agent view");
        true
    }

    /// Advance every view by `delta_secs` and queue work sparkles.
    pub fn update(&mut self, delta_secs: f64) {
        for tracked in self.agents.values_mut() {
            tracked.view.update(delta_secs);
        }

        self.sparkle_timer += delta_secs;
        if self.sparkle_timer > SPARKLE_INTERVAL_SECS {
            self.sparkle_timer = 0.0;
            let mut working: Vec<&String> = self
                .agents
                .iter()
                .filter(|(_, t)| t.state == AgentState::Working)
                .map(|(id, _)| id)
                .collect();
            working.sort();
            self.effects.extend(
                working
                    .into_iter()
                    .map(|id| Effect::WorkSparkle { id: id.clone() }),
            );
        }
    }

    pub fn get(&self, id: &str) -> Option<&F::View> {
        self.agents.get(id).map(|t| &t.view)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &F::View)> {
        self.agents.iter().map(|(id, t)| (id, &t.view))
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }

    pub fn hit_targets(&self) -> &[String] {
        &self.hit_targets
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Dispose every view. The reconciler is empty afterwards.
    pub fn dispose_all(&mut self) {
        for (_, mut tracked) in self.agents.drain() {
            tracked.view.dispose();
        }
        self.hit_targets.clear();
    }

    fn upsert(&mut self, record: &AgentRecord) {
        if let Some(tracked) = self.agents.get_mut(&record.id) {
            if tracked.state != record.state && record.state == AgentState::Error {
                self.effects.push(Effect::ErrorBurst {
                    id: record.id.clone(),
                });
            }
            tracked.state = record.state;
            tracked.view.sync(record);
            return;
        }

        match self.factory.create(record) {
            Ok(view) => {
                self.hit_targets.extend(view.hit_targets());
                self.agents.insert(
                    record.id.clone(),
                    Tracked {
                        view,
                        state: record.state,
                    },
                );
            }
            Err(e) => {
                error!(agent_id = %record.id, error = %e, "Failed to create agent view");
            }
        }
    }
}

impl<F> Reconciler<F>
where
    F: ViewFactory + 'static,
{
    /// Subscribe a shared reconciler to the bus's world, update and remove topics.
    pub fn attach(reconciler: &Arc<Mutex<Self>>, bus: &NetEvents) -> Vec<SubscriptionId> {
        let r = Arc::clone(reconciler);
        let world = bus.world_state.subscribe(move |snapshot| {
            r.lock()
                .expect("reconciler lock poisoned")
                .apply_world_state(snapshot);
        });

        let r = Arc::clone(reconciler);
        let update = bus.agent_update.subscribe(move |records| {
            r.lock()
                .expect("reconciler lock poisoned")
                .apply_agent_update(records);
        });

        let r = Arc::clone(reconciler);
        let remove = bus.agent_remove.subscribe(move |id| {
            r.lock()
                .expect("reconciler lock poisoned")
                .apply_agent_remove(id);
        });

        vec![world, update, remove]
    }

    /// Undo [`Reconciler::attach`].
    pub fn detach(bus: &NetEvents, ids: &[SubscriptionId]) {
        for id in ids {
            bus.world_state.unsubscribe(*id);
            bus.agent_update.unsubscribe(*id);
            bus.agent_remove.unsubscribe(*id);
        }
    }
}
