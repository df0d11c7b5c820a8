// Mock agent traffic for dev mode (no API key configured).
//
// Every tick: maybe spawn (below the population cap), advance every agent's
// task and state, maybe despawn one agent (above the floor), re-sample
// proximity connections. State rolls are memoryless: the previous state does
// not influence the next one.

use crate::agent::{AgentMetrics, AgentRecord, AgentState, AgentTask, WorldBounds};
use crate::scheduler::ScheduledTask;
use crate::state::AgentRegistry;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};


const JOB_TYPES: [&str; 7] = ["code-review", "deploy", "debug", "test", "refactor", "docs", "meeting"];

/// Task name prefix per job type (same order as JOB_TYPES)
const TASK_NAMES: [&str; 7] = [
    "Reviewing PR #",
    "Deploying to ",
    "Debugging issue ",
    "Running tests for ",
    "Refactoring ",
    "Writing docs for ",
    "Meeting about ",
];

const SKILLS: [&str; 16] = [
    "typescript", "javascript", "react", "node", "python", "go", "rust",
    "testing", "deployment", "debugging", "code-review", "documentation",
    "api-design", "database", "security", "performance",
];

const SPAWN_CHANCE: f64 = 0.3;
const DESPAWN_CHANCE: f64 = 0.1;
/// Never despawn at or below this population
const MIN_POPULATION: usize = 3;
const CONNECT_CHANCE: f64 = 0.3;
const PROXIMITY_RADIUS: f64 = 150.0;
const MOVE_JITTER: i32 = 20;
const SPAWN_INSET: i32 = 50;

static AGENT_COUNTER: AtomicU64 = AtomicU64::new(0);
static TASK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Tunables for the mock generator
#[derive(Debug, Clone, Copy)]
pub struct MockSettings {
    pub bounds: WorldBounds,
    pub max_agents: usize,
}

/// Drives the registry with simulated agents on a fixed interval.
pub struct MockAgentService {
    registry: Arc<AgentRegistry>,
    settings: MockSettings,
    task: ScheduledTask,
}

impl MockAgentService {
    pub fn new(registry: Arc<AgentRegistry>, settings: MockSettings, interval: Duration) -> Self {
        Self {
            registry,
            settings,
            task: ScheduledTask::new("mock-agents", interval),
        }
    }

    /// Start the simulation. No-op if already running.
    pub fn start(&mut self) -> bool {
        let registry = Arc::clone(&self.registry);
        let settings = self.settings;
        let mut rng = StdRng::from_entropy();

        let started = self.task.start(move || {
            step(&registry, &settings, &mut rng);
        });
        if started {
            info!(max_agents = settings.max_agents, "Mock agent simulation started");
        }
        started
    }

    pub fn stop(&mut self) -> bool {
        self.task.stop()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }
}

/// One simulation tick against the registry.
pub fn step<R: Rng>(registry: &AgentRegistry, settings: &MockSettings, rng: &mut R) {
    if registry.count() < settings.max_agents && rng.gen_bool(SPAWN_CHANCE) {
        let agent = spawn_agent(&settings.bounds, rng);
        debug!(agent_id = %agent.id, job_type = ?agent.job_type, "Mock agent spawned");
        registry.upsert(agent);
    }

    // In-place updates only: an agent deleted mid-step stays deleted
    let ids: Vec<String> = registry.get_all().into_iter().map(|a| a.id).collect();
    for id in &ids {
        registry.update(id, |agent| simulate_agent(agent, &settings.bounds, rng));
    }
    let mut agents = registry.get_all();
    resample_connections(&mut agents, rng);
    for agent in agents {
        registry.update(&agent.id, |live| live.connections = agent.connections);
    }

    if registry.count() > MIN_POPULATION && rng.gen_bool(DESPAWN_CHANCE) {
        let ids: Vec<String> = registry.get_all().into_iter().map(|a| a.id).collect();
        if let Some(victim) = ids.choose(rng) {
            debug!(agent_id = %victim, "Mock agent despawned");
            registry.remove(victim);
        }
    }
}

/// Fresh IDLE agent at a random position inset from the world edges
pub fn spawn_agent<R: Rng>(bounds: &WorldBounds, rng: &mut R) -> AgentRecord {
    let n = AGENT_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let job_index = rng.gen_range(0..JOB_TYPES.len());
    let skill_count = rng.gen_range(2..=5);

    let mut agent = AgentRecord::new(
        format!("agent-{}", n),
        random_coord(bounds.width, rng),
        random_coord(bounds.height, rng),
        AgentState::Idle,
    );
    agent.job_type = Some(JOB_TYPES[job_index].to_string());
    agent.current_task = Some(new_task(job_index, rng));
    agent.skills = Some(
        SKILLS
            .choose_multiple(rng, skill_count)
            .map(|s| s.to_string())
            .collect(),
    );
    agent.metrics = Some(AgentMetrics {
        tasks_completed: rng.gen_range(0..=50),
        tasks_in_progress: 1,
        success_rate: rng.gen_range(75..=100) as f64,
        average_time: rng.gen_range(30_000..=90_000),
        active_time: rng.gen_range(60_000..=3_600_000),
    });
    agent.connections = Some(Vec::new());
    agent
}

/// Advance task progress, then apply one weighted state roll.
///
/// Bands: move 40%, work 30%, idle 20%, error 10%.
pub fn simulate_agent<R: Rng>(agent: &mut AgentRecord, bounds: &WorldBounds, rng: &mut R) {
    if agent.state == AgentState::Working {
        advance_task(agent, rng);
    }

    let roll: f64 = rng.gen();
    agent.state = if roll < 0.4 {
        agent.x = bounds.clamp_x(agent.x + rng.gen_range(-MOVE_JITTER..=MOVE_JITTER) as f64);
        agent.y = bounds.clamp_y(agent.y + rng.gen_range(-MOVE_JITTER..=MOVE_JITTER) as f64);
        AgentState::Moving
    } else if roll < 0.7 {
        AgentState::Working
    } else if roll < 0.9 {
        AgentState::Idle
    } else {
        AgentState::Error
    };
}

/// Progress the current task; a finished task is replaced, never kept at 100.
fn advance_task<R: Rng>(agent: &mut AgentRecord, rng: &mut R) {
    let Some(task) = agent.current_task.as_mut() else {
        return;
    };
    task.progress = (task.progress + rng.gen_range(1..=5) as f64).min(100.0);
    if task.progress < 100.0 {
        return;
    }

    if let Some(metrics) = agent.metrics.as_mut() {
        metrics.tasks_completed += 1;
    }
    let job_index = agent
        .job_type
        .as_deref()
        .and_then(|job| JOB_TYPES.iter().position(|j| *j == job))
        .unwrap_or_else(|| rng.gen_range(0..JOB_TYPES.len()));
    agent.current_task = Some(new_task(job_index, rng));
}

/// Each agent links to 1-2 random neighbours within the proximity radius
/// (30% chance), otherwise none. Nothing carries over between ticks.
pub fn resample_connections<R: Rng>(agents: &mut [AgentRecord], rng: &mut R) {
    let positions: Vec<(String, f64, f64)> =
        agents.iter().map(|a| (a.id.clone(), a.x, a.y)).collect();

    for agent in agents.iter_mut() {
        let nearby: Vec<&String> = positions
            .iter()
            .filter(|(id, x, y)| {
                *id != agent.id && (x - agent.x).hypot(y - agent.y) < PROXIMITY_RADIUS
            })
            .map(|(id, _, _)| id)
            .collect();

        agent.connections = if !nearby.is_empty() && rng.gen_bool(CONNECT_CHANCE) {
            let count = rng.gen_range(1..=2).min(nearby.len());
            Some(
                nearby
                    .choose_multiple(rng, count)
                    .map(|id| id.to_string())
                    .collect(),
            )
        } else {
            Some(Vec::new())
        };
    }
}

fn new_task<R: Rng>(job_index: usize, rng: &mut R) -> AgentTask {
    let n = TASK_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    AgentTask {
        id: format!("task-{}", n),
        name: format!("{}{}", TASK_NAMES[job_index], rng.gen_range(100..=999)),
        task_type: JOB_TYPES[job_index].to_string(),
        progress: 0.0,
        started_at: Utc::now().timestamp_millis(),
        estimated_duration: Some(rng.gen_range(30_000..=120_000)),
    }
}

fn random_coord<R: Rng>(extent: f64, rng: &mut R) -> f64 {
    let max = (extent as i32 - SPAWN_INSET).max(SPAWN_INSET);
    rng.gen_range(SPAWN_INSET..=max) as f64
}
