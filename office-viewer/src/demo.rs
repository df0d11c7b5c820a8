//! Local stand-in for the server when no live connection exists.
//!
//! Emits the same vocabulary the server does: one `world_state` on start,
//! then an `agent_update` with every agent each step.

use crate::bus::NetEvents;
use crate::fallback::Fallback;
use crate::view::{CoordinateMapper, ScenePoint};
use pixel_office::agent::{AgentMetrics, AgentRecord, AgentState, AgentTask, WorldState};
use pixel_office::scheduler::ScheduledTask;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

pub const DEMO_STEP: Duration = Duration::from_millis(500);

const NAMES: [&str; 10] = [
    "Alice", "Bob", "Charlie", "Diana", "Eve", "Frank", "Grace", "Hank", "Ivy", "Jack",
];

const JOB_TYPES: [&str; 6] = ["developer", "designer", "analyst", "manager", "tester", "devops"];

const TASKS: [&str; 12] = [
    "Reviewing PR #42",
    "Fixing login bug",
    "Writing unit tests",
    "Deploying v2.1",
    "Code review",
    "Architecture doc",
    "Sprint planning",
    "CI/CD pipeline",
    "Database migration",
    "API refactor",
    "Performance audit",
    "Design system update",
];

/// Desk positions on the scene grid (x, z)
pub const DESK_SPOTS: [(f64, f64); 19] = [
    (6.0, 5.0),
    (8.0, 5.0),
    (10.0, 5.0),
    (6.0, 8.0),
    (8.0, 8.0),
    (10.0, 8.0),
    (6.0, 11.0),
    (8.0, 11.0),
    (10.0, 11.0),
    (6.0, 14.0),
    (8.0, 14.0),
    (10.0, 14.0),
    (16.0, 5.0),
    (18.0, 5.0),
    (16.0, 8.0),
    (18.0, 8.0),
    (16.0, 12.0),
    (18.0, 12.0),
    (20.0, 12.0),
];

// Per-step transition thresholds on a single roll
const MOVE_BELOW: f64 = 0.02;
const IDLE_BELOW: f64 = 0.03;
const ERROR_BELOW: f64 = 0.035;
const RESUME_WORK_CHANCE: f64 = 0.2;

fn skills_for(job_type: &str) -> Vec<String> {
    let skills: &[&str] = match job_type {
        "developer" => &["TypeScript", "React", "Node.js"],
        "designer" => &["Figma", "CSS", "UI/UX"],
        "analyst" => &["Python", "SQL", "Tableau"],
        "manager" => &["Agile", "Jira", "Roadmap"],
        "tester" => &["Jest", "Cypress", "QA"],
        "devops" => &["Docker", "AWS", "CI/CD"],
        _ => &["General"],
    };
    skills.iter().map(|s| s.to_string()).collect()
}

fn desk_position(index: usize) -> (f64, f64) {
    let (x, z) = DESK_SPOTS[index];
    CoordinateMapper::default().to_server(ScenePoint { x, z })
}

/// Build the fixed roster: one named agent per desk, all WORKING, wired up in pairs.
pub fn create_roster<R: Rng>(rng: &mut R, now_ms: i64) -> Vec<AgentRecord> {
    let count = NAMES.len().min(DESK_SPOTS.len());
    let mut agents: Vec<AgentRecord> = (0..count)
        .map(|i| {
            let (x, y) = desk_position(i);
            let job_type = JOB_TYPES[i % JOB_TYPES.len()];
            let mut agent = AgentRecord::new(NAMES[i], x, y, AgentState::Working);
            agent.job_type = Some(job_type.to_string());
            agent.current_task = Some(AgentTask {
                id: format!("task-{}", i),
                name: TASKS[i % TASKS.len()].to_string(),
                task_type: job_type.to_string(),
                progress: rng.gen_range(10..80) as f64,
                started_at: now_ms - rng.gen_range(0..300_000),
                estimated_duration: None,
            });
            agent.skills = Some(skills_for(job_type));
            agent.metrics = Some(AgentMetrics {
                tasks_completed: rng.gen_range(5..30),
                tasks_in_progress: rng.gen_range(1..4),
                success_rate: rng.gen_range(85..100) as f64,
                average_time: rng.gen_range(5_000..20_000),
                active_time: rng.gen_range(0..3_600_000),
            });
            agent.connections = Some(Vec::new());
            agent
        })
        .collect();

    for pair in agents.chunks_mut(2) {
        if let [a, b] = pair {
            a.connections = Some(vec![b.id.clone()]);
            b.connections = Some(vec![a.id.clone()]);
        }
    }
    agents
}

/// Advance one agent by one step.
///
/// A WORKING agent gains 1-3 progress; finishing the task bumps the completed
/// count, hands out a fresh task and leaves the agent IDLE for this step.
/// Otherwise one roll decides: move to a random desk, go idle, error, or
/// (when not working) a small chance to resume work.
pub fn step_agent<R: Rng>(agent: &mut AgentRecord, rng: &mut R, now_ms: i64) {
    if agent.state == AgentState::Working {
        if let Some(task) = agent.current_task.as_mut() {
            task.progress = (task.progress + 1.0 + rng.gen::<f64>() * 2.0).min(100.0);

            if task.progress >= 100.0 {
                if let Some(metrics) = agent.metrics.as_mut() {
                    metrics.tasks_completed += 1;
                }
                agent.current_task = Some(AgentTask {
                    id: format!("task-{}-{}", now_ms, agent.id),
                    name: TASKS[rng.gen_range(0..TASKS.len())].to_string(),
                    task_type: agent
                        .job_type
                        .clone()
                        .unwrap_or_else(|| "developer".to_string()),
                    progress: 0.0,
                    started_at: now_ms,
                    estimated_duration: None,
                });
                agent.state = AgentState::Idle;
                return;
            }
        }
    }

    let roll: f64 = rng.gen();
    if roll < MOVE_BELOW {
        let (x, y) = desk_position(rng.gen_range(0..DESK_SPOTS.len()));
        agent.state = AgentState::Moving;
        agent.x = x;
        agent.y = y;
    } else if roll < IDLE_BELOW {
        agent.state = AgentState::Idle;
    } else if roll < ERROR_BELOW {
        agent.state = AgentState::Error;
    } else if agent.state != AgentState::Working && rng.gen_bool(RESUME_WORK_CHANCE) {
        agent.state = AgentState::Working;
    }
}

struct DemoWorld {
    agents: Vec<AgentRecord>,
    rng: StdRng,
}

/// Runs the roster on a timer and publishes onto the bus.
pub struct DemoService {
    bus: Arc<NetEvents>,
    world: Arc<Mutex<DemoWorld>>,
    task: Mutex<ScheduledTask>,
}

impl DemoService {
    pub fn new(bus: Arc<NetEvents>) -> Self {
        Self::with_rng(bus, StdRng::from_entropy(), DEMO_STEP)
    }

    pub fn with_rng(bus: Arc<NetEvents>, rng: StdRng, step: Duration) -> Self {
        Self {
            bus,
            world: Arc::new(Mutex::new(DemoWorld {
                agents: Vec::new(),
                rng,
            })),
            task: Mutex::new(ScheduledTask::new("demo-simulation", step)),
        }
    }

    /// Current roster (empty while stopped)
    pub fn agents(&self) -> Vec<AgentRecord> {
        self.world.lock().expect("demo lock poisoned").agents.clone()
    }
}

impl Fallback for DemoService {
    fn start(&self) -> bool {
        let snapshot = {
            let mut task = self.task.lock().expect("demo lock poisoned");
            if task.is_running() {
                return false;
            }

            let snapshot = {
                let mut world = self.world.lock().expect("demo lock poisoned");
                let now = chrono::Utc::now().timestamp_millis();
                let DemoWorld { agents, rng } = &mut *world;
                *agents = create_roster(rng, now);
                WorldState {
                    agents: agents.clone(),
                    tick: 0,
                }
            };

            let world = Arc::clone(&self.world);
            let bus = Arc::clone(&self.bus);
            let mut first = true;
            task.start(move || {
                // The ticker fires immediately; the snapshot covers that instant
                if std::mem::take(&mut first) {
                    return;
                }
                let updated = {
                    let mut world = world.lock().expect("demo lock poisoned");
                    let now = chrono::Utc::now().timestamp_millis();
                    let DemoWorld { agents, rng } = &mut *world;
                    for agent in agents.iter_mut() {
                        step_agent(agent, rng, now);
                    }
                    agents.clone()
                };
                bus.agent_update.publish(&updated);
            });
            snapshot
        };

        // Published with no demo lock held: handlers may take their own locks
        // and call back into this service.
        info!(agents = snapshot.agents.len(), "Demo simulation started");
        self.bus.world_state.publish(&snapshot);
        true
    }

    fn stop(&self) -> bool {
        let stopped = self.task.lock().expect("demo lock poisoned").stop();
        if stopped {
            self.world.lock().expect("demo lock poisoned").agents.clear();
            info!("Demo simulation stopped");
        }
        stopped
    }

    fn is_running(&self) -> bool {
        self.task.lock().expect("demo lock poisoned").is_running()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const NOW: i64 = 1_700_000_000_000;

    fn desk_positions() -> Vec<(f64, f64)> {
        (0..DESK_SPOTS.len()).map(desk_position).collect()
    }

    #[test]
    fn test_roster_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let roster = create_roster(&mut rng, NOW);

        assert_eq!(roster.len(), 10);
        assert_eq!(roster[0].id, "Alice");
        assert_eq!(roster[9].id, "Jack");
        // Desk (6, 5) on the 24x18 grid
        assert_eq!((roster[0].x, roster[0].y), (200.0, 5.0 / 18.0 * 600.0));

        for (i, agent) in roster.iter().enumerate() {
            assert_eq!(agent.state, AgentState::Working);
            assert_eq!(agent.job_type.as_deref(), Some(JOB_TYPES[i % 6]));
            let progress = agent.current_task.as_ref().unwrap().progress;
            assert!((10.0..80.0).contains(&progress));
        }

        assert_eq!(roster[0].connections, Some(vec!["Bob".to_string()]));
        assert_eq!(roster[1].connections, Some(vec!["Alice".to_string()]));
        assert_eq!(roster[8].connections, Some(vec!["Jack".to_string()]));
    }

    #[test]
    fn test_task_completion_sets_idle_and_replaces_task() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut agent = create_roster(&mut rng, NOW).remove(0);
        agent.current_task.as_mut().unwrap().progress = 99.5;
        let completed = agent.metrics.as_ref().unwrap().tasks_completed;

        step_agent(&mut agent, &mut rng, NOW);

        assert_eq!(agent.state, AgentState::Idle);
        let task = agent.current_task.as_ref().unwrap();
        assert_eq!(task.progress, 0.0);
        assert_eq!(task.id, format!("task-{}-Alice", NOW));
        assert_eq!(task.task_type, "developer");
        assert_eq!(agent.metrics.as_ref().unwrap().tasks_completed, completed + 1);
    }

    #[test]
    fn test_progress_only_while_working() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut agent = create_roster(&mut rng, NOW).remove(0);
        agent.state = AgentState::Error;
        agent.current_task.as_mut().unwrap().progress = 50.0;

        step_agent(&mut agent, &mut rng, NOW);

        assert_eq!(agent.current_task.as_ref().unwrap().progress, 50.0);
    }

    #[test]
    fn test_long_run_stays_on_desks() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut roster = create_roster(&mut rng, NOW);
        let desks = desk_positions();
        let mut seen = std::collections::HashSet::new();

        for _ in 0..2_000 {
            for agent in roster.iter_mut() {
                step_agent(agent, &mut rng, NOW);
                seen.insert(agent.state);
                assert!(desks.contains(&(agent.x, agent.y)));
                let progress = agent.current_task.as_ref().unwrap().progress;
                assert!((0.0..=100.0).contains(&progress));
            }
        }

        for state in AgentState::ALL {
            assert!(seen.contains(&state), "never reached {}", state);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_publishes_snapshot_then_updates() {
        let bus = Arc::new(NetEvents::new());
        let snapshots = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&snapshots);
        bus.world_state.subscribe(move |state| {
            assert_eq!(state.tick, 0);
            assert_eq!(state.agents.len(), 10);
            s.fetch_add(1, Ordering::SeqCst);
        });
        let u = Arc::clone(&updates);
        bus.agent_update.subscribe(move |agents| {
            assert_eq!(agents.len(), 10);
            u.fetch_add(1, Ordering::SeqCst);
        });

        let demo = DemoService::with_rng(Arc::clone(&bus), StdRng::seed_from_u64(5), DEMO_STEP);
        assert!(demo.start());
        assert!(!demo.start());
        assert_eq!(snapshots.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(updates.load(Ordering::SeqCst), 2);

        assert!(demo.stop());
        assert!(!demo.stop());
        assert!(!demo.is_running());
        assert!(demo.agents().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_start_publishes_without_holding_demo_lock() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let bus = Arc::new(NetEvents::new());
        let view_lock = Arc::new(Mutex::new(()));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);

        // Stands in for the reconciler: the snapshot handler needs the view lock
        let lock = Arc::clone(&view_lock);
        bus.world_state.subscribe(move |_| {
            entered_tx.lock().unwrap().send(()).unwrap();
            let _views = lock.lock().unwrap();
        });

        let demo = Arc::new(DemoService::with_rng(
            Arc::clone(&bus),
            StdRng::seed_from_u64(6),
            DEMO_STEP,
        ));

        // A status reader holds the view lock and asks whether the demo runs
        let views = view_lock.lock().unwrap();
        let starter = {
            let demo = Arc::clone(&demo);
            let handle = runtime.handle().clone();
            std::thread::spawn(move || {
                let _rt = handle.enter();
                demo.start()
            })
        };
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("snapshot never published");

        assert!(demo.is_running());
        drop(views);
        assert!(starter.join().unwrap());

        let _rt = runtime.enter();
        assert!(demo.stop());
    }
}
