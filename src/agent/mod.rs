use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{normalize_agent, ValidationError};

/// Closed set of states an agent can be in.
///
/// Serialized as upper-case strings ("IDLE", "WORKING", ...).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentState {
    #[default]
    Idle,
    Working,
    Moving,
    Error,
}

impl AgentState {
    pub const ALL: [AgentState; 4] = [
        AgentState::Idle,
        AgentState::Working,
        AgentState::Moving,
        AgentState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentState::Idle => "IDLE",
            AgentState::Working => "WORKING",
            AgentState::Moving => "MOVING",
            AgentState::Error => "ERROR",
        }
    }

    /// Parse the wire name. Returns None for anything outside the enumeration.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == value)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task an agent is currently working on
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTask {
    pub id: String,
    /// Human readable label (e.g., "Reviewing PR #123")
    pub name: String,
    /// Category (e.g., "code-review")
    #[serde(rename = "type")]
    pub task_type: String,
    /// 0-100
    pub progress: f64,
    /// Unix epoch milliseconds
    pub started_at: i64,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub tasks_completed: u64,
    pub tasks_in_progress: u64,
    /// 0-100
    pub success_rate: f64,
    /// Milliseconds
    pub average_time: u64,
    /// Total active milliseconds
    pub active_time: u64,
}

/// AgentRecord is one simulated worker in the office.
///
/// `id` is the identity key and never changes after creation. Position is
/// expressed in world coordinates bounded by [`WorldBounds`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub state: AgentState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task: Option<AgentTask>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AgentMetrics>,

    /// Ids of agents this one collaborates with. Not checked against the registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<Vec<String>>,
}

impl AgentRecord {
    /// Bare record with no optional data
    pub fn new(id: impl Into<String>, x: f64, y: f64, state: AgentState) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            state,
            job_type: None,
            current_task: None,
            skills: None,
            metrics: None,
            connections: None,
        }
    }
}

/// Full snapshot of the office, sent to a viewer when it connects
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub agents: Vec<AgentRecord>,
    pub tick: u64,
}

/// Size of the 2D coordinate space agents live in
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f64,
    pub height: f64,
}

impl WorldBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn clamp_x(&self, x: f64) -> f64 {
        x.clamp(0.0, self.width)
    }

    pub fn clamp_y(&self, y: f64) -> f64 {
        y.clamp(0.0, self.height)
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}
