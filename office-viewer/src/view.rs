use anyhow::{bail, Result};
use pixel_office::agent::{AgentRecord, AgentState, WorldBounds};

/// Scene grid size (one unit per office cell)
pub const SCENE_WIDTH: f64 = 24.0;
pub const SCENE_DEPTH: f64 = 18.0;

/// Units per second an agent walks toward its target
const WALK_SPEED: f64 = 3.0;

/// Position on the scene's ground plane
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScenePoint {
    pub x: f64,
    pub z: f64,
}

/// Maps between server coordinates (0..width, 0..height) and the scene grid.
#[derive(Clone, Copy, Debug)]
pub struct CoordinateMapper {
    pub server: WorldBounds,
}

impl CoordinateMapper {
    pub fn new(server: WorldBounds) -> Self {
        Self { server }
    }

    pub fn to_scene(&self, x: f64, y: f64) -> ScenePoint {
        ScenePoint {
            x: x / self.server.width * SCENE_WIDTH,
            z: y / self.server.height * SCENE_DEPTH,
        }
    }

    pub fn to_server(&self, point: ScenePoint) -> (f64, f64) {
        (
            point.x / SCENE_WIDTH * self.server.width,
            point.z / SCENE_DEPTH * self.server.height,
        )
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(WorldBounds::default())
    }
}

/// A tracked, render-ready representation of one agent.
pub trait AgentView: Send {
    /// Apply the latest server record in place.
    fn sync(&mut self, record: &AgentRecord);

    /// Advance per-frame state (animation, movement).
    fn update(&mut self, _delta_secs: f64) {}

    /// Release anything the view holds. Called exactly once before the view is dropped.
    fn dispose(&mut self);

    /// Ids this view contributes to hit-testing
    fn hit_targets(&self) -> Vec<String>;
}

/// Builds views for records seen for the first time.
pub trait ViewFactory: Send {
    type View: AgentView;

    fn create(&mut self, record: &AgentRecord) -> Result<Self::View>;
}

/// Default view model: latest record plus a smoothed scene position.
#[derive(Clone, Debug)]
pub struct AgentViewModel {
    record: AgentRecord,
    position: ScenePoint,
    target: ScenePoint,
    mapper: CoordinateMapper,
    disposed: bool,
}

impl AgentViewModel {
    pub fn record(&self) -> &AgentRecord {
        &self.record
    }

    pub fn state(&self) -> AgentState {
        self.record.state
    }

    pub fn position(&self) -> ScenePoint {
        self.position
    }

    pub fn target(&self) -> ScenePoint {
        self.target
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// One-line nameplate text: "<id> · <job> · <task> <progress>%"
    pub fn label(&self) -> String {
        let mut parts = vec![self.record.id.clone()];
        if let Some(job) = &self.record.job_type {
            parts.push(job.clone());
        }
        if let Some(task) = &self.record.current_task {
            parts.push(format!("{} {:.0}%", task.name, task.progress));
        }
        parts.join(" · ")
    }
}

impl AgentView for AgentViewModel {
    fn sync(&mut self, record: &AgentRecord) {
        self.target = self.mapper.to_scene(record.x, record.y);
        self.record = record.clone();
    }

    fn update(&mut self, delta_secs: f64) {
        let dx = self.target.x - self.position.x;
        let dz = self.target.z - self.position.z;
        let dist = dx.hypot(dz);
        let step = WALK_SPEED * delta_secs;
        if dist <= step || dist == 0.0 {
            self.position = self.target;
        } else {
            self.position.x += dx / dist * step;
            self.position.z += dz / dist * step;
        }
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }

    fn hit_targets(&self) -> Vec<String> {
        vec![self.record.id.clone()]
    }
}

/// Builds [`AgentViewModel`]s. Rejects records that cannot be placed.
#[derive(Clone, Debug, Default)]
pub struct ViewModelFactory {
    mapper: CoordinateMapper,
}

impl ViewModelFactory {
    pub fn new(mapper: CoordinateMapper) -> Self {
        Self { mapper }
    }
}

impl ViewFactory for ViewModelFactory {
    type View = AgentViewModel;

    fn create(&mut self, record: &AgentRecord) -> Result<AgentViewModel> {
        if record.id.trim().is_empty() {
            bail!("agent record has a blank id");
        }
        if !record.x.is_finite() || !record.y.is_finite() {
            bail!("agent {} has non-finite coordinates", record.id);
        }

        let position = self.mapper.to_scene(record.x, record.y);
        Ok(AgentViewModel {
            record: record.clone(),
            position,
            target: position,
            mapper: self.mapper,
            disposed: false,
        })
    }
}
