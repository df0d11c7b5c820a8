use crate::agent::WorldBounds;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Complete server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OfficeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// HTTP/WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origin, "*" for any
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Shared bearer token for /api/agents. Empty = auth disabled (dev mode).
    #[serde(default)]
    pub api_key: String,
    /// How often the broadcast loop runs (milliseconds)
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origin() -> String {
    "*".to_string()
}

fn default_tick_rate_ms() -> u64 {
    100
}

fn default_max_body_bytes() -> usize {
    1_048_576 // 1 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            cors_origin: default_cors_origin(),
            api_key: String::new(),
            tick_rate_ms: default_tick_rate_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// World bounds (cartesian)
#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_width")]
    pub width: f64,
    #[serde(default = "default_world_height")]
    pub height: f64,
}

fn default_world_width() -> f64 {
    800.0
}

fn default_world_height() -> f64 {
    600.0
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_width(),
            height: default_world_height(),
        }
    }
}

/// Mock simulation configuration (dev mode only)
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Max agents alive at once
    #[serde(default = "default_max_mock_agents")]
    pub max_mock_agents: usize,
    #[serde(default = "default_mock_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_mock_agents() -> usize {
    20
}

fn default_mock_interval_ms() -> u64 {
    500
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_mock_agents: default_max_mock_agents(),
            interval_ms: default_mock_interval_ms(),
        }
    }
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            world: WorldConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl OfficeConfig {
    /// Load from the TOML file named by PIXEL_OFFICE_CONFIG (if set), then
    /// apply environment overrides.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match std::env::var("PIXEL_OFFICE_CONFIG") {
            Ok(path) if !path.is_empty() => load_config(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Override fields from env vars. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(n) = parse_var(&lookup, "PORT") {
            self.server.port = n;
        }
        if let Some(v) = lookup("CORS_ORIGIN") {
            self.server.cors_origin = v;
        }
        if let Some(v) = lookup("PIXEL_OFFICE_API_KEY") {
            self.server.api_key = v;
        }
        if let Some(n) = parse_var(&lookup, "PIXEL_OFFICE_TICK_RATE_MS") {
            self.server.tick_rate_ms = n;
        }
        if let Some(n) = parse_var(&lookup, "PIXEL_OFFICE_MAX_BODY_BYTES") {
            self.server.max_body_bytes = n;
        }
        if let Some(n) = parse_var(&lookup, "PIXEL_OFFICE_WORLD_WIDTH") {
            self.world.width = n;
        }
        if let Some(n) = parse_var(&lookup, "PIXEL_OFFICE_WORLD_HEIGHT") {
            self.world.height = n;
        }
        if let Some(n) = parse_var(&lookup, "PIXEL_OFFICE_MAX_MOCK_AGENTS") {
            self.simulation.max_mock_agents = n;
        }
        if let Some(n) = parse_var(&lookup, "PIXEL_OFFICE_MOCK_INTERVAL_MS") {
            self.simulation.interval_ms = n;
        }
        self.sanitize_world();
    }

    /// World extents must be finite and positive; anything else falls back
    /// to the default for that axis.
    fn sanitize_world(&mut self) {
        if !(self.world.width.is_finite() && self.world.width > 0.0) {
            warn!(width = self.world.width, "Invalid world width, using default");
            self.world.width = default_world_width();
        }
        if !(self.world.height.is_finite() && self.world.height > 0.0) {
            warn!(height = self.world.height, "Invalid world height, using default");
            self.world.height = default_world_height();
        }
    }

    /// None when no API key is configured (dev mode)
    pub fn api_key(&self) -> Option<String> {
        let key = self.server.api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    pub fn bounds(&self) -> WorldBounds {
        WorldBounds::new(self.world.width, self.world.height)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.server.tick_rate_ms.max(1))
    }

    pub fn mock_interval(&self) -> Duration {
        Duration::from_millis(self.simulation.interval_ms.max(1))
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse::<T>().ok())
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<OfficeConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let mut config: OfficeConfig = toml::from_str(&contents)?;
    config.sanitize_world();
    Ok(config)
}
