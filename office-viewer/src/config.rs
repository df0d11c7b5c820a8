use crate::fallback::{RECONNECT_GRACE, STARTUP_GRACE};
use std::time::Duration;

const DEFAULT_SERVER_URL: &str = "http://localhost:3001";
const DEFAULT_STATUS_INTERVAL_MS: u64 = 5_000;

/// Viewer settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// HTTP base URL of the office server
    pub server_url: String,
    pub api_key: Option<String>,
    pub room: Option<String>,
    pub startup_grace: Duration,
    pub reconnect_grace: Duration,
    pub status_interval: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_key: None,
            room: None,
            startup_grace: STARTUP_GRACE,
            reconnect_grace: RECONNECT_GRACE,
            status_interval: Duration::from_millis(DEFAULT_STATUS_INTERVAL_MS),
        }
    }
}

impl ViewerConfig {
    /// Defaults overridden by environment variables. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = non_blank(lookup("PIXEL_OFFICE_SERVER_URL")) {
            config.server_url = url;
        }
        config.api_key = non_blank(lookup("PIXEL_OFFICE_API_KEY"));
        config.room = non_blank(lookup("PIXEL_OFFICE_ROOM"));
        if let Some(ms) = millis(&lookup, "PIXEL_OFFICE_STARTUP_GRACE_MS") {
            config.startup_grace = ms;
        }
        if let Some(ms) = millis(&lookup, "PIXEL_OFFICE_RECONNECT_GRACE_MS") {
            config.reconnect_grace = ms;
        }
        if let Some(ms) = millis(&lookup, "PIXEL_OFFICE_STATUS_INTERVAL_MS") {
            config.status_interval = ms.max(Duration::from_millis(1));
        }
        config
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> ViewerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ViewerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_map(&[]);
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.server_url, "http://localhost:3001");
        assert_eq!(config.startup_grace, Duration::from_secs(2));
        assert_eq!(config.reconnect_grace, Duration::from_secs(3));
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("PIXEL_OFFICE_SERVER_URL", "http://office:9000"),
            ("PIXEL_OFFICE_API_KEY", "secret"),
            ("PIXEL_OFFICE_ROOM", "floor-2"),
            ("PIXEL_OFFICE_STARTUP_GRACE_MS", "500"),
            ("PIXEL_OFFICE_RECONNECT_GRACE_MS", "bogus"),
        ]);

        assert_eq!(config.server_url, "http://office:9000");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.room.as_deref(), Some("floor-2"));
        assert_eq!(config.startup_grace, Duration::from_millis(500));
        assert_eq!(config.reconnect_grace, RECONNECT_GRACE);
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = from_map(&[("PIXEL_OFFICE_SERVER_URL", " "), ("PIXEL_OFFICE_API_KEY", "")]);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(config.api_key.is_none());
    }
}
