use super::{AgentMetrics, AgentRecord, AgentState, AgentTask, WorldBounds};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// Validation errors for agent ingestion
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    BodyNotObject,
    MissingId,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::BodyNotObject => write!(f, "request body must be a JSON object"),
            ValidationError::MissingId => write!(f, "Missing required field: id (string)"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Normalizes an untrusted JSON body into an agent record.
///
/// Rules:
/// - Required: `id` as a non-blank string (stored trimmed)
/// - `x`/`y`: numbers or numeric strings, anything else is 0; clamped into bounds
/// - `state`: unknown or missing falls back to IDLE
/// - Optional fields with the wrong shape are dropped, never rejected
pub fn normalize_agent(body: &Value, bounds: WorldBounds) -> Result<AgentRecord, ValidationError> {
    let obj = body.as_object().ok_or(ValidationError::BodyNotObject)?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingId)?;

    let state = obj
        .get("state")
        .and_then(Value::as_str)
        .and_then(AgentState::parse)
        .unwrap_or_default();

    let mut current_task = optional_record::<AgentTask>(obj, "currentTask");
    if let Some(task) = current_task.as_mut() {
        task.progress = clamp_percent(task.progress);
    }

    let mut metrics = optional_record::<AgentMetrics>(obj, "metrics");
    if let Some(metrics) = metrics.as_mut() {
        metrics.success_rate = clamp_percent(metrics.success_rate);
    }

    Ok(AgentRecord {
        id: id.to_string(),
        x: bounds.clamp_x(coerce_number(obj.get("x"))),
        y: bounds.clamp_y(coerce_number(obj.get("y"))),
        state,
        job_type: obj
            .get("jobType")
            .and_then(Value::as_str)
            .map(str::to_string),
        current_task,
        skills: string_list(obj, "skills"),
        metrics,
        connections: string_list(obj, "connections"),
    })
}

/// Numbers pass through, numeric strings are parsed, everything else is 0.
fn coerce_number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn optional_record<T: DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    obj.get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

/// Keeps arrays only; non-string elements are discarded.
fn string_list(obj: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    obj.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    })
}
