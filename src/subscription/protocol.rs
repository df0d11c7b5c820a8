use crate::agent::{AgentRecord, WorldState};
use serde::{Deserialize, Serialize};

/// Longest room name a client may join
pub const MAX_ROOM_NAME_LEN: usize = 64;

/// Server → Client messages.
///
/// Framed as JSON text: `{"event": "<name>", "data": <payload>}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Full world snapshot, sent once on connect
    #[serde(rename = "server:world:state")]
    WorldState(WorldState),

    /// Batch update of all agents
    #[serde(rename = "server:agent:update")]
    AgentUpdate(Vec<AgentRecord>),

    /// A single agent was removed
    #[serde(rename = "server:agent:remove")]
    AgentRemove { id: String },
}

/// Client → Server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "client:join:room")]
    JoinRoom { room: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::WorldState(_) => "server:world:state",
            ServerMessage::AgentUpdate(_) => "server:agent:update",
            ServerMessage::AgentRemove { .. } => "server:agent:remove",
        }
    }
}
