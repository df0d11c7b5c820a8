use crate::state::{AgentBroadcast, Broadcaster};
use crate::subscription::protocol::{ClientMessage, ServerMessage, MAX_ROOM_NAME_LEN};
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Manages a single viewer connection.
///
/// Agents are not owned by connections: nothing here mutates the registry.
pub struct ConnectionSession {
    id: Uuid,
    /// Rooms this connection joined. Scoping only, no routing effect yet.
    rooms: HashSet<String>,
}

impl ConnectionSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            rooms: HashSet::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn rooms(&self) -> &HashSet<String> {
        &self.rooms
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(mut self, mut socket: WebSocket, broadcaster: Arc<Broadcaster>) {
        // Subscribe before snapshotting so no broadcast falls between the two
        let mut updates = broadcaster.subscribe();
        let snapshot = ServerMessage::WorldState(broadcaster.snapshot());

        info!(
            connection_id = %self.id,
            agents = broadcaster.registry().count(),
            "Viewer connected"
        );

        if let Err(e) = send(&mut socket, &snapshot).await {
            error!(connection_id = %self.id, error = %e, "Failed to send world snapshot");
            return;
        }

        loop {
            tokio::select! {
                Some(msg) = socket.recv() => {
                    match msg {
                        Ok(Message::Text(text)) => self.handle_client_message(&text),
                        Ok(Message::Close(_)) => break,
                        Ok(Message::Ping(data)) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(connection_id = %self.id, error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Ok(_) => {
                            // Ignore binary, pong messages
                        }
                        Err(e) => {
                            warn!(connection_id = %self.id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                result = updates.recv() => {
                    let Some(frames) = self.outgoing(result, &broadcaster) else {
                        break;
                    };
                    if let Err(e) = send_all(&mut socket, &frames).await {
                        error!(connection_id = %self.id, error = %e, "Failed to send agent update");
                        break;
                    }
                }

                else => {
                    break;
                }
            }
        }

        info!(connection_id = %self.id, "Viewer disconnected");
    }

    /// Handle an inbound control frame. Malformed frames are logged and ignored.
    pub fn handle_client_message(&mut self, text: &str) {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(connection_id = %self.id, error = %e, "Ignoring malformed client message");
                return;
            }
        };

        match msg {
            ClientMessage::JoinRoom { room } => {
                self.join_room(room);
            }
        }
    }

    /// Join a room. Names longer than 64 characters are ignored.
    pub fn join_room(&mut self, room: String) -> bool {
        if room.chars().count() > MAX_ROOM_NAME_LEN {
            warn!(connection_id = %self.id, len = room.chars().count(), "Room name too long, ignoring join");
            return false;
        }
        info!(connection_id = %self.id, room = %room, "Viewer joined room");
        self.rooms.insert(room);
        true
    }

    /// Frames to send for one broadcast receive. None ends the session.
    ///
    /// A lagged receiver may have missed removal frames, which later
    /// broadcasts never repeat, so it is resynced with a full snapshot.
    pub(crate) fn outgoing(
        &self,
        result: Result<AgentBroadcast, broadcast::error::RecvError>,
        broadcaster: &Broadcaster,
    ) -> Option<Vec<ServerMessage>> {
        match result {
            Ok(update) => Some(Self::frames(update)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(connection_id = %self.id, skipped = skipped, "Viewer lagged, resending world snapshot");
                Some(vec![ServerMessage::WorldState(broadcaster.snapshot())])
            }
            Err(broadcast::error::RecvError::Closed) => {
                error!(connection_id = %self.id, "Broadcast channel closed");
                None
            }
        }
    }

    /// One update frame, then one removal frame per removed id
    pub(crate) fn frames(update: AgentBroadcast) -> Vec<ServerMessage> {
        let mut frames = Vec::with_capacity(1 + update.removed.len());
        frames.push(ServerMessage::AgentUpdate(update.agents));
        frames.extend(
            update
                .removed
                .into_iter()
                .map(|id| ServerMessage::AgentRemove { id }),
        );
        frames
    }
}

impl Default for ConnectionSession {
    fn default() -> Self {
        Self::new()
    }
}

async fn send(socket: &mut WebSocket, msg: &ServerMessage) -> anyhow::Result<()> {
    let json = msg.to_json()?;
    socket.send(Message::Text(json)).await?;
    Ok(())
}

async fn send_all(socket: &mut WebSocket, frames: &[ServerMessage]) -> anyhow::Result<()> {
    for msg in frames {
        send(socket, msg).await?;
    }
    Ok(())
}
