//! WebSocket transport to the office server.
//!
//! Decoded server frames are published onto the [`NetEvents`] bus. The
//! connection is retried forever with a fixed delay.

use crate::bus::NetEvents;
use anyhow::{bail, Result};
use futures::{SinkExt, StreamExt};
use pixel_office::subscription::{ClientMessage, ServerMessage, MAX_ROOM_NAME_LEN};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Turn an HTTP base URL into the server's WebSocket endpoint.
pub fn websocket_url(server_url: &str) -> String {
    let base = server_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/ws", base)
}

/// Publish one server frame onto the bus. Returns false for frames that do
/// not decode.
pub fn dispatch(bus: &NetEvents, text: &str) -> bool {
    let msg: ServerMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed server frame");
            return false;
        }
    };

    debug!(event = msg.event_name(), "Server event");
    match msg {
        ServerMessage::WorldState(state) => {
            bus.world_state.publish(&state);
        }
        ServerMessage::AgentUpdate(agents) => {
            bus.agent_update.publish(&agents);
        }
        ServerMessage::AgentRemove { id } => {
            bus.agent_remove.publish(&id);
        }
    }
    true
}

pub struct NetworkClient {
    url: String,
    bus: Arc<NetEvents>,
    reconnect_delay: Duration,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbox: Mutex<Option<mpsc::UnboundedReceiver<ClientMessage>>>,
}

impl NetworkClient {
    pub fn new(server_url: &str, bus: Arc<NetEvents>) -> Self {
        let (outbound, inbox) = mpsc::unbounded_channel();
        Self {
            url: websocket_url(server_url),
            bus,
            reconnect_delay: RECONNECT_DELAY,
            outbound,
            inbox: Mutex::new(Some(inbox)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Start the connect/reconnect loop. Only the first call spawns anything.
    pub fn spawn(&self) -> Option<JoinHandle<()>> {
        let inbox = self.inbox.lock().expect("network lock poisoned").take()?;
        let url = self.url.clone();
        let bus = Arc::clone(&self.bus);
        let delay = self.reconnect_delay;
        Some(tokio::spawn(run(url, bus, inbox, delay)))
    }

    /// Queue a room join. Sent immediately when connected, otherwise once the
    /// next connection is up.
    pub fn join_room(&self, room: impl Into<String>) -> Result<()> {
        let room = room.into();
        if room.chars().count() > MAX_ROOM_NAME_LEN {
            bail!("room name longer than {} characters", MAX_ROOM_NAME_LEN);
        }
        if self.outbound.send(ClientMessage::JoinRoom { room }).is_err() {
            bail!("network client is shut down");
        }
        Ok(())
    }
}

async fn run(
    url: String,
    bus: Arc<NetEvents>,
    mut inbox: mpsc::UnboundedReceiver<ClientMessage>,
    delay: Duration,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                info!(url = %url, "Connected to server");
                bus.mark_connected();
                let reason = session(socket, &bus, &mut inbox).await;
                info!(reason = %reason, "Disconnected from server");
                bus.mark_disconnected(reason);
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Connect failed");
            }
        }
        tokio::time::sleep(delay).await;
    }
}

/// Pump one live connection until it ends. Returns the disconnect reason.
async fn session(
    mut socket: Socket,
    bus: &NetEvents,
    inbox: &mut mpsc::UnboundedReceiver<ClientMessage>,
) -> String {
    loop {
        tokio::select! {
            frame = socket.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(bus, &text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return "failed to answer ping".to_string();
                        }
                    }
                    Some(Ok(Message::Close(_))) => return "server closed connection".to_string(),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return format!("transport error: {}", e),
                    None => return "stream ended".to_string(),
                }
            }
            Some(msg) = inbox.recv() => {
                let text = match serde_json::to_string(&msg) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode client message");
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(text)).await {
                    return format!("send failed: {}", e);
                }
            }
        }
    }
}
