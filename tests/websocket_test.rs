// End-to-end tests for the viewer stream: a real listener, a real WebSocket
// client, and a broadcast loop ticking on the runtime.

use futures::{SinkExt, StreamExt};
use pixel_office::agent::{AgentRecord, AgentState, WorldBounds};
use pixel_office::api::{create_app, AppState};
use pixel_office::state::{AgentRegistry, Broadcaster};
use pixel_office::subscription::ServerMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Server {
    addr: std::net::SocketAddr,
    registry: Arc<AgentRegistry>,
    broadcaster: Arc<Broadcaster>,
}

async fn start_server() -> Server {
    let registry = Arc::new(AgentRegistry::new());
    let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));
    let state = AppState::new(
        Arc::clone(&broadcaster),
        WorldBounds::new(800.0, 600.0),
        Some("secret".to_string()),
    );
    let app = create_app(state, "*", 1024 * 1024);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        addr,
        registry,
        broadcaster,
    }
}

async fn connect(server: &Server) -> Client {
    let (ws, _) = connect_async(format!("ws://{}/ws", server.addr)).await.unwrap();
    ws
}

async fn next_message(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn agent(id: &str, x: f64) -> AgentRecord {
    AgentRecord::new(id, x, 5.0, AgentState::Working)
}

#[tokio::test]
async fn test_snapshot_sent_on_connect() {
    let server = start_server().await;
    server.registry.upsert(agent("a1", 1.0));
    server.broadcaster.tick();

    let mut ws = connect(&server).await;

    match next_message(&mut ws).await {
        ServerMessage::WorldState(state) => {
            assert_eq!(state.agents, vec![agent("a1", 1.0)]);
            assert_eq!(state.tick, 1);
        }
        other => panic!("expected world state, got {:?}", other),
    }
}

#[tokio::test]
async fn test_updates_and_removals_forwarded() {
    let server = start_server().await;
    server.registry.upsert(agent("a1", 1.0));
    server.registry.upsert(agent("a2", 1.0));
    server.broadcaster.tick();

    let mut ws = connect(&server).await;
    assert!(matches!(next_message(&mut ws).await, ServerMessage::WorldState(_)));

    // Two upserts of the same id plus a removal, all within one tick
    server.registry.upsert(agent("a1", 10.0));
    server.registry.upsert(agent("a1", 20.0));
    server.registry.remove("a2");
    server.broadcaster.tick();

    assert_eq!(
        next_message(&mut ws).await,
        ServerMessage::AgentUpdate(vec![agent("a1", 20.0)])
    );
    assert_eq!(
        next_message(&mut ws).await,
        ServerMessage::AgentRemove { id: "a2".to_string() }
    );
}

#[tokio::test]
async fn test_join_room_keeps_connection_alive() {
    let server = start_server().await;
    let mut ws = connect(&server).await;
    assert!(matches!(next_message(&mut ws).await, ServerMessage::WorldState(_)));

    ws.send(Message::Text(
        r#"{"event":"client:join:room","data":{"room":"lobby"}}"#.to_string(),
    ))
    .await
    .unwrap();
    ws.send(Message::Text(format!(
        r#"{{"event":"client:join:room","data":{{"room":"{}"}}}}"#,
        "r".repeat(100)
    )))
    .await
    .unwrap();
    ws.send(Message::Text("garbage".to_string())).await.unwrap();

    server.registry.upsert(agent("a9", 3.0));
    server.broadcaster.tick();

    assert_eq!(
        next_message(&mut ws).await,
        ServerMessage::AgentUpdate(vec![agent("a9", 3.0)])
    );
}

#[tokio::test]
async fn test_disconnect_leaves_registry_untouched() {
    let server = start_server().await;
    server.registry.upsert(agent("a1", 1.0));

    let mut ws = connect(&server).await;
    assert!(matches!(next_message(&mut ws).await, ServerMessage::WorldState(_)));
    ws.close(None).await.unwrap();
    drop(ws);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.registry.count(), 1);
}
