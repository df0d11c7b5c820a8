// REST client tests against a mockito server

use mockito::{Matcher, Server};
use office_viewer::api_client::ApiClient;
use pixel_office::agent::AgentState;
use serde_json::json;

#[tokio::test]
async fn test_list_agents() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/agents")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "agents": [
                    {"id": "a1", "x": 10.0, "y": 20.0, "state": "WORKING", "jobType": "developer"},
                    {"id": "a2", "x": 0.0, "y": 0.0, "state": "IDLE"}
                ],
                "count": 2
            }"#,
        )
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let list = client.list_agents().await.unwrap();

    assert_eq!(list.count, 2);
    assert_eq!(list.agents[0].state, AgentState::Working);
    assert_eq!(list.agents[0].job_type.as_deref(), Some("developer"));
    assert_eq!(list.agents[1].id, "a2");
}

#[tokio::test]
async fn test_create_sends_bearer_and_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/agents")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({"id": "a1", "x": 900})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "a1", "x": 800.0, "y": 0.0, "state": "IDLE"}"#)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), Some("secret".to_string())).unwrap();
    let stored = client
        .create_agent(&json!({"id": "a1", "x": 900, "y": -10, "state": "BOGUS"}))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(stored.x, 800.0);
    assert_eq!(stored.state, AgentState::Idle);
}

#[tokio::test]
async fn test_get_and_delete_encode_id() {
    let mut server = Server::new_async().await;
    let _get = server
        .mock("GET", "/api/agents/dev%201")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "dev 1", "x": 1.0, "y": 2.0, "state": "MOVING"}"#)
        .create_async()
        .await;
    let _delete = server
        .mock("DELETE", "/api/agents/dev%201")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"deleted": "dev 1"}"#)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();

    let agent = client.get_agent("dev 1").await.unwrap();
    assert_eq!(agent.state, AgentState::Moving);
    assert_eq!(client.delete_agent("dev 1").await.unwrap(), "dev 1");
}

#[tokio::test]
async fn test_server_error_message_surfaces() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/agents")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Missing required field: id (string)"}"#)
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), None).unwrap();
    let err = client.create_agent(&json!({"x": 1})).await.unwrap_err();

    assert_eq!(err.to_string(), "Missing required field: id (string)");
}

#[tokio::test]
async fn test_unauthorized_and_not_found() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("GET", "/api/agents")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Invalid or missing API key"}"#)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/api/agents/ghost")
        .with_status(404)
        .with_body("")
        .create_async()
        .await;

    let client = ApiClient::new(&server.url(), Some("wrong".to_string())).unwrap();

    let err = client.list_agents().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid or missing API key");

    let err = client.get_agent("ghost").await.unwrap_err();
    assert!(err.to_string().contains("404"));
}
