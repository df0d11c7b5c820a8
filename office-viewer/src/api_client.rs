//! HTTP client for the office server's agent REST API.

use anyhow::{anyhow, Context, Result};
use pixel_office::agent::AgentRecord;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Response body of `GET /api/agents`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentList {
    pub agents: Vec<AgentRecord>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct DeletedBody {
    deleted: String,
}

/// Talks to `/api/agents`, optionally with a bearer API key.
pub struct ApiClient {
    http_client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(server_url: &str, api_key: Option<String>) -> Result<Self> {
        let base_url = Url::parse(server_url)
            .with_context(|| format!("Invalid server URL: {}", server_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Server URL cannot be a base: {}", server_url));
        }
        let http_client = Client::builder()
            .user_agent("office-viewer/0.1")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
    }

    pub async fn list_agents(&self) -> Result<AgentList> {
        let response = self
            .request(reqwest::Method::GET, self.url(&[]))
            .send()
            .await
            .context("Failed to send list_agents request")?;
        parse(response).await
    }

    pub async fn get_agent(&self, id: &str) -> Result<AgentRecord> {
        let response = self
            .request(reqwest::Method::GET, self.url(&[id]))
            .send()
            .await
            .context("Failed to send get_agent request")?;
        parse(response).await
    }

    /// Upsert an agent. The server normalizes the body and returns the stored record.
    pub async fn create_agent<T: Serialize + ?Sized>(&self, agent: &T) -> Result<AgentRecord> {
        let response = self
            .request(reqwest::Method::POST, self.url(&[]))
            .json(agent)
            .send()
            .await
            .context("Failed to send create_agent request")?;
        parse(response).await
    }

    /// Returns the id the server reports as deleted.
    pub async fn delete_agent(&self, id: &str) -> Result<String> {
        let response = self
            .request(reqwest::Method::DELETE, self.url(&[id]))
            .send()
            .await
            .context("Failed to send delete_agent request")?;
        let body: DeletedBody = parse(response).await?;
        Ok(body.deleted)
    }

    /// `<base>/api/agents[/<segment>...]` with each segment percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["api", "agents"]).extend(segments);
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http_client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// Decode a success body, or turn the server's `{"error": ...}` into an error.
async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => format!("API error {}", status),
        };
        return Err(anyhow!(message));
    }

    response
        .json::<T>()
        .await
        .context("Failed to parse API response")
}
