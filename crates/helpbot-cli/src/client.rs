//! Async HTTP client wrapping the helpbot JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use helpbot_core::{id::ChannelId, message::Message, thread::Thread};
use reqwest::{Client, Response};
use serde::{Serialize, de::DeserializeOwned};

/// Connection settings for the helpbot API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Filters for `GET /api/threads`.
#[derive(Debug, Clone, Default)]
pub struct ThreadFilter {
  pub open:       Option<bool>,
  pub solved:     Option<bool>,
  pub collection: Option<String>,
  pub limit:      Option<usize>,
}

impl ThreadFilter {
  fn pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(open) = self.open {
      pairs.push(("open", open.to_string()));
    }
    if let Some(solved) = self.solved {
      pairs.push(("solved", solved.to_string()));
    }
    if let Some(collection) = &self.collection {
      pairs.push(("collection", collection.clone()));
    }
    if let Some(limit) = self.limit {
      pairs.push(("limit", limit.to_string()));
    }
    pairs
  }
}

/// Body of `POST /api/threads/{id}/answers`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAnswer {
  pub content:    String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sources:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message_id: Option<String>,
}

/// Async HTTP client for the helpbot JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Fail with the server's `{"error": …}` message on a non-2xx status.
  async fn decode<R: DeserializeOwned>(resp: Response, what: &str) -> Result<R> {
    let status = resp.status();
    if !status.is_success() {
      let detail = resp
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_owned))
        .unwrap_or_default();
      return Err(anyhow!("{what} → {status} {detail}"));
    }
    resp.json().await.with_context(|| format!("deserialising {what}"))
  }

  // ── Threads ───────────────────────────────────────────────────────────────

  /// `GET /api/threads`
  pub async fn list_threads(&self, filter: &ThreadFilter) -> Result<Vec<Thread>> {
    let resp = self
      .auth(self.client.get(self.url("/threads")))
      .query(&filter.pairs())
      .send()
      .await
      .context("GET /threads failed")?;
    Self::decode(resp, "GET /threads").await
  }

  /// `GET /api/threads/{id}`
  pub async fn get_thread(&self, id: ChannelId) -> Result<Thread> {
    let path = format!("/threads/{id}");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    Self::decode(resp, &format!("GET {path}")).await
  }

  /// `GET /api/threads/{id}/messages`
  pub async fn list_messages(&self, id: ChannelId) -> Result<Vec<Message>> {
    let path = format!("/threads/{id}/messages");
    let resp = self
      .auth(self.client.get(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    Self::decode(resp, &format!("GET {path}")).await
  }

  /// `POST /api/threads/{id}/answers`
  pub async fn post_answer(&self, id: ChannelId, answer: &NewAnswer) -> Result<Message> {
    let path = format!("/threads/{id}/answers");
    let resp = self
      .auth(self.client.post(self.url(&path)))
      .json(answer)
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    Self::decode(resp, &format!("POST {path}")).await
  }

  // ── Collections ───────────────────────────────────────────────────────────

  /// `GET /api/collections`
  pub async fn list_collections(&self) -> Result<Vec<String>> {
    let resp = self
      .auth(self.client.get(self.url("/collections")))
      .send()
      .await
      .context("GET /collections failed")?;
    Self::decode(resp, "GET /collections").await
  }
}
