use std::sync::{
  Mutex,
  atomic::{AtomicU64, Ordering},
};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use helpbot_core::{
  id::MessageId,
  transport::{ChannelInfo, Embed, PostedMessage, TransportError},
};
use helpbot_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

const FORUM: ChannelId = ChannelId(10);
const THREAD: ChannelId = ChannelId(100);

// ─── Stub transport ──────────────────────────────────────────────────────────

/// Knows one thread in the tracked forum and accepts every write.
struct StubTransport {
  next_id:  AtomicU64,
  archived: Mutex<bool>,
}

impl StubTransport {
  fn new() -> Self { Self { next_id: AtomicU64::new(1_000), archived: Mutex::new(false) } }
}

impl Transport for StubTransport {
  fn bot_user_id(&self) -> UserId { UserId(1) }

  async fn send_embed(&self, channel: ChannelId, _: Embed) -> Result<PostedMessage, TransportError> {
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    Ok(PostedMessage { channel_id: channel, message_id: MessageId(id) })
  }

  async fn edit_embed(&self, _: ChannelId, _: MessageId, _: Embed) -> Result<(), TransportError> {
    Ok(())
  }

  async fn add_reaction(&self, _: ChannelId, _: MessageId, _: &str) -> Result<(), TransportError> {
    Ok(())
  }

  async fn channel_info(&self, channel: ChannelId) -> Result<ChannelInfo, TransportError> {
    if channel != THREAD {
      return Err(TransportError::NotFound);
    }
    Ok(ChannelInfo {
      id:        THREAD,
      name:      "How do I start?".into(),
      parent_id: Some(FORUM),
      is_thread: true,
      archived:  *self.archived.lock().unwrap(),
    })
  }

  async fn set_archived(&self, _: ChannelId, archived: bool) -> Result<(), TransportError> {
    *self.archived.lock().unwrap() = archived;
    Ok(())
  }

  async fn member_roles(&self, _: UserId) -> Result<Vec<RoleId>, TransportError> { Ok(vec![]) }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

struct TestServer {
  app:   Router,
  store: Arc<SqliteStore>,
}

async fn server() -> TestServer {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(b"secret", &salt)
    .unwrap()
    .to_string();

  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let config = EngineConfig::new(GuildId(2)).with_channel(FORUM, "docs_v3");
  let ctx = Context::new(Arc::clone(&store), Arc::new(StubTransport::new()), Arc::new(config));
  let app = router(&ctx, AuthConfig {
    username:      "relay".into(),
    password_hash: hash,
  });
  TestServer { app, store }
}

fn basic() -> String { format!("Basic {}", B64.encode("relay:secret")) }

fn post_json(uri: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header(header::AUTHORIZATION, basic())
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  (status, body)
}

fn starter_message() -> Value {
  json!({
    "channel_id": "100",
    "message_id": "100",
    "author_id": "7",
    "content": "How do I start?",
  })
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_credentials_are_rejected() {
  let server = server().await;

  let req = Request::builder()
    .method("POST")
    .uri("/events/message")
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(starter_message().to_string()))
    .unwrap();
  let resp = server.app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let req = Request::builder().uri("/api/threads").body(Body::empty()).unwrap();
  let resp = server.app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  assert!(server.store.get_thread(THREAD).await.unwrap().is_none());
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn starter_message_creates_thread() {
  let server = server().await;

  let (status, body) = call(&server.app, post_json("/events/message", starter_message())).await;
  assert_eq!(status, StatusCode::ACCEPTED);
  assert_eq!(body, json!({ "outcome": "recorded", "new_thread": true, "mentions_bot": false }));

  let thread = server.store.get_thread(THREAD).await.unwrap().unwrap();
  assert_eq!(thread.title, "How do I start?");
  assert_eq!(thread.collection, "docs_v3");
  assert!(thread.open && !thread.solved);
}

#[tokio::test]
async fn message_outside_tracked_threads_is_ignored() {
  let server = server().await;
  let (status, body) = call(
    &server.app,
    post_json("/events/message", json!({
      "channel_id": "300",
      "message_id": "301",
      "author_id": "7",
      "content": "hi",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::ACCEPTED);
  assert_eq!(body["outcome"], "ignored");
}

#[tokio::test]
async fn author_reaction_solves_thread() {
  let server = server().await;
  call(&server.app, post_json("/events/message", starter_message())).await;
  let controller = server.store.get_thread(THREAD).await.unwrap().unwrap().thread_controller_id;

  let (status, body) = call(
    &server.app,
    post_json("/events/reaction", json!({
      "channel_id": "100",
      "message_id": controller.to_string(),
      "user_id": "7",
      "emoji": "✅",
      "added": true,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "outcome": "counted", "detail": { "author_override": true } }));

  let thread = server.store.get_thread(THREAD).await.unwrap().unwrap();
  assert!(thread.solved);
  assert_eq!(thread.solved_votes, 1);
}

#[tokio::test]
async fn command_returns_reply() {
  let server = server().await;
  call(&server.app, post_json("/events/message", starter_message())).await;

  let (status, body) = call(
    &server.app,
    post_json("/commands", json!({ "channel_id": "100", "user_id": "7", "command": "status" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["ephemeral"], false);
  assert_eq!(body["embeds"][0]["title"], "How do I start?");
}

#[tokio::test]
async fn api_is_nested_behind_auth() {
  let server = server().await;
  call(&server.app, post_json("/events/message", starter_message())).await;

  let req = Request::builder()
    .uri("/api/threads/100/messages")
    .header(header::AUTHORIZATION, basic())
    .body(Body::empty())
    .unwrap();
  let (status, body) = call(&server.app, req).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["first_message"], true);
}

// ─── Configuration ───────────────────────────────────────────────────────────

fn server_config(channels: &[(&str, &str)]) -> ServerConfig {
  let mut value = json!({
    "store_path": ":memory:",
    "auth_username": "relay",
    "auth_password_hash": "x",
    "discord_token": "t",
    "guild_id": 2,
    "moderator_role_id": "99",
    "banned_users": ["13"],
    "poll_interval_ms": 250,
  });
  value["channels"] = channels
    .iter()
    .map(|(k, v)| (k.to_string(), json!(v)))
    .collect::<serde_json::Map<_, _>>()
    .into();
  serde_json::from_value(value).unwrap()
}

#[test]
fn engine_config_from_server_config() {
  let config = server_config(&[("10", "docs_v3"), ("11", " api_v1 ")]);
  assert_eq!(config.port, 8080);
  assert_eq!(config.discord_api_base, discord::DEFAULT_API_BASE);

  let engine = config.engine_config().unwrap();
  assert_eq!(engine.guild_id, GuildId(2));
  assert_eq!(engine.collection_for(ChannelId(11)), Some("api_v1"));
  assert_eq!(engine.moderator_role, Some(RoleId(99)));
  assert!(engine.is_banned(UserId(13)));
  assert_eq!(engine.poll_interval, Duration::from_millis(250));
  assert_eq!(engine.backend_timeout, Duration::from_secs(10));
}

#[test]
fn engine_config_rejects_bad_channels() {
  let bad_key = server_config(&[("forum", "docs")]);
  assert!(matches!(bad_key.engine_config(), Err(Error::Config(_))));

  let empty = server_config(&[("10", "  ")]);
  assert!(matches!(empty.engine_config(), Err(Error::Config(_))));
}
