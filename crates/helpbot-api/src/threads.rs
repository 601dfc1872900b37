//! Handlers for `/threads` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/threads` | Optional `?open=&solved=&collection=&limit=&offset=` |
//! | `GET`  | `/threads/:id` | 404 if not found |
//! | `GET`  | `/threads/:id/messages` | Arrival order; 404 if the thread is unknown |
//! | `POST` | `/threads/:id/answers` | Body: `{"content":"…","sources":"…","message_id":"…"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use helpbot_core::{
  id::ChannelId,
  message::{Message, NewMessage},
  store::ThreadStore,
  thread::{Thread, ThreadQuery},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

fn parse_id(raw: &str) -> Result<ChannelId, ApiError> {
  raw
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("invalid thread id {raw:?}")))
}

async fn require_thread<S>(store: &S, id: ChannelId) -> Result<Thread, ApiError>
where
  S: ThreadStore,
{
  store
    .get_thread(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("thread {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /threads[?open=<bool>&solved=<bool>&collection=<name>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(query): Query<ThreadQuery>,
) -> Result<Json<Vec<Thread>>, ApiError>
where
  S: ThreadStore,
{
  let threads = store.list_threads(&query).await.map_err(ApiError::store)?;
  Ok(Json(threads))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /threads/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Thread>, ApiError>
where
  S: ThreadStore,
{
  let id = parse_id(&id)?;
  Ok(Json(require_thread(store.as_ref(), id).await?))
}

// ─── Messages ─────────────────────────────────────────────────────────────────

/// `GET /threads/:id/messages`
pub async fn messages<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError>
where
  S: ThreadStore,
{
  let id = parse_id(&id)?;
  require_thread(store.as_ref(), id).await?;
  let messages = store.list_messages(id).await.map_err(ApiError::store)?;
  Ok(Json(messages))
}

// ─── Answers ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnswerBody {
  pub content:    String,
  #[serde(default)]
  pub sources:    Option<String>,
  /// Defaults to a fresh UUID.
  #[serde(default)]
  pub message_id: Option<String>,
}

/// `POST /threads/:id/answers`
///
/// Stores a producer answer as an unprocessed bot message; the dispatcher
/// posts it on its next tick.
pub async fn post_answer<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ThreadStore,
{
  let id = parse_id(&id)?;
  if body.content.trim().is_empty() {
    return Err(ApiError::BadRequest("answer content is empty".into()));
  }
  require_thread(store.as_ref(), id).await?;

  let message_id = body
    .message_id
    .filter(|m| !m.trim().is_empty())
    .unwrap_or_else(|| Uuid::new_v4().to_string());
  let message = store
    .insert_message(NewMessage::bot_answer(id, message_id, body.content, body.sources))
    .await
    .map_err(ApiError::store)?;

  info!(thread = %id, message = %message.message_id, "answer queued");
  Ok((StatusCode::CREATED, Json(message)))
}
