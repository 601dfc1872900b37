//! `GET /collections`: the searchable document collections.

use std::sync::Arc;

use axum::{Json, extract::State};
use helpbot_core::store::ThreadStore;

use crate::error::ApiError;

pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<String>>, ApiError>
where
  S: ThreadStore,
{
  let names = store.list_collections().await.map_err(ApiError::store)?;
  Ok(Json(names))
}
