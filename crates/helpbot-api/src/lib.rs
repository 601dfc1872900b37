//! JSON REST API for the help bot's store.
//!
//! Exposes an axum [`Router`] backed by any [`helpbot_core::store::ThreadStore`].
//! Operators read threads and messages through it; the answer producer posts
//! answers into it. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", helpbot_api::api_router(store.clone()))
//! ```

pub mod collections;
pub mod error;
pub mod threads;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use helpbot_core::store::ThreadStore;

pub use error::ApiError;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ThreadStore + 'static,
{
  Router::new()
    // Threads
    .route("/threads", get(threads::list::<S>))
    .route("/threads/{id}", get(threads::get_one::<S>))
    .route("/threads/{id}/messages", get(threads::messages::<S>))
    .route("/threads/{id}/answers", post(threads::post_answer::<S>))
    // Collections
    .route("/collections", get(collections::list::<S>))
    .with_state(store)
}
