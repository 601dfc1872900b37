//! The `ThreadStore` trait, the backend gateway.
//!
//! The trait is implemented by storage backends (e.g. `helpbot-store-sqlite`).
//! The engine, the JSON API and the server depend on this abstraction, not on
//! any concrete backend. Each method is one atomic operation from the
//! caller's point of view.

use std::future::Future;

use crate::{
  id::{ChannelId, MessageId},
  lifecycle::ThreadState,
  message::{ClaimedMessage, Message, NewMessage},
  thread::{NewThread, Thread, ThreadQuery},
};

/// Abstraction over the persisted thread/message store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ThreadStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Threads ───────────────────────────────────────────────────────────

  /// Persist a new thread. Fails if the thread id is already taken.
  fn insert_thread(
    &self,
    input: NewThread,
  ) -> impl Future<Output = Result<Thread, Self::Error>> + Send + '_;

  /// Look a thread up by its id. Returns `None` if not found.
  fn get_thread(
    &self,
    thread_id: ChannelId,
  ) -> impl Future<Output = Result<Option<Thread>, Self::Error>> + Send + '_;

  /// Look a thread up by the id of its controller message.
  fn get_thread_by_controller(
    &self,
    controller_id: MessageId,
  ) -> impl Future<Output = Result<Option<Thread>, Self::Error>> + Send + '_;

  /// Add the deltas to the thread's vote counters in a single backend-side
  /// increment (never a read-modify-write).
  fn update_votes(
    &self,
    thread_id: ChannelId,
    failed_delta: i64,
    solved_delta: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite the thread's `(open, solved)` flags.
  fn set_thread_state(
    &self,
    thread_id: ChannelId,
    state: ThreadState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// List threads matching `query`, newest first.
  fn list_threads<'a>(
    &'a self,
    query: &'a ThreadQuery,
  ) -> impl Future<Output = Result<Vec<Thread>, Self::Error>> + Send + 'a;

  // ── Messages ──────────────────────────────────────────────────────────

  /// Append a message to a thread's log.
  fn insert_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Atomically select every bot message with `processed = false`, mark those
  /// rows processed, and return their pre-update values joined with the
  /// owning thread's controller and author.
  ///
  /// A row returned once is never returned again, even if the caller fails
  /// to act on it.
  fn claim_unprocessed_bot_messages(
    &self,
  ) -> impl Future<Output = Result<Vec<ClaimedMessage>, Self::Error>> + Send + '_;

  /// All messages of a thread in arrival order.
  fn list_messages(
    &self,
    thread_id: ChannelId,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  // ── Collections ───────────────────────────────────────────────────────

  /// The names of all searchable document collections.
  fn list_collections(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Register a collection name; a no-op if it already exists.
  fn ensure_collection<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
