//! Thread, the unit of work.
//!
//! A thread is created once, when its starter message arrives, and is never
//! deleted. Only its lifecycle flags and vote counters change afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  id::{ChannelId, MessageId, UserId},
  lifecycle::ThreadState,
};

/// A persisted help thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
  pub thread_id:            ChannelId,
  /// The bot-authored status message inside the thread. Set once at
  /// creation; reactions on this message are the votes.
  pub thread_controller_id: MessageId,
  pub title:                String,
  pub author_id:            UserId,
  /// The document collection the thread's forum channel maps to.
  pub collection:           String,
  pub open:                 bool,
  pub solved:               bool,
  pub solved_votes:         i64,
  pub failed_votes:         i64,
  pub created_at:           DateTime<Utc>,
  pub updated_at:           DateTime<Utc>,
}

impl Thread {
  pub fn state(&self) -> ThreadState {
    ThreadState { open: self.open, solved: self.solved }
  }
}

/// Input to [`ThreadStore::insert_thread`](crate::store::ThreadStore::insert_thread).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
  pub thread_id:            ChannelId,
  pub thread_controller_id: MessageId,
  pub title:                String,
  pub author_id:            UserId,
  pub collection:           String,
  pub state:                ThreadState,
}

impl NewThread {
  /// A thread in the initial open, unsolved state.
  pub fn new(
    thread_id: ChannelId,
    thread_controller_id: MessageId,
    title: impl Into<String>,
    author_id: UserId,
    collection: impl Into<String>,
  ) -> Self {
    Self {
      thread_id,
      thread_controller_id,
      title: title.into(),
      author_id,
      collection: collection.into(),
      state: ThreadState::INITIAL,
    }
  }
}

/// Filters for [`ThreadStore::list_threads`](crate::store::ThreadStore::list_threads).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadQuery {
  pub open:       Option<bool>,
  pub solved:     Option<bool>,
  pub collection: Option<String>,
  pub limit:      Option<usize>,
  pub offset:     Option<usize>,
}
