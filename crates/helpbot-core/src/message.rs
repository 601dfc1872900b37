//! Messages: the append-only conversation log attached to a thread.
//!
//! Human messages are recorded as they arrive. Bot answers are written by an
//! out-of-band producer with `processed = false`; the dispatcher claims them
//! exactly once and posts them into the thread.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, MessageId, UserId};

/// A persisted message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  /// The platform message id for human messages; producer-chosen for answers.
  pub message_id:    String,
  pub thread_id:     ChannelId,
  pub content:       String,
  pub sources:       Option<String>,
  pub from_bot:      bool,
  pub first_message: bool,
  pub mentions_bot:  bool,
  pub processed:     bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input to [`ThreadStore::insert_message`](crate::store::ThreadStore::insert_message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
  pub message_id:    String,
  pub thread_id:     ChannelId,
  pub content:       String,
  pub sources:       Option<String>,
  pub from_bot:      bool,
  pub first_message: bool,
  pub mentions_bot:  bool,
  pub processed:     bool,
}

impl NewMessage {
  /// A message typed by a person. Needs no dispatch, so it is stored as
  /// already processed.
  pub fn human(
    thread_id: ChannelId,
    message_id: MessageId,
    content: impl Into<String>,
    first_message: bool,
    mentions_bot: bool,
  ) -> Self {
    Self {
      message_id: message_id.to_string(),
      thread_id,
      content: content.into(),
      sources: None,
      from_bot: false,
      first_message,
      mentions_bot,
      processed: true,
    }
  }

  /// An answer from the producer, waiting for the dispatcher.
  pub fn bot_answer(
    thread_id: ChannelId,
    message_id: impl Into<String>,
    content: impl Into<String>,
    sources: Option<String>,
  ) -> Self {
    Self {
      message_id: message_id.into(),
      thread_id,
      content: content.into(),
      sources,
      from_bot: true,
      first_message: false,
      mentions_bot: false,
      processed: false,
    }
  }
}

/// One row returned by the claim operation: the message as it was before it
/// was marked processed, joined with the owning thread's controller and
/// author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedMessage {
  pub message_id:           String,
  pub thread_id:            ChannelId,
  pub content:              String,
  pub sources:              Option<String>,
  pub created_at:           DateTime<Utc>,
  pub thread_controller_id: MessageId,
  pub author_id:            UserId,
}
