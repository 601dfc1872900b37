//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order is chronological. Snowflake
//! ids are stored as decimal strings.

use chrono::{DateTime, SecondsFormat, Utc};
use helpbot_core::{
  id::{ChannelId, MessageId, UserId},
  message::{ClaimedMessage, Message},
  thread::Thread,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawThread::from_row`].
pub const THREAD_COLUMNS: &str = "thread_id, thread_controller_id, title, author_id, \
   collection, open, solved, solved_votes, failed_votes, created_at, updated_at";

/// Column list matching [`RawMessage::from_row`].
pub const MESSAGE_COLUMNS: &str = "message_id, thread_id, content, sources, from_bot, \
   first_message, mentions_bot, processed, created_at, updated_at";

/// Raw values read directly from a `threads` row.
pub struct RawThread {
  pub thread_id:            String,
  pub thread_controller_id: String,
  pub title:                String,
  pub author_id:            String,
  pub collection:           String,
  pub open:                 bool,
  pub solved:               bool,
  pub solved_votes:         i64,
  pub failed_votes:         i64,
  pub created_at:           String,
  pub updated_at:           String,
}

impl RawThread {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      thread_id:            row.get(0)?,
      thread_controller_id: row.get(1)?,
      title:                row.get(2)?,
      author_id:            row.get(3)?,
      collection:           row.get(4)?,
      open:                 row.get(5)?,
      solved:               row.get(6)?,
      solved_votes:         row.get(7)?,
      failed_votes:         row.get(8)?,
      created_at:           row.get(9)?,
      updated_at:           row.get(10)?,
    })
  }

  pub fn into_thread(self) -> Result<Thread> {
    Ok(Thread {
      thread_id:            self.thread_id.parse::<ChannelId>()?,
      thread_controller_id: self.thread_controller_id.parse::<MessageId>()?,
      title:                self.title,
      author_id:            self.author_id.parse::<UserId>()?,
      collection:           self.collection,
      open:                 self.open,
      solved:               self.solved,
      solved_votes:         self.solved_votes,
      failed_votes:         self.failed_votes,
      created_at:           decode_dt(&self.created_at)?,
      updated_at:           decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `messages` row.
pub struct RawMessage {
  pub message_id:    String,
  pub thread_id:     String,
  pub content:       String,
  pub sources:       Option<String>,
  pub from_bot:      bool,
  pub first_message: bool,
  pub mentions_bot:  bool,
  pub processed:     bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawMessage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      message_id:    row.get(0)?,
      thread_id:     row.get(1)?,
      content:       row.get(2)?,
      sources:       row.get(3)?,
      from_bot:      row.get(4)?,
      first_message: row.get(5)?,
      mentions_bot:  row.get(6)?,
      processed:     row.get(7)?,
      created_at:    row.get(8)?,
      updated_at:    row.get(9)?,
    })
  }

  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      message_id:    self.message_id,
      thread_id:     self.thread_id.parse::<ChannelId>()?,
      content:       self.content,
      sources:       self.sources,
      from_bot:      self.from_bot,
      first_message: self.first_message,
      mentions_bot:  self.mentions_bot,
      processed:     self.processed,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// A pending bot message joined with its thread, as read by the claim.
pub struct RawClaimed {
  pub message_id:           String,
  pub thread_id:            String,
  pub content:              String,
  pub sources:              Option<String>,
  pub created_at:           String,
  pub thread_controller_id: String,
  pub author_id:            String,
}

impl RawClaimed {
  pub fn into_claimed(self) -> Result<ClaimedMessage> {
    Ok(ClaimedMessage {
      message_id:           self.message_id,
      thread_id:            self.thread_id.parse::<ChannelId>()?,
      content:              self.content,
      sources:              self.sources,
      created_at:           decode_dt(&self.created_at)?,
      thread_controller_id: self.thread_controller_id.parse::<MessageId>()?,
      author_id:            self.author_id.parse::<UserId>()?,
    })
  }
}
