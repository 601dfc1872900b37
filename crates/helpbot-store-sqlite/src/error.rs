//! Error type for `helpbot-store-sqlite`.

use helpbot_core::id::ChannelId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] helpbot_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An update targeted a thread that does not exist.
  #[error("thread not found: {0}")]
  ThreadNotFound(ChannelId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
