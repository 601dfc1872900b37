//! Error types for `helpbot-core`.

use thiserror::Error;

use crate::id::ChannelId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid snowflake id: {0:?}")]
  InvalidId(String),

  #[error("unknown lifecycle command: {0:?}")]
  UnknownCommand(String),

  #[error("thread not found: {0}")]
  ThreadNotFound(ChannelId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
