//! The `Transport` trait: the chat platform as seen by the engine.
//!
//! Only the handful of capabilities the engine needs are exposed: posting and
//! editing embeds, adding reactions, reading channel metadata, toggling a
//! thread's archive flag and resolving a member's roles.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{ChannelId, MessageId, RoleId, UserId};

// ─── Embeds ──────────────────────────────────────────────────────────────────

/// An RGB embed accent colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
  pub const BLUE: Self = Self(0x3498db);
  pub const GREEN: Self = Self(0x2ecc71);
  pub const GOLD: Self = Self(0xf1c40f);
  pub const RED: Self = Self(0xe74c3c);
}

impl Default for Color {
  fn default() -> Self { Self::BLUE }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
  pub name:   String,
  pub value:  String,
  pub inline: bool,
}

/// One formatted message unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
  pub title:       String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub color:       Color,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub footer:      Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub fields:      Vec<EmbedField>,
}

impl Embed {
  pub fn new(title: impl Into<String>, color: Color) -> Self {
    Self { title: title.into(), color, ..Self::default() }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn footer(mut self, footer: impl Into<String>) -> Self {
    self.footer = Some(footer.into());
    self
  }

  pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
    self.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
    self
  }
}

// ─── Handles ─────────────────────────────────────────────────────────────────

/// A message the transport successfully posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedMessage {
  pub channel_id: ChannelId,
  pub message_id: MessageId,
}

/// What the engine needs to know about a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
  pub id:        ChannelId,
  pub name:      String,
  /// The forum (or text) channel a thread lives in.
  pub parent_id: Option<ChannelId>,
  pub is_thread: bool,
  pub archived:  bool,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
  /// The platform asked us to slow down. `retry_after` is its hint, if any.
  #[error("rate limited (retry after {retry_after:?})")]
  RateLimited { retry_after: Option<Duration> },

  #[error("not found")]
  NotFound,

  #[error("forbidden")]
  Forbidden,

  #[error("transport error: {0}")]
  Other(String),
}

impl TransportError {
  pub fn is_rate_limit(&self) -> bool { matches!(self, Self::RateLimited { .. }) }

  /// The platform's wait hint, present only on a rate limit.
  pub fn retry_after(&self) -> Option<Duration> {
    match self {
      Self::RateLimited { retry_after } => *retry_after,
      _ => None,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Capability object for the chat platform, passed to every engine component
/// at construction.
pub trait Transport: Send + Sync {
  /// The bot's own user id; events it authored are ignored.
  fn bot_user_id(&self) -> UserId;

  /// Post a single embed into `channel`.
  fn send_embed(
    &self,
    channel: ChannelId,
    embed: Embed,
  ) -> impl Future<Output = Result<PostedMessage, TransportError>> + Send + '_;

  /// Replace the embed of an existing message.
  fn edit_embed(
    &self,
    channel: ChannelId,
    message: MessageId,
    embed: Embed,
  ) -> impl Future<Output = Result<(), TransportError>> + Send + '_;

  /// React to a message as the bot.
  fn add_reaction<'a>(
    &'a self,
    channel: ChannelId,
    message: MessageId,
    emoji: &'a str,
  ) -> impl Future<Output = Result<(), TransportError>> + Send + 'a;

  /// Fetch channel metadata.
  fn channel_info(
    &self,
    channel: ChannelId,
  ) -> impl Future<Output = Result<ChannelInfo, TransportError>> + Send + '_;

  /// Archive or un-archive a thread container.
  fn set_archived(
    &self,
    channel: ChannelId,
    archived: bool,
  ) -> impl Future<Output = Result<(), TransportError>> + Send + '_;

  /// The roles `user` holds in the bot's guild.
  fn member_roles(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<RoleId>, TransportError>> + Send + '_;
}
