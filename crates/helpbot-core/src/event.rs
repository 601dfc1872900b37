//! Inbound platform events, as forwarded by the gateway relay.

use serde::{Deserialize, Serialize};

use crate::id::{ChannelId, MessageId, UserId};

/// A message posted in any channel the bot can see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
  pub channel_id: ChannelId,
  pub message_id: MessageId,
  pub author_id:  UserId,
  #[serde(default)]
  pub content:    String,
  /// Users mentioned in the message.
  #[serde(default)]
  pub mentions:   Vec<UserId>,
}

impl InboundMessage {
  /// A thread's id equals the id of the message that started it.
  pub fn starts_thread(&self) -> bool { self.message_id.as_thread() == self.channel_id }

  pub fn mentions_user(&self, user: UserId) -> bool { self.mentions.contains(&user) }
}

/// A reaction added to or removed from a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
  pub channel_id: ChannelId,
  pub message_id: MessageId,
  pub user_id:    UserId,
  pub emoji:      String,
  /// `true` for an add, `false` for a removal.
  pub added:      bool,
}

impl ReactionEvent {
  /// The signed vote delta this event carries.
  pub fn delta(&self) -> i64 { if self.added { 1 } else { -1 } }
}

/// A slash command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInvocation {
  pub channel_id: ChannelId,
  pub user_id:    UserId,
  /// The command name without the leading slash, e.g. `solve`.
  pub command:    String,
}
