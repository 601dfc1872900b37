//! Immutable engine configuration, loaded once at startup.

use std::{
  collections::{HashMap, HashSet},
  time::Duration,
};

use helpbot_core::id::{ChannelId, GuildId, RoleId, UserId};

// ─── Delivery ────────────────────────────────────────────────────────────────

/// Limits for posting a single formatted unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
  /// Maximum characters per unit (the platform's embed description limit).
  pub max_unit_len: usize,
  /// Attempts per unit while the platform keeps rate limiting.
  pub max_attempts: u32,
  /// First backoff delay; doubled on every further attempt.
  pub base_delay:   Duration,
}

impl DeliveryPolicy {
  /// The delay before retry number `attempt + 1`.
  ///
  /// `base_delay * 2^attempt`, unless the platform's `retry_after` hint asks
  /// for longer.
  pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let exponential = self.base_delay.saturating_mul(1u32 << attempt.min(16));
    retry_after.map_or(exponential, |hint| hint.max(exponential))
  }
}

impl Default for DeliveryPolicy {
  fn default() -> Self {
    Self {
      max_unit_len: 4096,
      max_attempts: 5,
      base_delay:   Duration::from_secs(1),
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub guild_id:        GuildId,
  /// Tracked forum channels and the document collection each one serves.
  pub channels:        HashMap<ChannelId, String>,
  /// Members holding this role may run lifecycle commands on any thread.
  pub moderator_role:  Option<RoleId>,
  /// Users whose messages are never recorded.
  pub banned_users:    HashSet<UserId>,
  /// Channel receiving operational log lines, if any.
  pub log_channel:     Option<ChannelId>,
  pub poll_interval:   Duration,
  /// Upper bound on every backend call; a timeout counts as a failure.
  pub backend_timeout: Duration,
  pub delivery:        DeliveryPolicy,
  /// Link to the bot's source code, shown in the help banner and `/info`.
  pub source_link:     Option<String>,
}

impl EngineConfig {
  pub fn new(guild_id: GuildId) -> Self {
    Self {
      guild_id,
      channels: HashMap::new(),
      moderator_role: None,
      banned_users: HashSet::new(),
      log_channel: None,
      poll_interval: Duration::from_secs(1),
      backend_timeout: Duration::from_secs(10),
      delivery: DeliveryPolicy::default(),
      source_link: None,
    }
  }

  /// Track `forum` and route its threads to `collection`.
  pub fn with_channel(mut self, forum: ChannelId, collection: impl Into<String>) -> Self {
    self.channels.insert(forum, collection.into());
    self
  }

  /// The collection served by `forum`, if it is tracked.
  pub fn collection_for(&self, forum: ChannelId) -> Option<&str> {
    self.channels.get(&forum).map(String::as_str)
  }

  pub fn is_banned(&self, user: UserId) -> bool { self.banned_users.contains(&user) }

  /// Tracked forum channels in ascending id order.
  pub fn tracked_channels(&self) -> Vec<ChannelId> {
    let mut ids: Vec<_> = self.channels.keys().copied().collect();
    ids.sort();
    ids
  }
}
