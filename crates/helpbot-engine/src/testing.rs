//! A recording in-memory transport, a store that is down, and a harness
//! wiring the transport to an in-memory store.

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Arc, Mutex,
    atomic::{AtomicU64, AtomicUsize, Ordering},
  },
  time::Duration,
};

use helpbot_core::{
  id::{ChannelId, GuildId, MessageId, RoleId, UserId},
  lifecycle::ThreadState,
  message::{ClaimedMessage, Message, NewMessage},
  store::ThreadStore,
  thread::{NewThread, Thread, ThreadQuery},
  transport::{ChannelInfo, Embed, PostedMessage, Transport, TransportError},
};
use helpbot_store_sqlite::SqliteStore;

use crate::{
  config::{DeliveryPolicy, EngineConfig},
  context::Context,
  lifecycle::Lifecycle,
};

pub const BOT: UserId = UserId(1);
pub const AUTHOR: UserId = UserId(7);
pub const GUILD: GuildId = GuildId(2);
pub const FORUM: ChannelId = ChannelId(10);
pub const OTHER_FORUM: ChannelId = ChannelId(11);
pub const MODERATOR_ROLE: RoleId = RoleId(99);
pub const COLLECTION: &str = "docs_v3";

// ─── Fake transport ──────────────────────────────────────────────────────────

/// A side effect the engine asked the transport for.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  Send { channel: ChannelId, message: MessageId, embed: Embed },
  Edit { channel: ChannelId, message: MessageId, embed: Embed },
  React { channel: ChannelId, message: MessageId, emoji: String },
  SetArchived { channel: ChannelId, archived: bool },
}

pub struct FakeTransport {
  next_id:       AtomicU64,
  send_attempts: AtomicUsize,
  calls:         Mutex<Vec<Call>>,
  channels:      Mutex<HashMap<ChannelId, ChannelInfo>>,
  roles:         Mutex<HashMap<UserId, Vec<RoleId>>>,
  send_failures: Mutex<VecDeque<TransportError>>,
  edit_failures: Mutex<VecDeque<TransportError>>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self {
      next_id:       AtomicU64::new(10_000),
      send_attempts: AtomicUsize::new(0),
      calls:         Mutex::default(),
      channels:      Mutex::default(),
      roles:         Mutex::default(),
      send_failures: Mutex::default(),
      edit_failures: Mutex::default(),
    }
  }

  pub fn add_channel(&self, info: ChannelInfo) {
    self.channels.lock().unwrap().insert(info.id, info);
  }

  pub fn add_thread(&self, id: ChannelId, parent: ChannelId, archived: bool) {
    self.add_channel(ChannelInfo {
      id,
      name: format!("thread {id}"),
      parent_id: Some(parent),
      is_thread: true,
      archived,
    });
  }

  pub fn set_roles(&self, user: UserId, roles: impl IntoIterator<Item = RoleId>) {
    self.roles.lock().unwrap().insert(user, roles.into_iter().collect());
  }

  /// Fail the next sends with these errors, in order.
  pub fn fail_sends(&self, errors: impl IntoIterator<Item = TransportError>) {
    self.send_failures.lock().unwrap().extend(errors);
  }

  pub fn fail_edits(&self, errors: impl IntoIterator<Item = TransportError>) {
    self.edit_failures.lock().unwrap().extend(errors);
  }

  pub fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }

  pub fn clear(&self) { self.calls.lock().unwrap().clear(); }

  pub fn send_attempts(&self) -> usize { self.send_attempts.load(Ordering::SeqCst) }

  pub fn sent_embeds(&self, channel: ChannelId) -> Vec<Embed> {
    self
      .calls()
      .into_iter()
      .filter_map(|call| match call {
        Call::Send { channel: c, embed, .. } if c == channel => Some(embed),
        _ => None,
      })
      .collect()
  }

  pub fn last_posted(&self) -> Option<MessageId> {
    self.calls().into_iter().rev().find_map(|call| match call {
      Call::Send { message, .. } => Some(message),
      _ => None,
    })
  }

  pub fn is_archived(&self, channel: ChannelId) -> bool {
    self
      .channels
      .lock()
      .unwrap()
      .get(&channel)
      .is_some_and(|info| info.archived)
  }

  fn record(&self, call: Call) { self.calls.lock().unwrap().push(call); }
}

impl Transport for FakeTransport {
  fn bot_user_id(&self) -> UserId { BOT }

  async fn send_embed(
    &self,
    channel: ChannelId,
    embed: Embed,
  ) -> Result<PostedMessage, TransportError> {
    self.send_attempts.fetch_add(1, Ordering::SeqCst);
    if let Some(e) = self.send_failures.lock().unwrap().pop_front() {
      return Err(e);
    }
    let message = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
    self.record(Call::Send { channel, message, embed });
    Ok(PostedMessage { channel_id: channel, message_id: message })
  }

  async fn edit_embed(
    &self,
    channel: ChannelId,
    message: MessageId,
    embed: Embed,
  ) -> Result<(), TransportError> {
    if let Some(e) = self.edit_failures.lock().unwrap().pop_front() {
      return Err(e);
    }
    self.record(Call::Edit { channel, message, embed });
    Ok(())
  }

  async fn add_reaction(
    &self,
    channel: ChannelId,
    message: MessageId,
    emoji: &str,
  ) -> Result<(), TransportError> {
    self.record(Call::React { channel, message, emoji: emoji.to_owned() });
    Ok(())
  }

  async fn channel_info(&self, channel: ChannelId) -> Result<ChannelInfo, TransportError> {
    self
      .channels
      .lock()
      .unwrap()
      .get(&channel)
      .cloned()
      .ok_or(TransportError::NotFound)
  }

  async fn set_archived(&self, channel: ChannelId, archived: bool) -> Result<(), TransportError> {
    if let Some(info) = self.channels.lock().unwrap().get_mut(&channel) {
      info.archived = archived;
    }
    self.record(Call::SetArchived { channel, archived });
    Ok(())
  }

  async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, TransportError> {
    Ok(self.roles.lock().unwrap().get(&user).cloned().unwrap_or_default())
  }
}

// ─── Unavailable store ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("backend unavailable")]
pub struct Unavailable;

/// A store whose every operation either errors at once or never completes.
pub struct OutageStore {
  hang: bool,
}

impl OutageStore {
  pub fn failing() -> Self { Self { hang: false } }

  pub fn hanging() -> Self { Self { hang: true } }

  async fn outage<R>(&self) -> Result<R, Unavailable> {
    if self.hang {
      std::future::pending::<()>().await;
    }
    Err(Unavailable)
  }
}

impl ThreadStore for OutageStore {
  type Error = Unavailable;

  async fn insert_thread(&self, _input: NewThread) -> Result<Thread, Unavailable> {
    self.outage().await
  }

  async fn get_thread(&self, _thread_id: ChannelId) -> Result<Option<Thread>, Unavailable> {
    self.outage().await
  }

  async fn get_thread_by_controller(
    &self,
    _controller_id: MessageId,
  ) -> Result<Option<Thread>, Unavailable> {
    self.outage().await
  }

  async fn update_votes(
    &self,
    _thread_id: ChannelId,
    _failed_delta: i64,
    _solved_delta: i64,
  ) -> Result<(), Unavailable> {
    self.outage().await
  }

  async fn set_thread_state(
    &self,
    _thread_id: ChannelId,
    _state: ThreadState,
  ) -> Result<(), Unavailable> {
    self.outage().await
  }

  async fn list_threads(&self, _query: &ThreadQuery) -> Result<Vec<Thread>, Unavailable> {
    self.outage().await
  }

  async fn insert_message(&self, _input: NewMessage) -> Result<Message, Unavailable> {
    self.outage().await
  }

  async fn claim_unprocessed_bot_messages(&self) -> Result<Vec<ClaimedMessage>, Unavailable> {
    self.outage().await
  }

  async fn list_messages(&self, _thread_id: ChannelId) -> Result<Vec<Message>, Unavailable> {
    self.outage().await
  }

  async fn list_collections(&self) -> Result<Vec<String>, Unavailable> {
    self.outage().await
  }

  async fn ensure_collection(&self, _name: &str) -> Result<(), Unavailable> {
    self.outage().await
  }
}

/// Backend timeout used with [`outage_context`].
pub const OUTAGE_TIMEOUT: Duration = Duration::from_millis(50);

/// A context over `store` whose transport knows thread 100 in [`FORUM`].
pub fn outage_context(store: OutageStore) -> Context<OutageStore, FakeTransport> {
  let transport = FakeTransport::new();
  transport.add_channel(ChannelInfo {
    id:        FORUM,
    name:      "help".into(),
    parent_id: None,
    is_thread: false,
    archived:  false,
  });
  transport.add_thread(ChannelId(100), FORUM, false);
  let mut config = config();
  config.backend_timeout = OUTAGE_TIMEOUT;
  Context::new(Arc::new(store), Arc::new(transport), Arc::new(config))
}

// ─── Harness ─────────────────────────────────────────────────────────────────

pub fn config() -> EngineConfig {
  let mut config = EngineConfig::new(GUILD).with_channel(FORUM, COLLECTION);
  config.moderator_role = Some(MODERATOR_ROLE);
  config.delivery = DeliveryPolicy {
    max_unit_len: 4096,
    max_attempts: 5,
    base_delay:   Duration::from_millis(1),
  };
  config
}

pub struct Harness {
  pub store:     Arc<SqliteStore>,
  pub transport: Arc<FakeTransport>,
  pub ctx:       Context<SqliteStore, FakeTransport>,
}

impl Harness {
  pub async fn new() -> Self { Self::with_config(config()).await }

  pub async fn with_config(config: EngineConfig) -> Self {
    let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
    let transport = Arc::new(FakeTransport::new());
    transport.add_channel(ChannelInfo {
      id:        FORUM,
      name:      "help".into(),
      parent_id: None,
      is_thread: false,
      archived:  false,
    });
    let ctx = Context::new(Arc::clone(&store), Arc::clone(&transport), Arc::new(config));
    Self { store, transport, ctx }
  }

  pub fn lifecycle(&self) -> Lifecycle<SqliteStore, FakeTransport> {
    Lifecycle::new(self.ctx.clone())
  }

  /// Record a tracked thread `id` by `AUTHOR` with controller `id + 1`.
  pub async fn thread(&self, id: u64, archived: bool) -> ChannelId {
    let channel = ChannelId(id);
    self.transport.add_thread(channel, FORUM, archived);
    self
      .store
      .insert_thread(NewThread::new(
        channel,
        MessageId(id + 1),
        format!("thread {id}"),
        AUTHOR,
        COLLECTION,
      ))
      .await
      .unwrap();
    channel
  }

  pub async fn stored(&self, channel: ChannelId) -> Thread {
    self.store.get_thread(channel).await.unwrap().unwrap()
  }
}
