//! Records human messages posted in tracked threads.
//!
//! The first message of a thread (its id equals the thread id) also gets a
//! controller message and a thread record.

use helpbot_core::{
  event::InboundMessage,
  message::NewMessage,
  store::ThreadStore,
  thread::NewThread,
  transport::{Color, Embed, Transport},
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  context::{Context, Placement},
  delivery::Delivery,
  render,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntakeOutcome {
  /// Outside a tracked thread, from the bot itself or from a banned user.
  Ignored,
  Recorded { new_thread: bool, mentions_bot: bool },
  /// The controller could not be posted or the store did not answer.
  Failed,
}

pub struct Intake<S, T> {
  ctx:      Context<S, T>,
  delivery: Delivery<T>,
}

impl<S, T> Intake<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(ctx: Context<S, T>) -> Self {
    let delivery = ctx.delivery();
    Self { ctx, delivery }
  }

  pub async fn on_message(&self, message: InboundMessage) -> IntakeOutcome {
    let bot = self.ctx.transport.bot_user_id();
    if message.author_id == bot || self.ctx.config.is_banned(message.author_id) {
      debug!(author = %message.author_id, "message ignored");
      return IntakeOutcome::Ignored;
    }

    let (info, collection) = match self.ctx.placement(message.channel_id).await {
      Ok(Placement::Tracked { info, collection }) => (info, collection),
      Ok(_) => return IntakeOutcome::Ignored,
      Err(e) => {
        debug!(channel = %message.channel_id, error = %e, "message channel lookup failed");
        return IntakeOutcome::Ignored;
      }
    };

    let new_thread = message.starts_thread();
    if new_thread {
      let controller = self
        .delivery
        .send_with_backoff(message.channel_id, render::controller_loading(message.message_id))
        .await;
      let Some(controller) = controller else {
        warn!(thread = %message.channel_id, "controller not posted, thread not recorded");
        return IntakeOutcome::Failed;
      };

      let record = NewThread::new(
        message.channel_id,
        controller.message_id,
        info.name,
        message.author_id,
        collection,
      );
      let inserted = self
        .ctx
        .backend("insert_thread", self.ctx.store.insert_thread(record))
        .await;
      if inserted.is_none() {
        return IntakeOutcome::Failed;
      }
      info!(thread = %message.channel_id, author = %message.author_id, "thread recorded");
    }

    let mentions_bot = message.mentions_user(bot);
    let record = NewMessage::human(
      message.channel_id,
      message.message_id,
      message.content,
      new_thread,
      mentions_bot,
    );
    let inserted = self
      .ctx
      .backend("insert_message", self.ctx.store.insert_message(record))
      .await;
    if inserted.is_none() {
      return IntakeOutcome::Failed;
    }

    if mentions_bot {
      let loading = Embed::new(render::loading_message(message.message_id), Color::GOLD);
      self.delivery.send_with_backoff(message.channel_id, loading).await;
    }

    IntakeOutcome::Recorded { new_thread, mentions_bot }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use helpbot_core::{
    id::{ChannelId, MessageId, UserId},
    lifecycle::ThreadState,
    transport::TransportError,
  };

  use super::*;
  use crate::testing::{AUTHOR, BOT, COLLECTION, FORUM, Harness, OTHER_FORUM, config};

  fn message(channel: u64, id: u64, mentions: Vec<UserId>) -> InboundMessage {
    InboundMessage {
      channel_id: ChannelId(channel),
      message_id: MessageId(id),
      author_id: AUTHOR,
      content: "how do I configure the thing?".into(),
      mentions,
    }
  }

  #[tokio::test]
  async fn first_message_creates_thread_then_message() {
    let h = Harness::new().await;
    h.transport.add_thread(ChannelId(100), FORUM, false);
    let intake = Intake::new(h.ctx.clone());

    let outcome = intake.on_message(message(100, 100, vec![])).await;
    assert_eq!(outcome, IntakeOutcome::Recorded { new_thread: true, mentions_bot: false });

    let thread = h.stored(ChannelId(100)).await;
    assert_eq!(thread.state(), ThreadState::INITIAL);
    assert_eq!(thread.author_id, AUTHOR);
    assert_eq!(thread.collection, COLLECTION);
    assert_eq!(thread.title, "thread 100");
    assert_eq!(Some(thread.thread_controller_id), h.transport.last_posted());

    let sent = h.transport.sent_embeds(ChannelId(100));
    assert_eq!(sent[0].title, render::CONTROLLER_TITLE);

    let messages = h.store.list_messages(ChannelId(100)).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].first_message && messages[0].processed && !messages[0].from_bot);
  }

  #[tokio::test]
  async fn follow_up_mentioning_bot_posts_loading_line() {
    let h = Harness::new().await;
    let thread = h.thread(100, false).await;
    let intake = Intake::new(h.ctx.clone());

    let outcome = intake.on_message(message(100, 150, vec![BOT])).await;
    assert_eq!(outcome, IntakeOutcome::Recorded { new_thread: false, mentions_bot: true });

    let sent = h.transport.sent_embeds(thread);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, render::loading_message(MessageId(150)));

    let messages = h.store.list_messages(thread).await.unwrap();
    assert!(messages[0].mentions_bot && !messages[0].first_message);
  }

  #[tokio::test]
  async fn ignores_untracked_bot_and_banned() {
    let mut config = config();
    config.banned_users = HashSet::from([UserId(66)]);
    let h = Harness::with_config(config).await;
    h.transport.add_thread(ChannelId(200), OTHER_FORUM, false);
    h.thread(100, false).await;
    let intake = Intake::new(h.ctx.clone());

    assert_eq!(intake.on_message(message(200, 200, vec![])).await, IntakeOutcome::Ignored);
    assert_eq!(intake.on_message(message(10, 300, vec![])).await, IntakeOutcome::Ignored);

    let mut from_bot = message(100, 301, vec![]);
    from_bot.author_id = BOT;
    assert_eq!(intake.on_message(from_bot).await, IntakeOutcome::Ignored);

    let mut banned = message(100, 302, vec![BOT]);
    banned.author_id = UserId(66);
    assert_eq!(intake.on_message(banned).await, IntakeOutcome::Ignored);

    assert!(h.store.list_messages(ChannelId(100)).await.unwrap().is_empty());
    assert!(h.store.get_thread(ChannelId(200)).await.unwrap().is_none());
    assert!(h.transport.calls().is_empty());
  }

  #[tokio::test]
  async fn thread_not_recorded_without_controller() {
    let h = Harness::new().await;
    h.transport.add_thread(ChannelId(100), FORUM, false);
    h.transport.fail_sends([TransportError::Forbidden]);
    let intake = Intake::new(h.ctx.clone());

    assert_eq!(intake.on_message(message(100, 100, vec![])).await, IntakeOutcome::Failed);
    assert!(h.store.get_thread(ChannelId(100)).await.unwrap().is_none());
  }
}
