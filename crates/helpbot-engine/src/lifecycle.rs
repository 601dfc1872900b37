//! Executes lifecycle transitions planned by [`helpbot_core::lifecycle::plan`].
//!
//! Two entry points share one executor: [`Lifecycle::apply_command`] for
//! explicit commands (gated on author or moderator) and
//! [`Lifecycle::apply_author_vote`] for the author's own reaction (no gate).

use helpbot_core::{
  id::{ChannelId, GuildId, UserId},
  lifecycle::{Effect, LifecycleCommand, ThreadState, plan},
  store::ThreadStore,
  thread::Thread,
  transport::Transport,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{context::Context, delivery::Delivery, render};

// ─── Status view ─────────────────────────────────────────────────────────────

/// Everything the status reply shows, derived from a thread record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
  pub thread_id:       ChannelId,
  pub title:           String,
  pub thread_link:     String,
  pub controller_link: String,
  pub state:           ThreadState,
  pub open_label:      &'static str,
  pub solved_label:    &'static str,
  pub solved_votes:    i64,
  pub failed_votes:    i64,
}

impl StatusView {
  pub fn new(thread: &Thread, guild: GuildId) -> Self {
    let state = thread.state();
    Self {
      thread_id:       thread.thread_id,
      title:           thread.title.clone(),
      thread_link:     render::thread_link(guild, thread.thread_id),
      controller_link: render::message_link(guild, thread.thread_id, thread.thread_controller_id),
      state,
      open_label:      state.open_label(),
      solved_label:    state.solved_label(),
      solved_votes:    thread.solved_votes,
      failed_votes:    thread.failed_votes,
    }
  }
}

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
  /// The transition ran; `view` reflects the thread afterwards.
  Applied { command: LifecycleCommand, view: StatusView },
  /// The precondition did not hold; nothing changed.
  Skipped { command: LifecycleCommand, view: StatusView },
  PermissionDenied,
  ThreadNotFound,
  BackendUnavailable,
}

impl CommandOutcome {
  pub fn view(&self) -> Option<&StatusView> {
    match self {
      Self::Applied { view, .. } | Self::Skipped { view, .. } => Some(view),
      _ => None,
    }
  }
}

// ─── Executor ────────────────────────────────────────────────────────────────

pub struct Lifecycle<S, T> {
  ctx:      Context<S, T>,
  delivery: Delivery<T>,
}

impl<S, T> Lifecycle<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(ctx: Context<S, T>) -> Self {
    let delivery = ctx.delivery();
    Self { ctx, delivery }
  }

  /// Run `command` on the thread `channel` on behalf of `actor`.
  pub async fn apply_command(
    &self,
    channel: ChannelId,
    actor: UserId,
    command: LifecycleCommand,
  ) -> CommandOutcome {
    let lookup = self
      .ctx
      .backend("get_thread", self.ctx.store.get_thread(channel))
      .await;
    let thread = match lookup {
      None => return CommandOutcome::BackendUnavailable,
      Some(None) => return CommandOutcome::ThreadNotFound,
      Some(Some(thread)) => thread,
    };

    if !self.may_act(&thread, actor).await {
      info!(thread = %channel, %actor, %command, "lifecycle command refused");
      return CommandOutcome::PermissionDenied;
    }

    self.execute(thread, command).await
  }

  /// The author's positive reaction was added (`solved = true`) or removed.
  ///
  /// Sets the flag absolutely: repeating the same vote is a skipped no-op.
  pub async fn apply_author_vote(&self, thread: Thread, solved: bool) -> CommandOutcome {
    self
      .execute(thread, LifecycleCommand::from_author_vote(solved))
      .await
  }

  async fn may_act(&self, thread: &Thread, actor: UserId) -> bool {
    if actor == thread.author_id {
      return true;
    }
    let Some(role) = self.ctx.config.moderator_role else {
      return false;
    };
    match self.ctx.transport.member_roles(actor).await {
      Ok(roles) => roles.contains(&role),
      Err(e) => {
        warn!(%actor, error = %e, "could not resolve member roles");
        false
      }
    }
  }

  async fn execute(&self, thread: Thread, command: LifecycleCommand) -> CommandOutcome {
    let archived = match self.ctx.transport.channel_info(thread.thread_id).await {
      Ok(info) => info.archived,
      Err(e) => {
        debug!(thread = %thread.thread_id, error = %e, "channel lookup failed, assuming unarchived");
        false
      }
    };

    let Some(transition) = plan(thread.state(), command, archived) else {
      debug!(thread = %thread.thread_id, %command, "precondition not met, skipping");
      let view = self.refreshed_view(thread).await;
      return CommandOutcome::Skipped { command, view };
    };

    let channel = thread.thread_id;
    for effect in &transition.effects {
      match *effect {
        Effect::Persist(state) => {
          let persisted = self
            .ctx
            .backend("set_thread_state", self.ctx.store.set_thread_state(channel, state))
            .await;
          if persisted.is_none() {
            return CommandOutcome::BackendUnavailable;
          }
        }
        Effect::Unarchive => self.set_archived(channel, false).await,
        Effect::Archive => self.set_archived(channel, true).await,
        Effect::RefreshController(announcement) => {
          let embed = render::controller_update(announcement);
          if let Err(e) = self
            .delivery
            .edit_with_backoff(channel, thread.thread_controller_id, embed)
            .await
          {
            warn!(thread = %channel, error = %e, "controller refresh failed");
          }
        }
        Effect::Announce(announcement) => {
          self
            .delivery
            .deliver(
              channel,
              render::STATUS_TITLE,
              render::announcement_text(announcement),
              render::announcement_color(announcement),
            )
            .await;
        }
      }
    }

    info!(
      thread = %channel,
      %command,
      from = ?transition.from,
      to = ?transition.to,
      "lifecycle transition applied"
    );

    let mut thread = thread;
    thread.open = transition.to.open;
    thread.solved = transition.to.solved;
    let view = self.refreshed_view(thread).await;
    CommandOutcome::Applied { command, view }
  }

  async fn set_archived(&self, channel: ChannelId, archived: bool) {
    if let Err(e) = self.ctx.transport.set_archived(channel, archived).await {
      warn!(thread = %channel, archived, error = %e, "archive toggle failed");
    }
  }

  /// Re-read the thread for the view, falling back to `known` if the store
  /// does not answer.
  async fn refreshed_view(&self, known: Thread) -> StatusView {
    let fresh = self
      .ctx
      .backend("get_thread", self.ctx.store.get_thread(known.thread_id))
      .await
      .flatten();
    StatusView::new(fresh.as_ref().unwrap_or(&known), self.ctx.config.guild_id)
  }
}
