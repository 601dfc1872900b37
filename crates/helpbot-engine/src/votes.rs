//! Reaction votes on controller messages.
//!
//! Every ✅/❌ add or remove on a controller applies one ±1 delta to the
//! thread's counters. The thread author's ✅ additionally sets the solved
//! flag through the lifecycle executor.

use helpbot_core::{
  event::ReactionEvent,
  store::ThreadStore,
  transport::Transport,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
  context::{Context, Placement},
  lifecycle::Lifecycle,
  render::{NEGATIVE_EMOJI, POSITIVE_EMOJI},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
  OwnReaction,
  UntrackedChannel,
  UnknownController,
  UnrecognizedEmoji,
  BackendUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum VoteOutcome {
  Ignored(IgnoreReason),
  /// The counters moved. `author_override` is set when the author's vote
  /// also ran a lifecycle transition.
  Counted { author_override: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vote {
  Positive,
  Negative,
}

impl Vote {
  fn parse(emoji: &str) -> Option<Self> {
    match emoji {
      POSITIVE_EMOJI => Some(Self::Positive),
      NEGATIVE_EMOJI => Some(Self::Negative),
      _ => None,
    }
  }

  /// `(failed_delta, solved_delta)` for a signed reaction delta.
  fn deltas(self, delta: i64) -> (i64, i64) {
    match self {
      Self::Positive => (0, delta),
      Self::Negative => (delta, 0),
    }
  }
}

pub struct VoteAggregator<S, T> {
  ctx:       Context<S, T>,
  lifecycle: Lifecycle<S, T>,
}

impl<S, T> VoteAggregator<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(ctx: Context<S, T>) -> Self {
    let lifecycle = Lifecycle::new(ctx.clone());
    Self { ctx, lifecycle }
  }

  pub async fn on_reaction(&self, event: ReactionEvent) -> VoteOutcome {
    if event.user_id == self.ctx.transport.bot_user_id() {
      return VoteOutcome::Ignored(IgnoreReason::OwnReaction);
    }

    match self.ctx.placement(event.channel_id).await {
      Ok(Placement::Tracked { .. }) => {}
      Ok(_) => return VoteOutcome::Ignored(IgnoreReason::UntrackedChannel),
      Err(e) => {
        debug!(channel = %event.channel_id, error = %e, "reaction channel lookup failed");
        return VoteOutcome::Ignored(IgnoreReason::UntrackedChannel);
      }
    }

    let lookup = self
      .ctx
      .backend(
        "get_thread_by_controller",
        self.ctx.store.get_thread_by_controller(event.message_id),
      )
      .await;
    let thread = match lookup {
      None => return VoteOutcome::Ignored(IgnoreReason::BackendUnavailable),
      Some(None) => {
        debug!(message = %event.message_id, "reaction on a non-controller message");
        return VoteOutcome::Ignored(IgnoreReason::UnknownController);
      }
      Some(Some(thread)) => thread,
    };

    let Some(vote) = Vote::parse(&event.emoji) else {
      return VoteOutcome::Ignored(IgnoreReason::UnrecognizedEmoji);
    };

    let delta = event.delta();
    let thread_id = thread.thread_id;
    let author_override = vote == Vote::Positive && event.user_id == thread.author_id;
    if author_override {
      self.lifecycle.apply_author_vote(thread, delta > 0).await;
    }

    let (failed_delta, solved_delta) = vote.deltas(delta);
    let counted = self
      .ctx
      .backend(
        "update_votes",
        self.ctx.store.update_votes(thread_id, failed_delta, solved_delta),
      )
      .await;
    if counted.is_none() {
      return VoteOutcome::Ignored(IgnoreReason::BackendUnavailable);
    }

    info!(thread = %thread_id, user = %event.user_id, emoji = %event.emoji, delta, "vote counted");
    VoteOutcome::Counted { author_override }
  }
}
