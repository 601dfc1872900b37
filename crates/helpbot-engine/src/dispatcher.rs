//! The polling dispatcher.
//!
//! Every tick claims all pending producer answers in one atomic store
//! operation and posts each one into its thread: the answer, its sources, the
//! voting banner on the controller and the two vote reactions.

use helpbot_core::{
  message::ClaimedMessage,
  store::ThreadStore,
  transport::{Color, Transport, TransportError},
};
use serde::Serialize;
use thiserror::Error;
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::{info, warn};

use crate::{context::Context, delivery::Delivery, render};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
  pub claimed:   usize,
  pub delivered: usize,
  pub failed:    usize,
}

#[derive(Debug, Error)]
enum RowError {
  #[error("answer could not be posted")]
  Undelivered,
  #[error("controller edit failed: {0}")]
  Controller(#[source] TransportError),
  #[error("reaction failed: {0}")]
  Reaction(#[source] TransportError),
}

pub struct Dispatcher<S, T> {
  ctx:      Context<S, T>,
  delivery: Delivery<T>,
}

impl<S, T> Dispatcher<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(ctx: Context<S, T>) -> Self {
    let delivery = ctx.delivery();
    Self { ctx, delivery }
  }

  /// Tick until `shutdown` flips to `true` or its sender is dropped.
  ///
  /// A tick that overruns the interval delays the next one instead of
  /// bunching them up, so ticks never overlap.
  pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
    let period = self.ctx.config.poll_interval;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(?period, "dispatcher started");

    loop {
      tokio::select! {
        _ = ticker.tick() => {
          let report = self.run_once().await;
          if report.claimed > 0 {
            info!(
              claimed = report.claimed,
              delivered = report.delivered,
              failed = report.failed,
              "dispatcher tick"
            );
          }
        }
        changed = shutdown.changed() => {
          if changed.is_err() || *shutdown.borrow() {
            break;
          }
        }
      }
    }

    info!("dispatcher stopped");
  }

  /// Claim and deliver everything pending.
  pub async fn run_once(&self) -> TickReport {
    let claimed = self
      .ctx
      .backend(
        "claim_unprocessed_bot_messages",
        self.ctx.store.claim_unprocessed_bot_messages(),
      )
      .await;
    let Some(rows) = claimed else {
      return TickReport::default();
    };

    let mut report = TickReport { claimed: rows.len(), ..TickReport::default() };
    for row in &rows {
      match self.deliver_row(row).await {
        Ok(()) => report.delivered += 1,
        Err(e) => {
          warn!(
            message = %row.message_id,
            thread = %row.thread_id,
            error = %e,
            "answer delivery failed"
          );
          report.failed += 1;
        }
      }
    }
    report
  }

  /// Every step is attempted even after an earlier one fails; the row then
  /// reports the first failure.
  async fn deliver_row(&self, row: &ClaimedMessage) -> Result<(), RowError> {
    let channel = row.thread_id;
    let mut failure = None;

    let answer = self
      .delivery
      .deliver_long(channel, render::RESPONSE_TITLE, &row.content, Color::BLUE, None)
      .await;
    if answer.is_none() && !row.content.trim().is_empty() {
      failure = Some(RowError::Undelivered);
    }

    if let Some(sources) = row.sources.as_deref() {
      self
        .delivery
        .deliver_long(channel, render::RESPONSE_SOURCES_TITLE, sources, Color::GREEN, None)
        .await;
    }

    let banner = render::controller_banner(
      row.author_id,
      self.ctx.transport.bot_user_id(),
      self.ctx.config.source_link.as_deref(),
    );
    if let Err(e) = self
      .delivery
      .edit_with_backoff(channel, row.thread_controller_id, banner)
      .await
    {
      failure.get_or_insert(RowError::Controller(e));
    }

    for emoji in [render::POSITIVE_EMOJI, render::NEGATIVE_EMOJI] {
      if let Err(e) = self
        .delivery
        .react_with_backoff(channel, row.thread_controller_id, emoji)
        .await
      {
        failure.get_or_insert(RowError::Reaction(e));
      }
    }

    match failure {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }
}
