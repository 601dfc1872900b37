//! Shared handles passed to every engine component.

use std::{future::Future, sync::Arc};

use helpbot_core::{
  id::ChannelId,
  store::ThreadStore,
  transport::{ChannelInfo, Color, Embed, Transport, TransportError},
};
use tracing::warn;

use crate::{config::EngineConfig, delivery::Delivery};

/// Where a channel sits relative to the tracked forums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
  /// Not a thread at all.
  NotThread,
  /// A thread whose parent forum is not tracked.
  Untracked,
  /// A thread inside a tracked forum.
  Tracked { info: ChannelInfo, collection: String },
}

/// The store, the transport and the configuration.
///
/// Cloning is cheap; all three are reference-counted.
pub struct Context<S, T> {
  pub store:     Arc<S>,
  pub transport: Arc<T>,
  pub config:    Arc<EngineConfig>,
}

impl<S, T> Clone for Context<S, T> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      transport: Arc::clone(&self.transport),
      config:    Arc::clone(&self.config),
    }
  }
}

impl<S, T> Context<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(store: Arc<S>, transport: Arc<T>, config: Arc<EngineConfig>) -> Self {
    Self { store, transport, config }
  }

  pub fn delivery(&self) -> Delivery<T> {
    Delivery::new(Arc::clone(&self.transport), self.config.delivery)
  }

  /// Await a backend operation under the configured timeout.
  ///
  /// Failures and timeouts are logged and collapse to `None`; callers skip
  /// their unit of work.
  pub async fn backend<R>(
    &self,
    op: &'static str,
    fut: impl Future<Output = Result<R, S::Error>>,
  ) -> Option<R> {
    match tokio::time::timeout(self.config.backend_timeout, fut).await {
      Ok(Ok(value)) => Some(value),
      Ok(Err(e)) => {
        warn!(op, error = %e, "backend operation failed");
        None
      }
      Err(_) => {
        warn!(op, timeout = ?self.config.backend_timeout, "backend operation timed out");
        None
      }
    }
  }

  /// Classify `channel` against the tracked forums.
  pub async fn placement(&self, channel: ChannelId) -> Result<Placement, TransportError> {
    let info = self.transport.channel_info(channel).await?;
    if !info.is_thread {
      return Ok(Placement::NotThread);
    }
    let collection = info
      .parent_id
      .and_then(|parent| self.config.collection_for(parent))
      .map(str::to_owned);
    Ok(match collection {
      Some(collection) => Placement::Tracked { info, collection },
      None => Placement::Untracked,
    })
  }

  /// Post a line to the logging channel, if one is configured.
  pub async fn log_line(&self, text: &str) {
    let Some(channel) = self.config.log_channel else { return };
    let embed = Embed::new("Log", Color::GOLD).description(text);
    self.delivery().send_with_backoff(channel, embed).await;
  }
}
