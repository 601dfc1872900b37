//! Slash command handlers.

use helpbot_core::{
  event::CommandInvocation,
  id::ChannelId,
  lifecycle::LifecycleCommand,
  store::ThreadStore,
  transport::{Embed, Transport},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
  context::{Context, Placement},
  lifecycle::{CommandOutcome, Lifecycle, StatusView},
  render,
};

/// The response to a command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandReply {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub content:   Option<String>,
  pub embeds:    Vec<Embed>,
  /// Only the invoking user sees the reply.
  pub ephemeral: bool,
}

impl CommandReply {
  pub fn embed(embed: Embed) -> Self {
    Self { embeds: vec![embed], ..Self::default() }
  }

  pub fn text(content: impl Into<String>) -> Self {
    Self { content: Some(content.into()), ..Self::default() }
  }

  pub fn ephemeral(mut self) -> Self {
    self.ephemeral = true;
    self
  }
}

pub struct Commands<S, T> {
  ctx:       Context<S, T>,
  lifecycle: Lifecycle<S, T>,
}

impl<S, T> Commands<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(ctx: Context<S, T>) -> Self {
    let lifecycle = Lifecycle::new(ctx.clone());
    Self { ctx, lifecycle }
  }

  pub async fn handle(&self, invocation: CommandInvocation) -> CommandReply {
    let name = invocation.command.trim().trim_start_matches('/').to_ascii_lowercase();
    debug!(command = %name, user = %invocation.user_id, "command received");

    if let Ok(command) = name.parse::<LifecycleCommand>() {
      return self.lifecycle_command(invocation, command).await;
    }

    match name.as_str() {
      "status" => self.status(invocation.channel_id).await,
      "collections" => self.collections().await,
      "commands" => CommandReply::embed(render::commands_help()),
      "info" => CommandReply::embed(render::info(self.ctx.config.source_link.as_deref())),
      "hello" => {
        self
          .ctx
          .log_line(&format!("Hello command from <@{}>", invocation.user_id))
          .await;
        CommandReply::text("Hello World!")
      }
      _ => CommandReply::embed(render::notice(&format!("Unknown command: {name}"))).ephemeral(),
    }
  }

  /// `None` when `channel` is a tracked thread, otherwise the reply to send.
  async fn require_tracked(&self, channel: ChannelId) -> Option<CommandReply> {
    match self.ctx.placement(channel).await {
      Ok(Placement::Tracked { .. }) => None,
      Ok(Placement::Untracked) => Some(
        CommandReply::embed(render::allowed_channels(&self.ctx.config.tracked_channels()))
          .ephemeral(),
      ),
      Ok(Placement::NotThread) | Err(_) => {
        Some(CommandReply::embed(render::notice(render::UNAVAILABLE_COMMAND)).ephemeral())
      }
    }
  }

  async fn lifecycle_command(
    &self,
    invocation: CommandInvocation,
    command: LifecycleCommand,
  ) -> CommandReply {
    if let Some(reply) = self.require_tracked(invocation.channel_id).await {
      return reply;
    }

    let outcome = self
      .lifecycle
      .apply_command(invocation.channel_id, invocation.user_id, command)
      .await;
    info!(thread = %invocation.channel_id, %command, ?outcome, "lifecycle command handled");

    match outcome {
      CommandOutcome::Applied { view, .. } | CommandOutcome::Skipped { view, .. } => {
        CommandReply::embed(render::status_embed(&view))
      }
      CommandOutcome::PermissionDenied => CommandReply::embed(render::notice(&format!(
        "Only the thread's author or a moderator can {command} this thread."
      )))
      .ephemeral(),
      CommandOutcome::ThreadNotFound => not_tracked(),
      CommandOutcome::BackendUnavailable => backend_unavailable(),
    }
  }

  async fn status(&self, channel: ChannelId) -> CommandReply {
    if let Some(reply) = self.require_tracked(channel).await {
      return reply;
    }

    match self
      .ctx
      .backend("get_thread", self.ctx.store.get_thread(channel))
      .await
    {
      Some(Some(thread)) => {
        let view = StatusView::new(&thread, self.ctx.config.guild_id);
        CommandReply::embed(render::status_embed(&view))
      }
      Some(None) => not_tracked(),
      None => backend_unavailable(),
    }
  }

  async fn collections(&self) -> CommandReply {
    match self
      .ctx
      .backend("list_collections", self.ctx.store.list_collections())
      .await
    {
      Some(names) => CommandReply::embed(render::collections(&names)).ephemeral(),
      None => backend_unavailable(),
    }
  }
}

fn not_tracked() -> CommandReply {
  CommandReply::embed(render::notice("This thread is not tracked by the help bot.")).ephemeral()
}

fn backend_unavailable() -> CommandReply {
  CommandReply::embed(render::notice(
    "The help bot cannot reach its database right now. Please try again later.",
  ))
  .ephemeral()
}
