//! HTTP ingress for the help bot.
//!
//! A gateway relay forwards Discord messages, reactions and slash commands to
//! this server; the engine handles them against the store and talks back to
//! Discord through [`discord::DiscordTransport`]. The JSON API from
//! `helpbot-api` is nested under `/api`. Every route sits behind HTTP Basic
//! auth.

pub mod auth;
pub mod discord;
pub mod error;

pub use error::{Error, Result};

use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::State,
  http::StatusCode,
  middleware,
  routing::post,
};
use helpbot_core::{
  event::{CommandInvocation, InboundMessage, ReactionEvent},
  id::{ChannelId, GuildId, RoleId, UserId},
  store::ThreadStore,
  transport::Transport,
};
use helpbot_engine::{
  Context, DeliveryPolicy, EngineConfig,
  commands::{CommandReply, Commands},
  intake::{Intake, IntakeOutcome},
  votes::{VoteAggregator, VoteOutcome},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_api_base() -> String { discord::DEFAULT_API_BASE.to_string() }
fn default_poll_interval_ms() -> u64 { 1_000 }
fn default_backend_timeout_ms() -> u64 { 10_000 }
fn default_request_timeout_ms() -> u64 { 15_000 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `HELPBOT_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,

  pub discord_token:      String,
  #[serde(default = "default_api_base")]
  pub discord_api_base:   String,
  pub guild_id:           GuildId,
  #[serde(default)]
  pub moderator_role_id:  Option<RoleId>,
  #[serde(default)]
  pub log_channel_id:     Option<ChannelId>,
  /// Forum channel id → document collection.
  #[serde(default)]
  pub channels:           HashMap<String, String>,
  #[serde(default)]
  pub banned_users:       Vec<UserId>,
  #[serde(default)]
  pub source_link:        Option<String>,

  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms:   u64,
  #[serde(default = "default_backend_timeout_ms")]
  pub backend_timeout_ms: u64,
  /// Timeout for a single Discord REST request.
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,
  #[serde(default)]
  pub delivery_attempts:  Option<u32>,
}

impl ServerConfig {
  pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }

  /// The immutable engine configuration derived from this file.
  pub fn engine_config(&self) -> Result<EngineConfig> {
    let mut engine = EngineConfig::new(self.guild_id);
    for (channel, collection) in &self.channels {
      let forum = channel
        .parse::<ChannelId>()
        .map_err(|_| Error::Config(format!("channel key {channel:?} is not a channel id")))?;
      if collection.trim().is_empty() {
        return Err(Error::Config(format!("channel {forum} has an empty collection")));
      }
      engine = engine.with_channel(forum, collection.trim());
    }

    engine.moderator_role = self.moderator_role_id;
    engine.banned_users = self.banned_users.iter().copied().collect();
    engine.log_channel = self.log_channel_id;
    engine.source_link = self.source_link.clone();
    engine.poll_interval = Duration::from_millis(self.poll_interval_ms.max(1));
    engine.backend_timeout = Duration::from_millis(self.backend_timeout_ms.max(1));
    if let Some(attempts) = self.delivery_attempts {
      engine.delivery = DeliveryPolicy { max_attempts: attempts.max(1), ..engine.delivery };
    }
    Ok(engine)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the event handlers.
pub struct AppState<S, T> {
  pub intake:   Arc<Intake<S, T>>,
  pub votes:    Arc<VoteAggregator<S, T>>,
  pub commands: Arc<Commands<S, T>>,
}

impl<S, T> Clone for AppState<S, T> {
  fn clone(&self) -> Self {
    Self {
      intake:   Arc::clone(&self.intake),
      votes:    Arc::clone(&self.votes),
      commands: Arc::clone(&self.commands),
    }
  }
}

impl<S, T> AppState<S, T>
where
  S: ThreadStore,
  T: Transport,
{
  pub fn new(ctx: &Context<S, T>) -> Self {
    Self {
      intake:   Arc::new(Intake::new(ctx.clone())),
      votes:    Arc::new(VoteAggregator::new(ctx.clone())),
      commands: Arc::new(Commands::new(ctx.clone())),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`]: event ingress plus the JSON API.
pub fn router<S, T>(ctx: &Context<S, T>, credentials: AuthConfig) -> Router
where
  S: ThreadStore + 'static,
  T: Transport + 'static,
{
  Router::new()
    .route("/events/message",  post(message_event::<S, T>))
    .route("/events/reaction", post(reaction_event::<S, T>))
    .route("/commands",        post(command::<S, T>))
    .with_state(AppState::new(ctx))
    .nest("/api", helpbot_api::api_router(Arc::clone(&ctx.store)))
    .layer(middleware::from_fn_with_state(Arc::new(credentials), auth::require_auth))
    .layer(TraceLayer::new_for_http())
}

// ─── Route handlers ──────────────────────────────────────────────────────────

async fn message_event<S, T>(
  State(state): State<AppState<S, T>>,
  Json(message): Json<InboundMessage>,
) -> (StatusCode, Json<IntakeOutcome>)
where
  S: ThreadStore + 'static,
  T: Transport + 'static,
{
  let outcome = state.intake.on_message(message).await;
  (StatusCode::ACCEPTED, Json(outcome))
}

async fn reaction_event<S, T>(
  State(state): State<AppState<S, T>>,
  Json(event): Json<ReactionEvent>,
) -> Json<VoteOutcome>
where
  S: ThreadStore + 'static,
  T: Transport + 'static,
{
  Json(state.votes.on_reaction(event).await)
}

async fn command<S, T>(
  State(state): State<AppState<S, T>>,
  Json(invocation): Json<CommandInvocation>,
) -> Json<CommandReply>
where
  S: ThreadStore + 'static,
  T: Transport + 'static,
{
  Json(state.commands.handle(invocation).await)
}

#[cfg(test)]
mod tests;
