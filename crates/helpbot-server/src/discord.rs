//! Discord REST implementation of [`Transport`].
//!
//! Every call is a single HTTP request; retrying is the engine's job. A `429`
//! surfaces as [`TransportError::RateLimited`] carrying Discord's
//! `retry_after` hint so the delivery backoff can honour it.

use std::time::Duration;

use helpbot_core::{
  id::{ChannelId, GuildId, MessageId, RoleId, UserId},
  transport::{ChannelInfo, Embed, PostedMessage, Transport, TransportError},
};
use reqwest::{
  Method, StatusCode, Url,
  header::{AUTHORIZATION, HeaderMap},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Channel types that are threads (announcement, public, private).
const THREAD_TYPES: [u8; 3] = [10, 11, 12];

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct UserObject {
  id: UserId,
}

#[derive(Deserialize)]
struct MessageObject {
  id: MessageId,
}

#[derive(Deserialize)]
struct MemberObject {
  #[serde(default)]
  roles: Vec<RoleId>,
}

#[derive(Deserialize)]
struct ThreadMetadata {
  #[serde(default)]
  archived: bool,
}

#[derive(Deserialize)]
struct ChannelObject {
  id:              ChannelId,
  #[serde(default)]
  name:            Option<String>,
  #[serde(rename = "type")]
  kind:            u8,
  #[serde(default)]
  parent_id:       Option<ChannelId>,
  #[serde(default)]
  thread_metadata: Option<ThreadMetadata>,
}

impl From<ChannelObject> for ChannelInfo {
  fn from(raw: ChannelObject) -> Self {
    ChannelInfo {
      id:        raw.id,
      name:      raw.name.unwrap_or_default(),
      parent_id: raw.parent_id,
      is_thread: THREAD_TYPES.contains(&raw.kind),
      archived:  raw.thread_metadata.is_some_and(|m| m.archived),
    }
  }
}

#[derive(Deserialize)]
struct RateLimitBody {
  retry_after: Option<f64>,
}

fn embed_json(embed: &Embed) -> Value {
  let mut value = json!({ "title": embed.title, "color": embed.color.0 });
  if let Some(description) = &embed.description {
    value["description"] = json!(description);
  }
  if let Some(footer) = &embed.footer {
    value["footer"] = json!({ "text": footer });
  }
  if !embed.fields.is_empty() {
    value["fields"] = json!(embed.fields);
  }
  value
}

fn seconds(raw: f64) -> Option<Duration> { Duration::try_from_secs_f64(raw).ok() }

/// Discord's wait hint: the `Retry-After` header, else the JSON body's
/// `retry_after` (both in seconds, possibly fractional).
fn rate_limit_hint(headers: &HeaderMap, body: &str) -> Option<Duration> {
  let header = headers
    .get("retry-after")
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse::<f64>().ok())
    .and_then(seconds);
  header.or_else(|| {
    serde_json::from_str::<RateLimitBody>(body)
      .ok()?
      .retry_after
      .and_then(seconds)
  })
}

fn other(e: impl std::fmt::Display) -> TransportError { TransportError::Other(e.to_string()) }

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct DiscordTransport {
  client:   reqwest::Client,
  api_base: Url,
  auth:     String,
  guild_id: GuildId,
  bot_id:   UserId,
}

impl DiscordTransport {
  /// Build the client and resolve the bot's own user id.
  pub async fn connect(
    api_base: &str,
    token: &str,
    guild_id: GuildId,
    timeout: Duration,
  ) -> Result<Self, TransportError> {
    let client = reqwest::Client::builder().timeout(timeout).build().map_err(other)?;
    let api_base = Url::parse(api_base.trim().trim_end_matches('/'))
      .map_err(|e| TransportError::Other(format!("invalid discord api base: {e}")))?;

    let mut transport = Self {
      client,
      api_base,
      auth: format!("Bot {}", token.trim()),
      guild_id,
      bot_id: UserId(0),
    };
    let me: UserObject = transport.json(Method::GET, &["users", "@me"], None).await?;
    transport.bot_id = me.id;
    Ok(transport)
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
    let mut url = self.api_base.clone();
    url
      .path_segments_mut()
      .map_err(|_| TransportError::Other(format!("{} cannot be a base url", self.api_base)))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  async fn execute(
    &self,
    method: Method,
    segments: &[&str],
    body: Option<Value>,
  ) -> Result<reqwest::Response, TransportError> {
    let url = self.endpoint(segments)?;
    debug!(%method, %url, "discord request");

    let mut request = self
      .client
      .request(method, url)
      .header(AUTHORIZATION, self.auth.as_str());
    if let Some(body) = body {
      request = request.json(&body);
    }
    let response = request.send().await.map_err(other)?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let headers = response.headers().clone();
    let text = response.text().await.unwrap_or_default();
    Err(match status {
      StatusCode::TOO_MANY_REQUESTS => {
        TransportError::RateLimited { retry_after: rate_limit_hint(&headers, &text) }
      }
      StatusCode::NOT_FOUND => TransportError::NotFound,
      StatusCode::FORBIDDEN => TransportError::Forbidden,
      _ => TransportError::Other(format!("discord returned {status}: {text}")),
    })
  }

  async fn json<R>(
    &self,
    method: Method,
    segments: &[&str],
    body: Option<Value>,
  ) -> Result<R, TransportError>
  where
    R: for<'de> Deserialize<'de>,
  {
    self
      .execute(method, segments, body)
      .await?
      .json::<R>()
      .await
      .map_err(other)
  }
}

impl Transport for DiscordTransport {
  fn bot_user_id(&self) -> UserId { self.bot_id }

  async fn send_embed(
    &self,
    channel: ChannelId,
    embed: Embed,
  ) -> Result<PostedMessage, TransportError> {
    let channel_seg = channel.to_string();
    let posted: MessageObject = self
      .json(
        Method::POST,
        &["channels", channel_seg.as_str(), "messages"],
        Some(json!({ "embeds": [embed_json(&embed)] })),
      )
      .await?;
    Ok(PostedMessage { channel_id: channel, message_id: posted.id })
  }

  async fn edit_embed(
    &self,
    channel: ChannelId,
    message: MessageId,
    embed: Embed,
  ) -> Result<(), TransportError> {
    let (channel_seg, message_seg) = (channel.to_string(), message.to_string());
    self
      .execute(
        Method::PATCH,
        &["channels", channel_seg.as_str(), "messages", message_seg.as_str()],
        Some(json!({ "embeds": [embed_json(&embed)] })),
      )
      .await?;
    Ok(())
  }

  async fn add_reaction(
    &self,
    channel: ChannelId,
    message: MessageId,
    emoji: &str,
  ) -> Result<(), TransportError> {
    let (channel_seg, message_seg) = (channel.to_string(), message.to_string());
    let path = [
      "channels",
      channel_seg.as_str(),
      "messages",
      message_seg.as_str(),
      "reactions",
      emoji,
      "@me",
    ];
    self.execute(Method::PUT, &path, None).await?;
    Ok(())
  }

  async fn channel_info(&self, channel: ChannelId) -> Result<ChannelInfo, TransportError> {
    let channel_seg = channel.to_string();
    let raw: ChannelObject = self.json(Method::GET, &["channels", channel_seg.as_str()], None).await?;
    Ok(raw.into())
  }

  async fn set_archived(&self, channel: ChannelId, archived: bool) -> Result<(), TransportError> {
    let channel_seg = channel.to_string();
    self
      .execute(
        Method::PATCH,
        &["channels", channel_seg.as_str()],
        Some(json!({ "archived": archived })),
      )
      .await?;
    Ok(())
  }

  async fn member_roles(&self, user: UserId) -> Result<Vec<RoleId>, TransportError> {
    let (guild_seg, user_seg) = (self.guild_id.to_string(), user.to_string());
    let member: MemberObject = self
      .json(Method::GET, &["guilds", guild_seg.as_str(), "members", user_seg.as_str()], None)
      .await?;
    Ok(member.roles)
  }
}
