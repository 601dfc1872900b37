//! Chunked delivery with rate-limit backoff.
//!
//! Long text is split on whitespace into units that fit the platform's embed
//! limit; each unit is posted in order. A rate-limited unit is retried with
//! exponential backoff, any other failure abandons just that unit.

use std::{future::Future, sync::Arc};

use helpbot_core::{
  id::{ChannelId, MessageId},
  transport::{Color, Embed, PostedMessage, Transport, TransportError},
};
use tracing::{debug, warn};

use crate::config::DeliveryPolicy;

// ─── Splitting ───────────────────────────────────────────────────────────────

/// Split `text` into chunks of at most `max_len` characters.
///
/// A chunk ends at the last whitespace character within its first
/// `max_len + 1` characters; that one whitespace character is dropped and
/// the text after it always starts a new chunk, even when nothing is left.
/// A chunk without such whitespace is cut hard at `max_len`. Empty text
/// yields no chunks.
pub fn split_content(text: &str, max_len: usize) -> Vec<&str> {
  let max_len = max_len.max(1);
  let mut chunks = Vec::new();
  if text.is_empty() {
    return chunks;
  }

  let mut rest = text;
  loop {
    // Byte offset of character `max_len`; absent when the rest fits.
    let Some((cut, next)) = rest.char_indices().nth(max_len) else {
      chunks.push(rest);
      break;
    };

    let window = &rest[..cut + next.len_utf8()];
    let boundary = window
      .char_indices()
      .rev()
      .find(|&(i, c)| i > 0 && c.is_whitespace());

    match boundary {
      Some((i, ws)) => {
        chunks.push(&rest[..i]);
        rest = &rest[i + ws.len_utf8()..];
      }
      None => {
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
      }
    }
  }

  chunks
}

// ─── Delivery ────────────────────────────────────────────────────────────────

/// Posts formatted units through a [`Transport`].
pub struct Delivery<T> {
  transport: Arc<T>,
  policy:    DeliveryPolicy,
}

impl<T: Transport> Delivery<T> {
  pub fn new(transport: Arc<T>, policy: DeliveryPolicy) -> Self {
    Self { transport, policy }
  }

  /// Post `text` as one or more units titled `title`.
  ///
  /// `footer` goes on the last unit only. Returns the last unit that was
  /// posted, or `None` if nothing was.
  pub async fn deliver_long(
    &self,
    channel: ChannelId,
    title: &str,
    text: &str,
    color: Color,
    footer: Option<&str>,
  ) -> Option<PostedMessage> {
    // Blank chunks have nothing to show and the platform rejects them.
    let chunks: Vec<&str> = split_content(text, self.policy.max_unit_len)
      .into_iter()
      .filter(|chunk| !chunk.trim().is_empty())
      .collect();
    let last = chunks.len().saturating_sub(1);

    let mut posted = None;
    for (i, chunk) in chunks.into_iter().enumerate() {
      let mut embed = Embed::new(title, color).description(chunk);
      if i == last
        && let Some(footer) = footer
      {
        embed = embed.footer(footer);
      }
      if let Some(handle) = self.send_with_backoff(channel, embed).await {
        posted = Some(handle);
      }
    }
    posted
  }

  /// Post `text` as a single unit without splitting.
  pub async fn deliver(
    &self,
    channel: ChannelId,
    title: &str,
    text: &str,
    color: Color,
  ) -> Option<PostedMessage> {
    let mut embed = Embed::new(title, color);
    if !text.is_empty() {
      embed = embed.description(text);
    }
    self.send_with_backoff(channel, embed).await
  }

  /// Post one embed, retrying while rate limited. Gives up (with a warning)
  /// after `max_attempts` or on the first non-rate-limit error.
  pub async fn send_with_backoff(&self, channel: ChannelId, embed: Embed) -> Option<PostedMessage> {
    let transport = &*self.transport;
    let unit = &embed;
    let result = self
      .retry(move || transport.send_embed(channel, unit.clone()))
      .await;
    match result {
      Ok(posted) => Some(posted),
      Err(e) => {
        warn!(%channel, title = %embed.title, error = %e, "unit abandoned");
        None
      }
    }
  }

  /// Replace a message's embed, retrying while rate limited.
  pub async fn edit_with_backoff(
    &self,
    channel: ChannelId,
    message: MessageId,
    embed: Embed,
  ) -> Result<(), TransportError> {
    let transport = &*self.transport;
    let embed = &embed;
    self
      .retry(move || transport.edit_embed(channel, message, embed.clone()))
      .await
  }

  /// Add a reaction, retrying while rate limited.
  pub async fn react_with_backoff(
    &self,
    channel: ChannelId,
    message: MessageId,
    emoji: &str,
  ) -> Result<(), TransportError> {
    let transport = &*self.transport;
    self
      .retry(move || transport.add_reaction(channel, message, emoji))
      .await
  }

  /// Run `op` until it succeeds, fails with something other than a rate
  /// limit, or runs out of attempts. Returns the last error in the latter
  /// two cases.
  async fn retry<R, F, Fut>(&self, mut op: F) -> Result<R, TransportError>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<R, TransportError>>,
  {
    let attempts = self.policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_rate_limit() && attempt + 1 < attempts => {
          let delay = self.policy.backoff(attempt, e.retry_after());
          debug!(attempt = attempt + 1, ?delay, "rate limited, backing off");
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::testing::{Call, FakeTransport};

  fn fast_policy(max_unit_len: usize) -> DeliveryPolicy {
    DeliveryPolicy {
      max_unit_len,
      max_attempts: 5,
      base_delay: Duration::from_millis(1),
    }
  }

  fn delivery(transport: &Arc<FakeTransport>, max_unit_len: usize) -> Delivery<FakeTransport> {
    Delivery::new(Arc::clone(transport), fast_policy(max_unit_len))
  }

  // ── split_content ─────────────────────────────────────────────────────────

  #[test]
  fn short_text_is_one_chunk() {
    assert_eq!(split_content("hello world", 4096), ["hello world"]);
  }

  #[test]
  fn empty_text_has_no_chunks() {
    assert!(split_content("", 10).is_empty());
  }

  #[test]
  fn splits_on_last_space_within_limit() {
    assert_eq!(split_content("aaa bbb ccc", 7), ["aaa bbb", "ccc"]);
    // The space right after the limit still counts as a boundary.
    assert_eq!(split_content("aaaa bbbb", 4), ["aaaa", "bbbb"]);
  }

  #[test]
  fn hard_splits_without_whitespace() {
    assert_eq!(split_content("abcdefghij", 4), ["abcd", "efgh", "ij"]);
  }

  #[test]
  fn leading_whitespace_is_not_a_boundary() {
    assert_eq!(split_content(" abcdef", 3), [" ab", "cde", "f"]);
  }

  #[test]
  fn counts_characters_not_bytes() {
    let text = "ééé ééé";
    assert_eq!(split_content(text, 3), ["ééé", "ééé"]);
  }

  #[test]
  fn chunks_rejoin_to_the_input() {
    let words: Vec<String> = (0..400).map(|i| format!("word{i}")).collect();
    let text = words.join(" ");
    for max in [7, 10, 64, 100, 4096] {
      let chunks = split_content(&text, max);
      assert!(chunks.iter().all(|c| c.chars().count() <= max), "max {max}");
      assert_eq!(chunks.join(" "), text, "max {max}");
    }
  }

  #[test]
  fn trailing_boundary_leaves_an_empty_chunk() {
    assert_eq!(split_content("ab ", 2), ["ab", ""]);
    assert_eq!(split_content("ab  ", 2), ["ab", " "]);
  }

  /// Every word here is shorter than the limit, so every boundary is a
  /// whitespace one and joining with a single space is exact.
  #[test]
  fn chunks_rejoin_with_leading_trailing_and_doubled_whitespace() {
    let fixed = [
      "ab ",
      " ab",
      "  ab",
      "a  b",
      "aa  bb  cc  ",
      "   lead and trail   ",
      "one two  three   four    five ",
      "    ",
      " ",
    ];
    let words = ["a", "bb", "ccc", "dddd", "eeeee"];
    let gaps = ["", " ", "  ", "   "];
    let mut seed: u64 = 0x2545_f491;
    let mut pick = |n: usize| {
      seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
      (seed >> 33) as usize % n
    };
    let generated: Vec<String> = (0..200)
      .map(|_| {
        let mut text = gaps[pick(gaps.len())].to_string();
        for _ in 0..30 {
          text.push_str(words[pick(words.len())]);
          text.push_str(gaps[1 + pick(gaps.len() - 1)]);
        }
        if pick(2) == 0 {
          text.push_str(words[pick(words.len())]);
        }
        text
      })
      .collect();

    for text in fixed.iter().copied().chain(generated.iter().map(String::as_str)) {
      for max in [6, 8, 13, 64] {
        let chunks = split_content(text, max);
        assert!(chunks.iter().all(|c| c.chars().count() <= max), "{text:?} max {max}");
        assert_eq!(chunks.join(" "), text, "max {max}");
      }
    }
    assert_eq!(split_content("ab ", 2).join(" "), "ab ");
  }

  // ── Delivery ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn deliver_long_posts_every_chunk_with_footer_on_last() {
    let transport = Arc::new(FakeTransport::new());
    let posted = delivery(&transport, 7)
      .deliver_long(ChannelId(5), "T", "aaa bbb ccc", Color::BLUE, Some("end"))
      .await
      .unwrap();

    let sends = transport.sent_embeds(ChannelId(5));
    assert_eq!(sends.len(), 2);
    assert_eq!(sends[0].description.as_deref(), Some("aaa bbb"));
    assert_eq!(sends[0].footer, None);
    assert_eq!(sends[1].description.as_deref(), Some("ccc"));
    assert_eq!(sends[1].footer.as_deref(), Some("end"));
    assert_eq!(Some(posted.message_id), transport.last_posted());
  }

  #[tokio::test]
  async fn deliver_long_with_empty_text_posts_nothing() {
    let transport = Arc::new(FakeTransport::new());
    let posted = delivery(&transport, 10)
      .deliver_long(ChannelId(5), "T", "", Color::BLUE, None)
      .await;
    assert!(posted.is_none());
    assert!(transport.calls().is_empty());
  }

  #[tokio::test]
  async fn blank_chunks_are_not_posted() {
    let transport = Arc::new(FakeTransport::new());
    delivery(&transport, 3)
      .deliver_long(ChannelId(5), "T", "abc ", Color::BLUE, Some("end"))
      .await
      .unwrap();

    let sends = transport.sent_embeds(ChannelId(5));
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].description.as_deref(), Some("abc"));
    assert_eq!(sends[0].footer.as_deref(), Some("end"));
  }

  #[tokio::test]
  async fn rate_limited_send_is_retried() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_sends([
      TransportError::RateLimited { retry_after: None },
      TransportError::RateLimited { retry_after: Some(Duration::from_millis(2)) },
    ]);

    let posted = delivery(&transport, 100)
      .deliver(ChannelId(5), "T", "hi", Color::BLUE)
      .await;
    assert!(posted.is_some());
    assert_eq!(transport.send_attempts(), 3);
    assert_eq!(transport.sent_embeds(ChannelId(5)).len(), 1);
  }

  #[tokio::test]
  async fn rate_limit_exhaustion_abandons_only_that_unit() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_sends(std::iter::repeat_n(
      TransportError::RateLimited { retry_after: None },
      5,
    ));

    let posted = delivery(&transport, 3)
      .deliver_long(ChannelId(5), "T", "aaa bbb", Color::BLUE, None)
      .await;

    // First unit burns all five attempts, the second goes through.
    assert_eq!(transport.send_attempts(), 6);
    let sends = transport.sent_embeds(ChannelId(5));
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].description.as_deref(), Some("bbb"));
    assert!(posted.is_some());
  }

  #[tokio::test]
  async fn other_errors_are_not_retried() {
    let transport = Arc::new(FakeTransport::new());
    transport.fail_sends([TransportError::Forbidden]);

    let posted = delivery(&transport, 100)
      .deliver(ChannelId(5), "T", "hi", Color::BLUE)
      .await;
    assert!(posted.is_none());
    assert_eq!(transport.send_attempts(), 1);
    assert!(!transport.calls().iter().any(|c| matches!(c, Call::Send { .. })));
  }
}
