//! User-facing text and embed builders.

use helpbot_core::{
  id::{ChannelId, GuildId, MessageId, UserId},
  lifecycle::Announcement,
  transport::{Color, Embed},
};

use crate::lifecycle::StatusView;

// ─── Constants ───────────────────────────────────────────────────────────────

pub const POSITIVE_EMOJI: &str = "✅";
pub const NEGATIVE_EMOJI: &str = "❌";

pub const CONTROLLER_TITLE: &str = "Help Bot Thread Information";
pub const RESPONSE_TITLE: &str = "Help Response";
pub const RESPONSE_SOURCES_TITLE: &str = "Help Response Sources";
pub const STATUS_TITLE: &str = "Thread Status";

pub const SOLVED_MESSAGE: &str = "This post has been marked as solved!";
pub const UNSOLVED_MESSAGE: &str =
  "Hmm... At one point this post was marked as solved, but it no longer is. Maybe this is out of date?";
pub const OPENED_MESSAGE: &str = "This post has been re-opened.";
pub const CLOSED_MESSAGE: &str = "This post has been closed.";

pub const UNAVAILABLE_COMMAND: &str = "This command is unavailable here.";

const LOADING_MESSAGES: [&str; 9] = [
  "🤖 Compiling the latest insights for you. 🔄 please wait a second... beep boop",
  "🤖 Tuning in to the data frequencies. 📡 please wait a second... beep boop",
  "🤖 Gathering bytes and bits. 🧲 please wait a second... beep boop",
  "🤖 Calibrating response parameters. 🎛️ please wait a second... beep boop",
  "🤖 Sifting through digital archives. 🗄️ please wait a second... beep boop",
  "🤖 Engaging cognitive circuits. 💡 please wait a second... beep boop",
  "🤖 Deciphering the code matrix. 🧬 please wait a second... beep boop",
  "🤖 Navigating through the information maze. 🌐 please wait a second... beep boop",
  "🤖 Assembling the pieces of the puzzle. 🧩 please wait a second... beep boop",
];

/// A loading line, picked deterministically from the message that asked.
pub fn loading_message(seed: MessageId) -> &'static str {
  LOADING_MESSAGES[(seed.get() % LOADING_MESSAGES.len() as u64) as usize]
}

// ─── Links ───────────────────────────────────────────────────────────────────

pub fn thread_link(guild: GuildId, thread: ChannelId) -> String {
  format!("https://discord.com/channels/{guild}/{thread}")
}

pub fn message_link(guild: GuildId, channel: ChannelId, message: MessageId) -> String {
  format!("https://discord.com/channels/{guild}/{channel}/{message}")
}

// ─── Controller ──────────────────────────────────────────────────────────────

/// The placeholder controller posted when a thread is first seen.
pub fn controller_loading(seed: MessageId) -> Embed {
  Embed::new(CONTROLLER_TITLE, Color::GOLD).description(loading_message(seed))
}

/// The voting banner the controller shows once an answer has arrived.
pub fn help_banner(author: UserId, bot: UserId, source_link: Option<&str>) -> String {
  let mut text = format!(
    "<@{author}> can react to **this message** with a {POSITIVE_EMOJI} once the thread is \
     solved, whether the answer came from the bot or from a person.\n\n\
     Anyone can react to **this message** with a {NEGATIVE_EMOJI} if the bot's answer is \
     unhelpful or made up.\n\n\
     To keep talking to the bot, reply in this thread and mention <@{bot}>.\n\n\
     Threads are used to improve the bot over time, so constructive conversations help \
     everyone. Answers are generated from our documentation and may be wrong; please verify \
     them against the linked sources.\n\n"
  );
  if let Some(link) = source_link {
    text.push_str(&format!("Source code: {link}\n\n"));
  }
  text.push_str("For a list of available commands, type `/commands`.");
  text
}

pub fn controller_banner(author: UserId, bot: UserId, source_link: Option<&str>) -> Embed {
  Embed::new(CONTROLLER_TITLE, Color::GOLD).description(help_banner(author, bot, source_link))
}

// ─── Announcements ───────────────────────────────────────────────────────────

pub fn announcement_text(announcement: Announcement) -> &'static str {
  match announcement {
    Announcement::Opened => OPENED_MESSAGE,
    Announcement::Closed => CLOSED_MESSAGE,
    Announcement::Solved => SOLVED_MESSAGE,
    Announcement::Unsolved => UNSOLVED_MESSAGE,
  }
}

pub fn announcement_color(announcement: Announcement) -> Color {
  match announcement {
    Announcement::Solved => Color::GREEN,
    Announcement::Unsolved => Color::RED,
    Announcement::Opened | Announcement::Closed => Color::GOLD,
  }
}

/// The controller after a lifecycle transition.
pub fn controller_update(announcement: Announcement) -> Embed {
  Embed::new(CONTROLLER_TITLE, announcement_color(announcement))
    .description(announcement_text(announcement))
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn status_embed(view: &StatusView) -> Embed {
  let color = if view.state.solved { Color::GREEN } else { Color::GOLD };
  Embed::new(&view.title, color)
    .field("Thread", &view.thread_link, false)
    .field("Controller", &view.controller_link, false)
    .field("Status", view.state.open_label(), true)
    .field("Solution", view.state.solved_label(), true)
    .field(format!("{POSITIVE_EMOJI} votes"), view.solved_votes.to_string(), true)
    .field(format!("{NEGATIVE_EMOJI} votes"), view.failed_votes.to_string(), true)
}

// ─── Command replies ─────────────────────────────────────────────────────────

pub fn notice(title: &str) -> Embed { Embed::new(title, Color::RED) }

/// Lists the forums where thread commands work.
pub fn allowed_channels(channels: &[ChannelId]) -> Embed {
  let list = channels
    .iter()
    .map(|id| format!("- <#{id}>"))
    .collect::<Vec<_>>()
    .join("\n");
  Embed::new("This command only works in help forum threads", Color::RED)
    .description(format!("Allowed channels:\n{list}"))
}

pub fn commands_help() -> Embed {
  Embed::new("Commands Help", Color::BLUE).description(
    "`/open` re-opens a closed thread.\n\
     `/close` closes and archives the thread.\n\
     `/solve` marks the thread as solved.\n\
     `/unsolve` marks the thread as unsolved.\n\
     `/status` shows the thread's current status.\n\
     `/collections` lists the searchable document collections.\n\
     `/info` tells you about this bot.\n\
     `/commands` shows this message.\n\n\
     Only the thread's author or a moderator can open, close, solve or unsolve a thread.",
  )
}

pub fn info(source_link: Option<&str>) -> Embed {
  let mut text = String::from(
    "This bot answers questions in the help forums using our documentation. Mention it in a \
     thread to ask a follow-up, and vote on the thread's controller message to tell us \
     whether the answer helped.",
  );
  if let Some(link) = source_link {
    text.push_str(&format!("\n\nThe source code lives at {link}"));
  }
  Embed::new("About the Help Bot", Color::BLUE).description(text)
}

pub fn collections(names: &[String]) -> Embed {
  let description = if names.is_empty() {
    "No collections are available.".to_owned()
  } else {
    names.iter().map(|n| format!("- `{n}`")).collect::<Vec<_>>().join("\n")
  };
  Embed::new("The available document collections are:", Color::BLUE).description(description)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn loading_message_is_stable_per_seed() {
    assert_eq!(loading_message(MessageId(9)), loading_message(MessageId(18)));
    assert!(loading_message(MessageId(1)).starts_with("🤖"));
  }

  #[test]
  fn links_point_into_the_guild() {
    assert_eq!(
      thread_link(GuildId(1), ChannelId(2)),
      "https://discord.com/channels/1/2"
    );
    assert_eq!(
      message_link(GuildId(1), ChannelId(2), MessageId(3)),
      "https://discord.com/channels/1/2/3"
    );
  }

  #[test]
  fn banner_mentions_author_and_bot() {
    let text = help_banner(UserId(7), UserId(1), Some("https://example.org/src"));
    assert!(text.contains("<@7>"));
    assert!(text.contains("<@1>"));
    assert!(text.contains("https://example.org/src"));
    assert!(!help_banner(UserId(7), UserId(1), None).contains("Source code"));
  }
}
