//! `helpbot`: command-line client for the help bot's JSON API.
//!
//! Operators inspect threads with it; an answer producer can push answers
//! through `helpbot answer`.
//!
//! # Usage
//!
//! ```
//! helpbot --url http://localhost:8080 --user relay --password secret threads --open
//! helpbot --config ~/.config/helpbot/config.toml answer 1234 --sources doc.md < answer.md
//! ```

mod client;

use std::io::Read as _;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, NewAnswer, ThreadFilter};
use helpbot_core::{id::ChannelId, message::Message, thread::Thread};
use serde::Deserialize;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "helpbot", about = "Command-line client for the help bot")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the helpbot server (default: http://localhost:8080).
  #[arg(long, env = "HELPBOT_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "HELPBOT_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "HELPBOT_PASSWORD")]
  password: Option<String>,

  /// Print raw JSON instead of a table.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List threads, newest first.
  Threads {
    #[arg(long, conflicts_with = "closed")]
    open:       bool,
    #[arg(long)]
    closed:     bool,
    #[arg(long, conflicts_with = "unsolved")]
    solved:     bool,
    #[arg(long)]
    unsolved:   bool,
    #[arg(long)]
    collection: Option<String>,
    #[arg(long)]
    limit:      Option<usize>,
  },
  /// Show one thread.
  Thread { id: ChannelId },
  /// Show a thread's messages in arrival order.
  Messages { id: ChannelId },
  /// Queue an answer for delivery into a thread.
  Answer {
    id:         ChannelId,
    /// Answer text; read from stdin when omitted.
    #[arg(long)]
    content:    Option<String>,
    #[arg(long)]
    sources:    Option<String>,
    #[arg(long)]
    message_id: Option<String>,
  },
  /// List the searchable document collections.
  Collections,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// CLI flags override the config file, which overrides defaults.
fn api_config(args: &Args, file: ConfigFile) -> ApiConfig {
  let pick = |flag: &Option<String>, file: String| {
    flag.clone().or_else(|| (!file.is_empty()).then_some(file))
  };
  ApiConfig {
    base_url: pick(&args.url, file.url).unwrap_or_else(|| "http://localhost:8080".to_string()),
    username: pick(&args.user, file.username).unwrap_or_default(),
    password: pick(&args.password, file.password).unwrap_or_default(),
  }
}

/// `--open`/`--closed` style flag pairs to an optional filter value.
fn tri_state(yes: bool, no: bool) -> Option<bool> {
  match (yes, no) {
    (true, _) => Some(true),
    (_, true) => Some(false),
    _ => None,
  }
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn thread_row(t: &Thread) -> String {
  format!(
    "{:<20} {:<7} {:<9} ✅{:<3} ❌{:<3} {:<12} {}",
    t.thread_id,
    if t.open { "open" } else { "closed" },
    if t.solved { "solved" } else { "unsolved" },
    t.solved_votes,
    t.failed_votes,
    t.collection,
    t.title,
  )
}

fn message_row(m: &Message) -> String {
  let who = if m.from_bot { "bot" } else { "user" };
  let pending = if m.from_bot && !m.processed { " (pending)" } else { "" };
  let mut row = format!(
    "[{}] {who}{pending} {}\n{}",
    m.created_at.format("%Y-%m-%d %H:%M:%S"),
    m.message_id,
    m.content
  );
  if let Some(sources) = &m.sources {
    row.push_str(&format!("\nsources: {sources}"));
  }
  row
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(api_config(&args, file_cfg))?;

  match args.command {
    Command::Threads { open, closed, solved, unsolved, collection, limit } => {
      let filter = ThreadFilter {
        open: tri_state(open, closed),
        solved: tri_state(solved, unsolved),
        collection,
        limit,
      };
      let threads = client.list_threads(&filter).await?;
      if args.json {
        return print_json(&threads);
      }
      for thread in &threads {
        println!("{}", thread_row(thread));
      }
    }
    Command::Thread { id } => {
      let thread = client.get_thread(id).await?;
      if args.json {
        return print_json(&thread);
      }
      println!("{}", thread_row(&thread));
      println!("controller: {}", thread.thread_controller_id);
      println!("author:     {}", thread.author_id);
    }
    Command::Messages { id } => {
      let messages = client.list_messages(id).await?;
      if args.json {
        return print_json(&messages);
      }
      for message in &messages {
        println!("{}\n", message_row(message));
      }
    }
    Command::Answer { id, content, sources, message_id } => {
      let content = match content {
        Some(content) => content,
        None => {
          let mut buf = String::new();
          std::io::stdin().read_to_string(&mut buf).context("reading answer from stdin")?;
          buf
        }
      };
      if content.trim().is_empty() {
        bail!("answer content is empty");
      }
      let message = client
        .post_answer(id, &NewAnswer { content, sources, message_id })
        .await?;
      if args.json {
        return print_json(&message);
      }
      println!("queued {} for thread {}", message.message_id, message.thread_id);
    }
    Command::Collections => {
      let names = client.list_collections().await?;
      if args.json {
        return print_json(&names);
      }
      for name in &names {
        println!("{name}");
      }
    }
  }

  Ok(())
}
