//! helpbot server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, connects to Discord, starts the polling dispatcher and serves
//! the event ingress and JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash` in config.toml:
//!
//! ```
//! cargo run -p helpbot-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use helpbot_core::{store::ThreadStore, transport::Transport};
use helpbot_engine::{Context, dispatcher::Dispatcher};
use helpbot_server::{ServerConfig, auth::AuthConfig, discord::DiscordTransport};
use helpbot_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::{net::TcpListener, sync::watch};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Forum help bot server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("HELPBOT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  let engine_cfg = server_cfg.engine_config().context("invalid engine configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  for collection in engine_cfg.channels.values() {
    store
      .ensure_collection(collection)
      .await
      .with_context(|| format!("failed to register collection {collection:?}"))?;
  }

  let transport = DiscordTransport::connect(
    &server_cfg.discord_api_base,
    &server_cfg.discord_token,
    server_cfg.guild_id,
    server_cfg.request_timeout(),
  )
  .await
  .context("failed to connect to discord")?;
  let bot = transport.bot_user_id();
  tracing::info!(%bot, tracked = engine_cfg.channels.len(), "connected to discord");

  let ctx = Context::new(Arc::new(store), Arc::new(transport), Arc::new(engine_cfg));
  ctx.log_line(&format!("The bot has logged in as <@{bot}>")).await;

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let dispatcher = tokio::spawn(Dispatcher::new(ctx.clone()).run(shutdown_rx));

  let app = helpbot_server::router(&ctx, AuthConfig {
    username:      server_cfg.auth_username.clone(),
    password_hash: server_cfg.auth_password_hash.clone(),
  });
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
      }
      tracing::info!("shutting down");
      let _ = shutdown_tx.send(true);
    })
    .await
    .context("server error")?;

  dispatcher.await.context("dispatcher task panicked")?;
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
