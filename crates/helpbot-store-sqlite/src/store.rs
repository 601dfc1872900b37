//! [`SqliteStore`]: the SQLite implementation of [`ThreadStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use helpbot_core::{
  id::{ChannelId, MessageId},
  lifecycle::ThreadState,
  message::{ClaimedMessage, Message, NewMessage},
  store::ThreadStore,
  thread::{NewThread, Thread, ThreadQuery},
};

use crate::{
  encode::{
    encode_dt, RawClaimed, RawMessage, RawThread, MESSAGE_COLUMNS, THREAD_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A helpbot store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All
/// statements run on one connection, so SQLite serialises every operation;
/// the claim additionally runs inside an `IMMEDIATE` transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn thread_where(&self, column: &'static str, key: String) -> Result<Option<Thread>> {
    let raw: Option<RawThread> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {THREAD_COLUMNS} FROM threads WHERE {column} = ?1"),
            rusqlite::params![key],
            RawThread::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawThread::into_thread).transpose()
  }
}

// ─── ThreadStore impl ────────────────────────────────────────────────────────

impl ThreadStore for SqliteStore {
  type Error = Error;

  // ── Threads ───────────────────────────────────────────────────────────────

  async fn insert_thread(&self, input: NewThread) -> Result<Thread> {
    let now = Utc::now();
    let thread = Thread {
      thread_id:            input.thread_id,
      thread_controller_id: input.thread_controller_id,
      title:                input.title,
      author_id:            input.author_id,
      collection:           input.collection,
      open:                 input.state.open,
      solved:               input.state.solved,
      solved_votes:         0,
      failed_votes:         0,
      created_at:           now,
      updated_at:           now,
    };

    let id_str         = thread.thread_id.to_string();
    let controller_str = thread.thread_controller_id.to_string();
    let author_str     = thread.author_id.to_string();
    let title          = thread.title.clone();
    let collection     = thread.collection.clone();
    let (open, solved) = (thread.open, thread.solved);
    let at_str         = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO threads (
             thread_id, thread_controller_id, title, author_id, collection,
             open, solved, solved_votes, failed_votes, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, ?8)",
          rusqlite::params![
            id_str,
            controller_str,
            title,
            author_str,
            collection,
            open,
            solved,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(thread)
  }

  async fn get_thread(&self, thread_id: ChannelId) -> Result<Option<Thread>> {
    self.thread_where("thread_id", thread_id.to_string()).await
  }

  async fn get_thread_by_controller(&self, controller_id: MessageId) -> Result<Option<Thread>> {
    self
      .thread_where("thread_controller_id", controller_id.to_string())
      .await
  }

  async fn update_votes(
    &self,
    thread_id:    ChannelId,
    failed_delta: i64,
    solved_delta: i64,
  ) -> Result<()> {
    let id_str = thread_id.to_string();
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE threads
              SET failed_votes = failed_votes + ?2,
                  solved_votes = solved_votes + ?3,
                  updated_at   = ?4
            WHERE thread_id = ?1",
          rusqlite::params![id_str, failed_delta, solved_delta, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ThreadNotFound(thread_id));
    }
    Ok(())
  }

  async fn set_thread_state(&self, thread_id: ChannelId, state: ThreadState) -> Result<()> {
    let id_str = thread_id.to_string();
    let at_str = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE threads SET open = ?2, solved = ?3, updated_at = ?4 WHERE thread_id = ?1",
          rusqlite::params![id_str, state.open, state.solved, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ThreadNotFound(thread_id));
    }
    Ok(())
  }

  async fn list_threads(&self, query: &ThreadQuery) -> Result<Vec<Thread>> {
    let open       = query.open;
    let solved     = query.solved;
    let collection = query.collection.clone();
    let limit_val  = query.limit.unwrap_or(100) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawThread> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {THREAD_COLUMNS} FROM threads
            WHERE (?1 IS NULL OR open = ?1)
              AND (?2 IS NULL OR solved = ?2)
              AND (?3 IS NULL OR collection = ?3)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?4 OFFSET ?5"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![open, solved, collection, limit_val, offset_val],
            RawThread::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawThread::into_thread).collect()
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn insert_message(&self, input: NewMessage) -> Result<Message> {
    let now = Utc::now();
    let message = Message {
      message_id:    input.message_id,
      thread_id:     input.thread_id,
      content:       input.content,
      sources:       input.sources,
      from_bot:      input.from_bot,
      first_message: input.first_message,
      mentions_bot:  input.mentions_bot,
      processed:     input.processed,
      created_at:    now,
      updated_at:    now,
    };

    let message_id = message.message_id.clone();
    let thread_str = message.thread_id.to_string();
    let content    = message.content.clone();
    let sources    = message.sources.clone();
    let flags      = (
      message.from_bot,
      message.first_message,
      message.mentions_bot,
      message.processed,
    );
    let at_str     = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO messages (
             message_id, thread_id, content, sources,
             from_bot, first_message, mentions_bot, processed,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            message_id, thread_str, content, sources, flags.0, flags.1, flags.2, flags.3, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(message)
  }

  async fn claim_unprocessed_bot_messages(&self) -> Result<Vec<ClaimedMessage>> {
    let at_str = encode_dt(Utc::now());

    let raws: Vec<RawClaimed> = self
      .conn
      .call(move |conn| {
        // Select and mark in one write transaction: a row read here can never
        // be read by another claim.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = {
          let mut select = tx.prepare(
            "SELECT m.message_id, m.thread_id, m.content, m.sources, m.created_at,
                    t.thread_controller_id, t.author_id
               FROM messages m
               JOIN threads t ON t.thread_id = m.thread_id
              WHERE m.from_bot = 1 AND m.processed = 0
              ORDER BY m.created_at, m.rowid",
          )?;
          select
            .query_map([], |row| {
              Ok(RawClaimed {
                message_id:           row.get(0)?,
                thread_id:            row.get(1)?,
                content:              row.get(2)?,
                sources:              row.get(3)?,
                created_at:           row.get(4)?,
                thread_controller_id: row.get(5)?,
                author_id:            row.get(6)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        {
          let mut mark = tx.prepare(
            "UPDATE messages SET processed = 1, updated_at = ?2
              WHERE message_id = ?1 AND processed = 0",
          )?;
          for raw in &rows {
            mark.execute(rusqlite::params![raw.message_id, at_str])?;
          }
        }

        tx.commit()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawClaimed::into_claimed).collect()
  }

  async fn list_messages(&self, thread_id: ChannelId) -> Result<Vec<Message>> {
    let id_str = thread_id.to_string();

    let raws: Vec<RawMessage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE thread_id = ?1
            ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawMessage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMessage::into_message).collect()
  }

  // ── Collections ───────────────────────────────────────────────────────────

  async fn list_collections(&self) -> Result<Vec<String>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
          let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn ensure_collection(&self, name: &str) -> Result<()> {
    let name = name.trim().to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
          rusqlite::params![name],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
