//! Thread lifecycle states and the transition table.
//!
//! A thread's state is the pair `(open, solved)`. Each of the four commands
//! has a precondition on that pair; when it holds, [`plan`] yields the next
//! state together with an ordered list of [`Effect`]s for the executor to
//! carry out. Planning is pure so the whole table can be tested without a
//! store or a transport.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── State ───────────────────────────────────────────────────────────────────

/// The two independent lifecycle flags of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadState {
  pub open:   bool,
  pub solved: bool,
}

impl ThreadState {
  /// Every thread starts open and unsolved.
  pub const INITIAL: Self = Self { open: true, solved: false };

  pub fn open_label(self) -> &'static str {
    if self.open { "Open" } else { "Closed" }
  }

  pub fn solved_label(self) -> &'static str {
    if self.solved { "Solved" } else { "Unsolved" }
  }
}

impl Default for ThreadState {
  fn default() -> Self { Self::INITIAL }
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// A lifecycle command token, as typed by a user or implied by an author vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleCommand {
  Open,
  Close,
  Solve,
  Unsolve,
}

impl LifecycleCommand {
  pub const ALL: [Self; 4] = [Self::Open, Self::Close, Self::Solve, Self::Unsolve];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::Close => "close",
      Self::Solve => "solve",
      Self::Unsolve => "unsolve",
    }
  }

  /// The command an author vote maps to: adding the positive reaction solves,
  /// removing it unsolves.
  pub fn from_author_vote(solved: bool) -> Self {
    if solved { Self::Solve } else { Self::Unsolve }
  }

  /// Whether `state` satisfies this command's precondition.
  pub fn applies_to(self, state: ThreadState) -> bool {
    match self {
      Self::Open => !state.open,
      Self::Close => state.open,
      Self::Solve => !state.solved,
      Self::Unsolve => state.solved,
    }
  }

  /// The state after this command, ignoring the precondition.
  pub fn apply(self, state: ThreadState) -> ThreadState {
    match self {
      Self::Open => ThreadState { open: true, ..state },
      Self::Close => ThreadState { open: false, ..state },
      Self::Solve => ThreadState { solved: true, ..state },
      Self::Unsolve => ThreadState { solved: false, ..state },
    }
  }
}

impl fmt::Display for LifecycleCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for LifecycleCommand {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let token = s.trim().trim_start_matches('/');
    Self::ALL
      .into_iter()
      .find(|c| c.as_str().eq_ignore_ascii_case(token))
      .ok_or_else(|| Error::UnknownCommand(s.to_owned()))
  }
}

// ─── Effects ─────────────────────────────────────────────────────────────────

/// A message posted into the thread (and mirrored on the controller) when a
/// transition happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Announcement {
  Opened,
  Closed,
  Solved,
  Unsolved,
}

/// A side effect of a transition, executed in list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "value", rename_all = "snake_case")]
pub enum Effect {
  /// Write the new flags to the backend. Always the first effect.
  Persist(ThreadState),
  /// Un-archive the thread so messages can be posted into it.
  Unarchive,
  /// Edit the controller message to reflect the transition.
  RefreshController(Announcement),
  /// Post an announcement unit into the thread.
  Announce(Announcement),
  /// Archive the thread.
  Archive,
}

/// The result of planning a command against a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
  pub command: LifecycleCommand,
  pub from:    ThreadState,
  pub to:      ThreadState,
  pub effects: Vec<Effect>,
}

/// Plan `command` against `state`.
///
/// `archived` is the transport's current view of the thread container.
/// Returns `None` when the precondition fails; such commands are skipped
/// without side effects.
pub fn plan(
  state: ThreadState,
  command: LifecycleCommand,
  archived: bool,
) -> Option<Transition> {
  if !command.applies_to(state) {
    return None;
  }

  let to = command.apply(state);
  let mut effects = vec![Effect::Persist(to)];
  if archived {
    effects.push(Effect::Unarchive);
  }

  match command {
    LifecycleCommand::Open => {
      effects.push(Effect::RefreshController(Announcement::Opened));
      if state.solved {
        effects.push(Effect::Announce(Announcement::Solved));
      }
      effects.push(Effect::Announce(Announcement::Opened));
    }
    LifecycleCommand::Close => {
      effects.push(Effect::RefreshController(Announcement::Closed));
      effects.push(Effect::Announce(Announcement::Closed));
      if state.solved {
        effects.push(Effect::Announce(Announcement::Solved));
      }
      effects.push(Effect::Archive);
    }
    LifecycleCommand::Solve => {
      effects.push(Effect::RefreshController(Announcement::Solved));
      effects.push(Effect::Announce(Announcement::Solved));
      if archived {
        effects.push(Effect::Archive);
      }
    }
    LifecycleCommand::Unsolve => {
      effects.push(Effect::RefreshController(Announcement::Unsolved));
      effects.push(Effect::Announce(Announcement::Unsolved));
      if archived {
        effects.push(Effect::Archive);
      }
    }
  }

  Some(Transition { command, from: state, to, effects })
}
