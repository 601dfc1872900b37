//! Platform identifiers.
//!
//! Every id handed out by the chat platform is a 64-bit snowflake. They are
//! wrapped in newtypes so a message id cannot be passed where a channel id is
//! expected. On the wire (and in the store) they travel as decimal strings;
//! deserialisation also accepts plain JSON numbers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Error;

#[derive(Deserialize)]
#[serde(untagged)]
enum SnowflakeRepr {
  Number(u64),
  Text(String),
}

macro_rules! snowflake {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct $name(pub u64);

    impl $name {
      pub const fn get(self) -> u64 { self.0 }
    }

    impl From<u64> for $name {
      fn from(value: u64) -> Self { Self(value) }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl FromStr for $name {
      type Err = Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
          .parse::<u64>()
          .map(Self)
          .map_err(|_| Error::InvalidId(s.to_owned()))
      }
    }

    impl Serialize for $name {
      fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
      }
    }

    impl<'de> Deserialize<'de> for $name {
      fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match SnowflakeRepr::deserialize(deserializer)? {
          SnowflakeRepr::Number(n) => Ok(Self(n)),
          SnowflakeRepr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
      }
    }
  };
}

snowflake!(
  /// A guild (server) on the chat platform.
  GuildId
);
snowflake!(
  /// A text channel, forum channel or thread. A thread's id doubles as the
  /// primary key of its [`Thread`](crate::thread::Thread) record.
  ChannelId
);
snowflake!(
  /// A single chat message.
  MessageId
);
snowflake!(
  /// A platform user (humans and the bot itself).
  UserId
);
snowflake!(
  /// A guild role, used for the moderator permission check.
  RoleId
);

impl MessageId {
  /// The channel whose id equals this message id, i.e. the thread that this
  /// message started.
  pub const fn as_thread(self) -> ChannelId { ChannelId(self.0) }
}
