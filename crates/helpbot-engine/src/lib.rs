//! The delivery and lifecycle engine of the help bot.
//!
//! Four components share one persisted [`Thread`](helpbot_core::thread::Thread)
//! record and run on independent triggers:
//!
//! - [`dispatcher::Dispatcher`] polls the store for producer answers and posts
//!   them (timer);
//! - [`votes::VoteAggregator`] counts reactions on controller messages
//!   (reaction events);
//! - [`lifecycle::Lifecycle`] applies open/close/solve/unsolve transitions
//!   (commands and author votes);
//! - [`delivery::Delivery`] splits long text and retries rate-limited sends
//!   (used by all of the above).
//!
//! [`intake::Intake`] and [`commands::Commands`] are the message and slash
//! command entry points. Everything is generic over a
//! [`ThreadStore`](helpbot_core::store::ThreadStore) and a
//! [`Transport`](helpbot_core::transport::Transport) and receives both through
//! a shared [`Context`].

pub mod commands;
pub mod config;
pub mod context;
pub mod delivery;
pub mod dispatcher;
pub mod intake;
pub mod lifecycle;
pub mod render;
pub mod votes;

#[cfg(test)]
mod testing;

pub use config::{DeliveryPolicy, EngineConfig};
pub use context::{Context, Placement};
