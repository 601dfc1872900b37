//! Core types and trait definitions for the helpbot forum assistant.
//!
//! This crate is deliberately free of HTTP, database and chat-platform
//! dependencies. The engine, the store and the server all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod event;
pub mod id;
pub mod lifecycle;
pub mod message;
pub mod store;
pub mod thread;
pub mod transport;

pub use error::{Error, Result};
