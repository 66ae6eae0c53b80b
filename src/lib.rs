//! # emberkv — a minimal RESP-speaking key-value server
//!
//! emberkv serves a small command set (`PING`, `ECHO`, `GET`, `SET`
//! with millisecond expiry) over a line-delimited, length-prefixed
//! wire protocol on persistent TCP connections, backed by a shared
//! in-memory store with lazy expiration.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────────┐     ┌────────────────┐
//! │ TCP server │────>│ Connection     │────>│ Command        │
//! │ (main.rs)  │     │ handler        │     │ handler        │
//! └────────────┘     └───────┬────────┘     └───────┬────────┘
//!                            │                      │
//!                            ▼                      ▼
//!                    ┌────────────────┐     ┌────────────────┐
//!                    │ Frame codec    │     │ Store + reaper │
//!                    │ (protocol)     │     │ (store)        │
//!                    └────────────────┘     └────────────────┘
//! ```
//!
//! Raw bytes flow in from a connection, the codec parses them into
//! frames, the command handler decodes and executes, and the reply
//! frame is serialized straight back onto the socket.
//!
//! ## Modules
//!
//! - [`protocol`]: frame types, incremental parser, serialization
//! - [`store`]: mutex-guarded key map with lazy expiry and a
//!   deferred-removal reaper task
//! - [`commands`]: request decoding, arity validation, execution
//! - [`connection`]: per-client buffer and I/O loop
//!
//! ## Expiry model
//!
//! A `SET` always installs an absolute expiry instant — far-future
//! when no `PX` is given — so the liveness check is one comparison.
//! Nothing sweeps on a timer: a read past the deadline reports the
//! key as absent and hands the removal to the store's reaper task,
//! which applies it under the same lock as every other mutation.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod store;

pub use commands::{Command, CommandError, CommandHandler};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse, Frame, FrameError};
pub use store::{Record, Store};

/// The default port emberkv listens on.
pub const DEFAULT_PORT: u16 = 6379;

/// The default host emberkv binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of emberkv.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
