//! Command processing.
//!
//! Sits between the wire codec and the store: decodes request frames
//! into [`Command`] values, validates arity and options, executes
//! against the [`Store`](crate::store::Store), and renders exactly
//! one reply frame per request.
//!
//! | Command | Arguments | Reply |
//! |---------|-----------|-------|
//! | `PING` | — | `+PONG` |
//! | `ECHO` | message | bulk string |
//! | `GET` | key | bulk string, or null if absent/expired |
//! | `SET` | key value `[PX millis]` | `+OK` |

pub mod handler;

pub use handler::{Command, CommandError, CommandHandler};
