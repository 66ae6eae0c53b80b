//! Command decoding and execution.
//!
//! A request is an array frame whose first element names the command,
//! case-insensitively; the remaining elements are arguments. Decoding
//! goes through one state machine per request:
//!
//! ```text
//! request frame → string sequence → Command (arity checked)
//!              → execute against the store → one reply frame
//! ```
//!
//! The command set is closed, so it is an enum and every operation on
//! it is a single `match`. Every failure — undecodable frame, empty
//! request, unknown name, bad arity, bad option — becomes exactly one
//! error frame; nothing here ever terminates the connection.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::protocol::{DecodeError, Frame};
use crate::store::Store;
use thiserror::Error;

/// A fully decoded, arity-checked client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `PING` — surplus arguments are ignored.
    Ping,
    /// `ECHO <message>`
    Echo(String),
    /// `GET <key>`
    Get(String),
    /// `SET <key> <value> [PX <milliseconds>]`
    Set {
        key: String,
        value: String,
        expiry: Option<Duration>,
    },
}

/// Rejection reasons, rendered to the client as `-ERR <message>`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid command format")]
    InvalidFormat,

    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("invalid value provided as expiry for 'set' command")]
    InvalidExpiry,

    #[error("unknown option '{0}' for 'set' command")]
    UnknownOption(String),
}

impl CommandError {
    /// Renders the rejection as the single reply frame the client
    /// sees.
    pub fn into_frame(self) -> Frame {
        Frame::Error(format!("ERR {}", self))
    }
}

impl From<DecodeError> for CommandError {
    fn from(_: DecodeError) -> Self {
        CommandError::InvalidFormat
    }
}

impl Command {
    /// Decodes a request frame into a command. The root must be an
    /// array of string-bearing frames; arity and options are
    /// validated here so execution cannot fail.
    pub fn from_frame(frame: &Frame) -> Result<Command, CommandError> {
        let sequence = frame.to_string_sequence()?;
        let (name, args) = match sequence.split_first() {
            Some(split) => split,
            None => return Err(CommandError::Empty),
        };

        match name.to_uppercase().as_str() {
            "PING" => Ok(Command::Ping),
            "ECHO" => match args {
                [message] => Ok(Command::Echo(message.clone())),
                _ => Err(CommandError::WrongArity("echo")),
            },
            "GET" => match args {
                [key] => Ok(Command::Get(key.clone())),
                _ => Err(CommandError::WrongArity("get")),
            },
            "SET" => match args {
                [key, value] => Ok(Command::Set {
                    key: key.clone(),
                    value: value.clone(),
                    expiry: None,
                }),
                [key, value, option, millis] => {
                    if !option.eq_ignore_ascii_case("px") {
                        return Err(CommandError::UnknownOption(option.clone()));
                    }
                    let millis: i64 =
                        millis.parse().map_err(|_| CommandError::InvalidExpiry)?;
                    if millis < 0 {
                        return Err(CommandError::InvalidExpiry);
                    }
                    Ok(Command::Set {
                        key: key.clone(),
                        value: value.clone(),
                        expiry: Some(Duration::from_millis(millis as u64)),
                    })
                }
                _ => Err(CommandError::WrongArity("set")),
            },
            _ => Err(CommandError::Unknown(name.clone())),
        }
    }
}

/// Executes decoded requests against the shared store.
#[derive(Clone)]
pub struct CommandHandler {
    store: Store,
}

impl CommandHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Maps one request frame to exactly one reply frame. Total:
    /// every failure path is an error frame, never an `Err`.
    pub fn execute(&self, request: Frame) -> Frame {
        match Command::from_frame(&request) {
            Ok(command) => self.apply(command),
            Err(e) => {
                debug!(error = %e, "rejected command");
                e.into_frame()
            }
        }
    }

    fn apply(&self, command: Command) -> Frame {
        match command {
            Command::Ping => Frame::pong(),
            Command::Echo(message) => Frame::Bulk(Bytes::from(message)),
            Command::Get(key) => match self.store.get(&key) {
                Some(value) => Frame::Bulk(Bytes::from(value)),
                None => Frame::Null,
            },
            Command::Set { key, value, expiry } => {
                self.store.set(&key, value, expiry);
                Frame::ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time;

    fn handler() -> CommandHandler {
        CommandHandler::new(Store::new())
    }

    fn request(args: &[&str]) -> Frame {
        Frame::Array(args.iter().map(|s| Frame::bulk(s.to_string())).collect())
    }

    fn assert_error(reply: Frame, expected: &str) {
        match reply {
            Frame::Error(message) => assert_eq!(message, expected),
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ping() {
        let handler = handler();
        assert_eq!(handler.execute(request(&["PING"])), Frame::pong());
    }

    #[tokio::test]
    async fn ping_is_case_insensitive() {
        let handler = handler();
        assert_eq!(handler.execute(request(&["PiNg"])), Frame::pong());
        assert_eq!(handler.execute(request(&["ping"])), Frame::pong());
    }

    #[tokio::test]
    async fn ping_ignores_surplus_arguments() {
        let handler = handler();
        assert_eq!(handler.execute(request(&["PING", "extra"])), Frame::pong());
    }

    #[tokio::test]
    async fn echo() {
        let handler = handler();
        assert_eq!(
            handler.execute(request(&["ECHO", "hey"])),
            Frame::bulk("hey")
        );
    }

    #[tokio::test]
    async fn echo_without_argument_is_an_arity_error() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["ECHO"])),
            "ERR wrong number of arguments for 'echo' command",
        );
    }

    #[tokio::test]
    async fn echo_with_two_arguments_is_an_arity_error() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["ECHO", "a", "b"])),
            "ERR wrong number of arguments for 'echo' command",
        );
    }

    #[tokio::test]
    async fn set_then_get() {
        let handler = handler();
        assert_eq!(
            handler.execute(request(&["SET", "key", "value"])),
            Frame::ok()
        );
        assert_eq!(
            handler.execute(request(&["GET", "key"])),
            Frame::bulk("value")
        );
    }

    #[tokio::test]
    async fn keys_and_command_names_are_case_insensitive() {
        let handler = handler();
        handler.execute(request(&["SET", "Foo", "bar"]));
        assert_eq!(
            handler.execute(request(&["get", "FOO"])),
            Frame::bulk("bar")
        );
    }

    #[tokio::test]
    async fn get_missing_key_replies_null() {
        let handler = handler();
        let reply = handler.execute(request(&["GET", "nope"]));
        assert_eq!(reply, Frame::Null);
        assert_eq!(reply.serialize(), b"$-1\r\n");
    }

    #[tokio::test]
    async fn get_arity() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["GET"])),
            "ERR wrong number of arguments for 'get' command",
        );
        assert_error(
            handler.execute(request(&["GET", "a", "b"])),
            "ERR wrong number of arguments for 'get' command",
        );
    }

    #[tokio::test]
    async fn set_with_px_expires() {
        time::pause();
        let handler = handler();

        assert_eq!(
            handler.execute(request(&["SET", "k", "v", "PX", "50"])),
            Frame::ok()
        );
        assert_eq!(handler.execute(request(&["GET", "k"])), Frame::bulk("v"));

        time::advance(Duration::from_millis(50)).await;
        assert_eq!(handler.execute(request(&["GET", "k"])), Frame::Null);
    }

    #[tokio::test]
    async fn set_with_zero_px_expires_immediately() {
        let handler = handler();
        handler.execute(request(&["SET", "k", "v", "px", "0"]));
        assert_eq!(handler.execute(request(&["GET", "k"])), Frame::Null);
    }

    #[tokio::test]
    async fn set_with_non_numeric_expiry() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["SET", "k", "v", "PX", "notanumber"])),
            "ERR invalid value provided as expiry for 'set' command",
        );
    }

    #[tokio::test]
    async fn set_with_negative_expiry() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["SET", "k", "v", "PX", "-10"])),
            "ERR invalid value provided as expiry for 'set' command",
        );
    }

    #[tokio::test]
    async fn set_with_unknown_option() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["SET", "k", "v", "EX", "10"])),
            "ERR unknown option 'EX' for 'set' command",
        );
    }

    #[tokio::test]
    async fn set_arity() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["SET", "k"])),
            "ERR wrong number of arguments for 'set' command",
        );
        assert_error(
            handler.execute(request(&["SET", "k", "v", "PX"])),
            "ERR wrong number of arguments for 'set' command",
        );
        assert_error(
            handler.execute(request(&["SET", "k", "v", "PX", "10", "extra"])),
            "ERR wrong number of arguments for 'set' command",
        );
    }

    #[tokio::test]
    async fn unknown_command() {
        let handler = handler();
        assert_error(
            handler.execute(request(&["FLUSHEVERYTHING"])),
            "ERR unknown command 'FLUSHEVERYTHING'",
        );
    }

    #[tokio::test]
    async fn non_array_root_is_invalid_format() {
        let handler = handler();
        assert_error(
            handler.execute(Frame::simple("PING")),
            "ERR invalid command format",
        );
    }

    #[tokio::test]
    async fn non_string_element_is_invalid_format() {
        let handler = handler();
        let frame = Frame::Array(vec![Frame::bulk("ECHO"), Frame::Integer(1)]);
        assert_error(handler.execute(frame), "ERR invalid command format");
    }

    #[tokio::test]
    async fn empty_array_is_empty_command() {
        let handler = handler();
        assert_error(handler.execute(Frame::Array(vec![])), "ERR empty command");
    }

    #[tokio::test]
    async fn simple_string_elements_are_accepted() {
        let handler = handler();
        let frame = Frame::Array(vec![Frame::simple("SET"), Frame::simple("k"), Frame::simple("v")]);
        assert_eq!(handler.execute(frame), Frame::ok());
        assert_eq!(handler.execute(request(&["GET", "k"])), Frame::bulk("v"));
    }

    #[test]
    fn from_frame_decodes_set_with_px() {
        let frame = Frame::Array(vec![
            Frame::bulk("set"),
            Frame::bulk("k"),
            Frame::bulk("v"),
            Frame::bulk("Px"),
            Frame::bulk("1500"),
        ]);
        assert_eq!(
            Command::from_frame(&frame).unwrap(),
            Command::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                expiry: Some(Duration::from_millis(1500)),
            }
        );
    }
}
