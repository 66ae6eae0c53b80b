//! Wire protocol implementation.
//!
//! The protocol is a line-delimited, length-prefixed request/response
//! format carried over a persistent byte stream. Five frame kinds
//! exist: simple string, error, integer, bulk string, and array.
//!
//! - `frame`: the [`Frame`] type, serialization, and decoding of
//!   arrays into command argument lists
//! - `parser`: incremental parsing of byte buffers into frames
//!
//! ```ignore
//! use emberkv::protocol::{parse, Frame};
//!
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (frame, consumed) = parse(data)?.expect("complete frame");
//!
//! let reply = Frame::bulk("value");
//! let bytes = reply.serialize();
//! ```

pub mod frame;
pub mod parser;

pub use frame::{DecodeError, Frame, CRLF};
pub use parser::{parse, FrameError, ParseResult, MAX_BULK_SIZE, MAX_NESTING_DEPTH};
