//! Wire frame types and serialization.
//!
//! Every protocol unit starts with a one-byte type marker:
//!
//! - `+` simple string
//! - `-` error
//! - `:` integer
//! - `$` bulk string
//! - `*` array
//!
//! Every line-based field ends with CRLF. Bulk strings are the only
//! binary-safe variant: the payload is length-prefixed and written
//! verbatim, so it may contain CRLF or any other byte. Simple string
//! and error payloads share their line with the terminator, so any
//! embedded `\r` or `\n` is replaced with a space before emission —
//! a reply value can never inject an extra terminator into the
//! stream.

use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// The CRLF terminator used by the wire format.
pub const CRLF: &[u8] = b"\r\n";

/// Protocol type markers.
pub mod marker {
    pub const SIMPLE: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One decoded unit of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+<payload>\r\n`
    Simple(String),
    /// `-<message>\r\n`
    Error(String),
    /// `:<signed decimal>\r\n`
    Integer(i64),
    /// `$<length>\r\n<payload>\r\n`
    Bulk(Bytes),
    /// The null bulk string, `$-1\r\n`.
    Null,
    /// `*<count>\r\n<element-1>...<element-n>`; elements may nest.
    Array(Vec<Frame>),
}

/// Errors produced when translating an array frame into a command
/// argument list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected an array frame, got {0}")]
    NotAnArray(&'static str),
    #[error("element {index} is not a string-bearing frame (got {kind})")]
    NotAString { index: usize, kind: &'static str },
    #[error("element {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

impl Frame {
    pub fn simple(s: impl Into<String>) -> Self {
        Frame::Simple(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Frame::Error(s.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(data.into())
    }

    /// The `+OK` reply shared by every successful write command.
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    pub fn pong() -> Self {
        Frame::Simple("PONG".to_string())
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Frame::Simple(_) => "simple string",
            Frame::Error(_) => "error",
            Frame::Integer(_) => "integer",
            Frame::Bulk(_) => "bulk string",
            Frame::Null => "null bulk string",
            Frame::Array(_) => "array",
        }
    }

    /// Renders the frame into a fresh buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    /// Appends the frame's wire rendering to `buf`. Pure append; the
    /// only allocation is growth of `buf` itself.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => write_line(buf, marker::SIMPLE, s),
            Frame::Error(s) => write_line(buf, marker::ERROR, s),
            Frame::Integer(n) => {
                buf.push(marker::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            Frame::Bulk(data) => {
                write_prefix(buf, marker::BULK, data.len() as i64);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            Frame::Null => {
                write_prefix(buf, marker::BULK, -1);
            }
            Frame::Array(items) => {
                write_prefix(buf, marker::ARRAY, items.len() as i64);
                for item in items {
                    item.write_to(buf);
                }
            }
        }
    }

    /// Decodes an array frame into its elements as strings, in
    /// declaration order. Only simple strings and UTF-8 bulk strings
    /// qualify; anything else is a [`DecodeError`]. This is the sole
    /// translation point between wire frames and command argument
    /// lists.
    pub fn to_string_sequence(&self) -> Result<Vec<String>, DecodeError> {
        let items = match self {
            Frame::Array(items) => items,
            other => return Err(DecodeError::NotAnArray(other.kind_name())),
        };

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match item {
                Frame::Simple(s) => out.push(s.clone()),
                Frame::Bulk(data) => {
                    let s = std::str::from_utf8(data)
                        .map_err(|_| DecodeError::InvalidUtf8(index))?;
                    out.push(s.to_string());
                }
                other => {
                    return Err(DecodeError::NotAString {
                        index,
                        kind: other.kind_name(),
                    })
                }
            }
        }
        Ok(out)
    }
}

/// Writes a `$3\r\n` style marker-plus-decimal prefix line, with a
/// fast path for single-digit values.
fn write_prefix(buf: &mut Vec<u8>, marker: u8, n: i64) {
    if (0..=9).contains(&n) {
        buf.extend_from_slice(&[marker, b'0' + n as u8, b'\r', b'\n']);
        return;
    }
    buf.push(marker);
    buf.extend_from_slice(n.to_string().as_bytes());
    buf.extend_from_slice(CRLF);
}

/// Writes a line-based frame, replacing any embedded `\r` or `\n` in
/// the payload with a space.
fn write_line(buf: &mut Vec<u8>, marker: u8, payload: &str) {
    buf.push(marker);
    if payload.bytes().any(|b| b == b'\r' || b == b'\n') {
        let sanitized: String = payload
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        buf.extend_from_slice(sanitized.as_bytes());
    } else {
        buf.extend_from_slice(payload.as_bytes());
    }
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "\"{}\"", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(n) => write!(f, "(integer) {}", n),
            Frame::Bulk(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "\"{}\"", s),
                Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
            },
            Frame::Null => write!(f, "(nil)"),
            Frame::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                writeln!(f)?;
                for (i, item) in items.iter().enumerate() {
                    writeln!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
        }
    }
}
