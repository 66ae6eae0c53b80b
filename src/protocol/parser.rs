//! Incremental frame parser.
//!
//! [`parse`] inspects a caller-owned byte buffer that may hold zero,
//! one, or a trailing-partial protocol unit and returns one of:
//!
//! - `Ok(Some((frame, consumed)))` — the first complete frame and the
//!   number of bytes it occupied
//! - `Ok(None)` — the buffer is empty or ends mid-frame; read more
//!   bytes and call again
//! - `Err(FrameError)` — the bytes can never form a valid frame
//!
//! The intended loop: append incoming network data to a buffer, call
//! [`parse`], advance the buffer by `consumed` on success, and keep
//! any remainder for the next read. The incomplete/invalid split in
//! the return type is what lets a streaming caller decide between
//! waiting for more bytes and reporting a protocol error.
//!
//! ## Framing rules
//!
//! Every line ends with the two bytes `\r\n`. A `\n` whose
//! predecessor is not `\r` is invalid framing everywhere, including
//! the initial type/length line. Integer payloads are an optional
//! leading `-` followed by one or more ASCII digits. A bulk string
//! with a negative declared length is the null bulk string and
//! consumes only its length line; a non-negative length must be
//! followed by exactly that many payload bytes and a terminator.
//! Arrays parse their declared element count recursively; one bad
//! element fails the whole array.
//!
//! The parser never panics and never reads past the end of the
//! buffer.

use crate::protocol::frame::{marker, Frame, CRLF};
use bytes::Bytes;
use thiserror::Error;

/// Errors for byte sequences that can never become a valid frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// First byte is not one of the five type markers.
    #[error("unknown type marker: {0:#04x}")]
    UnknownMarker(u8),

    /// A line feed without a preceding carriage return.
    #[error("line feed without preceding carriage return")]
    BareLineFeed,

    /// Integer payload is empty, a bare `-`, non-digit, or overflows.
    #[error("invalid integer payload")]
    InvalidInteger,

    /// Bulk/array length line is not a valid count.
    #[error("invalid length line")]
    InvalidLength,

    /// Bulk payload is not followed by `\r\n`.
    #[error("bulk string missing trailing CRLF")]
    BadTerminator,

    /// Simple string or error payload is not valid UTF-8.
    #[error("invalid UTF-8 in line payload")]
    InvalidUtf8,

    /// Declared bulk length exceeds the size cap.
    #[error("bulk string of {size} bytes exceeds limit of {max}")]
    BulkTooLarge { size: usize, max: usize },

    /// Arrays nested deeper than the recursion cap.
    #[error("array nesting deeper than {0} levels")]
    DepthExceeded(usize),
}

pub type ParseResult<T> = Result<T, FrameError>;

/// Maximum size for a single bulk string payload (512 MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Attempts to parse the first complete frame from `buf`.
pub fn parse(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    parse_at_depth(buf, 0)
}

fn parse_at_depth(buf: &[u8], depth: usize) -> ParseResult<Option<(Frame, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }
    if depth > MAX_NESTING_DEPTH {
        return Err(FrameError::DepthExceeded(MAX_NESTING_DEPTH));
    }

    match buf[0] {
        marker::SIMPLE => parse_simple(buf),
        marker::ERROR => parse_error(buf),
        marker::INTEGER => parse_integer(buf),
        marker::BULK => parse_bulk(buf),
        marker::ARRAY => parse_array(buf, depth),
        other => Err(FrameError::UnknownMarker(other)),
    }
}

/// `+<payload>\r\n`
fn parse_simple(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    match read_line(buf)? {
        Some((payload, consumed)) => {
            let s = line_str(payload)?;
            Ok(Some((Frame::Simple(s.to_string()), consumed)))
        }
        None => Ok(None),
    }
}

/// `-<message>\r\n`
fn parse_error(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    match read_line(buf)? {
        Some((payload, consumed)) => {
            let s = line_str(payload)?;
            Ok(Some((Frame::Error(s.to_string()), consumed)))
        }
        None => Ok(None),
    }
}

/// `:<signed decimal>\r\n`
fn parse_integer(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    match read_line(buf)? {
        Some((payload, consumed)) => {
            let n = decimal_payload(payload)?;
            Ok(Some((Frame::Integer(n), consumed)))
        }
        None => Ok(None),
    }
}

/// `$<length>\r\n<payload>\r\n`, or `$-1\r\n` for the null form.
fn parse_bulk(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    let (payload, line_len) = match read_line(buf)? {
        Some(line) => line,
        None => return Ok(None),
    };

    let declared = decimal_payload(payload).map_err(|_| FrameError::InvalidLength)?;

    // Any negative declared length is the null bulk string; it
    // occupies only its length line.
    if declared < 0 {
        return Ok(Some((Frame::Null, line_len)));
    }

    let len = declared as usize;
    if len > MAX_BULK_SIZE {
        return Err(FrameError::BulkTooLarge {
            size: len,
            max: MAX_BULK_SIZE,
        });
    }

    let total = line_len + len + CRLF.len();
    if buf.len() < total {
        return Ok(None);
    }
    if &buf[line_len + len..total] != CRLF {
        return Err(FrameError::BadTerminator);
    }

    let data = Bytes::copy_from_slice(&buf[line_len..line_len + len]);
    Ok(Some((Frame::Bulk(data), total)))
}

/// `*<count>\r\n<element-1>...<element-n>`
fn parse_array(buf: &[u8], depth: usize) -> ParseResult<Option<(Frame, usize)>> {
    let (payload, line_len) = match read_line(buf)? {
        Some(line) => line,
        None => return Ok(None),
    };

    let count = decimal_payload(payload).map_err(|_| FrameError::InvalidLength)?;
    if count < 0 {
        return Err(FrameError::InvalidLength);
    }
    let count = count as usize;

    let mut elements = Vec::with_capacity(count.min(64));
    let mut consumed = line_len;

    for _ in 0..count {
        match parse_at_depth(&buf[consumed..], depth + 1)? {
            Some((frame, n)) => {
                elements.push(frame);
                consumed += n;
            }
            None => return Ok(None),
        }
    }

    Ok(Some((Frame::Array(elements), consumed)))
}

/// Scans `buf` (whose first byte is the type marker) for the line
/// terminator. Returns the payload between the marker and the CRLF
/// plus the total bytes the line occupies, `Ok(None)` if the buffer
/// ends before any line feed, or [`FrameError::BareLineFeed`] if the
/// first line feed is not preceded by a carriage return.
fn read_line(buf: &[u8]) -> ParseResult<Option<(&[u8], usize)>> {
    let mut i = 1;
    loop {
        if i == buf.len() {
            return Ok(None);
        }
        if buf[i] == b'\n' {
            if buf[i - 1] != b'\r' {
                return Err(FrameError::BareLineFeed);
            }
            return Ok(Some((&buf[1..i - 1], i + 1)));
        }
        i += 1;
    }
}

/// Validates and parses a decimal line payload: non-empty, optional
/// single leading `-`, one or more ASCII digits, fits in an `i64`.
fn decimal_payload(payload: &[u8]) -> ParseResult<i64> {
    if payload.is_empty() {
        return Err(FrameError::InvalidInteger);
    }
    let digits = if payload[0] == b'-' {
        &payload[1..]
    } else {
        payload
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(FrameError::InvalidInteger);
    }

    let s = std::str::from_utf8(payload).map_err(|_| FrameError::InvalidInteger)?;
    s.parse().map_err(|_| FrameError::InvalidInteger)
}

fn line_str(payload: &[u8]) -> ParseResult<&str> {
    std::str::from_utf8(payload).map_err(|_| FrameError::InvalidUtf8)
}
