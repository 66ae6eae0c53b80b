//! Client connection management.
//!
//! One async task per connection. The handler accumulates socket
//! reads in a `BytesMut` buffer, slices complete frames off the
//! front, and writes codec output back — so pipelined requests and
//! requests split across TCP segments both work.

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
