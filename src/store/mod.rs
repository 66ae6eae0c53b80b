//! Key-value storage.
//!
//! - `engine`: the [`Store`] — a single mutex-guarded map of
//!   case-insensitive keys to records with absolute expiry instants
//! - `reaper`: the deferred-removal task that applies expirations
//!   discovered by reads
//!
//! ```ignore
//! use emberkv::store::Store;
//! use tokio::time::Duration;
//!
//! let store = Store::new();
//! store.set("name", "ember".to_string(), None);
//! assert_eq!(store.get("name"), Some("ember".to_string()));
//!
//! // Expires on the first read at or after the deadline.
//! store.set("session", "token".to_string(), Some(Duration::from_millis(100)));
//! ```

pub mod engine;
mod reaper;

pub use engine::{Record, Store};
