//! In-memory key-value store with lazy expiration.
//!
//! One [`Store`] instance is shared by every connection. The whole
//! key map lives behind a single mutex; every read, write, and
//! expiry-triggered removal goes through it. Keys compare
//! case-insensitively — the map is keyed by the lowercased form while
//! each record keeps the key as submitted.
//!
//! Expiration is lazy: nothing sweeps the map on a timer. A record
//! whose expiry instant has passed is simply reported as absent by
//! the next [`Store::get`], which also hands the key to the reaper
//! task for removal off the read path. Until the reaper runs, the
//! dead record still occupies the map but is invisible to readers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

use crate::store::reaper::ReaperHandle;

/// Expiry installed when a `set` carries no explicit duration. Far
/// enough out to be operationally unbounded, so the expiry check
/// stays a single unconditional comparison.
const NO_EXPIRY: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// One stored key.
#[derive(Debug, Clone)]
pub struct Record {
    /// The key as submitted, original case preserved.
    pub key: String,
    pub value: String,
    pub created_at: Instant,
    /// Always populated; reads at or past this instant see the
    /// record as absent.
    pub expires_at: Instant,
}

impl Record {
    fn new(key: String, value: String, expiry: Option<Duration>) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            created_at: now,
            expires_at: now + expiry.unwrap_or(NO_EXPIRY),
        }
    }

    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Shared, thread-safe key-value store.
///
/// Cloning is cheap; all clones observe the same map.
///
/// # Example
///
/// ```ignore
/// use emberkv::store::Store;
/// use tokio::time::Duration;
///
/// let store = Store::new();
/// store.set("name", "ember".to_string(), None);
/// assert_eq!(store.get("NAME"), Some("ember".to_string()));
///
/// store.set("session", "token".to_string(), Some(Duration::from_millis(50)));
/// ```
#[derive(Clone)]
pub struct Store {
    entries: Arc<Mutex<HashMap<String, Record>>>,
    reaper: ReaperHandle,
}

impl Store {
    /// Creates an empty store and spawns its reaper task. Must be
    /// called from within a tokio runtime.
    pub fn new() -> Self {
        let entries = Arc::new(Mutex::new(HashMap::new()));
        let reaper = ReaperHandle::spawn(Arc::clone(&entries));
        Self { entries, reaper }
    }

    /// Looks up a key, case-insensitively.
    ///
    /// Returns `None` for both missing and expired keys. Discovering
    /// an expired record schedules its removal with the reaper; the
    /// record is already invisible to every caller from this moment,
    /// whether or not the removal has been applied yet.
    pub fn get(&self, key: &str) -> Option<String> {
        let normalized = normalize(key);
        let now = Instant::now();

        let mut expired = false;
        let value = {
            let entries = self.entries.lock().unwrap();
            match entries.get(&normalized) {
                Some(record) if record.is_expired(now) => {
                    expired = true;
                    None
                }
                Some(record) => Some(record.value.clone()),
                None => None,
            }
        };

        if expired {
            self.reaper.schedule(normalized);
        }
        value
    }

    /// Installs a record unconditionally, replacing any previous one
    /// wholesale. `Some(duration)` expires the key `duration` from
    /// now (zero means expired on the next read); `None` installs the
    /// far-future expiry.
    pub fn set(&self, key: &str, value: String, expiry: Option<Duration>) {
        let record = Record::new(key.to_string(), value, expiry);
        self.entries.lock().unwrap().insert(normalize(key), record);
    }

    /// Snapshot of the record behind a key, with the same lazy-expiry
    /// semantics as [`Store::get`].
    pub fn record(&self, key: &str) -> Option<Record> {
        let normalized = normalize(key);
        let now = Instant::now();

        let mut expired = false;
        let record = {
            let entries = self.entries.lock().unwrap();
            match entries.get(&normalized) {
                Some(record) if record.is_expired(now) => {
                    expired = true;
                    None
                }
                Some(record) => Some(record.clone()),
                None => None,
            }
        };

        if expired {
            self.reaper.schedule(normalized);
        }
        record
    }

    /// Number of records in the map, including expired records whose
    /// removal the reaper has not yet applied.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until every removal scheduled before this call has been
    /// applied.
    pub async fn sync(&self) {
        self.reaper.sync().await;
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookups are case-insensitive; the map key is the lowercased form.
fn normalize(key: &str) -> String {
    key.to_lowercase()
}
