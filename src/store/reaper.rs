//! Deferred removal of expired records.
//!
//! A read that discovers an expired record must report the key as
//! absent without paying for the map mutation on its own path. The
//! reaper is the explicit home for that deferred work: one task per
//! store, fed keys over an unbounded channel, applying removals under
//! the same mutex as every other map access.
//!
//! A removal is applied only if the record is *still* expired when
//! the reaper gets to it. A fresh `set` that lands between the read
//! and the removal wins; an expired record can never be resurrected
//! because readers check the expiry themselves.
//!
//! The `Sync` message is a flush barrier: it is acknowledged only
//! after every previously queued removal has been applied, which is
//! what lets tests await the reaper deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::store::engine::Record;

pub(crate) enum ReapMsg {
    /// Remove the (normalized) key if it is still expired.
    Expired(String),
    /// Acknowledged once all prior messages have been handled.
    Sync(oneshot::Sender<()>),
}

/// Sending half of the reaper queue, held by the store.
#[derive(Clone)]
pub(crate) struct ReaperHandle {
    tx: mpsc::UnboundedSender<ReapMsg>,
}

impl ReaperHandle {
    /// Spawns the reaper task over the store's entry map. The task
    /// exits once every handle clone has been dropped.
    pub(crate) fn spawn(entries: Arc<Mutex<HashMap<String, Record>>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(reap_loop(entries, rx));
        Self { tx }
    }

    /// Queues a removal for a key observed as expired.
    pub(crate) fn schedule(&self, key: String) {
        // A send only fails during shutdown, when the map is going
        // away with the task; the record is already invisible to
        // readers either way.
        let _ = self.tx.send(ReapMsg::Expired(key));
    }

    /// Waits for all removals queued before this call.
    pub(crate) async fn sync(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ReapMsg::Sync(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

async fn reap_loop(
    entries: Arc<Mutex<HashMap<String, Record>>>,
    mut rx: mpsc::UnboundedReceiver<ReapMsg>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            ReapMsg::Expired(key) => {
                let now = Instant::now();
                let mut map = entries.lock().unwrap();
                if let Some(record) = map.get(&key) {
                    // A fresh set may have replaced the record since
                    // the read that scheduled this removal.
                    if record.is_expired(now) {
                        map.remove(&key);
                        trace!(key = %key, "removed expired record");
                    }
                }
            }
            ReapMsg::Sync(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("reaper stopped");
}
