//! Listener connection tracking with a grace period.
//!
//! When the last listener leaves, a grace timer starts. Teardown happens only
//! if the set is still empty when the timer fires and nobody connected in the
//! meantime. The expiry check and every connect take the same lock, so a
//! connect that wins the lock before the check cancels teardown and one that
//! loses it does not.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default grace period before an empty audience ends the session.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
struct TrackerInner {
    connections: HashSet<String>,
    /// Bumped on every connect and every transition to empty. A pending
    /// timer only acts if the epoch it captured is still current.
    epoch: u64,
}

/// Handle for a pending grace timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraceTicket {
    epoch: u64,
}

#[derive(Debug)]
pub struct ConnectionTracker {
    inner: Mutex<TrackerInner>,
    grace_period: Duration,
}

impl ConnectionTracker {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            inner: Mutex::new(TrackerInner::default()),
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Register a listener. Voids any pending grace timer.
    pub fn on_connect(&self, id: &str) {
        let mut inner = self.inner.lock();
        inner.epoch += 1;
        inner.connections.insert(id.to_string());
        info!(connection_id = %id, listeners = inner.connections.len(), "Listener connected");
    }

    /// Remove a listener. Returns a ticket when this disconnect emptied the set.
    pub fn on_disconnect(&self, id: &str) -> Option<GraceTicket> {
        let mut inner = self.inner.lock();
        if !inner.connections.remove(id) {
            debug!(connection_id = %id, "Disconnect for unknown listener");
            return None;
        }
        info!(connection_id = %id, listeners = inner.connections.len(), "Listener disconnected");

        if inner.connections.is_empty() {
            inner.epoch += 1;
            Some(GraceTicket { epoch: inner.epoch })
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().connections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().connections.len()
    }

    /// Whether the set is still empty and untouched since `ticket` was issued.
    pub fn grace_expired(&self, ticket: GraceTicket) -> bool {
        let inner = self.inner.lock();
        inner.connections.is_empty() && inner.epoch == ticket.epoch
    }

    /// Sleep for the grace period, then run `on_expire` if the ticket is still valid.
    pub fn watch_grace<F>(self: &Arc<Self>, ticket: GraceTicket, on_expire: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(tracker.grace_period).await;
            if tracker.grace_expired(ticket) {
                info!(
                    grace_ms = tracker.grace_period.as_millis() as u64,
                    "No listeners reconnected within grace period"
                );
                on_expire();
            } else {
                debug!("Grace timer voided by reconnect");
            }
        })
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_PERIOD)
    }
}
