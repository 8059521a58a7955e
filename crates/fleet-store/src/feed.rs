//! Typed subscriber handle for the `delivery` channel.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use tracing::warn;

use crate::DeliveryEvent;

/// Receives [`DeliveryEvent`]s published after the subscription was made.
///
/// Messages that fail to decode (e.g. free-text notifications from another
/// publisher) are logged and skipped.  Dropping the feed unsubscribes.
pub struct DeliveryFeed {
    rx: Receiver<String>,
}

impl DeliveryFeed {
    pub(crate) fn new(rx: Receiver<String>) -> Self {
        Self { rx }
    }

    /// Next already-published event, without blocking.
    pub fn try_next(&self) -> Option<DeliveryEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(raw) => {
                    if let Some(ev) = decode(&raw) {
                        return Some(ev);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Block up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<DeliveryEvent> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(raw) => {
                    if let Some(ev) = decode(&raw) {
                        return Some(ev);
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Every event currently buffered.
    pub fn drain(&self) -> Vec<DeliveryEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

fn decode(raw: &str) -> Option<DeliveryEvent> {
    match serde_json::from_str(raw) {
        Ok(ev) => Some(ev),
        Err(e) => {
            warn!(payload = raw, error = %e, "skipping undecodable delivery notification");
            None
        }
    }
}
