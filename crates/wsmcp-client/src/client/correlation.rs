//! In-flight request table.
//!
//! Every outbound request registers its id here before the frame is written.
//! The entry leaves the table exactly once: resolved by the receive loop,
//! failed on disconnect, expired on timeout, or cancelled when the waiting
//! future is dropped. Whoever removes the entry is the only one allowed to
//! complete the waiter, which is what makes delivery exactly-once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, trace};
use wsmcp_protocol::{Error, Message, MessageId, Result};

#[derive(Debug)]
struct PendingRequest {
    method: String,
    created_at: Instant,
    tx: oneshot::Sender<Result<Message>>,
}

/// Pending requests keyed by id, behind a single mutex.
#[derive(Debug, Default)]
pub(crate) struct CorrelationTable {
    pending: Mutex<HashMap<MessageId, PendingRequest>>,
}

impl CorrelationTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reserve `id` for a request to `method`.
    pub(crate) fn register(self: &Arc<Self>, id: MessageId, method: &str) -> Result<Waiter> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.contains_key(&id) {
                return Err(Error::DuplicateId(id));
            }
            pending.insert(
                id.clone(),
                PendingRequest {
                    method: method.to_owned(),
                    created_at: Instant::now(),
                    tx,
                },
            );
        }
        trace!(id = %id, method, "request registered");
        Ok(Waiter {
            id,
            rx: Some(rx),
            table: Arc::clone(self),
        })
    }

    /// Hand `message` to the waiter for `id`. Gives the message back if no
    /// request with that id is pending.
    pub(crate) fn resolve(&self, id: &MessageId, message: Message) -> std::result::Result<(), Message> {
        let Some(entry) = self.pending.lock().remove(id) else {
            return Err(message);
        };
        trace!(
            id = %id,
            method = %entry.method,
            elapsed_ms = entry.created_at.elapsed().as_millis() as u64,
            "response correlated"
        );
        if entry.tx.send(Ok(message)).is_err() {
            debug!(id = %id, "waiter went away before its response arrived");
        }
        Ok(())
    }

    /// Complete the waiter for `id` with `error`.
    pub(crate) fn fail(&self, id: &MessageId, error: Error) -> bool {
        match self.pending.lock().remove(id) {
            Some(entry) => {
                let _ = entry.tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Complete the waiter for `id` with a `Timeout` error.
    pub(crate) fn expire(&self, id: &MessageId, timeout: Duration) -> bool {
        let Some(entry) = self.pending.lock().remove(id) else {
            return false;
        };
        debug!(id = %id, method = %entry.method, ?timeout, "request timed out");
        let _ = entry.tx.send(Err(Error::Timeout {
            method: entry.method,
            timeout,
        }));
        true
    }

    /// Complete every waiter with a clone of `error`. Returns how many.
    pub(crate) fn fail_all(&self, error: &Error) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (_, entry) in drained {
            let _ = entry.tx.send(Err(error.clone()));
        }
        if count > 0 {
            debug!(count, error = %error, "failed all pending requests");
        }
        count
    }

    /// Drop the entry for `id` without completing it.
    fn cancel(&self, id: &MessageId) -> bool {
        self.pending.lock().remove(id).is_some()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: &MessageId) -> bool {
        self.pending.lock().contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

/// The caller's side of a registered request.
///
/// Dropping a waiter (or the future returned by [`Waiter::wait`]) before it
/// completes removes its entry, so a response that arrives afterwards is
/// treated as unknown.
#[derive(Debug)]
pub(crate) struct Waiter {
    id: MessageId,
    rx: Option<oneshot::Receiver<Result<Message>>>,
    table: Arc<CorrelationTable>,
}

impl Waiter {
    pub(crate) fn id(&self) -> &MessageId {
        &self.id
    }

    /// Wait for the correlated response, at most `timeout`.
    pub(crate) async fn wait(mut self, timeout: Duration) -> Result<Message> {
        let Some(mut rx) = self.rx.take() else {
            return Err(Error::Cancelled);
        };
        let outcome = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(received) => received,
            Err(_) => {
                // Either this expires the entry and queues the Timeout, or the
                // entry was already taken and its result is on the way.
                self.table.expire(&self.id, timeout);
                rx.await
            }
        };
        outcome.unwrap_or(Err(Error::ConnectionClosed))
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if self.table.cancel(&self.id) {
            trace!(id = %self.id, "request abandoned");
        }
    }
}
