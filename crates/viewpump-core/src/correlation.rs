//! Pending script replies keyed by ticket.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use viewpump_protocols::Ticket;

use crate::error::ViewError;

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;

/// Outcome delivered to the caller awaiting a ticket.
pub type ReplyOutcome = Result<Value, ViewError>;

/// Sender half held for a pending ticket.
pub type ReplySender = oneshot::Sender<ReplyOutcome>;

/// Maps outstanding tickets to the caller awaiting them.
///
/// Every entry fires at most once: resolution, cancellation and
/// [`fail_all`](Self::fail_all) all remove it first.
#[derive(Default)]
pub struct CorrelationTable {
    pending: Mutex<HashMap<Ticket, ReplySender>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a caller for `ticket`.
    pub fn register(&self, ticket: Ticket, sender: ReplySender) -> Result<(), ViewError> {
        let mut pending = self.pending.lock();
        if pending.contains_key(&ticket) {
            return Err(ViewError::DuplicateTicket(ticket));
        }
        pending.insert(ticket, sender);
        Ok(())
    }

    /// Deliver `outcome` to the caller of `ticket`.
    ///
    /// Returns `false` when the ticket is not pending (late or duplicate
    /// delivery); the reply is dropped.
    pub fn resolve(&self, ticket: Ticket, outcome: ReplyOutcome) -> bool {
        let sender = self.pending.lock().remove(&ticket);
        match sender {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    debug!("Caller of ticket {} is gone", ticket);
                }
                true
            }
            None => {
                warn!("Dropping reply for unknown ticket {}", ticket);
                false
            }
        }
    }

    /// Forget `ticket` without notifying its caller.
    pub fn cancel(&self, ticket: Ticket) -> bool {
        self.pending.lock().remove(&ticket).is_some()
    }

    /// Fail every pending caller with an error built by `error`.
    pub fn fail_all(&self, error: impl Fn() -> ViewError) -> usize {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        let count = drained.len();
        for (_, sender) in drained {
            let _ = sender.send(Err(error()));
        }
        if count > 0 {
            debug!("Failed {} pending tickets", count);
        }
        count
    }

    pub fn contains(&self, ticket: Ticket) -> bool {
        self.pending.lock().contains_key(&ticket)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
