//! Message envelope exchanged across the host/view boundary.
//!
//! An envelope travels out with a script and comes back, filled in, through
//! the view's events listener. It is addressed either by a [`Ticket`] (a reply
//! awaited by exactly one caller) or by an event name (broadcast to
//! subscribers), never both.

use std::fmt;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;

/// Correlation identifier for a pending script reply.
///
/// Stringified on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticket(u64);

impl Ticket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Ticket {
    type Error = ParseIntError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.trim().parse().map(Ticket)
    }
}

impl From<Ticket> for String {
    fn from(ticket: Ticket) -> Self {
        ticket.to_string()
    }
}

/// How a script source is executed in the page context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Expression or zero-argument function, evaluated inside try/catch.
    #[default]
    Sync,
    /// Single-argument function receiving an error-first callback.
    Async,
    /// External script resource (`file:`, `http:`, `https:`).
    Path,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Sync => write!(f, "sync"),
            RunMode::Async => write!(f, "async"),
            RunMode::Path => write!(f, "path"),
        }
    }
}

/// Wire envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,

    #[serde(default)]
    pub mode: RunMode,

    /// Positional arguments of an emitted event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Envelope {
    /// Envelope for a reply awaited under `ticket`.
    pub fn ticketed(ticket: Ticket, mode: RunMode) -> Self {
        Self {
            ticket: Some(ticket),
            mode,
            ..Default::default()
        }
    }

    /// Envelope whose reply is emitted as the named event.
    pub fn evented(event: impl Into<String>, mode: RunMode) -> Self {
        Self {
            event: Some(event.into()),
            mode,
            ..Default::default()
        }
    }

    /// Serialize for embedding in page code or handing to the view.
    pub fn to_json(&self) -> String {
        // An envelope only holds strings and JSON values, serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Script compiled for the page context, with the outbound envelope it answers to.
#[derive(Debug, Clone, PartialEq)]
pub struct PageScript {
    pub code: String,
    pub envelope: Envelope,
}

impl PageScript {
    pub fn new(code: impl Into<String>, envelope: Envelope) -> Self {
        Self {
            code: code.into(),
            envelope,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.envelope.mode
    }
}
