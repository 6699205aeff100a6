//! JSON-lines frames exchanged with the view host.
//!
//! Host-bound lines are requests `{"id", "method", "params"}`. Lines coming
//! back are either replies `{"id", "result" | "error"}` or notifications
//! tagged by `"notify"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use viewpump_protocols::WebResponse;

/// Request sent to the host.
#[derive(Debug, Serialize)]
pub struct HostRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

/// Answer to an intercepted request. Sent without an id of its own.
#[derive(Debug, Serialize)]
pub struct DecisionFrame {
    pub method: &'static str,
    pub params: DecisionParams,
}

#[derive(Debug, Serialize)]
pub struct DecisionParams {
    pub id: u64,
    /// `None` blocks the request.
    pub uri: Option<String>,
}

impl DecisionFrame {
    pub fn new(id: u64, uri: Option<String>) -> Self {
        Self {
            method: "decision",
            params: DecisionParams { id, uri },
        }
    }
}

/// Something the host raised on its own.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "notify", rename_all = "lowercase")]
pub enum Notification {
    /// An outgoing request awaiting a decision.
    Request { id: u64, uri: String },
    Response(WebResponse),
    /// A serialized envelope raised by page code.
    Event { payload: String },
    /// Navigation committed to `uri`.
    Committed { uri: String },
}

/// Reply to a request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostReply {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<HostErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostErrorBody {
    pub message: String,
}

/// Any line coming back from the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HostMessage {
    Notification(Notification),
    Reply(HostReply),
}
