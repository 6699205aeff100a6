//! Observer events and session state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use viewpump_protocols::WebResponse;

use crate::navigation::NavigationRequest;

/// Events broadcast to session subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An allowed outgoing request, after interceptors ran.
    Request(NavigationRequest),
    Response(WebResponse),
    /// The document became interactive.
    Ready,
    /// The document finished loading.
    Load,
    /// Ready during the cookie preload.
    PreReady,
    /// Load during the cookie preload.
    PreLoad,
    /// An event raised by page code.
    Custom { name: String, args: Vec<Value> },
}

impl SessionEvent {
    pub fn name(&self) -> &str {
        match self {
            SessionEvent::Request(_) => "request",
            SessionEvent::Response(_) => "response",
            SessionEvent::Ready => "ready",
            SessionEvent::Load => "load",
            SessionEvent::PreReady => "preready",
            SessionEvent::PreLoad => "preload",
            SessionEvent::Custom { name, .. } => name,
        }
    }
}

/// Document readiness, mirroring `document.readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyState::Loading => write!(f, "loading"),
            ReadyState::Interactive => write!(f, "interactive"),
            ReadyState::Complete => write!(f, "complete"),
        }
    }
}

impl FromStr for ReadyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(ReadyState::Loading),
            "interactive" => Ok(ReadyState::Interactive),
            "complete" => Ok(ReadyState::Complete),
            other => Err(format!("unknown ready state '{}'", other)),
        }
    }
}

/// Cookie preload progress. The preload runs at most once per session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PreloadState {
    #[default]
    Idle,
    Active,
    Done,
}

/// Session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Loading,
    Ready,
    Loaded,
    LoadFailed(String),
    Unloaded,
    Closed,
}

impl SessionState {
    /// Readiness of the current document, if any.
    pub fn ready_state(&self) -> Option<ReadyState> {
        match self {
            SessionState::Loading => Some(ReadyState::Loading),
            SessionState::Ready => Some(ReadyState::Interactive),
            SessionState::Loaded => Some(ReadyState::Complete),
            _ => None,
        }
    }

    pub(crate) fn is_terminal(&self) -> bool {
        matches!(self, SessionState::LoadFailed(_) | SessionState::Closed)
    }
}
