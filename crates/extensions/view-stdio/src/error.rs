//! View host errors.

use thiserror::Error;

use viewpump_protocols::ProtocolError;

/// Errors talking to the view host process.
#[derive(Debug, Error)]
pub enum StdioViewError {
    /// No host program configured.
    #[error("No view host program configured")]
    NotConfigured,

    /// Host process failed to start.
    #[error("View host failed to start: {0}")]
    StartFailed(String),

    /// Host process went away.
    #[error("View host died: {0}")]
    HostDied(String),

    /// Communication error with the host.
    #[error("View host communication error: {0}")]
    Communication(String),

    /// The host answered with an error.
    #[error("View host error: {0}")]
    Host(String),

    /// Timeout waiting for a reply.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The connection was closed.
    #[error("View host connection closed")]
    Closed,
}

impl From<std::io::Error> for StdioViewError {
    fn from(e: std::io::Error) -> Self {
        StdioViewError::Communication(e.to_string())
    }
}

impl From<serde_json::Error> for StdioViewError {
    fn from(e: serde_json::Error) -> Self {
        StdioViewError::Communication(format!("JSON error: {}", e))
    }
}

impl From<StdioViewError> for ProtocolError {
    fn from(e: StdioViewError) -> Self {
        match e {
            StdioViewError::Closed | StdioViewError::HostDied(_) => ProtocolError::ViewClosed,
            StdioViewError::Timeout(message) => ProtocolError::Timeout(message),
            other => ProtocolError::Transport(other.to_string()),
        }
    }
}
