//! Session errors.

use serde_json::Value;
use thiserror::Error;

use viewpump_protocols::{ProtocolError, RunMode, Ticket};

/// Errors surfaced by a view session.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The page script reported an error (thrown, or passed to its callback).
    #[error("Script error: {0}")]
    Script(Value),

    /// A ticket was registered twice while still pending.
    #[error("Duplicate ticket: {0}")]
    DuplicateTicket(Ticket),

    /// The script mode cannot be executed by this bridge.
    #[error("Unsupported script mode: {0}")]
    UnsupportedMode(RunMode),

    /// The main document answered with a status outside [200, 400).
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The session was closed before the operation completed.
    #[error("Session is closed")]
    Closed,

    /// The page navigation failed before any document was available.
    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Invalid allow mode: {0}")]
    InvalidAllowMode(String),

    /// A page reply did not have the expected shape.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    #[error(transparent)]
    Display(#[from] DisplayError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ViewError {
    /// The value the page reported, for script errors.
    pub fn script_error(&self) -> Option<&Value> {
        match self {
            ViewError::Script(value) => Some(value),
            _ => None,
        }
    }
}

/// Errors resolving the X display a view renders on.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Display :0 is missing and is never provisioned.
    #[error("Display :0 is not available and will not be provisioned")]
    RefuseDefault,

    /// The display is missing and provisioning is not configured.
    #[error("Display :{0} is not available")]
    Unavailable(u32),

    #[error("Failed to provision display :{index}: {message}")]
    ProvisionFailed { index: u32, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_error_keeps_value() {
        let err = ViewError::Script(json!({"name": "TypeError", "message": "x is undefined"}));
        assert_eq!(err.script_error().unwrap()["name"], "TypeError");
        assert!(err.to_string().contains("x is undefined"));
    }

    #[test]
    fn test_non_script_error_has_no_value() {
        assert!(ViewError::Closed.script_error().is_none());
    }

    #[test]
    fn test_unsupported_mode_display() {
        let err = ViewError::UnsupportedMode(RunMode::Path);
        assert_eq!(err.to_string(), "Unsupported script mode: path");
    }

    #[test]
    fn test_display_error_from() {
        let err = ViewError::from(DisplayError::RefuseDefault);
        assert!(matches!(err, ViewError::Display(DisplayError::RefuseDefault)));
        assert!(err.to_string().contains(":0"));
    }

    #[test]
    fn test_protocol_error_from() {
        let err = ViewError::from(ProtocolError::ViewClosed);
        assert!(matches!(err, ViewError::Protocol(_)));
    }

    #[test]
    fn test_provision_failed_display() {
        let err = DisplayError::ProvisionFailed {
            index: 99,
            message: "Xvfb not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to provision display :99: Xvfb not found"
        );
    }
}
