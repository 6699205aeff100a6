//! Errors reported by native view implementations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("View is closed")]
    ViewClosed,

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Script rejected by view: {0}")]
    ScriptRejected(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Display error: {0}")]
    Display(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Transport(format!("JSON error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_closed_error() {
        let err = ProtocolError::ViewClosed;
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_load_failed_error() {
        let err = ProtocolError::LoadFailed("net::ERR_NAME_NOT_RESOLVED".to_string());
        let display = err.to_string();
        assert!(display.contains("Load failed"));
        assert!(display.contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = ProtocolError::from(io_err);
        assert!(matches!(err, ProtocolError::Transport(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ProtocolError::from(json_err);
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_all_error_variants_display() {
        let errors: Vec<ProtocolError> = vec![
            ProtocolError::ViewClosed,
            ProtocolError::LoadFailed("a".to_string()),
            ProtocolError::ScriptRejected("b".to_string()),
            ProtocolError::CaptureFailed("c".to_string()),
            ProtocolError::Transport("d".to_string()),
            ProtocolError::Display("e".to_string()),
            ProtocolError::Timeout("f".to_string()),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
