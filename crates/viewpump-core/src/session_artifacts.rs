//! Artifact capture: HTML, PNG and PDF.
//!
//! Each capture waits for the document to be ready first, so it may be
//! requested right after (or even before) a load.

use std::path::Path;

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;
use url::Url;

use viewpump_protocols::PdfOptions;
use viewpump_runloop::CycleMode;

use crate::error::ViewError;
use crate::events::{ReadyState, SessionState};
use crate::session::Session;

const HTML_SCRIPT: &str = "document.documentElement.outerHTML";

impl Session {
    /// Serialized DOM, once the document is interactive.
    pub async fn html(&self) -> Result<String, ViewError> {
        self.wait_until(ReadyState::Interactive).await?;
        match self.run(HTML_SCRIPT).await? {
            Value::String(html) => Ok(html),
            other => Err(ViewError::UnexpectedReply(format!("outerHTML is {}", other))),
        }
    }

    /// PNG capture, once the document is loaded.
    pub async fn png(&self) -> Result<Bytes, ViewError> {
        self.wait_until(ReadyState::Complete).await?;
        let view = self.view()?;
        let _hold = self.shared.pump.hold(CycleMode::Blocking);
        let data = view.png().await?;
        debug!("Captured {} bytes of PNG", data.len());
        Ok(data)
    }

    pub async fn save_png(&self, path: impl AsRef<Path>) -> Result<(), ViewError> {
        let data = self.png().await?;
        tokio::fs::write(path.as_ref(), &data).await?;
        Ok(())
    }

    /// Print the loaded document to `path`.
    pub async fn pdf(&self, path: impl AsRef<Path>, options: &PdfOptions) -> Result<(), ViewError> {
        self.wait_until(ReadyState::Complete).await?;
        let target = file_uri(path.as_ref())?;
        let view = self.view()?;
        let _hold = self.shared.pump.hold(CycleMode::Blocking);
        view.pdf(&target, options).await?;
        debug!("Printed to {}", target);
        Ok(())
    }

    /// Wait until the document reached `target`, or fail if the load failed
    /// or the session closed.
    pub(crate) async fn wait_until(&self, target: ReadyState) -> Result<(), ViewError> {
        let mut states = self.shared.state.subscribe();
        let state = states
            .wait_for(|state| {
                state.is_terminal() || state.ready_state().is_some_and(|ready| ready >= target)
            })
            .await
            .map_err(|_| ViewError::Closed)?
            .clone();

        match state {
            SessionState::Closed => Err(ViewError::Closed),
            SessionState::LoadFailed(reason) => Err(ViewError::LoadFailed(reason)),
            _ => Ok(()),
        }
    }
}

/// Absolute `file://` URI for `path`.
pub(crate) fn file_uri(path: &Path) -> Result<String, ViewError> {
    let absolute = std::path::absolute(path)?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| {
            ViewError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} cannot be expressed as a file URI", absolute.display()),
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_uri_absolute() {
        let uri = file_uri(Path::new("/tmp/out.pdf")).unwrap();
        assert_eq!(uri, "file:///tmp/out.pdf");
    }

    #[test]
    fn test_file_uri_relative_is_resolved() {
        let uri = file_uri(Path::new("out.pdf")).unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("/out.pdf"));
        assert!(uri.contains(cwd.file_name().unwrap().to_str().unwrap()));
    }

    #[test]
    fn test_file_uri_escapes_spaces() {
        let uri = file_uri(Path::new("/tmp/my report.pdf")).unwrap();
        assert_eq!(uri, "file:///tmp/my%20report.pdf");
    }
}
