//! Embedded view protocol definitions.
//!
//! The native view is an external collaborator: it owns a cooperative run
//! loop that only makes progress when the host asks it to process one
//! iteration ([`LoopDriver::cycle`]). Everything it reports back (request
//! interception, responses, script replies) flows through the
//! [`ViewListener`] handed to it at construction time.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::envelope::PageScript;
use crate::error::ProtocolError;

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;

/// Construction-time view configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Directory of the web extension loaded into the page process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webextension: Option<PathBuf>,

    /// Page-level event name carrying envelopes back to the host.
    pub event_name: String,

    /// X display index the view renders on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<u32>,
}

/// Options forwarded to the native load call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewLoadOptions {
    /// User stylesheet applied to the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// PDF export options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfOptions {
    #[serde(default)]
    pub landscape: bool,

    /// Paper name understood by the native printer (e.g. "iso_a4").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper: Option<String>,

    #[serde(rename = "marginMm", skip_serializing_if = "Option::is_none")]
    pub margin_mm: Option<f64>,
}

/// A response observed by the native layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResponse {
    pub uri: String,
    pub status: u16,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl WebResponse {
    pub fn new(uri: impl Into<String>, status: u16) -> Self {
        Self {
            uri: uri.into(),
            status,
            mime_type: None,
            headers: HashMap::new(),
        }
    }

    /// Whether the status lies outside [200, 400).
    pub fn is_failure(&self) -> bool {
        !(200..400).contains(&self.status)
    }
}

/// One iteration of the view's foreign run loop.
pub trait LoopDriver: Send + Sync {
    /// Process one cycle. A blocking cycle may wait for native events.
    fn cycle(&self, blocking: bool);
}

/// A native web view.
#[async_trait]
pub trait EmbeddedView: LoopDriver {
    /// Navigate; completes once navigation commits or fails.
    async fn load(&self, uri: &str, options: &ViewLoadOptions) -> Result<(), ProtocolError>;

    /// Execute script in the page context. Replies arrive through
    /// [`ViewListener::on_event`], never as a return value.
    fn run(&self, script: &PageScript) -> Result<(), ProtocolError>;

    /// Capture the rendered page as PNG.
    async fn png(&self) -> Result<Bytes, ProtocolError>;

    /// Print the page to `target_uri` (a `file://` URI).
    async fn pdf(&self, target_uri: &str, options: &PdfOptions) -> Result<(), ProtocolError>;

    /// Currently committed URI.
    fn uri(&self) -> Option<String>;

    /// Release native resources.
    fn close(&self);
}

/// Hooks the native layer calls back into.
pub trait ViewListener: Send + Sync {
    /// Decide an outgoing request. `None` blocks it, `Some(uri)` lets it
    /// proceed (possibly rewritten).
    fn on_request(&self, uri: &str) -> Option<String>;

    /// A response was received.
    fn on_response(&self, response: WebResponse);

    /// A serialized envelope raised by page code.
    fn on_event(&self, payload: &str);
}

/// Builds native views.
#[async_trait]
pub trait ViewFactory: Send + Sync {
    async fn create(
        &self,
        config: ViewConfig,
        listener: Arc<dyn ViewListener>,
    ) -> Result<Arc<dyn EmbeddedView>, ProtocolError>;
}
