//! Embedded view backed by an external host process.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use viewpump_config::HostConfig;
use viewpump_protocols::{
    EmbeddedView, LoopDriver, PageScript, PdfOptions, ProtocolError, ViewConfig, ViewFactory,
    ViewListener, ViewLoadOptions,
};

use crate::connection::HostConnection;
use crate::error::StdioViewError;

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;

/// How long a closing host gets to exit before it is killed.
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// Host process settings.
#[derive(Debug, Clone)]
pub struct StdioViewConfig {
    pub program: String,
    pub args: Vec<String>,
    pub response_timeout_ms: u64,
}

impl StdioViewConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            response_timeout_ms: 30000,
        }
    }

    pub fn from_config(config: &HostConfig) -> Result<Self, StdioViewError> {
        let program = config
            .program
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or(StdioViewError::NotConfigured)?;
        Ok(Self {
            program,
            args: config.args.clone(),
            response_timeout_ms: config.response_timeout_ms,
        })
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// A view living in a host process.
pub struct StdioView {
    connection: HostConnection,
    process: Mutex<Option<Child>>,
}

impl StdioView {
    /// Wrap an established connection. `process` is the host child, if any.
    pub fn new(connection: HostConnection, process: Option<Child>) -> Self {
        Self {
            connection,
            process: Mutex::new(process),
        }
    }

    /// Send the construction-time settings to the host.
    pub async fn init(&self, config: &ViewConfig) -> Result<(), StdioViewError> {
        self.connection
            .call(
                "init",
                json!({
                    "eventName": config.event_name,
                    "webextension": config.webextension,
                    "display": config.display,
                }),
            )
            .await?;
        Ok(())
    }

    pub fn connection(&self) -> &HostConnection {
        &self.connection
    }
}

impl LoopDriver for StdioView {
    fn cycle(&self, blocking: bool) {
        if self.connection.is_closed() {
            return;
        }
        if let Err(e) = self.connection.notify("loop", json!({ "blocking": blocking })) {
            debug!("Loop cycle not delivered: {}", e);
        }
    }
}

#[async_trait]
impl EmbeddedView for StdioView {
    async fn load(&self, uri: &str, options: &ViewLoadOptions) -> Result<(), ProtocolError> {
        self.connection.set_uri(Some(uri.to_string()));
        self.connection
            .call("load", json!({ "uri": uri, "options": options }))
            .await
            .map_err(|e| match e {
                StdioViewError::Host(message) => ProtocolError::LoadFailed(message),
                other => other.into(),
            })?;
        Ok(())
    }

    fn run(&self, script: &PageScript) -> Result<(), ProtocolError> {
        self.connection
            .notify("run", json!({ "code": script.code }))
            .map_err(|e| match e {
                StdioViewError::Closed => ProtocolError::ViewClosed,
                other => ProtocolError::ScriptRejected(other.to_string()),
            })
    }

    async fn png(&self) -> Result<Bytes, ProtocolError> {
        let result = self.connection.call("png", json!({})).await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::CaptureFailed("Reply carries no image data".to_string()))?;
        let decoded = STANDARD
            .decode(data)
            .map_err(|e| ProtocolError::CaptureFailed(format!("Invalid image data: {}", e)))?;
        Ok(Bytes::from(decoded))
    }

    async fn pdf(&self, target_uri: &str, options: &PdfOptions) -> Result<(), ProtocolError> {
        self.connection
            .call("pdf", json!({ "target": target_uri, "options": options }))
            .await
            .map_err(|e| match e {
                StdioViewError::Host(message) => ProtocolError::CaptureFailed(message),
                other => other.into(),
            })?;
        Ok(())
    }

    fn uri(&self) -> Option<String> {
        self.connection.uri()
    }

    fn close(&self) {
        if !self.connection.is_closed() {
            let _ = self.connection.notify("close", json!({}));
        }
        self.connection.close();

        let Some(mut child) = self.process.lock().take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if tokio::time::timeout(EXIT_GRACE, child.wait()).await.is_err() {
                        warn!("View host did not exit, killing it");
                        let _ = child.kill().await;
                    }
                });
            }
            Err(_) => {
                let _ = child.start_kill();
            }
        }
    }
}

/// Spawns one host process per view.
pub struct StdioViewFactory {
    config: StdioViewConfig,
}

impl StdioViewFactory {
    pub fn new(config: StdioViewConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &HostConfig) -> Result<Self, StdioViewError> {
        Ok(Self::new(StdioViewConfig::from_config(config)?))
    }

    async fn spawn(
        &self,
        config: &ViewConfig,
        listener: Arc<dyn ViewListener>,
    ) -> Result<StdioView, StdioViewError> {
        info!("Starting view host {}", self.config.program);

        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(display) = config.display {
            command.env("DISPLAY", format!(":{}", display));
        }

        let mut child = command
            .spawn()
            .map_err(|e| StdioViewError::StartFailed(format!("{}: {}", self.config.program, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StdioViewError::StartFailed("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StdioViewError::StartFailed("Failed to get stdout".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[View Host] {}", line);
                }
            });
        }

        let connection =
            HostConnection::connect(stdout, stdin, listener, self.config.response_timeout());
        let view = StdioView::new(connection, Some(child));

        if let Err(e) = view.init(config).await {
            view.close();
            return Err(StdioViewError::StartFailed(format!(
                "Host rejected init: {}",
                e
            )));
        }

        info!("View host started for event {}", config.event_name);
        Ok(view)
    }
}

#[async_trait]
impl ViewFactory for StdioViewFactory {
    async fn create(
        &self,
        config: ViewConfig,
        listener: Arc<dyn ViewListener>,
    ) -> Result<Arc<dyn EmbeddedView>, ProtocolError> {
        let view = self.spawn(&config, listener).await?;
        Ok(Arc::new(view))
    }
}
