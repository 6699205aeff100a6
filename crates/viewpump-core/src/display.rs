//! X display resolution and Xvfb provisioning.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info};

use viewpump_protocols::{DisplayProvider, ProtocolError, VirtualScreen};

use crate::error::DisplayError;

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;

/// Pick the display a view renders on.
///
/// An existing display is used as is. Display :0 is never provisioned; any
/// other missing display is provisioned only when `screen` is given.
pub async fn resolve_display(
    provider: &dyn DisplayProvider,
    index: u32,
    screen: Option<&VirtualScreen>,
) -> Result<u32, DisplayError> {
    if provider.exists(index).await {
        debug!("Using existing display :{}", index);
        return Ok(index);
    }
    if index == 0 {
        return Err(DisplayError::RefuseDefault);
    }
    match screen {
        Some(screen) => provider
            .provision(index, screen)
            .await
            .map_err(|e| DisplayError::ProvisionFailed {
                index,
                message: e.to_string(),
            }),
        None => Err(DisplayError::Unavailable(index)),
    }
}

/// Starts `Xvfb` servers on demand. Servers are killed when the provider is
/// dropped.
pub struct XvfbProvider {
    program: String,
    lock_dir: PathBuf,
    startup_timeout: Duration,
    servers: Mutex<Vec<Child>>,
}

impl XvfbProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            lock_dir: PathBuf::from("/tmp"),
            startup_timeout: Duration::from_secs(5),
            servers: Mutex::new(Vec::new()),
        }
    }

    /// Directory holding the `.X<n>-lock` files.
    pub fn with_lock_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.lock_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn lock_file(&self, index: u32) -> PathBuf {
        self.lock_dir.join(format!(".X{}-lock", index))
    }

    /// Number of servers started by this provider.
    pub fn running(&self) -> usize {
        self.servers.lock().len()
    }
}

impl Default for XvfbProvider {
    fn default() -> Self {
        Self::new("Xvfb")
    }
}

#[async_trait]
impl DisplayProvider for XvfbProvider {
    async fn exists(&self, index: u32) -> bool {
        tokio::fs::try_exists(self.lock_file(index))
            .await
            .unwrap_or(false)
    }

    async fn provision(&self, index: u32, screen: &VirtualScreen) -> Result<u32, ProtocolError> {
        let geometry = format!("{}x{}x{}", screen.width, screen.height, screen.depth);
        info!("Starting {} on display :{} ({})", self.program, index, geometry);

        let mut child = Command::new(&self.program)
            .arg(format!(":{}", index))
            .arg("-screen")
            .arg("0")
            .arg(&geometry)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProtocolError::Display(format!("failed to start {}: {}", self.program, e)))?;

        let deadline = Instant::now() + self.startup_timeout;
        while !self.exists(index).await {
            if let Some(status) = child.try_wait()? {
                return Err(ProtocolError::Display(format!(
                    "{} exited with {}",
                    self.program, status
                )));
            }
            if Instant::now() >= deadline {
                return Err(ProtocolError::Timeout(format!(
                    "display :{} did not come up within {:?}",
                    index, self.startup_timeout
                )));
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        debug!("Display :{} is up", index);
        self.servers.lock().push(child);
        Ok(index)
    }
}
