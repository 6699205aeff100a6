//! Display provisioning protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Geometry of a provisioned virtual screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualScreen {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Default for VirtualScreen {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            depth: 32,
        }
    }
}

/// Probes and provisions X displays.
#[async_trait]
pub trait DisplayProvider: Send + Sync {
    /// Whether a usable display already exists at `index`.
    async fn exists(&self, index: u32) -> bool;

    /// Start a virtual display at `index` and report the index in use.
    async fn provision(&self, index: u32, screen: &VirtualScreen) -> Result<u32, ProtocolError>;
}
