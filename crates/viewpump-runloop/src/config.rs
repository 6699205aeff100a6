//! Configuration for the loop pump.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Loop pump configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Delay between two pumped iterations, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    20
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl PumpConfig {
    pub fn new(interval_ms: u64) -> Self {
        Self { interval_ms }
    }

    /// Get the interval as Duration. Never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}
