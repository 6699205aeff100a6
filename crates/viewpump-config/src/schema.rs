//! Configuration schema definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub pump: PumpConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Per-session bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Deadline for a ticketed script reply, in milliseconds (0 = none).
    #[serde(default = "default_script_timeout_ms")]
    pub script_timeout_ms: u64,

    /// Web extension directory handed to the view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webextension: Option<PathBuf>,

    /// Default navigation allow mode.
    #[serde(default)]
    pub allow: AllowConfig,

    /// Prefix of the per-session page event name.
    #[serde(default = "default_event_prefix")]
    pub event_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            script_timeout_ms: default_script_timeout_ms(),
            webextension: None,
            allow: AllowConfig::default(),
            event_prefix: default_event_prefix(),
        }
    }
}

fn default_script_timeout_ms() -> u64 {
    30000
}

fn default_event_prefix() -> String {
    "viewpump".to_string()
}

/// Navigation allow mode as written in configuration.
///
/// Either one of the keywords `"all"`, `"none"`, `"same-origin"`, or a table
/// `{ pattern = "<regex>" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowConfig {
    Keyword(String),
    Pattern { pattern: String },
}

impl Default for AllowConfig {
    fn default() -> Self {
        AllowConfig::Keyword("all".to_string())
    }
}

impl AllowConfig {
    pub const KEYWORDS: [&'static str; 3] = ["all", "none", "same-origin"];
}

/// Loop pump configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PumpConfig {
    /// Delay between two pumped iterations of the view loop.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

fn default_interval_ms() -> u64 {
    20
}

/// X display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default)]
    pub index: u32,

    /// When set, a missing display (other than :0) is provisioned with Xvfb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_screen: Option<VirtualScreenConfig>,

    #[serde(default = "default_xvfb_path")]
    pub xvfb_path: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            index: 0,
            virtual_screen: None,
            xvfb_path: default_xvfb_path(),
        }
    }
}

fn default_xvfb_path() -> String {
    "Xvfb".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualScreenConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_depth")]
    pub depth: u32,
}

impl Default for VirtualScreenConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            depth: default_depth(),
        }
    }
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    768
}

fn default_depth() -> u32 {
    32
}

/// External view host program speaking the stdio protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    /// Timeout for host replies in milliseconds.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

fn default_response_timeout_ms() -> u64 {
    30000
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for rolling log files (default: ~/.viewpump/logs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            dir: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
