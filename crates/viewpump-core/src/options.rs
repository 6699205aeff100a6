//! Session and load options.

use std::path::PathBuf;
use std::time::Duration;

use viewpump_config::Config;
use viewpump_protocols::{ViewLoadOptions, VirtualScreen};
use viewpump_runloop::PumpConfig;

use crate::error::ViewError;
use crate::navigation::AllowMode;

/// Options fixed at session creation.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// X display index the view should render on.
    pub display: u32,
    /// Provision the display with this geometry when it is missing.
    pub virtual_screen: Option<VirtualScreen>,
    pub webextension: Option<PathBuf>,
    /// Prefix of the per-session page event name.
    pub event_prefix: String,
    /// Deadline for a ticketed reply. `None` waits forever.
    pub script_timeout: Option<Duration>,
    pub pump: PumpConfig,
    /// Allow mode of loads that do not set their own.
    pub allow: AllowMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            display: 0,
            virtual_screen: None,
            webextension: None,
            event_prefix: "viewpump".to_string(),
            script_timeout: Some(Duration::from_secs(30)),
            pump: PumpConfig::default(),
            allow: AllowMode::All,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Result<Self, ViewError> {
        let session = &config.session;
        Ok(Self {
            display: config.display.index,
            virtual_screen: config.display.virtual_screen.map(|screen| VirtualScreen {
                width: screen.width,
                height: screen.height,
                depth: screen.depth,
            }),
            webextension: session.webextension.clone(),
            event_prefix: session.event_prefix.clone(),
            script_timeout: match session.script_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
            pump: PumpConfig::new(config.pump.interval_ms),
            allow: AllowMode::from_config(&session.allow)?,
        })
    }
}

/// Options for one [`load`](crate::Session::load).
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Overrides the session's allow mode for this load.
    pub allow: Option<AllowMode>,
    /// Cookies set on the document before the real load.
    pub cookies: Vec<String>,
    /// File whose content becomes the user stylesheet.
    pub stylesheet: Option<PathBuf>,
    /// Options forwarded to the native view.
    pub view: ViewLoadOptions,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow(mut self, allow: AllowMode) -> Self {
        self.allow = Some(allow);
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookies.push(cookie.into());
        self
    }

    pub fn with_stylesheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.stylesheet = Some(path.into());
        self
    }

    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.view.css = Some(css.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.view.user_agent = Some(user_agent.into());
        self
    }
}
