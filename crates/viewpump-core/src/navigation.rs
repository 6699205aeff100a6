//! Navigation policy: which outgoing requests the view may issue.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use viewpump_config::AllowConfig;

use crate::error::ViewError;
use crate::events::PreloadState;

#[cfg(test)]
#[path = "navigation_tests.rs"]
mod tests;

/// An intercepted outgoing request. Interceptors may rewrite `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub uri: String,
}

impl NavigationRequest {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// Which requests are allowed relative to the committed document.
#[derive(Debug, Clone, Default)]
pub enum AllowMode {
    #[default]
    All,
    /// Only the committed document itself.
    None,
    /// Same host and effective port as the committed document.
    SameOrigin,
    /// Request URIs matching the pattern.
    Pattern(Regex),
}

impl AllowMode {
    pub fn from_config(config: &AllowConfig) -> Result<Self, ViewError> {
        match config {
            AllowConfig::Keyword(keyword) => keyword.parse(),
            AllowConfig::Pattern { pattern } => Regex::new(pattern)
                .map(AllowMode::Pattern)
                .map_err(|e| ViewError::InvalidAllowMode(e.to_string())),
        }
    }
}

impl FromStr for AllowMode {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(AllowMode::All),
            "none" => Ok(AllowMode::None),
            "same-origin" => Ok(AllowMode::SameOrigin),
            other => Err(ViewError::InvalidAllowMode(other.to_string())),
        }
    }
}

impl fmt::Display for AllowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowMode::All => write!(f, "all"),
            AllowMode::None => write!(f, "none"),
            AllowMode::SameOrigin => write!(f, "same-origin"),
            AllowMode::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Decides outgoing requests for one load.
#[derive(Debug, Clone, Default)]
pub struct NavigationPolicy {
    allow: AllowMode,
}

impl NavigationPolicy {
    pub fn new(allow: AllowMode) -> Self {
        Self { allow }
    }

    pub fn allow_mode(&self) -> &AllowMode {
        &self.allow
    }

    /// Whether `uri` may be requested while `committed` is the document URI.
    ///
    /// The document itself is always allowed. During the cookie preload
    /// nothing else is fetched.
    pub fn should_allow(&self, uri: &str, committed: Option<&str>, preloading: bool) -> bool {
        if committed == Some(uri) {
            return true;
        }
        if preloading {
            return false;
        }
        match &self.allow {
            AllowMode::All => true,
            AllowMode::None => false,
            AllowMode::SameOrigin => committed.is_some_and(|doc| same_origin(uri, doc)),
            AllowMode::Pattern(re) => re.is_match(uri),
        }
    }
}

/// Same host and effective port. Unparsable URIs never match.
fn same_origin(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => {
            a.host_str().is_some()
                && a.host_str() == b.host_str()
                && a.port_or_known_default() == b.port_or_known_default()
        }
        _ => false,
    }
}

/// Navigation bookkeeping shared between a session and its view listener.
#[derive(Debug, Default)]
pub(crate) struct NavigationState {
    pub(crate) policy: NavigationPolicy,
    pub(crate) preload: PreloadState,
    /// URI of the load in flight.
    pub(crate) target: Option<String>,
    /// Whether the next response for the committed document records its status.
    pub(crate) status_armed: bool,
    pub(crate) status: Option<u16>,
}
