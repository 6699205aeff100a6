//! # viewpump Core
//!
//! The host/view bridge: a [`Session`] owns one embedded view, pumps its
//! foreign run loop while anything waits on it, runs scripts in the page and
//! routes what the page reports back to the right caller.
//!
//! ## Components
//!
//! - [`CorrelationTable`] - pending script replies keyed by ticket
//! - [`DispatchRouter`] - single entry point for inbound envelopes
//! - [`ScriptExecutor`] - classification, page-code generation, round trips
//! - [`NavigationPolicy`] - which outgoing requests a load may issue
//! - [`resolve_display`] / [`XvfbProvider`] - X display selection
//!
//! ## Example
//!
//! ```rust,ignore
//! let session = Session::create(&factory, Arc::new(XvfbProvider::default()), options).await?;
//! session.load("https://example.com", LoadOptions::new()).await?;
//! let html = session.html().await?;
//! let two = session.run("1+1").await?;
//! session.close();
//! ```

pub mod correlation;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod events;
pub mod navigation;
pub mod options;
pub mod script;
pub mod session;
mod session_accessors;
mod session_artifacts;
mod session_load;

pub use correlation::CorrelationTable;
pub use dispatch::{DispatchRouter, Inbound, RequestInterceptor};
pub use display::{resolve_display, XvfbProvider};
pub use error::{DisplayError, ViewError};
pub use events::{PreloadState, ReadyState, SessionEvent, SessionState};
pub use navigation::{AllowMode, NavigationPolicy, NavigationRequest};
pub use options::{LoadOptions, SessionOptions};
pub use script::{classify, compile, cookie_script, ScriptExecutor};
pub use session::Session;

pub use viewpump_protocols::{PdfOptions, RunMode, WebResponse};
pub use viewpump_runloop::{PumpGuard, PumpStats};
