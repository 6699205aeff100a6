//! # viewpump Protocols
//!
//! Interface definitions shared between the bridge core and the native view
//! implementations. Contains only traits and wire types - no implementations.
//!
//! ## Core Traits
//!
//! - [`EmbeddedView`] - A native web view driven by the bridge
//! - [`LoopDriver`] - One iteration of the view's foreign run loop
//! - [`ViewListener`] - Inbound hooks the native layer calls back into
//! - [`ViewFactory`] - Builds views from a [`ViewConfig`]
//! - [`DisplayProvider`] - Probes and provisions X displays

pub mod display;
pub mod envelope;
pub mod error;
pub mod view;

pub use display::{DisplayProvider, VirtualScreen};
pub use envelope::{Envelope, PageScript, RunMode, Ticket};
pub use error::ProtocolError;
pub use view::{
    EmbeddedView, LoopDriver, PdfOptions, ViewConfig, ViewFactory, ViewListener,
    ViewLoadOptions, WebResponse,
};
