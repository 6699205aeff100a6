//! # viewpump View Host
//!
//! [`EmbeddedView`](viewpump_protocols::EmbeddedView) implementation that
//! drives a native web view living in a separate host process. The host
//! speaks JSON lines on stdin/stdout: requests carry an id and a method,
//! replies echo the id, and notifications (intercepted requests, responses,
//! page events, commits) arrive tagged by `notify`.
//!
//! Host methods: `init`, `load`, `loop`, `run`, `png`, `pdf`, `close` and
//! `decision` (the answer to an intercepted request).

pub mod connection;
pub mod error;
pub mod protocol;
pub mod view;

pub use connection::HostConnection;
pub use error::StdioViewError;
pub use view::{StdioView, StdioViewConfig, StdioViewFactory};
