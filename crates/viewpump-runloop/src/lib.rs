//! # viewpump RunLoop
//!
//! Drives a foreign, cooperative GUI run loop from the tokio scheduler.
//!
//! The embedded view owns a native event loop that makes progress only when
//! the host asks it to process one iteration. [`LoopPump`] keeps a reference
//! count of operations that are waiting on the view; while the count is
//! positive it cycles the loop once per interval from a single scheduled
//! timer task, and stops as soon as the count drops back to zero.
//!
//! ```text
//!  activate ──► count += 1 ──► cycle now ──► schedule (single-flight)
//!                                                   │ interval
//!                                                   ▼
//!  deactivate ─► count -= 1          fire ──► cycle ──► reschedule while count > 0
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let pump = LoopPump::new(PumpConfig::default());
//! pump.attach(driver);
//! let _guard = pump.hold(CycleMode::NonBlocking);
//! // the view loop is cycled every 20ms until `_guard` is dropped
//! ```

pub mod config;
pub mod pump;

pub use config::PumpConfig;
pub use pump::{CycleMode, LoopPump, PumpGuard, PumpStats};
