//! Session state accessors.

use viewpump_runloop::{CycleMode, PumpGuard, PumpStats};

use crate::events::{PreloadState, ReadyState, SessionState};
use crate::session::Session;

impl Session {
    /// URI of the last load, cleared by [`unload`](Self::unload).
    pub fn uri(&self) -> Option<String> {
        self.shared.navigation.lock().target.clone()
    }

    /// Status of the last loaded document, when it was outside [200, 400).
    pub fn status(&self) -> Option<u16> {
        self.shared.navigation.lock().status
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn ready_state(&self) -> Option<ReadyState> {
        self.shared.state.borrow().ready_state()
    }

    pub fn preload_state(&self) -> PreloadState {
        self.shared.navigation.lock().preload
    }

    /// Page event name carrying envelopes back to this session.
    pub fn event_name(&self) -> &str {
        &self.shared.event_name
    }

    /// X display the view renders on.
    pub fn display(&self) -> u32 {
        self.shared.display
    }

    pub fn pump_stats(&self) -> PumpStats {
        self.shared.pump.stats()
    }

    /// Keep the view loop pumping until the guard is dropped, e.g. while
    /// waiting for a page event raised by [`emit`](Self::emit).
    pub fn hold_pump(&self) -> PumpGuard {
        self.shared.pump.hold(CycleMode::NonBlocking)
    }

    /// Number of scripts awaiting a reply.
    pub fn pending_scripts(&self) -> usize {
        self.shared.tickets.len()
    }
}
