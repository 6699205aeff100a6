//! Reference-counted loop pump with a single-flight timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use viewpump_protocols::LoopDriver;

use crate::config::PumpConfig;

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;

/// Whether a cycle may block waiting for native events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    NonBlocking,
    /// Used around artifact capture so the pump does not busy-wait.
    Blocking,
}

/// Snapshot of the pump state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    /// Outstanding activations.
    pub active: i64,
    /// Outstanding blocking activations.
    pub blocking: u32,
    /// Whether a pump timer is currently scheduled.
    pub scheduled: bool,
    /// Cycles performed since creation.
    pub cycles: u64,
}

struct PumpState {
    active: i64,
    blocking: u32,
    timer: Option<JoinHandle<()>>,
    cancelled: bool,
}

struct PumpInner {
    interval: Duration,
    handle: Handle,
    driver: Mutex<Option<Arc<dyn LoopDriver>>>,
    state: Mutex<PumpState>,
    cycles: AtomicU64,
}

/// Pumps a foreign run loop while at least one operation is waiting on it.
///
/// Cloning is cheap; clones share the same counter and timer.
#[derive(Clone)]
pub struct LoopPump {
    inner: Arc<PumpInner>,
}

impl LoopPump {
    /// Create a pump. Must be called from within a tokio runtime.
    pub fn new(config: PumpConfig) -> Self {
        Self {
            inner: Arc::new(PumpInner {
                interval: config.interval(),
                handle: Handle::current(),
                driver: Mutex::new(None),
                state: Mutex::new(PumpState {
                    active: 0,
                    blocking: 0,
                    timer: None,
                    cancelled: false,
                }),
                cycles: AtomicU64::new(0),
            }),
        }
    }

    /// Attach the loop to drive.
    pub fn attach(&self, driver: Arc<dyn LoopDriver>) {
        *self.inner.driver.lock() = Some(driver);
        self.pump();
    }

    /// Register one more operation waiting on the loop and cycle it once.
    pub fn activate(&self, mode: CycleMode) {
        {
            let mut state = self.inner.state.lock();
            state.active += 1;
            if mode == CycleMode::Blocking {
                state.blocking += 1;
            }
            trace!("Pump activated ({} active)", state.active);
        }
        self.pump();
    }

    /// Release one activation.
    ///
    /// Going below zero is a bookkeeping defect: it is logged and the count is
    /// clamped back to zero.
    pub fn deactivate(&self, mode: CycleMode) {
        let mut state = self.inner.state.lock();
        state.active -= 1;
        if mode == CycleMode::Blocking {
            match state.blocking.checked_sub(1) {
                Some(blocking) => state.blocking = blocking,
                None => error!("Blocking pump released more often than held"),
            }
        }
        if state.active < 0 {
            error!(
                "Pump deactivated below zero ({}), activations and releases are unbalanced",
                state.active
            );
            state.active = 0;
        }
        if state.active == 0 {
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            trace!("Pump idle");
        }
    }

    /// Activate and return a guard that deactivates on drop.
    pub fn hold(&self, mode: CycleMode) -> PumpGuard {
        self.activate(mode);
        PumpGuard {
            pump: self.clone(),
            mode,
        }
    }

    /// Cycle the loop once without holding it active.
    pub fn kick(&self) {
        let blocking = {
            let state = self.inner.state.lock();
            if state.cancelled {
                return;
            }
            state.blocking > 0
        };
        self.cycle(blocking);
    }

    /// Stop pumping for good and drop the driver.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.cancelled = true;
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        drop(state);
        self.inner.driver.lock().take();
        debug!("Pump cancelled");
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active > 0
    }

    pub fn stats(&self) -> PumpStats {
        let state = self.inner.state.lock();
        PumpStats {
            active: state.active,
            blocking: state.blocking,
            scheduled: state.timer.is_some(),
            cycles: self.inner.cycles.load(Ordering::Relaxed),
        }
    }

    /// Cycle now if active, then make sure the next pump is scheduled.
    fn pump(&self) {
        let blocking = {
            let state = self.inner.state.lock();
            if state.cancelled || state.active <= 0 {
                return;
            }
            state.blocking > 0
        };
        self.cycle(blocking);
        self.schedule();
    }

    fn cycle(&self, blocking: bool) {
        // The driver may call back into listeners that deactivate this pump,
        // so no pump lock is held across the call.
        let driver = self.inner.driver.lock().clone();
        if let Some(driver) = driver {
            driver.cycle(blocking);
            self.inner.cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn schedule(&self) {
        let mut state = self.inner.state.lock();
        if state.cancelled || state.active <= 0 || state.timer.is_some() {
            return;
        }
        let pump = self.clone();
        let interval = self.inner.interval;
        state.timer = Some(self.inner.handle.spawn(async move {
            tokio::time::sleep(interval).await;
            pump.fire();
        }));
    }

    fn fire(&self) {
        self.inner.state.lock().timer = None;
        self.pump();
    }
}

/// Keeps the pump active until dropped.
pub struct PumpGuard {
    pump: LoopPump,
    mode: CycleMode,
}

impl PumpGuard {
    pub fn mode(&self) -> CycleMode {
        self.mode
    }
}

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.pump.deactivate(self.mode);
    }
}
