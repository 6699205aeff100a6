//! View session: one embedded view, its bridge and its lifecycle.
//!
//! ```text
//!  Created ─load─► Loading ─ready─► Ready ─load─► Loaded
//!                     │                              │
//!                     └──► LoadFailed      unload ─► Unloaded
//!
//!  any state ─close─► Closed
//! ```
//!
//! Loads, readiness tracking and artifact capture live in sibling modules
//! (`session_load`, `session_artifacts`, `session_accessors`).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use viewpump_protocols::{DisplayProvider, EmbeddedView, LoopDriver, ViewConfig, ViewFactory};
use viewpump_runloop::LoopPump;

use crate::correlation::CorrelationTable;
use crate::dispatch::{DispatchRouter, RequestInterceptor, SessionListener};
use crate::display::resolve_display;
use crate::error::ViewError;
use crate::events::{SessionEvent, SessionState};
use crate::navigation::{NavigationPolicy, NavigationState};
use crate::options::SessionOptions;
use crate::script::{drain_outbox, ScriptExecutor};

/// Capacity of the observer event channel.
const EVENT_CAPACITY: usize = 256;

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Page event name unique to one session in this process.
pub(crate) fn next_event_name(prefix: &str) -> String {
    format!(
        "{}{}{}",
        prefix,
        Utc::now().timestamp_millis(),
        SESSION_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

/// Drives the view's loop through the pump.
struct ViewDriver(Arc<dyn EmbeddedView>);

impl LoopDriver for ViewDriver {
    fn cycle(&self, blocking: bool) {
        self.0.cycle(blocking);
    }
}

pub(crate) struct SessionShared {
    pub(crate) options: SessionOptions,
    pub(crate) event_name: String,
    pub(crate) display: u32,
    pub(crate) pump: LoopPump,
    pub(crate) tickets: Arc<CorrelationTable>,
    pub(crate) router: DispatchRouter,
    pub(crate) executor: ScriptExecutor,
    pub(crate) navigation: Arc<Mutex<NavigationState>>,
    pub(crate) interceptors: Arc<RwLock<Vec<RequestInterceptor>>>,
    pub(crate) view: RwLock<Option<Arc<dyn EmbeddedView>>>,
    pub(crate) state: watch::Sender<SessionState>,
    /// Bumped by every load; readiness of older loads is discarded.
    pub(crate) generation: AtomicU64,
    pub(crate) closed: AtomicBool,
    outbox_cancel: CancellationToken,
    /// Keeps provisioned displays alive for the session's lifetime.
    _display_provider: Arc<dyn DisplayProvider>,
}

impl SessionShared {
    fn shutdown(&self) {
        self.pump.cancel();
        self.outbox_cancel.cancel();
        if let Some(view) = self.view.write().take() {
            view.close();
        }
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        if !*self.closed.get_mut() {
            self.shutdown();
        }
    }
}

/// A scriptable embedded web view.
///
/// Cloning is cheap; clones drive the same view.
#[derive(Clone)]
pub struct Session {
    pub(crate) shared: Arc<SessionShared>,
}

impl Session {
    /// Resolve the display, create the view and start the bridge.
    pub async fn create(
        factory: &dyn ViewFactory,
        display_provider: Arc<dyn DisplayProvider>,
        options: SessionOptions,
    ) -> Result<Self, ViewError> {
        let display_index = resolve_display(
            display_provider.as_ref(),
            options.display,
            options.virtual_screen.as_ref(),
        )
        .await?;

        let event_name = next_event_name(&options.event_prefix);
        let pump = LoopPump::new(options.pump.clone());
        let tickets = Arc::new(CorrelationTable::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let router = DispatchRouter::new(tickets.clone(), pump.clone(), events);
        let navigation = Arc::new(Mutex::new(NavigationState {
            policy: NavigationPolicy::new(options.allow.clone()),
            ..Default::default()
        }));
        let interceptors = Arc::new(RwLock::new(Vec::new()));
        let listener = Arc::new(SessionListener::new(
            router.clone(),
            navigation.clone(),
            interceptors.clone(),
        ));

        let config = ViewConfig {
            webextension: options.webextension.clone(),
            event_name: event_name.clone(),
            display: Some(display_index),
        };
        let view = factory.create(config, listener.clone()).await?;
        listener.bind(&view);
        pump.attach(Arc::new(ViewDriver(view.clone())));

        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let outbox_cancel = CancellationToken::new();
        tokio::spawn(drain_outbox(
            outbox_rx,
            view.clone(),
            router.clone(),
            pump.clone(),
            outbox_cancel.clone(),
        ));

        let executor = ScriptExecutor::new(
            event_name.clone(),
            tickets.clone(),
            pump.clone(),
            outbox_tx,
            options.script_timeout,
        );
        let (state, _) = watch::channel(SessionState::Created);

        info!("Created session {} on display :{}", event_name, display_index);

        Ok(Self {
            shared: Arc::new(SessionShared {
                options,
                event_name,
                display: display_index,
                pump,
                tickets,
                router,
                executor,
                navigation,
                interceptors,
                view: RwLock::new(Some(view)),
                state,
                generation: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                outbox_cancel,
                _display_provider: display_provider,
            }),
        })
    }

    /// Run `source` in the page and return its result.
    ///
    /// Single-parameter functions receive an error-first callback; other
    /// sources are evaluated (zero-argument functions are invoked).
    pub async fn run(&self, source: &str) -> Result<Value, ViewError> {
        self.ensure_open()?;
        self.shared.executor.run(source).await
    }

    /// Run `source` and broadcast what it reports as the page event `event`.
    ///
    /// No reply is awaited; hold the pump with [`hold_pump`](Self::hold_pump)
    /// while waiting for the event.
    pub fn emit(&self, source: &str, event: &str) -> Result<(), ViewError> {
        self.ensure_open()?;
        self.shared.executor.emit(source, event)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.router.subscribe()
    }

    /// Register a rewriter applied to every allowed request.
    pub fn intercept_requests<F>(&self, interceptor: F)
    where
        F: Fn(&mut crate::navigation::NavigationRequest) + Send + Sync + 'static,
    {
        self.shared.interceptors.write().push(Arc::new(interceptor));
    }

    /// Close the view. Pending scripts fail with [`ViewError::Closed`].
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.shutdown();
        let failed = self.shared.tickets.fail_all(|| ViewError::Closed);
        self.shared.state.send_replace(SessionState::Closed);
        info!(
            "Closed session {} ({} pending scripts failed)",
            self.shared.event_name, failed
        );
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ViewError> {
        if self.is_closed() {
            Err(ViewError::Closed)
        } else {
            Ok(())
        }
    }

    pub(crate) fn view(&self) -> Result<Arc<dyn EmbeddedView>, ViewError> {
        self.shared.view.read().clone().ok_or(ViewError::Closed)
    }

    /// Move to `state` unless the session is closed.
    pub(crate) fn set_state(&self, state: SessionState) {
        self.shared.state.send_if_modified(|current| {
            if *current == SessionState::Closed || *current == state {
                return false;
            }
            debug!("Session {} {:?} -> {:?}", self.shared.event_name, current, state);
            *current = state;
            true
        });
    }
}
