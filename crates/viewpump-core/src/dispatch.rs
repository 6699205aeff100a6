//! Inbound routing: the single entry point for everything the view reports.

use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use viewpump_protocols::{EmbeddedView, Envelope, Ticket, ViewListener, WebResponse};
use viewpump_runloop::{CycleMode, LoopPump};

use crate::correlation::{CorrelationTable, ReplyOutcome};
use crate::error::ViewError;
use crate::events::{PreloadState, SessionEvent};
use crate::navigation::{NavigationRequest, NavigationState};

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;

/// Synchronous rewriter applied to every allowed request.
pub type RequestInterceptor = Arc<dyn Fn(&mut NavigationRequest) + Send + Sync>;

/// An inbound payload, classified once.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event { name: String, args: Vec<Value> },
    Reply { ticket: Ticket, outcome: Result<Value, Value> },
    Malformed(String),
}

impl Inbound {
    pub fn parse(payload: &str) -> Self {
        let payload = payload.trim();
        if payload.is_empty() {
            return Inbound::Malformed("empty payload".to_string());
        }
        let envelope: Option<Envelope> = match serde_json::from_str(payload) {
            Ok(envelope) => envelope,
            Err(e) => return Inbound::Malformed(format!("unparsable payload: {}", e)),
        };
        let Some(envelope) = envelope else {
            return Inbound::Malformed("null payload".to_string());
        };

        match (envelope.ticket, envelope.event) {
            (Some(ticket), None) => {
                let outcome = match envelope.error {
                    Some(error) if !error.is_null() => Err(error),
                    _ => Ok(envelope.result.unwrap_or(Value::Null)),
                };
                Inbound::Reply { ticket, outcome }
            }
            (None, Some(name)) => Inbound::Event {
                name,
                args: envelope.args.unwrap_or_default(),
            },
            (Some(_), Some(_)) => Inbound::Malformed("both ticket and event set".to_string()),
            (None, None) => Inbound::Malformed("neither ticket nor event set".to_string()),
        }
    }
}

/// Routes replies to their callers and page events to subscribers.
#[derive(Clone)]
pub struct DispatchRouter {
    tickets: Arc<CorrelationTable>,
    pump: LoopPump,
    events: broadcast::Sender<SessionEvent>,
}

impl DispatchRouter {
    pub fn new(
        tickets: Arc<CorrelationTable>,
        pump: LoopPump,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            tickets,
            pump,
            events,
        }
    }

    /// Route one serialized envelope.
    pub fn route(&self, payload: &str) {
        match Inbound::parse(payload) {
            Inbound::Reply { ticket, outcome } => {
                trace!(%ticket, "Routing reply");
                self.settle(ticket, outcome.map_err(ViewError::Script));
            }
            Inbound::Event { name, args } => {
                trace!("Routing page event '{}'", name);
                self.emit(SessionEvent::Custom { name, args });
            }
            Inbound::Malformed(reason) => {
                warn!("Dropping inbound payload: {}", reason);
            }
        }
    }

    /// Deliver `outcome` to the caller of `ticket` and release the pump unit
    /// it held. Nothing happens for tickets that are no longer pending.
    pub fn settle(&self, ticket: Ticket, outcome: ReplyOutcome) -> bool {
        let settled = self.tickets.resolve(ticket, outcome);
        if settled {
            self.pump.deactivate(CycleMode::NonBlocking);
        }
        settled
    }

    pub fn emit(&self, event: SessionEvent) {
        // no subscribers is not an error
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// The listener handed to the native view.
pub(crate) struct SessionListener {
    router: DispatchRouter,
    navigation: Arc<Mutex<NavigationState>>,
    interceptors: Arc<RwLock<Vec<RequestInterceptor>>>,
    view: OnceLock<Weak<dyn EmbeddedView>>,
}

impl SessionListener {
    pub(crate) fn new(
        router: DispatchRouter,
        navigation: Arc<Mutex<NavigationState>>,
        interceptors: Arc<RwLock<Vec<RequestInterceptor>>>,
    ) -> Self {
        Self {
            router,
            navigation,
            interceptors,
            view: OnceLock::new(),
        }
    }

    /// Attach the view whose committed URI the policy compares against.
    pub(crate) fn bind(&self, view: &Arc<dyn EmbeddedView>) {
        let _ = self.view.set(Arc::downgrade(view));
    }

    /// URI of the committed document, or of the load in flight.
    fn committed_uri(&self) -> Option<String> {
        let from_view = self
            .view
            .get()
            .and_then(Weak::upgrade)
            .and_then(|view| view.uri());
        from_view.or_else(|| self.navigation.lock().target.clone())
    }
}

impl ViewListener for SessionListener {
    fn on_request(&self, uri: &str) -> Option<String> {
        let committed = self.committed_uri();
        let (allowed, preloading) = {
            let navigation = self.navigation.lock();
            let preloading = navigation.preload == PreloadState::Active;
            (
                navigation
                    .policy
                    .should_allow(uri, committed.as_deref(), preloading),
                preloading,
            )
        };

        if !allowed {
            debug!("Blocked request {}", uri);
            return None;
        }
        if preloading {
            return Some(uri.to_string());
        }

        let mut request = NavigationRequest::new(uri);
        let interceptors = self.interceptors.read().clone();
        for interceptor in interceptors {
            interceptor(&mut request);
        }
        if request.uri != uri {
            debug!("Request {} rewritten to {}", uri, request.uri);
        }
        self.router.emit(SessionEvent::Request(request.clone()));
        Some(request.uri)
    }

    fn on_response(&self, response: WebResponse) {
        let committed = self.committed_uri();
        {
            let mut navigation = self.navigation.lock();
            if navigation.preload == PreloadState::Active {
                return;
            }
            if navigation.status_armed && committed.as_deref() == Some(response.uri.as_str()) {
                navigation.status_armed = false;
                if response.is_failure() {
                    debug!("Document {} answered {}", response.uri, response.status);
                    navigation.status = Some(response.status);
                }
            }
        }
        self.router.emit(SessionEvent::Response(response));
    }

    fn on_event(&self, payload: &str) {
        self.router.route(payload);
    }
}
