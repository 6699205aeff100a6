//! In-process view used by the session tests.
//!
//! Like a native view, it makes progress only when its loop is cycled:
//! navigation commits, script replies and captures are all delivered from
//! inside `cycle()`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{broadcast, oneshot};

use viewpump_core::{Session, SessionEvent, SessionOptions};
use viewpump_protocols::{
    DisplayProvider, EmbeddedView, LoopDriver, PageScript, PdfOptions, ProtocolError,
    ViewConfig, ViewFactory, ViewListener, ViewLoadOptions, VirtualScreen, WebResponse,
};
use viewpump_runloop::PumpConfig;

pub const URI: &str = "http://example.com/";
pub const PAGE_HTML: &str = "<html><head></head><body>hello</body></html>";
pub const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// How the page answers a script.
#[derive(Debug, Clone)]
pub enum MockReply {
    Result(Value),
    Error(Value),
    /// Raw arguments of an emitted event.
    Args(Vec<Value>),
    /// Never answers.
    Silent,
}

/// What the mock page looks like.
#[derive(Debug, Clone)]
pub struct MockPage {
    /// `document.readyState` right after commit.
    pub ready_state: &'static str,
    pub status: u16,
    pub subresources: Vec<String>,
    pub html: String,
    /// Scripts whose code contains the pattern get the reply.
    pub responders: Vec<(String, MockReply)>,
    pub fail_load: Option<String>,
    /// Whether the page ever reaches `load`.
    pub fires_load: bool,
    /// Thrown by the ready-state query instead of answering it.
    pub ready_state_error: Option<Value>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self {
            ready_state: "interactive",
            status: 200,
            subresources: Vec::new(),
            html: PAGE_HTML.to_string(),
            responders: vec![
                ("1+1".to_string(), MockReply::Result(json!(2))),
                ("done('boom')".to_string(), MockReply::Error(json!("boom"))),
            ],
            fail_load: None,
            fires_load: true,
            ready_state_error: None,
        }
    }
}

#[derive(Default)]
pub struct MockState {
    pub uri: Option<String>,
    pub loads: Vec<String>,
    pub load_options: Vec<ViewLoadOptions>,
    pub queued: VecDeque<PageScript>,
    pub runs: Vec<PageScript>,
    /// Request decisions: requested URI and what the listener answered.
    pub decisions: Vec<(String, Option<String>)>,
    pub printed: Vec<String>,
    pub cycles: u64,
    pub blocking_cycles: u64,
    pub closed: bool,
    pending_load: Option<(String, oneshot::Sender<Result<(), ProtocolError>>)>,
    pending_png: Option<oneshot::Sender<Result<Bytes, ProtocolError>>>,
    pending_pdf: Option<(String, oneshot::Sender<Result<(), ProtocolError>>)>,
}

pub struct MockView {
    pub config: ViewConfig,
    listener: Arc<dyn ViewListener>,
    page: MockPage,
    fires_load: AtomicBool,
    pub state: Mutex<MockState>,
}

impl MockView {
    fn new(config: ViewConfig, listener: Arc<dyn ViewListener>, page: MockPage) -> Self {
        Self {
            config,
            listener,
            fires_load: AtomicBool::new(page.fires_load),
            page,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Whether later loads reach the window `load` event.
    pub fn set_fires_load(&self, fires: bool) {
        self.fires_load.store(fires, Ordering::SeqCst);
    }

    /// Raise a raw payload as if page code dispatched it.
    pub fn inject(&self, payload: &str) {
        self.listener.on_event(payload);
    }

    pub fn decision(&self, uri: &str) -> Option<Option<String>> {
        self.state
            .lock()
            .decisions
            .iter()
            .rev()
            .find(|(requested, _)| requested == uri)
            .map(|(_, decided)| decided.clone())
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.state
            .lock()
            .runs
            .iter()
            .any(|script| script.code.contains(pattern))
    }

    fn request(&self, uri: &str) -> Option<String> {
        let decided = self.listener.on_request(uri);
        self.state
            .lock()
            .decisions
            .push((uri.to_string(), decided.clone()));
        decided
    }

    fn navigate(&self, uri: &str) -> Result<(), ProtocolError> {
        if let Some(reason) = &self.page.fail_load {
            return Err(ProtocolError::LoadFailed(reason.clone()));
        }
        if self.request(uri).is_none() {
            return Err(ProtocolError::LoadFailed(format!("{} was blocked", uri)));
        }
        let status = if uri == "about:blank" { 200 } else { self.page.status };
        self.listener.on_response(WebResponse::new(uri, status));

        for subresource in &self.page.subresources {
            if let Some(decided) = self.request(subresource) {
                self.listener.on_response(WebResponse::new(decided, 200));
            }
        }
        Ok(())
    }

    fn reply_for(&self, code: &str) -> MockReply {
        if code.contains("DOMContentLoaded") {
            if let Some(error) = &self.page.ready_state_error {
                return MockReply::Error(error.clone());
            }
            let state = match self.page.ready_state {
                "complete" => "complete",
                _ => "interactive",
            };
            MockReply::Result(json!(state))
        } else if code.contains("addEventListener('load'") {
            if self.fires_load.load(Ordering::SeqCst) {
                MockReply::Result(json!("complete"))
            } else {
                MockReply::Silent
            }
        } else if code.contains("document.documentElement.outerHTML") {
            MockReply::Result(json!(self.page.html))
        } else if code.contains("document.cookie") {
            MockReply::Result(Value::Null)
        } else {
            self.page
                .responders
                .iter()
                .find(|(pattern, _)| code.contains(pattern.as_str()))
                .map(|(_, reply)| reply.clone())
                .unwrap_or(MockReply::Silent)
        }
    }

    fn answer(&self, script: PageScript) {
        let reply = self.reply_for(&script.code);
        let mut envelope = script.envelope.clone();
        self.state.lock().runs.push(script);

        let evented = envelope.event.is_some();
        match reply {
            MockReply::Silent => return,
            MockReply::Result(value) if evented => envelope.args = Some(vec![Value::Null, value]),
            MockReply::Result(value) => envelope.result = Some(value),
            MockReply::Error(error) if evented => envelope.args = Some(vec![error]),
            MockReply::Error(error) => envelope.error = Some(error),
            MockReply::Args(args) => envelope.args = Some(args),
        }
        self.listener.on_event(&envelope.to_json());
    }
}

impl LoopDriver for MockView {
    fn cycle(&self, blocking: bool) {
        let (load, scripts, png, pdf) = {
            let mut state = self.state.lock();
            state.cycles += 1;
            if blocking {
                state.blocking_cycles += 1;
            }
            if state.closed {
                return;
            }
            let png = if blocking { state.pending_png.take() } else { None };
            let pdf = if blocking { state.pending_pdf.take() } else { None };
            let scripts: Vec<PageScript> = state.queued.drain(..).collect();
            (state.pending_load.take(), scripts, png, pdf)
        };

        if let Some((uri, done)) = load {
            let _ = done.send(self.navigate(&uri));
        }
        for script in scripts {
            self.answer(script);
        }
        if let Some(done) = png {
            let _ = done.send(Ok(Bytes::from_static(PNG_SIGNATURE)));
        }
        if let Some((target, done)) = pdf {
            self.state.lock().printed.push(target);
            let _ = done.send(Ok(()));
        }
    }
}

#[async_trait]
impl EmbeddedView for MockView {
    async fn load(&self, uri: &str, options: &ViewLoadOptions) -> Result<(), ProtocolError> {
        let committed = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(ProtocolError::ViewClosed);
            }
            state.uri = Some(uri.to_string());
            state.loads.push(uri.to_string());
            state.load_options.push(options.clone());
            let (tx, rx) = oneshot::channel();
            state.pending_load = Some((uri.to_string(), tx));
            rx
        };
        committed.await.map_err(|_| ProtocolError::ViewClosed)?
    }

    fn run(&self, script: &PageScript) -> Result<(), ProtocolError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(ProtocolError::ViewClosed);
        }
        state.queued.push_back(script.clone());
        Ok(())
    }

    async fn png(&self) -> Result<Bytes, ProtocolError> {
        let captured = {
            let (tx, rx) = oneshot::channel();
            self.state.lock().pending_png = Some(tx);
            rx
        };
        captured.await.map_err(|_| ProtocolError::ViewClosed)?
    }

    async fn pdf(&self, target_uri: &str, _options: &PdfOptions) -> Result<(), ProtocolError> {
        let printed = {
            let (tx, rx) = oneshot::channel();
            self.state.lock().pending_pdf = Some((target_uri.to_string(), tx));
            rx
        };
        printed.await.map_err(|_| ProtocolError::ViewClosed)?
    }

    fn uri(&self) -> Option<String> {
        self.state.lock().uri.clone()
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.pending_load = None;
        state.pending_png = None;
        state.pending_pdf = None;
    }
}

pub struct MockFactory {
    page: MockPage,
    pub views: Mutex<Vec<Arc<MockView>>>,
}

impl MockFactory {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            views: Mutex::new(Vec::new()),
        }
    }

    /// The most recently created view.
    pub fn view(&self) -> Arc<MockView> {
        self.views.lock().last().cloned().expect("no view created")
    }
}

#[async_trait]
impl ViewFactory for MockFactory {
    async fn create(
        &self,
        config: ViewConfig,
        listener: Arc<dyn ViewListener>,
    ) -> Result<Arc<dyn EmbeddedView>, ProtocolError> {
        let view = Arc::new(MockView::new(config, listener, self.page.clone()));
        self.views.lock().push(view.clone());
        Ok(view)
    }
}

/// Display provider reporting a fixed availability.
pub struct StaticDisplay {
    pub available: bool,
}

#[async_trait]
impl DisplayProvider for StaticDisplay {
    async fn exists(&self, _index: u32) -> bool {
        self.available
    }

    async fn provision(&self, index: u32, _screen: &VirtualScreen) -> Result<u32, ProtocolError> {
        Ok(index)
    }
}

pub fn test_options() -> SessionOptions {
    SessionOptions {
        script_timeout: Some(Duration::from_secs(5)),
        pump: PumpConfig::new(5),
        ..Default::default()
    }
}

pub async fn session_with(
    page: MockPage,
    configure: impl FnOnce(&mut SessionOptions),
) -> (Session, Arc<MockFactory>) {
    let factory = Arc::new(MockFactory::new(page));
    let mut options = test_options();
    configure(&mut options);
    let session = Session::create(
        factory.as_ref(),
        Arc::new(StaticDisplay { available: true }),
        options,
    )
    .await
    .expect("session");
    (session, factory)
}

/// Collect events until one matches `last` (included).
pub async fn events_until(
    events: &mut broadcast::Receiver<SessionEvent>,
    last: impl Fn(&SessionEvent) -> bool,
) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event channel");
            let done = last(&event);
            seen.push(event);
            if done {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for events");
    seen
}

pub fn position(events: &[SessionEvent], wanted: &SessionEvent) -> usize {
    events
        .iter()
        .position(|event| event == wanted)
        .unwrap_or_else(|| panic!("{:?} not in {:?}", wanted, events))
}
