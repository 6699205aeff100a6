//! Script execution: classification, page-code generation and the ticketed
//! round trip.
//!
//! A source string is classified into a [`RunMode`], wrapped into page code
//! that reports back through the session's page event, and handed to the view
//! on the outbox task. Ticketed runs keep the loop pump active until the
//! reply is routed back (or the call times out or is dropped).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use viewpump_protocols::{EmbeddedView, Envelope, PageScript, RunMode, Ticket};
use viewpump_runloop::{CycleMode, LoopPump};

use crate::correlation::CorrelationTable;
use crate::dispatch::DispatchRouter;
use crate::error::ViewError;

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;

static ASYNC_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(async\s+)?function(\s+[\w$]+)?\s*\(\s*[\w$]+\s*\)")
        .expect("valid async function pattern")
});

static ASYNC_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(async\s+)?(\(\s*[\w$]+\s*\)|[\w$]+)\s*=>").expect("valid async arrow pattern")
});

static PATH_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(file|https?):").expect("valid path pattern"));

static ZERO_ARG_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(function(\s+[\w$]+)?\s*\(\s*\)|\(\s*\)\s*=>)")
        .expect("valid zero-arg function pattern")
});

/// Classify a script source.
///
/// Single-parameter functions receive an error-first callback, `file:` and
/// `http(s):` sources name an external script, anything else is evaluated.
pub fn classify(source: &str) -> RunMode {
    if ASYNC_FUNCTION.is_match(source) || ASYNC_ARROW.is_match(source) {
        RunMode::Async
    } else if PATH_SOURCE.is_match(source) {
        RunMode::Path
    } else {
        RunMode::Sync
    }
}

/// Generate page code for `source`.
///
/// The code fills `envelope` with the outcome and raises it as a
/// `CustomEvent` named `event_name` whose `detail` is the serialized envelope.
pub fn compile(source: &str, envelope: Envelope, event_name: &str) -> Result<PageScript, ViewError> {
    let body = strip_source(source);
    let message = envelope.to_json();
    let event = serde_json::to_string(event_name).map_err(|e| ViewError::UnexpectedReply(e.to_string()))?;

    let code = match envelope.mode {
        RunMode::Sync => sync_code(body, &message, &event),
        RunMode::Async => async_code(body, &message, &event),
        RunMode::Path => return Err(ViewError::UnsupportedMode(RunMode::Path)),
    };
    Ok(PageScript::new(code, envelope))
}

fn strip_source(source: &str) -> &str {
    source.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn sync_code(body: &str, message: &str, event: &str) -> String {
    let invocation = if ZERO_ARG_FUNCTION.is_match(body) {
        format!("({})()", body)
    } else {
        format!("(function() {{ return {}; }})()", body)
    };
    format!(
        r#"(function() {{
  var message = {message};
  function serialize(e) {{ return (e instanceof Error) ? {{ name: e.name, message: e.message }} : e; }}
  try {{
    var result = {invocation};
    if (message.event) message.args = [null, result]; else message.result = result;
  }} catch (e) {{
    if (message.event) message.args = [serialize(e)]; else message.error = serialize(e);
  }}
  window.dispatchEvent(new CustomEvent({event}, {{ detail: JSON.stringify(message) }}));
}})();"#
    )
}

fn async_code(body: &str, message: &str, event: &str) -> String {
    format!(
        r#"(function() {{
  var message = {message};
  var settled = false;
  function serialize(e) {{ return (e instanceof Error) ? {{ name: e.name, message: e.message }} : e; }}
  function dispatch() {{
    window.dispatchEvent(new CustomEvent({event}, {{ detail: JSON.stringify(message) }}));
  }}
  function done(err, result) {{
    if (message.event) {{
      message.args = Array.prototype.slice.call(arguments).map(serialize);
      dispatch();
      return;
    }}
    if (settled) return;
    settled = true;
    if (err) message.error = serialize(err); else message.result = result;
    dispatch();
  }}
  try {{
    ({body})(done);
  }} catch (e) {{
    done(e);
  }}
}})();"#
    )
}

/// Page code setting each cookie on the current document.
pub fn cookie_script(cookies: &[String]) -> String {
    let statements: Vec<String> = cookies
        .iter()
        .map(|cookie| {
            let literal = serde_json::to_string(cookie).unwrap_or_else(|_| "\"\"".to_string());
            format!("document.cookie = {};", literal)
        })
        .collect();
    format!("function() {{ {} }}", statements.join(" "))
}

/// Issues scripts and awaits their replies.
pub struct ScriptExecutor {
    event_name: String,
    next_ticket: AtomicU64,
    tickets: Arc<CorrelationTable>,
    pump: LoopPump,
    outbox: mpsc::UnboundedSender<PageScript>,
    timeout: Option<Duration>,
}

impl ScriptExecutor {
    pub fn new(
        event_name: impl Into<String>,
        tickets: Arc<CorrelationTable>,
        pump: LoopPump,
        outbox: mpsc::UnboundedSender<PageScript>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            next_ticket: AtomicU64::new(1),
            tickets,
            pump,
            outbox,
            timeout,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    /// Run `source` in the page and wait for its outcome.
    pub async fn run(&self, source: &str) -> Result<Value, ViewError> {
        let mode = classify(source);
        if mode == RunMode::Path {
            warn!("Refusing to run external script {}", source.trim());
            return Err(ViewError::UnsupportedMode(mode));
        }

        let ticket = Ticket::new(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        let script = compile(source, Envelope::ticketed(ticket, mode), &self.event_name)?;

        let (tx, rx) = oneshot::channel();
        self.tickets.register(ticket, tx)?;
        let _guard = TicketGuard {
            ticket,
            tickets: &self.tickets,
            pump: &self.pump,
        };
        self.pump.activate(CycleMode::NonBlocking);

        trace!(%ticket, %mode, "Queueing script");
        if self.outbox.send(script).is_err() {
            return Err(ViewError::Closed);
        }

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!("Ticket {} timed out after {:?}", ticket, limit);
                    return Err(ViewError::Timeout(format!(
                        "no reply for ticket {} within {:?}",
                        ticket, limit
                    )));
                }
            },
            None => rx.await,
        };

        outcome.unwrap_or(Err(ViewError::Closed))
    }

    /// Run `source` with its reply broadcast as the page event `event`.
    pub fn emit(&self, source: &str, event: &str) -> Result<(), ViewError> {
        let mode = classify(source);
        if mode == RunMode::Path {
            warn!("Refusing to run external script {}", source.trim());
            return Err(ViewError::UnsupportedMode(mode));
        }
        let script = compile(source, Envelope::evented(event, mode), &self.event_name)?;
        self.outbox.send(script).map_err(|_| ViewError::Closed)
    }
}

/// Releases a ticket that was not answered: on timeout, on close of the
/// outbox, or when the awaiting future is dropped.
struct TicketGuard<'a> {
    ticket: Ticket,
    tickets: &'a CorrelationTable,
    pump: &'a LoopPump,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        if self.tickets.cancel(self.ticket) {
            self.pump.deactivate(CycleMode::NonBlocking);
        }
    }
}

/// Hand queued scripts to the view in issue order until cancelled.
pub(crate) async fn drain_outbox(
    mut outbox: mpsc::UnboundedReceiver<PageScript>,
    view: Arc<dyn EmbeddedView>,
    router: DispatchRouter,
    pump: LoopPump,
    cancel: CancellationToken,
) {
    loop {
        let script = tokio::select! {
            _ = cancel.cancelled() => break,
            next = outbox.recv() => match next {
                Some(script) => script,
                None => break,
            },
        };

        let ticket = script.envelope.ticket;
        match view.run(&script) {
            Ok(()) => {
                if ticket.is_none() {
                    // event-named runs hold no pump unit, cycle once so the page picks them up
                    pump.kick();
                }
            }
            Err(e) => match ticket {
                Some(ticket) => {
                    router.settle(ticket, Err(ViewError::Protocol(e)));
                }
                None => warn!("View rejected event script: {}", e),
            },
        }
    }
    debug!("Script outbox closed");
}
