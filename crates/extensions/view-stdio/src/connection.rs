//! Request/reply connection to a view host over JSON lines.
//!
//! Writes go through a writer task so they can be issued from synchronous
//! code (loop cycles, script handoff). A reader task resolves pending replies
//! by id and forwards notifications to the view listener.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace, warn};

use viewpump_protocols::ViewListener;

use crate::error::StdioViewError;
use crate::protocol::{DecisionFrame, HostMessage, HostReply, HostRequest, Notification};

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;

/// Longest frame prefix written to the log, in characters.
const LOG_PREVIEW_CHARS: usize = 200;

type PendingReplies = HashMap<u64, oneshot::Sender<Result<Value, StdioViewError>>>;

/// Shared between the connection and its reader task.
struct ConnectionState {
    pending: Mutex<PendingReplies>,
    uri: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl ConnectionState {
    fn fail_pending(&self, reason: &str) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        for (_, sender) in drained {
            let _ = sender.send(Err(StdioViewError::HostDied(reason.to_string())));
        }
    }
}

/// Connection to one view host.
pub struct HostConnection {
    outgoing: mpsc::UnboundedSender<String>,
    request_id: AtomicU64,
    state: Arc<ConnectionState>,
    response_timeout: Duration,
}

impl HostConnection {
    /// Start the reader and writer tasks over `reader`/`writer`.
    pub fn connect<R, W>(
        reader: R,
        writer: W,
        listener: Arc<dyn ViewListener>,
        response_timeout: Duration,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, lines) = mpsc::unbounded_channel();
        let state = Arc::new(ConnectionState {
            pending: Mutex::new(HashMap::new()),
            uri: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(write_lines(writer, lines));
        tokio::spawn(read_lines(
            reader,
            listener,
            state.clone(),
            outgoing.clone(),
        ));

        Self {
            outgoing,
            request_id: AtomicU64::new(1),
            state,
            response_timeout,
        }
    }

    /// Call a host method and wait for its reply.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, StdioViewError> {
        let (id, line) = self.frame(method, params)?;

        let (tx, rx) = oneshot::channel();
        self.state.pending.lock().insert(id, tx);

        if self.outgoing.send(line).is_err() {
            self.state.pending.lock().remove(&id);
            return Err(StdioViewError::Closed);
        }

        match tokio::time::timeout(self.response_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(StdioViewError::Communication(
                "Reply channel closed".to_string(),
            )),
            Err(_) => {
                self.state.pending.lock().remove(&id);
                Err(StdioViewError::Timeout(format!(
                    "Method {} timed out after {:?}",
                    method, self.response_timeout
                )))
            }
        }
    }

    /// Send a request without waiting for its reply. Error replies are logged.
    pub fn notify(&self, method: &str, params: Value) -> Result<(), StdioViewError> {
        let (_, line) = self.frame(method, params)?;
        self.outgoing.send(line).map_err(|_| StdioViewError::Closed)
    }

    /// Last URI the host navigated to.
    pub fn uri(&self) -> Option<String> {
        self.state.uri.lock().clone()
    }

    pub fn set_uri(&self, uri: Option<String>) {
        *self.state.uri.lock() = uri;
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting requests and fail the pending ones.
    pub fn close(&self) {
        if !self.state.closed.swap(true, Ordering::SeqCst) {
            self.state.fail_pending("connection closed");
        }
    }

    pub fn pending(&self) -> usize {
        self.state.pending.lock().len()
    }

    fn frame(&self, method: &str, params: Value) -> Result<(u64, String), StdioViewError> {
        if self.is_closed() {
            return Err(StdioViewError::Closed);
        }
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&HostRequest { id, method, params })?;
        if method != "loop" {
            trace!("Host request: {}", preview(&line));
        }
        Ok((id, line))
    }
}

/// Log-sized prefix of `line`, cut on a character boundary.
fn preview(line: &str) -> &str {
    line.char_indices()
        .nth(LOG_PREVIEW_CHARS)
        .map_or(line, |(end, _)| &line[..end])
}

async fn write_lines<W>(mut writer: W, mut lines: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            warn!("Failed to write to view host: {}", e);
            break;
        }
    }
}

async fn read_lines<R>(
    reader: R,
    listener: Arc<dyn ViewListener>,
    state: Arc<ConnectionState>,
    outgoing: mpsc::UnboundedSender<String>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Host message: {}", preview(&line));

        match serde_json::from_str::<HostMessage>(&line) {
            Ok(HostMessage::Reply(reply)) => resolve(&state, reply),
            Ok(HostMessage::Notification(notification)) => {
                handle_notification(notification, listener.as_ref(), &state, &outgoing)
            }
            Err(e) => {
                error!("Failed to parse host message: {} - {}", e, line);
            }
        }
    }

    debug!("View host closed its output");
    state.closed.store(true, Ordering::SeqCst);
    state.fail_pending("host closed its output");
}

fn resolve(state: &ConnectionState, reply: HostReply) {
    let sender = state.pending.lock().remove(&reply.id);
    let result = match reply.error {
        Some(error) => Err(StdioViewError::Host(error.message)),
        None => Ok(reply.result.unwrap_or(Value::Null)),
    };
    match (sender, result) {
        (Some(sender), result) => {
            let _ = sender.send(result);
        }
        (None, Err(e)) => warn!("Host request {} failed: {}", reply.id, e),
        (None, Ok(_)) => trace!("Unawaited reply {}", reply.id),
    }
}

fn handle_notification(
    notification: Notification,
    listener: &dyn ViewListener,
    state: &ConnectionState,
    outgoing: &mpsc::UnboundedSender<String>,
) {
    match notification {
        Notification::Request { id, uri } => {
            let decided = listener.on_request(&uri);
            match serde_json::to_string(&DecisionFrame::new(id, decided)) {
                Ok(line) => {
                    let _ = outgoing.send(line);
                }
                Err(e) => error!("Failed to encode decision: {}", e),
            }
        }
        Notification::Response(response) => listener.on_response(response),
        Notification::Event { payload } => listener.on_event(&payload),
        Notification::Committed { uri } => {
            *state.uri.lock() = Some(uri);
        }
    }
}
