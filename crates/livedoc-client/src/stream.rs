//! Supervised event stream connection.
//!
//! [`StreamClient::connect`] spawns a supervisor task that owns the
//! transport and replaces it whenever the connection drops. Decoded events
//! reach consumers through registered callbacks (synchronous, in arrival
//! order) and a broadcast channel for pull-style subscribers.
//!
//! ```text
//!   StreamHandle                         StreamSupervisor (tokio task)
//!   ┌──────────────────────┐  callbacks  ┌─────────────────────────────────┐
//!   │ .on_message(cb)      │ ◀────────── │ Transport::open → FrameStream   │
//!   │ .subscribe()         │ ◀─ bcast ── │ decode JSON, drop malformed     │
//!   │ .watch_state()       │ ◀─ watch ── │ drop → wait backoff → reopen    │
//!   │ .dispose()           │ ──cancel──▶ │ TornDown, exit                  │
//!   └──────────────────────┘             └─────────────────────────────────┘
//! ```
//!
//! There is no replay: events emitted while the connection is down are not
//! recovered on reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use livedoc_types::StreamEvent;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::constants::{
    CONNECT_TIMEOUT, EVENT_CHANNEL_CAPACITY, RECONNECT_BACKOFF, STATUS_CHANNEL_CAPACITY,
};
use crate::endpoint::StreamEndpoint;
use crate::sse::SseFrame;
use crate::subscriptions::{ConnectionStatus, StreamState};
use crate::transport::{FrameStream, Transport, TransportError};

type MessageCallback = Box<dyn FnMut(&StreamEvent) + Send>;

/// Supervisor tuning.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Fixed wait before each reconnect attempt.
    pub reconnect_backoff: Duration,
    /// Upper bound on a single open attempt.
    pub connect_timeout: Duration,
    /// Broadcast capacity for [`StreamHandle::subscribe`].
    pub event_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: RECONNECT_BACKOFF,
            connect_timeout: CONNECT_TIMEOUT,
            event_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// State shared between the handle and its supervisor.
struct Shared {
    callbacks: Mutex<Vec<MessageCallback>>,
    state_tx: watch::Sender<StreamState>,
    event_tx: broadcast::Sender<StreamEvent>,
    status_tx: broadcast::Sender<ConnectionStatus>,
}

impl Shared {
    /// Move to `next` unless already torn down.
    fn set_state(&self, next: StreamState) {
        self.state_tx.send_if_modified(|state| {
            if state.is_terminal() || *state == next {
                return false;
            }
            trace!(from = ?*state, to = ?next, "stream state");
            *state = next;
            true
        });
    }

    fn notify(&self, status: ConnectionStatus) {
        let _ = self.status_tx.send(status);
    }

    fn deliver(&self, event: StreamEvent) {
        {
            let mut callbacks = self.callbacks.lock();
            for callback in callbacks.iter_mut() {
                callback(&event);
            }
        }
        let _ = self.event_tx.send(event);
    }
}

// ============================================================================
// StreamClient / StreamHandle
// ============================================================================

/// Entry point for opening supervised event streams.
pub struct StreamClient;

impl StreamClient {
    /// Start streaming from `endpoint`. Must be called inside a tokio runtime.
    pub fn connect(
        endpoint: StreamEndpoint,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
    ) -> StreamHandle {
        Self::spawn(endpoint, transport, config, Vec::new())
    }

    /// Like [`connect`](Self::connect), with `callback` registered before the
    /// supervisor starts so that no event can slip past it.
    pub fn connect_with<F>(
        endpoint: StreamEndpoint,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
        callback: F,
    ) -> StreamHandle
    where
        F: FnMut(&StreamEvent) + Send + 'static,
    {
        Self::spawn(endpoint, transport, config, vec![Box::new(callback)])
    }

    fn spawn(
        endpoint: StreamEndpoint,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
        callbacks: Vec<MessageCallback>,
    ) -> StreamHandle {
        let (state_tx, _) = watch::channel(StreamState::Connecting);
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            callbacks: Mutex::new(callbacks),
            state_tx,
            event_tx,
            status_tx,
        });
        let cancel = CancellationToken::new();

        let supervisor = StreamSupervisor {
            endpoint: endpoint.clone(),
            transport,
            config,
            shared: Arc::clone(&shared),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(supervisor.run());

        StreamHandle {
            endpoint,
            shared,
            cancel,
            task: Some(task),
        }
    }
}

/// Owner's handle to one logical connection.
///
/// Dropping the handle disposes it.
pub struct StreamHandle {
    endpoint: StreamEndpoint,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// Register a callback for every decoded event.
    ///
    /// Callbacks run on the supervisor task, one event at a time, in arrival
    /// order. Registering from inside a callback deadlocks.
    pub fn on_message<F>(&self, callback: F)
    where
        F: FnMut(&StreamEvent) + Send + 'static,
    {
        self.shared.callbacks.lock().push(Box::new(callback));
    }

    /// Pull-style subscription to decoded events.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Connection lifecycle notifications.
    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn state(&self) -> StreamState {
        *self.shared.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.shared.state_tx.subscribe()
    }

    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// Stop streaming. No reconnect happens after this returns.
    pub fn dispose(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        debug!(endpoint = %self.endpoint, "disposing stream handle");
        self.cancel.cancel();
        self.shared.set_state(StreamState::TornDown);
    }

    /// Dispose and wait for the supervisor task to exit.
    pub async fn shutdown(mut self) {
        self.dispose();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ============================================================================
// StreamSupervisor (internal)
// ============================================================================

enum OpenOutcome {
    Opened(FrameStream),
    Failed(TransportError),
    Cancelled,
}

enum PumpOutcome {
    Dropped(TransportError),
    Cancelled,
}

/// Owns the transport and the reconnect loop.
struct StreamSupervisor {
    endpoint: StreamEndpoint,
    transport: Arc<dyn Transport>,
    config: StreamConfig,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl StreamSupervisor {
    async fn run(self) {
        let mut attempt: u32 = 0;
        loop {
            self.shared.set_state(StreamState::Connecting);
            match self.open().await {
                OpenOutcome::Cancelled => break,
                OpenOutcome::Failed(e) => {
                    warn!(endpoint = %self.endpoint, error = %e, "event stream connect failed");
                    self.shared.notify(ConnectionStatus::Error(e.to_string()));
                }
                OpenOutcome::Opened(frames) => {
                    attempt = 0;
                    info!(endpoint = %self.endpoint, "event stream open");
                    self.shared.set_state(StreamState::Open);
                    self.shared.notify(ConnectionStatus::Connected);
                    match self.pump(frames).await {
                        PumpOutcome::Cancelled => break,
                        PumpOutcome::Dropped(e) => {
                            warn!(endpoint = %self.endpoint, error = %e, "event stream dropped");
                            self.shared.notify(ConnectionStatus::Disconnected);
                        }
                    }
                }
            }

            attempt = attempt.saturating_add(1);
            self.shared.set_state(StreamState::ClosedRetrying);
            self.shared.notify(ConnectionStatus::Reconnecting { attempt });
            debug!(
                attempt,
                backoff_ms = self.config.reconnect_backoff.as_millis() as u64,
                "scheduling reconnect"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
            }
        }

        self.shared.set_state(StreamState::TornDown);
        debug!(endpoint = %self.endpoint, "stream supervisor shutting down");
    }

    async fn open(&self) -> OpenOutcome {
        let attempt = tokio::time::timeout(
            self.config.connect_timeout,
            self.transport.open(&self.endpoint),
        );
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => OpenOutcome::Cancelled,
            result = attempt => match result {
                Ok(Ok(frames)) => OpenOutcome::Opened(frames),
                Ok(Err(e)) => OpenOutcome::Failed(e),
                Err(_) => OpenOutcome::Failed(TransportError::Timeout(self.config.connect_timeout)),
            },
        }
    }

    /// Deliver frames until the connection ends. The frame stream is dropped
    /// (closing the transport) on return.
    async fn pump(&self, mut frames: FrameStream) -> PumpOutcome {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PumpOutcome::Cancelled,
                next = frames.next() => match next {
                    Some(Ok(frame)) => self.handle_frame(frame),
                    Some(Err(e)) => return PumpOutcome::Dropped(e),
                    None => return PumpOutcome::Dropped(TransportError::Closed),
                },
            }
        }
    }

    fn handle_frame(&self, frame: SseFrame) {
        match StreamEvent::from_json(&frame.data) {
            Ok(event) => {
                trace!(kind = %event.kind, "stream event");
                self.shared.deliver(event);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    event = frame.event.as_deref().unwrap_or(""),
                    len = frame.data.len(),
                    "dropping malformed stream event"
                );
            }
        }
    }
}
