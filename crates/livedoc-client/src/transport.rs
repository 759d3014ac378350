//! Event stream transports.
//!
//! The supervisor never touches HTTP directly: it asks a [`Transport`] to
//! open an endpoint and receives a stream of decoded SSE frames. Dropping
//! that stream closes the underlying connection.
//!
//! - [`HttpTransport`]: reqwest, `Accept: text/event-stream`
//! - [`MemoryTransport`]: in-process, paired with a [`MemoryServer`] that
//!   accepts connections and pushes frames (embedding and tests)

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::mpsc as frame_mpsc;
use futures::stream::{self, BoxStream, StreamExt};
use livedoc_types::StreamEvent;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::endpoint::StreamEndpoint;
use crate::sse::{SseDecoder, SseFrame};

/// Stream of frames from one open connection.
pub type FrameStream = BoxStream<'static, Result<SseFrame, TransportError>>;

/// Transport-level failures. All of them are recoverable by reconnecting.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("stream closed by server")]
    Closed,
    #[error("connection refused: {0}")]
    Refused(String),
}

/// Opens event streams.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a fresh connection to `endpoint`.
    async fn open(&self, endpoint: &StreamEndpoint) -> Result<FrameStream, TransportError>;
}

// ============================================================================
// HTTP
// ============================================================================

/// Server-sent events over HTTP(S).
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, endpoint: &StreamEndpoint) -> Result<FrameStream, TransportError> {
        debug!(url = %endpoint.redacted_url(), "opening event stream");
        let response = self
            .client
            .get(endpoint.url())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let mut decoder = SseDecoder::new();
        let frames = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => {
                    trace!(len = bytes.len(), "event stream chunk");
                    decoder.feed(&bytes).into_iter().map(Ok).collect::<Vec<_>>()
                }
                Err(e) => vec![Err(TransportError::from(e))],
            })
            .flat_map(stream::iter);
        Ok(frames.boxed())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Client half of an in-process transport.
#[derive(Clone)]
pub struct MemoryTransport {
    conn_tx: mpsc::UnboundedSender<MemoryConnection>,
    refusals: Arc<AtomicU32>,
}

/// Server half of an in-process transport.
pub struct MemoryServer {
    conn_rx: mpsc::UnboundedReceiver<MemoryConnection>,
    refusals: Arc<AtomicU32>,
}

/// One accepted in-process connection, seen from the server side.
pub struct MemoryConnection {
    endpoint: StreamEndpoint,
    frames: frame_mpsc::UnboundedSender<Result<SseFrame, TransportError>>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryServer) {
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        let refusals = Arc::new(AtomicU32::new(0));
        (
            MemoryTransport {
                conn_tx,
                refusals: Arc::clone(&refusals),
            },
            MemoryServer { conn_rx, refusals },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, endpoint: &StreamEndpoint) -> Result<FrameStream, TransportError> {
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Refused("server refused connection".into()));
        }

        let (frames, rx) = frame_mpsc::unbounded();
        self.conn_tx
            .send(MemoryConnection {
                endpoint: endpoint.clone(),
                frames,
            })
            .map_err(|_| TransportError::Refused("server gone".into()))?;
        Ok(rx.boxed())
    }
}

impl MemoryServer {
    /// Wait for the next client connection. `None` once every transport
    /// clone is gone.
    pub async fn accept(&mut self) -> Option<MemoryConnection> {
        self.conn_rx.recv().await
    }

    /// Refuse the next `n` connection attempts.
    pub fn refuse_next(&self, n: u32) {
        self.refusals.store(n, Ordering::SeqCst);
    }
}

impl MemoryConnection {
    /// The endpoint the client asked for.
    pub fn endpoint(&self) -> &StreamEndpoint {
        &self.endpoint
    }

    /// Push one event. Returns false if the client has closed the connection.
    pub fn send(&self, event: &StreamEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(data) => self.send_data(data),
            Err(_) => false,
        }
    }

    /// Push a raw `data:` payload, well-formed or not.
    pub fn send_data(&self, data: impl Into<String>) -> bool {
        self.frames.unbounded_send(Ok(SseFrame::data(data))).is_ok()
    }

    /// Push a transport error. The client drops the connection on receipt.
    pub fn fail(&self, error: TransportError) {
        let _ = self.frames.unbounded_send(Err(error));
    }

    /// Close from the server side (clean end of stream).
    pub fn close(self) {
        self.frames.close_channel();
    }

    /// Whether the client dropped its end.
    pub fn is_closed(&self) -> bool {
        self.frames.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livedoc_types::WorkspaceId;
    use serde_json::json;

    fn endpoint() -> StreamEndpoint {
        StreamEndpoint::new("http://localhost:8000", WorkspaceId::new("ws").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let (transport, mut server) = MemoryTransport::pair();
        let mut frames = transport.open(&endpoint()).await.unwrap();
        let conn = server.accept().await.unwrap();
        assert_eq!(conn.endpoint(), &endpoint());

        assert!(conn.send(&StreamEvent::new("document", json!("hi"), "t")));
        let frame = frames.next().await.unwrap().unwrap();
        let event = StreamEvent::from_json(&frame.data).unwrap();
        assert_eq!(event.document_text(), "hi");

        conn.close();
        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_refusals() {
        let (transport, server) = MemoryTransport::pair();
        server.refuse_next(2);
        assert!(matches!(
            transport.open(&endpoint()).await,
            Err(TransportError::Refused(_))
        ));
        assert!(transport.open(&endpoint()).await.is_err());
        assert!(transport.open(&endpoint()).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_drop_closes_connection() {
        let (transport, mut server) = MemoryTransport::pair();
        let frames = transport.open(&endpoint()).await.unwrap();
        let conn = server.accept().await.unwrap();
        assert!(!conn.is_closed());
        drop(frames);
        assert!(conn.is_closed());
        assert!(!conn.send_data("late"));
    }
}
