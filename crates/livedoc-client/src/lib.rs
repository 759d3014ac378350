//! Live synchronization engine for livedoc workspaces.
//!
//! Keeps a local copy of a workspace in step with the server's event stream
//! and works out what to highlight when the document changes.
//!
//! ```text
//!  server ──SSE──▶ Transport ──frames──▶ StreamSupervisor ──StreamEvent──▶ WorkspaceStore
//!                  (HTTP / memory)       (reconnect loop)     callback     reduce() → watch
//!                                                                              │
//!                                               RenderScheduler ◀── DocumentView ◀┘
//!                                               (timed highlights)  (diff vs settled text)
//! ```
//!
//! # Key Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`StreamEndpoint`] | Base URL, workspace, channel and token → stream URL |
//! | [`StreamClient`] / [`StreamHandle`] | Supervised, auto-reconnecting stream |
//! | [`Transport`] | Seam between the supervisor and the wire ([`HttpTransport`], [`MemoryTransport`]) |
//! | [`WorkspaceSnapshot`] / [`reduce`] | Immutable workspace state and its single mutation point |
//! | [`WorkspaceStore`] | Owns the live snapshot, subscribe/notify |
//! | [`DocumentView`] / [`RenderScheduler`] | Diff-driven, generation-tagged highlights |
//!
//! # Example
//!
//! ```ignore
//! let store = WorkspaceStore::new();
//! let endpoint = StreamEndpoint::new("http://localhost:8000", "demo".parse()?)?
//!     .with_token(std::env::var("LIVEDOC_TOKEN").ok());
//! store.connect(endpoint, Arc::new(HttpTransport::new()), StreamConfig::default());
//!
//! let (scheduler, mut updates, _task) = DocumentView::default().follow(store.subscribe());
//! while let Some(update) = updates.recv().await {
//!     render(&update.text, &update.script, &scheduler.highlighted());
//! }
//! ```

pub mod constants;
pub mod endpoint;
pub mod render;
pub mod sse;
pub mod stream;
pub mod subscriptions;
pub mod transport;
pub mod view;
pub mod workspace;

pub use endpoint::{EndpointError, StreamEndpoint};
pub use render::{HighlightActivation, HighlightConfig, Highlights, RenderScheduler, plan_highlights};
pub use sse::{SseDecoder, SseFrame};
pub use stream::{StreamClient, StreamConfig, StreamHandle};
pub use subscriptions::{ConnectionStatus, StreamState};
pub use transport::{
    FrameStream, HttpTransport, MemoryConnection, MemoryServer, MemoryTransport, Transport,
    TransportError,
};
pub use view::{DocumentView, RenderUpdate};
pub use workspace::{WorkspaceSnapshot, WorkspaceStore, reduce};

pub use livedoc_diff::{DiffAlgorithm, EditOp, EditScript, OpKind, compute_diff};
pub use livedoc_types::{Channel, ConnectionId, EventKind, StreamEvent, WorkspaceId};
