//! Workspace state: the snapshot model, its reducer, and the store that owns
//! the live snapshot.
//!
//! [`reduce`] is the only place a snapshot changes. It is pure: no I/O, no
//! timers, same input → same output. [`WorkspaceStore`] holds the single live
//! snapshot in a `watch` channel, applies events one at a time (the stream
//! supervisor is the only writer) and notifies readers, who only ever see
//! immutable `Arc<WorkspaceSnapshot>` values.
//!
//! # Update rules
//!
//! | Event kind          | Field          | Rule                        |
//! |---------------------|----------------|-----------------------------|
//! | `document`          | document text  | last write wins             |
//! | `log`               | log entries    | append, arrival order       |
//! | `source`            | sources        | replaced atomically         |
//! | `status`, `export`  | export status  | last write wins             |
//! | anything else       | (none)         | snapshot returned unchanged |

use std::sync::Arc;

use livedoc_types::{ConnectionId, EventKind, StreamEvent, WorkspaceId};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::constants::INITIAL_EXPORT_STATUS;
use crate::endpoint::StreamEndpoint;
use crate::stream::{StreamClient, StreamConfig, StreamHandle};
use crate::transport::Transport;

/// One workspace's state as last reported by the server.
///
/// Fields are individually reference-counted so that a reduction copies only
/// the field it changes.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkspaceSnapshot {
    workspace: Option<WorkspaceId>,
    document_text: Arc<str>,
    log_entries: Arc<Vec<StreamEvent>>,
    sources: Arc<Vec<Value>>,
    export_status: Arc<str>,
    connection_id: Option<ConnectionId>,
}

impl Default for WorkspaceSnapshot {
    fn default() -> Self {
        Self {
            workspace: None,
            document_text: Arc::from(""),
            log_entries: Arc::new(Vec::new()),
            sources: Arc::new(Vec::new()),
            export_status: Arc::from(INITIAL_EXPORT_STATUS),
            connection_id: None,
        }
    }
}

impl WorkspaceSnapshot {
    /// Empty snapshot for a newly requested workspace connection.
    pub fn new(workspace: WorkspaceId, connection_id: ConnectionId) -> Self {
        Self {
            workspace: Some(workspace),
            connection_id: Some(connection_id),
            ..Self::default()
        }
    }

    pub fn workspace(&self) -> Option<&WorkspaceId> {
        self.workspace.as_ref()
    }

    pub fn document_text(&self) -> &str {
        &self.document_text
    }

    /// Every `log` event applied so far, in arrival order.
    pub fn log_entries(&self) -> &[StreamEvent] {
        &self.log_entries
    }

    pub fn sources(&self) -> &[Value] {
        &self.sources
    }

    pub fn export_status(&self) -> &str {
        &self.export_status
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }
}

/// Apply one event to a snapshot.
///
/// Unrecognized kinds return the input `Arc` itself, so callers can detect a
/// no-op with [`Arc::ptr_eq`].
pub fn reduce(snapshot: &Arc<WorkspaceSnapshot>, event: &StreamEvent) -> Arc<WorkspaceSnapshot> {
    let mut next = WorkspaceSnapshot::clone(snapshot);
    match &event.kind {
        EventKind::Document => {
            next.document_text = Arc::from(event.document_text());
        }
        EventKind::Log => {
            Arc::make_mut(&mut next.log_entries).push(event.clone());
        }
        EventKind::Source => {
            next.sources = Arc::new(event.source_list());
        }
        EventKind::Status | EventKind::Export => {
            next.export_status = Arc::from(event.status_text());
        }
        EventKind::Unknown(kind) => {
            debug!(kind = %kind, "ignoring unknown event kind");
            return Arc::clone(snapshot);
        }
    }
    Arc::new(next)
}

// ============================================================================
// WorkspaceStore
// ============================================================================

/// Owner of the live snapshot for one UI session.
///
/// Constructed explicitly and passed to whoever needs it; independent stores
/// do not share anything.
pub struct WorkspaceStore {
    snapshot_tx: Arc<watch::Sender<Arc<WorkspaceSnapshot>>>,
    stream: Mutex<Option<StreamHandle>>,
}

impl Default for WorkspaceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceStore {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(WorkspaceSnapshot::default()));
        Self {
            snapshot_tx: Arc::new(snapshot_tx),
            stream: Mutex::new(None),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        Arc::clone(&self.snapshot_tx.borrow())
    }

    /// Receive every snapshot change. Readers that fall behind see the latest
    /// snapshot, not each intermediate one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<WorkspaceSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Apply one event directly. Returns whether the snapshot changed.
    pub fn apply(&self, event: &StreamEvent) -> bool {
        apply_event(&self.snapshot_tx, event, None)
    }

    /// Connect to a workspace stream and feed its events into this store.
    ///
    /// Any previous stream is disposed first. The snapshot is replaced by an
    /// empty one when the workspace differs from the current one; reconnecting
    /// to the same workspace keeps its state.
    pub fn connect(
        &self,
        endpoint: StreamEndpoint,
        transport: Arc<dyn Transport>,
        config: StreamConfig,
    ) -> ConnectionId {
        let mut stream = self.stream.lock();
        if let Some(mut previous) = stream.take() {
            previous.dispose();
        }

        let connection_id = ConnectionId::new();
        let workspace = endpoint.workspace().clone();
        self.snapshot_tx.send_modify(|snapshot| {
            let next = if snapshot.workspace() == Some(&workspace) {
                WorkspaceSnapshot {
                    connection_id: Some(connection_id),
                    ..WorkspaceSnapshot::clone(snapshot)
                }
            } else {
                WorkspaceSnapshot::new(workspace.clone(), connection_id)
            };
            *snapshot = Arc::new(next);
        });
        info!(
            workspace = %workspace,
            connection = %connection_id.short(),
            endpoint = %endpoint,
            "connecting workspace stream"
        );

        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let handle = StreamClient::connect_with(endpoint, transport, config, move |event| {
            apply_event(&snapshot_tx, event, Some(connection_id));
        });
        *stream = Some(handle);
        connection_id
    }

    /// Dispose the current stream, if any. The snapshot is kept.
    pub fn disconnect(&self) {
        if let Some(mut handle) = self.stream.lock().take() {
            handle.dispose();
        }
    }

    /// Run `f` against the live stream handle (status subscriptions etc).
    pub fn with_stream<R>(&self, f: impl FnOnce(&StreamHandle) -> R) -> Option<R> {
        self.stream.lock().as_ref().map(f)
    }
}

/// Reduce `event` into the live snapshot and notify readers if it changed.
///
/// With `connection` set, events from a connection that is no longer the
/// store's current one are discarded.
fn apply_event(
    snapshot_tx: &watch::Sender<Arc<WorkspaceSnapshot>>,
    event: &StreamEvent,
    connection: Option<ConnectionId>,
) -> bool {
    snapshot_tx.send_if_modified(|snapshot| {
        if connection.is_some() && snapshot.connection_id() != connection {
            debug!(kind = %event.kind, "discarding event from superseded connection");
            return false;
        }
        let next = reduce(snapshot, event);
        if Arc::ptr_eq(&next, snapshot) {
            return false;
        }
        *snapshot = next;
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ev(kind: &str, payload: Value) -> StreamEvent {
        StreamEvent::new(kind, payload, "2025-08-04T10:00:00Z")
    }

    fn empty() -> Arc<WorkspaceSnapshot> {
        Arc::new(WorkspaceSnapshot::default())
    }

    #[test]
    fn test_initial_snapshot() {
        let snap = WorkspaceSnapshot::default();
        assert_eq!(snap.document_text(), "");
        assert!(snap.log_entries().is_empty());
        assert!(snap.sources().is_empty());
        assert_eq!(snap.export_status(), "idle");
        assert_eq!(snap.connection_id(), None);
    }

    #[test]
    fn test_document_then_log_then_source() {
        let e1 = ev("document", json!("X"));
        let e2 = ev("log", json!({"agent": "planner", "msg": "start"}));
        let e3 = ev("source", json!(["u1", "u2"]));

        let s = reduce(&empty(), &e1);
        let s = reduce(&s, &e2);
        let s = reduce(&s, &e3);

        assert_eq!(s.document_text(), "X");
        assert_eq!(s.log_entries(), &[e2]);
        assert_eq!(s.sources(), &[json!("u1"), json!("u2")]);
        assert_eq!(s.export_status(), "idle");
    }

    #[test]
    fn test_document_last_write_wins() {
        let s = reduce(&empty(), &ev("document", json!("first")));
        let s = reduce(&s, &ev("document", json!("second")));
        assert_eq!(s.document_text(), "second");
    }

    #[test]
    fn test_log_appends_in_arrival_order_across_kinds() {
        let mut s = empty();
        let mut logs = Vec::new();
        for i in 0..5 {
            let log = ev("log", json!({ "seq": i }));
            s = reduce(&s, &log);
            logs.push(log.clone());
            s = reduce(&s, &ev("document", json!(format!("doc {i}"))));
            s = reduce(&s, &ev("status", json!("running")));
            // Identical log records are kept, not deduplicated.
            if i == 2 {
                s = reduce(&s, &log);
                logs.push(log);
            }
        }
        assert_eq!(s.log_entries().len(), 6);
        assert_eq!(s.log_entries(), logs.as_slice());
    }

    #[test]
    fn test_sources_replaced_not_merged() {
        let s = reduce(&empty(), &ev("source", json!(["a", "b", "c"])));
        let s = reduce(&s, &ev("source", json!(["d"])));
        assert_eq!(s.sources(), &[json!("d")]);
        let s = reduce(&s, &ev("source", json!("not a list")));
        assert!(s.sources().is_empty());
    }

    #[test]
    fn test_status_and_export_coerced() {
        let s = reduce(&empty(), &ev("export", json!("ready")));
        assert_eq!(s.export_status(), "ready");
        let s = reduce(&s, &ev("status", json!({"state": "paused"})));
        assert_eq!(s.export_status(), r#"{"state":"paused"}"#);
    }

    #[test]
    fn test_unknown_kind_is_identity() {
        let s = reduce(&empty(), &ev("document", json!("keep")));
        let next = reduce(&s, &ev("heartbeat", json!(null)));
        assert!(Arc::ptr_eq(&s, &next));
    }

    #[test]
    fn test_reduce_does_not_touch_input() {
        let s = reduce(&empty(), &ev("log", json!(1)));
        let before = WorkspaceSnapshot::clone(&s);
        let _ = reduce(&s, &ev("log", json!(2)));
        assert_eq!(*s, before);
        assert_eq!(s.log_entries().len(), 1);
    }

    #[test]
    fn test_reduce_is_deterministic() {
        let events = [
            ev("document", json!("a")),
            ev("log", json!("l")),
            ev("export", json!("done")),
        ];
        let run = || events.iter().fold(empty(), |s, e| reduce(&s, e));
        assert_eq!(*run(), *run());
    }

    #[test]
    fn test_store_apply_notifies_only_on_change() {
        let store = WorkspaceStore::new();
        let mut rx = store.subscribe();
        assert!(!store.apply(&ev("unknown", json!(1))));
        assert!(!rx.has_changed().unwrap());
        assert!(store.apply(&ev("document", json!("hi"))));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().document_text(), "hi");
    }

    #[test]
    fn test_independent_stores() {
        let a = WorkspaceStore::new();
        let b = WorkspaceStore::new();
        a.apply(&ev("document", json!("only a")));
        assert_eq!(a.snapshot().document_text(), "only a");
        assert_eq!(b.snapshot().document_text(), "");
    }

    #[test]
    fn test_superseded_connection_events_discarded() {
        let store = WorkspaceStore::new();
        let current = ConnectionId::new();
        store.snapshot_tx.send_modify(|s| {
            *s = Arc::new(WorkspaceSnapshot::new(WorkspaceId::new("w").unwrap(), current));
        });
        let stale = ConnectionId::new();
        assert!(!apply_event(&store.snapshot_tx, &ev("document", json!("old")), Some(stale)));
        assert!(apply_event(&store.snapshot_tx, &ev("document", json!("new")), Some(current)));
        assert_eq!(store.snapshot().document_text(), "new");
    }
}
