//! Connection lifecycle types.
//!
//! [`StreamState`] is the supervisor's state machine, observable through a
//! `watch` channel (latest value wins). [`ConnectionStatus`] is the
//! edge-triggered notification stream a UI shows to the user.

/// Stream supervisor state.
///
/// ```text
///             open ok                 error / server close
/// Connecting ─────────▶ Open ──────────────────────────────┐
///     ▲  │                                                  ▼
///     │  └── open failed / timed out ──────────────▶ ClosedRetrying
///     └──────────────── backoff elapsed ───────────────────┘
///
/// dispose() from any state ──▶ TornDown (terminal)
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamState {
    Connecting,
    Open,
    ClosedRetrying,
    TornDown,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::TornDown)
    }
}

/// Connection lifecycle notifications.
///
/// Subscribe via [`StreamHandle::subscribe_status()`](crate::StreamHandle::subscribe_status).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32 },
    Error(String),
}
