//! Shared stream event and identity types for livedoc.
//!
//! This is a leaf crate: the wire envelope pushed by the server over the
//! workspace event stream, the channels a workspace exposes, and the typed
//! identifiers the client attaches to a live connection.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`StreamEvent`]   | Decoded `{type, payload, timestamp}` frame   |
//! | [`EventKind`]     | Dispatch key, tolerant of unknown kinds      |
//! | [`Channel`]       | Which stream of a workspace to follow        |
//! | [`WorkspaceId`]   | Which workspace (server-assigned name)       |
//! | [`ConnectionId`]  | One logical connection request (UUIDv7)      |
//! |-------------------|----------------------------------------------|

pub mod channel;
pub mod event;
pub mod ids;

pub use channel::{Channel, ParseChannelError};
pub use event::{EventDecodeError, EventKind, StreamEvent};
pub use ids::{ConnectionId, WorkspaceId, WorkspaceIdError};
