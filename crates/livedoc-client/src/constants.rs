//! Client configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

use std::time::Duration;

/// Default server base URL for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Path prefix of the workspace stream routes (`/stream/{workspace}/{channel}`).
pub const STREAM_PATH_PREFIX: &str = "stream";

/// Query parameter carrying the bearer token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Fixed wait between a dropped connection and the next attempt.
///
/// No growth and no jitter: a long server outage means one attempt per
/// interval for as long as it lasts.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Timeout for opening the event stream (request sent → response headers).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the decoded event broadcast. Slow pull subscribers lag past
/// this; registered callbacks never do.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the connection status broadcast.
pub const STATUS_CHANNEL_CAPACITY: usize = 32;

/// Delay between successive inserted-token highlight activations.
pub const HIGHLIGHT_STEP: Duration = Duration::from_millis(30);

/// How long each inserted token stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(1200);

/// Export status of a fresh workspace snapshot.
pub const INITIAL_EXPORT_STATUS: &str = "idle";
