//! Stream channels exposed per workspace.
//!
//! The server routes each channel at `/stream/{workspace}/{channel}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Which event stream of a workspace to follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Channel {
    /// Document and workspace state snapshots.
    #[default]
    #[strum(serialize = "state")]
    State,
    /// Action log entries.
    #[strum(serialize = "actions", serialize = "action")]
    Actions,
    /// Citation / source updates.
    #[strum(serialize = "citations", serialize = "citation")]
    Citations,
}

impl Channel {
    /// Parse a channel name, keeping the rejected input for error reporting.
    pub fn parse(s: &str) -> Result<Self, ParseChannelError> {
        s.parse::<Channel>().map_err(|_| ParseChannelError(s.to_string()))
    }

    /// The URL path segment for this channel.
    pub fn as_path(&self) -> &'static str {
        match self {
            Channel::State => "state",
            Channel::Actions => "actions",
            Channel::Citations => "citations",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Unrecognized channel name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel '{0}' (expected state, actions or citations)")]
pub struct ParseChannelError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("STATE".parse::<Channel>().unwrap(), Channel::State);
        assert_eq!("action".parse::<Channel>().unwrap(), Channel::Actions);
        assert_eq!("citations".parse::<Channel>().unwrap(), Channel::Citations);
    }

    #[test]
    fn test_parse_unknown() {
        let err = Channel::parse("metrics").unwrap_err();
        assert_eq!(err, ParseChannelError("metrics".into()));
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(Channel::default().as_path(), "state");
        assert_eq!(Channel::Citations.to_string(), "citations");
    }
}
