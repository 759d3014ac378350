//! Stream endpoint identity.
//!
//! An endpoint is fixed for the lifetime of a [`StreamHandle`](crate::StreamHandle):
//! every reconnect reuses the same base URL, workspace, channel and token.

use std::fmt;

use livedoc_types::{Channel, WorkspaceId};
use url::Url;

use crate::constants::{STREAM_PATH_PREFIX, TOKEN_QUERY_PARAM};

/// Invalid endpoint configuration.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("base URL '{0}' cannot carry a path")]
    NotABase(String),
    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    Scheme(String),
}

/// Where to stream from: `{base}/stream/{workspace}/{channel}[?token=...]`.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    base_url: Url,
    workspace: WorkspaceId,
    channel: Channel,
    token: Option<String>,
}

impl StreamEndpoint {
    /// Endpoint for the default (`state`) channel of `workspace`.
    pub fn new(base_url: &str, workspace: WorkspaceId) -> Result<Self, EndpointError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(EndpointError::NotABase(base_url.to_string()));
        }
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(EndpointError::Scheme(base_url.scheme().to_string()));
        }
        Ok(Self {
            base_url,
            workspace,
            channel: Channel::default(),
            token: None,
        })
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Attach a bearer token. Empty tokens are treated as absent.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The full stream URL, token included.
    pub fn url(&self) -> Url {
        let mut url = self.stream_url();
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        }
        url
    }

    /// The stream URL without credentials, for logs.
    pub fn redacted_url(&self) -> Url {
        self.stream_url()
    }

    fn stream_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        // Checked non-opaque in `new`.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                STREAM_PATH_PREFIX,
                self.workspace.as_str(),
                self.channel.as_path(),
            ]);
        }
        url
    }
}

impl fmt::Debug for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamEndpoint")
            .field("url", &self.redacted_url().as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.redacted_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(id: &str) -> WorkspaceId {
        WorkspaceId::new(id).unwrap()
    }

    #[test]
    fn test_url_without_token() {
        let ep = StreamEndpoint::new("http://localhost:8000", ws("ws1")).unwrap();
        assert_eq!(ep.url().as_str(), "http://localhost:8000/stream/ws1/state");
    }

    #[test]
    fn test_url_with_channel_and_token() {
        let ep = StreamEndpoint::new("https://example.com/api/", ws("lecture 7"))
            .unwrap()
            .with_channel(Channel::Citations)
            .with_token(Some("a b&c=d".into()));
        assert_eq!(
            ep.url().as_str(),
            "https://example.com/api/stream/lecture%207/citations?token=a+b%26c%3Dd"
        );
    }

    #[test]
    fn test_empty_token_ignored() {
        let ep = StreamEndpoint::new("http://h", ws("w"))
            .unwrap()
            .with_token(Some(String::new()));
        assert!(!ep.has_token());
        assert!(ep.url().query().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let ep = StreamEndpoint::new("http://h", ws("w"))
            .unwrap()
            .with_token(Some("secret".into()));
        let debug = format!("{ep:?}");
        assert!(!debug.contains("secret"));
        assert!(!ep.to_string().contains("secret"));
        assert!(ep.url().as_str().contains("secret"));
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(matches!(
            StreamEndpoint::new("mailto:someone@example.com", ws("w")),
            Err(EndpointError::NotABase(_))
        ));
        assert!(matches!(
            StreamEndpoint::new("ftp://h", ws("w")),
            Err(EndpointError::Scheme(_))
        ));
        assert!(StreamEndpoint::new("not a url", ws("w")).is_err());
    }
}
