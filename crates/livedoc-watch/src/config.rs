//! Watcher configuration.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! a RON file (`~/.config/livedoc/watch.ron` or `--config`), command-line
//! flags.
//!
//! ```ron
//! (
//!     base_url: Some("https://livedoc.example.com"),
//!     workspace: Some("quarterly-report"),
//!     channel: Some("state"),
//!     backoff_ms: Some(1000),
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use livedoc_client::constants::DEFAULT_BASE_URL;
use livedoc_client::{EndpointError, HighlightConfig, StreamConfig, StreamEndpoint};
use livedoc_types::{Channel, ParseChannelError, WorkspaceId, WorkspaceIdError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Error type for config operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("no workspace given (use --workspace or set `workspace` in the config file)")]
    MissingWorkspace,

    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),

    #[error(transparent)]
    Workspace(#[from] WorkspaceIdError),

    #[error(transparent)]
    Channel(#[from] ParseChannelError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Contents of `watch.ron`. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub base_url: Option<String>,
    pub workspace: Option<String>,
    pub channel: Option<String>,
    pub token: Option<String>,
    pub backoff_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub highlight_step_ms: Option<u64>,
    pub highlight_duration_ms: Option<u64>,
}

/// Everything the watcher needs to run.
#[derive(Clone, Debug)]
pub struct Settings {
    pub endpoint: StreamEndpoint,
    pub stream: StreamConfig,
    pub highlight: HighlightConfig,
}

/// Default config file location (`~/.config/livedoc/watch.ron`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("livedoc").join("watch.ron"))
}

impl WatchConfig {
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let config = Self::parse(&content, path)?;
        info!(path = %path.display(), "loaded watcher config");
        Ok(config)
    }

    /// Load an explicitly named file, or the default location if it exists.
    ///
    /// A missing explicit file is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            Some(path) => {
                debug!(path = %path.display(), "no watcher config, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Overlay `other`'s set fields onto this config.
    pub fn merge(self, other: WatchConfig) -> Self {
        Self {
            base_url: other.base_url.or(self.base_url),
            workspace: other.workspace.or(self.workspace),
            channel: other.channel.or(self.channel),
            token: other.token.or(self.token),
            backoff_ms: other.backoff_ms.or(self.backoff_ms),
            connect_timeout_ms: other.connect_timeout_ms.or(self.connect_timeout_ms),
            highlight_step_ms: other.highlight_step_ms.or(self.highlight_step_ms),
            highlight_duration_ms: other.highlight_duration_ms.or(self.highlight_duration_ms),
        }
    }

    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let workspace = self.workspace.ok_or(ConfigError::MissingWorkspace)?;
        let workspace = WorkspaceId::new(workspace)?;
        let channel = match self.channel.as_deref() {
            Some(c) => Channel::parse(c)?,
            None => Channel::default(),
        };
        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let endpoint = StreamEndpoint::new(base_url, workspace)?
            .with_channel(channel)
            .with_token(self.token);

        let mut stream = StreamConfig::default();
        if let Some(ms) = self.backoff_ms {
            stream.reconnect_backoff = Duration::from_millis(ms);
        }
        if let Some(ms) = self.connect_timeout_ms {
            stream.connect_timeout = Duration::from_millis(ms);
        }

        let mut highlight = HighlightConfig::default();
        if let Some(ms) = self.highlight_step_ms {
            // Activations must fire at strictly increasing offsets.
            if ms == 0 {
                return Err(ConfigError::Zero("highlight_step_ms"));
            }
            highlight.step = Duration::from_millis(ms);
        }
        if let Some(ms) = self.highlight_duration_ms {
            highlight.duration = Duration::from_millis(ms);
        }

        Ok(Settings {
            endpoint,
            stream,
            highlight,
        })
    }
}
