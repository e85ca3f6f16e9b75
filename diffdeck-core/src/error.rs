//! Error types for the session controller.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::host::SurfaceId;

/// Failure reported by a diff provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider process or transport failed. Recoverable: the next
    /// refresh tries again.
    #[error("diff provider unavailable: {0}")]
    Unavailable(String),
    /// The provider cannot interpret the selector.
    #[error("unsupported revision selector `{0}`")]
    UnsupportedRevset(String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    ProviderUnavailable(#[from] ProviderError),
    #[error("failed to start the provider worker: {0}")]
    Worker(#[source] io::Error),
}

/// Why a change watcher could not be installed.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("no {vcs} repository found above {}", path.display())]
    RootNotFound { vcs: &'static str, path: PathBuf },
    #[error("VCS state file {} does not exist", .0.display())]
    StateFileMissing(PathBuf),
    #[error("failed to read VCS state: {0}")]
    Io(#[from] io::Error),
    #[error("change watcher needs a running tokio runtime")]
    NoRuntime,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("surface {0} no longer exists")]
    InvalidSurface(SurfaceId),
    #[error("host rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
