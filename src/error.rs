//! Error types.

use crate::context::Artifact;
use thiserror::Error;

/// Result alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors returned by reconciliation operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The resolver daemon binary could not be found on `PATH`.
    #[error("resolver daemon not installed: {binary}")]
    DaemonNotInstalled {
        /// The binary name that was probed for.
        binary: String,
    },

    /// The daemon's main configuration file does not exist.
    ///
    /// The base configuration is outside this tool's authority and is
    /// never auto-created.
    #[error("main config file missing: {path}")]
    MainConfigMissing {
        /// The expected path.
        path: String,
    },

    /// Downloading an artifact failed; the destination file is untouched.
    #[error("download of {artifact} from {url} failed: {source}")]
    Download {
        /// Which artifact the transfer was for.
        artifact: Artifact,
        /// The remote locator.
        url: String,
        /// The underlying transfer error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The main configuration file could not be patched
    /// (typically `PermissionDenied`).
    #[error("cannot patch {path}: {source}")]
    Write {
        /// The config file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The service manager reported a restart failure.
    ///
    /// Filesystem changes made earlier in the run are kept; the updated
    /// config is still valid input for a manual restart.
    #[error("restart of {service} failed: {detail}")]
    Restart {
        /// The service unit name.
        service: String,
        /// The service manager's own failure output.
        detail: String,
    },

    /// The operator-supplied daemon install command exited non-zero.
    #[error("install command failed: {command}")]
    InstallFailed {
        /// The command that was run.
        command: String,
    },
}

impl SyncError {
    /// Returns `true` if this is a service restart failure.
    ///
    /// Callers use this to tell "nothing was changed" apart from
    /// "config updated, restart needs manual attention".
    #[must_use]
    pub const fn is_restart_failure(&self) -> bool {
        matches!(self, Self::Restart { .. })
    }

    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(e) | Self::Write { source: e, .. } => {
                e.kind() == std::io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}
