//! Error types for expman
//!
//! Run preparation is a one-shot setup step: every failure here aborts the
//! broader training run before compute is wasted. Nothing is retried or
//! recovered internally.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Expman error types
#[derive(Error, Debug)]
pub enum Error {
    /// A parameter value falls outside the closed set the canonical
    /// serialization accepts (null, bool, int, float, string, sequence,
    /// mapping with string keys).
    #[error("unsupported parameter value: {0}")]
    UnsupportedValueKind(String),

    /// A monitored key is absent from the supplied hyperparameters.
    /// Raised before any filesystem mutation.
    #[error("monitored key '{0}' is missing from the hyperparameters")]
    MissingMonitoredKey(String),

    /// The computed run directory already holds artifacts from a previous
    /// run started in the same minute under the same experiment identifier.
    #[error("run directory {} already contains a previous run's artifacts", .0.display())]
    RunDirectoryCollision(PathBuf),

    /// The run directory named in a resume request does not exist.
    #[error("no run found at {}", .0.display())]
    RunNotFound(PathBuf),

    /// Underlying I/O failure (permissions, disk full, path length),
    /// annotated with the path being touched.
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        /// Path the failing operation was applied to
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path the operation was applied to.
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_message_names_path() {
        let err = Error::RunDirectoryCollision(PathBuf::from("/tmp/run--20-03-03--15-52"));
        assert!(err.to_string().contains("run--20-03-03--15-52"));
    }

    #[test]
    fn test_filesystem_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::fs("/srv/experiments", io);
        let msg = err.to_string();
        assert!(msg.contains("/srv/experiments"));
        assert!(msg.contains("denied"));
    }
}
