//! Error types for asset loading and watching.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while reading or watching an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The path given at construction does not point at a regular file.
    #[error("file does not exist: {path}")]
    Missing {
        /// The offending path.
        path: PathBuf,
    },

    /// Reading the file's contents failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Installing the filesystem watch failed.
    #[error("failed to watch {path}: {source}")]
    Watch {
        /// The file being watched.
        path: PathBuf,
        /// The underlying watcher error.
        #[source]
        source: notify::Error,
    },
}
