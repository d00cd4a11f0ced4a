//! Error types for mirroring and extraction operations.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for walk and tool operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The source directory to scan does not exist.
    #[error("Unable to find the source folder {0}")]
    SourceNotFound(PathBuf),

    /// The destination directory does not exist. It is never created by the walker.
    #[error("Unable to find the target folder {0}")]
    DestinationNotFound(PathBuf),

    /// A path grew past the maximum supported length.
    #[error("Path too long ({len} bytes > {max} bytes): {path}")]
    PathTooLong {
        /// The offending path, as far as it was built
        path: String,
        /// Length of the path in bytes
        len: usize,
        /// Maximum supported length in bytes
        max: usize,
    },

    /// A directory could not be listed. The walker skips it.
    #[error("Unable to read directory {path}: {source}")]
    DirectoryUnreadable {
        /// Directory that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The destination has less free space than required, or it cannot be checked.
    #[error("Not enough space on {} or cannot check space. {min_mb}MB minimum checked for", .path.display())]
    InsufficientDiskSpace {
        /// Destination that was checked
        path: PathBuf,
        /// Required free space in megabytes
        min_mb: u64,
    },

    /// A mandatory external extraction tool is not installed.
    #[error("Required tool not found: {0}")]
    ToolNotFound(String),

    /// An external tool could not be launched at all.
    #[error("Failed to launch {program}: {source}")]
    ToolLaunch {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-archive failures.
///
/// The `Display` text of each variant is the exact line that lands in the
/// end-of-run error report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// The extraction tool reported a damaged archive (exit code 10).
    #[error("{} is corrupt", .path.display())]
    Corrupt {
        /// Archive that failed
        path: PathBuf,
    },

    /// The extraction tool failed with any other non-zero status.
    #[error("{} failed to extract. Unknown error", .path.display())]
    Unknown {
        /// Archive that failed
        path: PathBuf,
        /// Exit code, or `None` when the tool was killed by a signal
        code: Option<i32>,
    },

    /// The destination did not have enough free space, or it could not be checked.
    #[error("{} skipped. Not enough space on the target drive or cannot check space", .path.display())]
    InsufficientDiskSpace {
        /// Archive that was skipped
        path: PathBuf,
    },

    /// An archive was found but could not be handed to its tool.
    #[error("{path} skipped. {reason}")]
    Skipped {
        /// Archive path, lossily converted for display
        path: String,
        /// Why the archive was left out
        reason: &'static str,
    },

    /// The archive path could not be represented within the path limit.
    #[error("Path too long: {path}")]
    PathTooLong {
        /// Path as far as it was built
        path: String,
    },
}
