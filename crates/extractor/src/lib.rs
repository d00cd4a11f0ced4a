//! # WHD Extractor
//!
//! Mirrors a directory tree full of LHA and LZX archives into a destination
//! tree, extracting every archive into the directory that matches its place
//! in the source tree.
//!
//! Decoding is left to the external `lha` and `unlzx` programs. This crate
//! walks the tree, builds the command lines, interprets exit codes, and
//! collects a bounded report of failures so that a run over thousands of
//! archives finishes instead of stopping at the first bad one.
//!
//! ## Supported Formats
//!
//! - LHA (`.lha`), via `lha`
//! - LZX (`.lzx`), via `unlzx` (UnLZX 2.16 and LZX 1.21 command syntax)
//!
//! ## Example
//!
//! ```rust,no_run
//! use whd_extractor::{mirror, ToolPaths, WalkOptions};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = WalkOptions::default();
//! let cancel_flag = Arc::new(AtomicBool::new(false));
//! let progress_cb = |event: &whd_extractor::ProgressEvent| {
//!     println!("{:?}", event);
//! };
//!
//! let summary = mirror(
//!     Path::new("Games:WHDLoad"),
//!     Path::new("Work:Games"),
//!     &options,
//!     &ToolPaths::default(),
//!     &progress_cb,
//!     cancel_flag,
//! )?;
//!
//! println!("Found {} archives", summary.total_found());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod path;
pub mod pipeline;
pub mod protection;
pub mod runner;
pub mod space;
pub mod stats;
pub mod tool;
pub mod types;
pub mod walker;

// Re-export main types
pub use error::{ArchiveError, ExtractError};
pub use runner::{CommandRunner, SystemRunner};
pub use space::{FreeSpace, SystemFreeSpace};
pub use stats::RunStats;
pub use tool::{CommandLine, SystemProbe, ToolPaths, ToolProbe, ToolProfile, ToolSet, ToolVariant};
pub use types::{
    ArchiveEntry, ArchiveKind, ExtractMode, Freshness, LowSpacePolicy, Outcome, ProgressEvent,
    RunSummary, ScanRoot, WalkOptions,
};
pub use walker::Walker;

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Type alias for progress callback functions.
///
/// Called when a directory is entered, when an archive is handed to its
/// tool, and when the archive has been handled.
pub type ProgressCallback = dyn Fn(&ProgressEvent) + Send + Sync;

/// Checks that both roots exist and, when the space guard is enabled, that
/// the destination has room to start.
///
/// # Errors
///
/// Returns an error if:
/// - The source or destination directory does not exist
/// - The space guard is enabled and free space is too low or unknown
pub fn preflight(
    source: &Path,
    destination: &Path,
    options: &WalkOptions,
    space: &dyn FreeSpace,
) -> Result<(), ExtractError> {
    if !source.is_dir() {
        return Err(ExtractError::SourceNotFound(source.to_path_buf()));
    }
    if !destination.is_dir() {
        return Err(ExtractError::DestinationNotFound(destination.to_path_buf()));
    }
    if options.space_check && !space::has_min_free_space(space, destination, options.min_free_mb) {
        return Err(ExtractError::InsufficientDiskSpace {
            path: destination.to_path_buf(),
            min_mb: options.min_free_mb,
        });
    }
    Ok(())
}

/// Extracts every archive below `source` into the mirrored location below
/// `destination`, using the installed tools.
///
/// # Arguments
///
/// * `source` - Root of the tree to scan
/// * `destination` - Existing root of the output tree
/// * `options` - Space guard, mode and error cap settings
/// * `tool_paths` - Optional explicit tool locations
/// * `progress_cb` - Callback for progress updates
/// * `cancel_flag` - Atomic flag to stop the walk between archives
///
/// # Returns
///
/// Returns the `RunSummary`. Per-archive failures are listed in it rather
/// than returned as errors.
///
/// # Errors
///
/// Returns an error if:
/// - The source or destination directory does not exist
/// - The space guard trips before the walk starts
/// - `lha` is not installed
pub fn mirror(
    source: &Path,
    destination: &Path,
    options: &WalkOptions,
    tool_paths: &ToolPaths,
    progress_cb: &ProgressCallback,
    cancel_flag: Arc<AtomicBool>,
) -> Result<RunSummary, ExtractError> {
    let space = SystemFreeSpace;
    preflight(source, destination, options, &space)?;

    let tools = ToolSet::resolve(tool_paths, &SystemProbe)?;
    let mut runner = SystemRunner;
    let root = ScanRoot::new(
        source.to_string_lossy().into_owned(),
        destination.to_string_lossy().into_owned(),
    );

    let walker = Walker::new(
        root,
        options,
        &tools,
        &mut runner,
        &space,
        progress_cb,
        cancel_flag,
    );
    Ok(walker.run())
}
