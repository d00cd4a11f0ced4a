//! Type definitions for mirrored extraction.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Archive container kinds recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArchiveKind {
    /// `.lha` archives, extracted with `lha`
    Lha,
    /// `.lzx` archives, extracted with `unlzx`
    Lzx,
}

impl ArchiveKind {
    /// All recognised kinds, in report order.
    pub const ALL: [ArchiveKind; 2] = [ArchiveKind::Lha, ArchiveKind::Lzx];

    /// Classifies a file name by its last four characters, ignoring case.
    ///
    /// ```
    /// use whd_extractor::ArchiveKind;
    ///
    /// assert_eq!(ArchiveKind::from_file_name("Game.LHA"), Some(ArchiveKind::Lha));
    /// assert_eq!(ArchiveKind::from_file_name("demo.lzx"), Some(ArchiveKind::Lzx));
    /// assert_eq!(ArchiveKind::from_file_name("readme.txt"), None);
    /// ```
    pub fn from_file_name(name: &str) -> Option<Self> {
        let start = name.len().checked_sub(4)?;
        let extension = name.get(start..)?;

        if extension.eq_ignore_ascii_case(".lha") {
            Some(ArchiveKind::Lha)
        } else if extension.eq_ignore_ascii_case(".lzx") {
            Some(ArchiveKind::Lzx)
        } else {
            None
        }
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveKind::Lha => f.write_str("LHA"),
            ArchiveKind::Lzx => f.write_str("LZX"),
        }
    }
}

/// Whether an archive's destination directory already holds earlier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The destination directory does not exist yet
    New,
    /// The destination directory exists; earlier extracted files may need
    /// their protection reset before they can be replaced
    Existing,
}

/// An archive discovered by the walker.
///
/// Lives only while the pipeline handles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Full normalized path of the archive
    pub source_path: String,

    /// Source path with the scan root prefix removed
    pub relative_suffix: String,

    /// Directory the archive extracts into, ending in a separator
    pub destination_dir: String,

    /// Archive container kind
    pub kind: ArchiveKind,

    /// New destination or resuming into an existing one
    pub freshness: Freshness,
}

impl ArchiveEntry {
    /// Archive path as a `Path`.
    pub fn source(&self) -> &Path {
        Path::new(&self.source_path)
    }
}

/// The fixed pair of roots for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    source: String,
    destination: String,
}

impl ScanRoot {
    /// Creates a scan root, dropping a trailing separator from both paths.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: clean_root(&source.into()),
            destination: clean_root(&destination.into()),
        }
    }

    /// Source root as passed to the walker.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Destination root. Never created by the walker.
    pub fn destination(&self) -> &str {
        &self.destination
    }
}

fn clean_root(root: &str) -> String {
    let collapsed = crate::path::collapse(root);
    crate::path::trim_trailing_separator(&collapsed).to_string()
}

/// Whether archives are extracted or only verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Extract archive contents into the destination
    #[default]
    Extract,
    /// Verify archive integrity without writing anything
    TestOnly,
}

/// What to do when the free space guard trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LowSpacePolicy {
    /// Skip the current archive and keep walking
    #[default]
    SkipFile,
    /// Skip the current archive and stop the walk
    HaltWalk,
}

/// Options for a mirrored extraction run.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Query free space on the destination before each archive
    pub space_check: bool,

    /// Minimum free space in megabytes (default: 20 MB)
    pub min_free_mb: u64,

    /// Behaviour when free space is too low or cannot be checked
    pub low_space_policy: LowSpacePolicy,

    /// Extract or only test archives
    pub mode: ExtractMode,

    /// Maximum number of recorded errors before the walk halts (default: 40)
    pub error_capacity: usize,

    /// Clear protection bits on earlier LHA output before re-extracting
    pub reset_protection: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            space_check: false,
            min_free_mb: 20,
            low_space_policy: LowSpacePolicy::SkipFile,
            mode: ExtractMode::Extract,
            error_capacity: 40,
            reset_protection: true,
        }
    }
}

/// Per-archive progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The walker entered a directory
    Scanning {
        /// Directory being listed
        directory: String,
    },
    /// An archive is about to be handed to its extraction tool
    Extracting {
        /// Archive file name
        archive: String,
        /// Destination directory
        destination: String,
        /// Archive kind
        kind: ArchiveKind,
    },
    /// An archive has been handled
    Finished {
        /// Archive path
        archive: String,
        /// How it went
        outcome: Outcome,
    },
}

/// Final state of one archive in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The tool exited with status 0
    Success,
    /// The tool exited with status 10
    CorruptArchive,
    /// The tool exited with any other status
    GenericFailure,
    /// The space guard skipped the archive
    SkippedLowSpace,
    /// The archive's tool is not installed
    Deferred,
}

/// Statistics about a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Source root that was scanned
    pub source: PathBuf,

    /// Destination root archives were extracted to
    pub destination: PathBuf,

    /// Number of directories scanned below the source root
    pub directories_scanned: u64,

    /// Successfully handled archives per kind
    pub archives_found: BTreeMap<ArchiveKind, u64>,

    /// Archives found but left alone because their tool is missing
    pub archives_deferred: BTreeMap<ArchiveKind, u64>,

    /// Error report lines in discovery order
    pub errors: Vec<String>,

    /// Whether the walk stopped early
    pub halted: bool,

    /// Whether the walk was cancelled
    pub cancelled: bool,

    /// Wall-clock duration of the walk (in seconds)
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl RunSummary {
    /// Archives handled for one kind.
    pub fn found(&self, kind: ArchiveKind) -> u64 {
        self.archives_found.get(&kind).copied().unwrap_or(0)
    }

    /// Archives deferred for one kind.
    pub fn deferred(&self, kind: ArchiveKind) -> u64 {
        self.archives_deferred.get(&kind).copied().unwrap_or(0)
    }

    /// Archives handled across all kinds.
    pub fn total_found(&self) -> u64 {
        self.archives_found.values().sum()
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }
}
