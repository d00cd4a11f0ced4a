//! Per-archive extraction pipeline.
//!
//! Each archive moves through these stages:
//!
//! 1. free space guard (when enabled)
//! 2. protection reset of earlier output (LHA, extract mode, existing destination)
//! 3. tool invocation
//! 4. classification of the exit status and stats update

use crate::error::{ArchiveError, ExtractError};
use crate::path;
use crate::protection::{clear_protection, first_top_level_dir};
use crate::runner::CommandRunner;
use crate::space::{has_min_free_space, FreeSpace};
use crate::stats::RunStats;
use crate::tool::{build_extraction_command, build_listing_command, ToolProfile, ToolSet};
use crate::types::{
    ArchiveEntry, ArchiveKind, ExtractMode, Freshness, LowSpacePolicy, Outcome, ProgressEvent,
    WalkOptions,
};
use crate::ProgressCallback;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info, warn};

/// Exit status the extraction tools use for a damaged archive.
pub const CORRUPT_EXIT_CODE: i32 = 10;

/// Maps a tool exit status to an outcome.
pub fn classify(code: Option<i32>) -> Outcome {
    match code {
        Some(0) => Outcome::Success,
        Some(CORRUPT_EXIT_CODE) => Outcome::CorruptArchive,
        _ => Outcome::GenericFailure,
    }
}

/// Drives the external tools for each archive the walker hands over.
pub struct Pipeline<'a> {
    options: &'a WalkOptions,
    tools: &'a ToolSet,
    runner: &'a mut dyn CommandRunner,
    space: &'a dyn FreeSpace,
    destination_root: String,
    progress_cb: &'a ProgressCallback,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline writing below `destination_root`.
    pub fn new(
        options: &'a WalkOptions,
        tools: &'a ToolSet,
        runner: &'a mut dyn CommandRunner,
        space: &'a dyn FreeSpace,
        destination_root: impl Into<String>,
        progress_cb: &'a ProgressCallback,
    ) -> Self {
        Self {
            options,
            tools,
            runner,
            space,
            destination_root: destination_root.into(),
            progress_cb,
        }
    }

    /// Handles one archive and records the result in `stats`.
    pub fn process(&mut self, entry: &ArchiveEntry, stats: &mut RunStats) -> Outcome {
        let outcome = self.run_stages(entry, stats);
        (self.progress_cb)(&ProgressEvent::Finished {
            archive: entry.source_path.clone(),
            outcome,
        });
        outcome
    }

    fn run_stages(&mut self, entry: &ArchiveEntry, stats: &mut RunStats) -> Outcome {
        let tools = self.tools;
        let profile = tools.profile(entry.kind);

        if !profile.available {
            debug!(archive = %entry.source_path, "tool missing, deferring archive");
            stats.record_deferred(entry.kind);
            return Outcome::Deferred;
        }

        let archive_name = entry
            .source()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.source_path.clone());
        debug!("Extracting {} to {}", archive_name, entry.destination_dir);
        (self.progress_cb)(&ProgressEvent::Extracting {
            archive: archive_name,
            destination: entry.destination_dir.clone(),
            kind: entry.kind,
        });

        if self.options.space_check && !self.space_available() {
            warn!(
                "Not enough space on the target drive or cannot check space. {}MB minimum checked for.",
                self.options.min_free_mb
            );
            stats.record_error(
                ArchiveError::InsufficientDiskSpace {
                    path: entry.source().to_path_buf(),
                }
                .to_string(),
            );
            if self.options.low_space_policy == LowSpacePolicy::HaltWalk {
                stats.request_halt();
            }
            return Outcome::SkippedLowSpace;
        }

        if self.needs_protection_reset(entry) {
            if let Err(err) = self.reset_protection(entry, profile) {
                warn!(archive = %entry.source_path, error = %err, "protection reset failed");
            }
        }

        let cmd = match build_extraction_command(
            profile,
            &entry.source_path,
            &entry.destination_dir,
            self.options.mode,
        ) {
            Ok(cmd) => cmd,
            Err(ExtractError::PathTooLong { path, .. }) => {
                stats.record_error(ArchiveError::PathTooLong { path }.to_string());
                return Outcome::GenericFailure;
            }
            Err(err) => {
                stats.record_error(format!("{}: {}", entry.source_path, err));
                return Outcome::GenericFailure;
            }
        };

        debug!(command = %cmd, "running extraction tool");
        let code = match self.runner.run(&cmd) {
            Ok(code) => code,
            Err(err) => {
                warn!(error = %err, "could not launch extraction tool");
                None
            }
        };

        let outcome = classify(code);
        match outcome {
            Outcome::Success => stats.record_found(entry.kind),
            Outcome::CorruptArchive => {
                warn!("Corrupt archive {}", entry.source_path);
                stats.record_error(
                    ArchiveError::Corrupt {
                        path: entry.source().to_path_buf(),
                    }
                    .to_string(),
                );
            }
            _ => {
                warn!(
                    code = ?code,
                    "Failed to execute {} for file {}. Please check the archive is not damaged, and there is enough space in the target directory.",
                    profile.program,
                    entry.source_path
                );
                stats.record_error(
                    ArchiveError::Unknown {
                        path: entry.source().to_path_buf(),
                        code,
                    }
                    .to_string(),
                );
            }
        }

        outcome
    }

    fn space_available(&self) -> bool {
        has_min_free_space(
            self.space,
            Path::new(&self.destination_root),
            self.options.min_free_mb,
        )
    }

    fn needs_protection_reset(&self, entry: &ArchiveEntry) -> bool {
        entry.kind == ArchiveKind::Lha
            && self.options.mode == ExtractMode::Extract
            && self.options.reset_protection
            && entry.freshness == Freshness::Existing
    }

    /// Lists the archive into an anonymous scratch file, finds the directory
    /// it unpacks into, and clears protection there if it already exists.
    ///
    /// The scratch file is removed when it goes out of scope.
    fn reset_protection(
        &mut self,
        entry: &ArchiveEntry,
        profile: &ToolProfile,
    ) -> Result<(), ExtractError> {
        let Some(cmd) = build_listing_command(profile, &entry.source_path)? else {
            return Ok(());
        };

        let mut listing = tempfile::tempfile()?;
        debug!(command = %cmd, "listing archive contents");
        self.runner.run_to_file(&cmd, &mut listing)?;
        listing.seek(SeekFrom::Start(0))?;

        let Some(top_dir) = first_top_level_dir(BufReader::new(&listing))? else {
            info!(
                "Unable to get the file path from the LHA output for file {}.",
                entry.source_path
            );
            return Ok(());
        };

        let target = path::join(&entry.destination_dir, &top_dir)?;
        let target = Path::new(&target);
        if target.is_dir() {
            info!("Prepping any protected files for potential replacement...");
            let changed = clear_protection(target);
            debug!(dir = %target.display(), changed, "protection cleared");
        }

        Ok(())
    }
}
