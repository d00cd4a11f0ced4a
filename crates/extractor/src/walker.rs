//! Recursive directory walker.

use crate::error::{ArchiveError, ExtractError};
use crate::path;
use crate::pipeline::Pipeline;
use crate::runner::CommandRunner;
use crate::space::FreeSpace;
use crate::stats::RunStats;
use crate::tool::ToolSet;
use crate::types::{ArchiveEntry, ArchiveKind, Freshness, ProgressEvent, RunSummary, ScanRoot, WalkOptions};
use crate::ProgressCallback;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const NON_UTF8_NAME: &str = "File name is not valid UTF-8";
const BROKEN_LINK: &str = "Link target cannot be read";

/// Walks a source tree depth first and extracts every archive into the
/// mirrored location below the destination root.
pub struct Walker<'a> {
    root: ScanRoot,
    pipeline: Pipeline<'a>,
    stats: RunStats,
    progress_cb: &'a ProgressCallback,
    cancel_flag: Arc<AtomicBool>,
}

impl<'a> Walker<'a> {
    /// Creates a walker. The destination root must already exist.
    pub fn new(
        root: ScanRoot,
        options: &'a WalkOptions,
        tools: &'a ToolSet,
        runner: &'a mut dyn CommandRunner,
        space: &'a dyn FreeSpace,
        progress_cb: &'a ProgressCallback,
        cancel_flag: Arc<AtomicBool>,
    ) -> Self {
        let pipeline = Pipeline::new(
            options,
            tools,
            runner,
            space,
            root.destination(),
            progress_cb,
        );

        Self {
            root,
            pipeline,
            stats: RunStats::new(options.error_capacity),
            progress_cb,
            cancel_flag,
        }
    }

    /// Walks the whole source root and returns the run summary.
    pub fn run(mut self) -> RunSummary {
        let start_time = Instant::now();
        let source = self.root.source().to_string();

        self.walk(&source);

        let cancelled = self.cancel_flag.load(Ordering::Relaxed);
        self.stats
            .summary(&self.root, start_time.elapsed(), cancelled)
    }

    /// Stats gathered so far.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Walks one source directory.
    ///
    /// Unreadable directories are skipped. Once a halt is requested no
    /// further entries are visited and the recursion unwinds.
    pub fn walk(&mut self, source_dir: &str) {
        self.walk_dir(Path::new(source_dir), source_dir);
    }

    /// Lists `dir` from the filesystem and reports it as `dir_display`, the
    /// string form used for relative suffixes and command lines.
    fn walk_dir(&mut self, dir: &Path, dir_display: &str) {
        if self.should_stop() {
            return;
        }

        debug!("Scanning directory: {}", dir_display);
        (self.progress_cb)(&ProgressEvent::Scanning {
            directory: dir_display.to_string(),
        });

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                let err = ExtractError::DirectoryUnreadable {
                    path: dir.to_path_buf(),
                    source,
                };
                warn!("{err}");
                return;
            }
        };

        for entry in entries {
            if self.should_stop() {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(dir = %dir_display, error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                let lossy = file_name.to_string_lossy();
                if ArchiveKind::from_file_name(&lossy).is_some() {
                    self.skip_archive(format!("{dir_display}/{lossy}"), NON_UTF8_NAME);
                } else {
                    debug!(dir = %dir_display, name = ?file_name, "skipping entry with non UTF-8 name");
                }
                continue;
            };
            if name == "." || name == ".." {
                continue;
            }

            let child = match path::join(dir_display, name) {
                Ok(child) => child,
                Err(err) => {
                    warn!("{err}");
                    self.stats.record_error(
                        ArchiveError::PathTooLong {
                            path: format!("{dir_display}/{name}"),
                        }
                        .to_string(),
                    );
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!(path = %child, error = %err, "cannot stat entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                self.stats.directory_scanned();
                self.walk_dir(&entry.path(), &child);
                continue;
            }

            let Some(kind) = ArchiveKind::from_file_name(name) else {
                continue;
            };

            if file_type.is_symlink() {
                // Linked archives are extracted; linked directories are not followed.
                match fs::metadata(entry.path()) {
                    Ok(target) if target.is_file() => self.visit_archive(child, kind),
                    Ok(_) => debug!(path = %child, "not following directory link"),
                    Err(_) => self.skip_archive(child, BROKEN_LINK),
                }
            } else if file_type.is_file() {
                self.visit_archive(child, kind);
            }
        }
    }

    fn skip_archive(&mut self, path: String, reason: &'static str) {
        warn!("{path} skipped. {reason}");
        self.stats
            .record_error(ArchiveError::Skipped { path, reason }.to_string());
    }

    fn visit_archive(&mut self, source_path: String, kind: ArchiveKind) {
        let entry = match self.archive_entry(source_path, kind) {
            Ok(entry) => entry,
            Err(ExtractError::PathTooLong { path, .. }) => {
                self.stats
                    .record_error(ArchiveError::PathTooLong { path }.to_string());
                return;
            }
            Err(err) => {
                warn!("{err}");
                return;
            }
        };

        self.pipeline.process(&entry, &mut self.stats);
    }

    /// Builds the entry for an archive found at `source_path`.
    pub fn archive_entry(
        &self,
        source_path: String,
        kind: ArchiveKind,
    ) -> Result<ArchiveEntry, ExtractError> {
        let relative_suffix = path::strip_root(&source_path, self.root.source()).to_string();
        let relative_dir = path::parent_dir(&relative_suffix).unwrap_or("");
        let mut destination_dir = path::join(self.root.destination(), relative_dir)?;
        if !destination_dir.ends_with(path::SEPARATOR) && !path::is_volume_root(&destination_dir) {
            destination_dir.push(path::SEPARATOR);
        }

        let freshness = if Path::new(&destination_dir).is_dir() {
            Freshness::Existing
        } else {
            Freshness::New
        };

        Ok(ArchiveEntry {
            source_path,
            relative_suffix,
            destination_dir,
            kind,
            freshness,
        })
    }

    fn should_stop(&self) -> bool {
        self.stats.halt_requested() || self.cancel_flag.load(Ordering::Relaxed)
    }
}
