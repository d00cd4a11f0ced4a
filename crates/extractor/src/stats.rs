//! Run counters and the bounded error report.

use crate::types::{ArchiveKind, RunSummary, ScanRoot};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Mutable state of one run, owned by the walker.
#[derive(Debug, Clone)]
pub struct RunStats {
    directories_scanned: u64,
    archives_found: BTreeMap<ArchiveKind, u64>,
    archives_deferred: BTreeMap<ArchiveKind, u64>,
    errors: Vec<String>,
    capacity: usize,
    halt_requested: bool,
}

impl RunStats {
    /// Creates empty stats holding at most `capacity` errors.
    pub fn new(capacity: usize) -> Self {
        Self {
            directories_scanned: 0,
            archives_found: BTreeMap::new(),
            archives_deferred: BTreeMap::new(),
            errors: Vec::with_capacity(capacity.min(64)),
            capacity,
            halt_requested: false,
        }
    }

    /// Counts one more scanned directory.
    pub fn directory_scanned(&mut self) {
        self.directories_scanned += 1;
    }

    /// Counts one successfully handled archive.
    pub fn record_found(&mut self, kind: ArchiveKind) {
        *self.archives_found.entry(kind).or_insert(0) += 1;
    }

    /// Counts one archive skipped because its tool is missing.
    pub fn record_deferred(&mut self, kind: ArchiveKind) {
        *self.archives_deferred.entry(kind).or_insert(0) += 1;
    }

    /// Appends an error line while there is room.
    ///
    /// Once the report is full the halt flag is set and later messages are
    /// dropped. Returns whether the walk must halt.
    pub fn record_error(&mut self, message: impl Into<String>) -> bool {
        if self.errors.len() < self.capacity {
            self.errors.push(message.into());
        }

        if self.errors.len() >= self.capacity && !self.halt_requested {
            warn!("Maximum number of errors reached. Aborting.");
            self.halt_requested = true;
        }

        self.halt_requested
    }

    /// Stops the walk for a reason other than the error cap.
    pub fn request_halt(&mut self) {
        self.halt_requested = true;
    }

    /// Whether no further archive may be processed.
    pub fn halt_requested(&self) -> bool {
        self.halt_requested
    }

    /// Number of directories scanned so far.
    pub fn directories(&self) -> u64 {
        self.directories_scanned
    }

    /// Archives handled so far for one kind.
    pub fn found(&self, kind: ArchiveKind) -> u64 {
        self.archives_found.get(&kind).copied().unwrap_or(0)
    }

    /// Recorded errors in insertion order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Builds the end-of-run report.
    pub fn summary(&self, root: &ScanRoot, duration: Duration, cancelled: bool) -> RunSummary {
        let mut archives_found = self.archives_found.clone();
        for kind in ArchiveKind::ALL {
            archives_found.entry(kind).or_insert(0);
        }

        RunSummary {
            source: PathBuf::from(root.source()),
            destination: PathBuf::from(root.destination()),
            directories_scanned: self.directories_scanned,
            archives_found,
            archives_deferred: self.archives_deferred.clone(),
            errors: self.errors.clone(),
            halted: self.halt_requested,
            cancelled,
            duration,
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(40)
    }
}
