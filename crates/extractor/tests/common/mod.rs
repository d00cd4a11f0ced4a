//! Shared fakes for walker integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use whd_extractor::tool::Arg;
use whd_extractor::{
    CommandLine, CommandRunner, ExtractError, FreeSpace, ProgressEvent, RunSummary, ScanRoot,
    ToolProfile, ToolSet, ToolVariant, WalkOptions, Walker,
};

/// Runner that records commands and pretends to be `lha` / `unlzx`.
#[derive(Default)]
pub struct FakeRunner {
    /// Rendered commands in execution order
    pub commands: Vec<String>,
    /// Rendered listing commands in execution order
    pub listings: Vec<String>,
    /// Exit code per archive file name; missing entries exit with 0
    pub exit_codes: HashMap<String, i32>,
    /// Text written for listing commands
    pub listing_text: String,
    /// Create a file below the destination for successful extract commands
    pub write_output: bool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, archive: &str, code: i32) -> Self {
        self.exit_codes.insert(archive.to_string(), code);
        self
    }

    pub fn with_listing(mut self, text: &str) -> Self {
        self.listing_text = text.to_string();
        self
    }

    pub fn writing_output(mut self) -> Self {
        self.write_output = true;
        self
    }

    fn archive_name(cmd: &CommandLine) -> String {
        cmd.paths()
            .next()
            .and_then(|p| Path::new(p).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn is_extract(cmd: &CommandLine) -> bool {
        cmd.args()
            .iter()
            .any(|arg| matches!(arg, Arg::Flag(f) if f == "x" || f == "-x"))
    }
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, cmd: &CommandLine) -> Result<Option<i32>, ExtractError> {
        self.commands.push(cmd.render());
        let archive = Self::archive_name(cmd);
        let code = self.exit_codes.get(&archive).copied().unwrap_or(0);

        if code == 0 && self.write_output && Self::is_extract(cmd) {
            if let Some(dest) = cmd.paths().last() {
                let out = Path::new(dest).join(format!("{archive}.out"));
                fs::create_dir_all(Path::new(dest))?;
                fs::write(out, archive.as_bytes())?;
            }
        }

        Ok(Some(code))
    }

    fn run_to_file(&mut self, cmd: &CommandLine, out: &mut File) -> Result<Option<i32>, ExtractError> {
        self.listings.push(cmd.render());
        out.write_all(self.listing_text.as_bytes())?;
        Ok(Some(0))
    }
}

/// Free space stub.
pub struct FixedSpace(pub Option<u64>);

impl FreeSpace for FixedSpace {
    fn free_megabytes(&self, _path: &Path) -> Option<u64> {
        self.0
    }
}

/// Tool set with both tools installed, UnLZX 2.16 syntax.
pub fn default_tools() -> ToolSet {
    ToolSet::new(
        ToolProfile::lha("lha"),
        ToolProfile::lzx("unlzx", ToolVariant::UnLzx216),
    )
}

/// Tool set with `unlzx` missing.
pub fn tools_without_lzx() -> ToolSet {
    ToolSet::new(
        ToolProfile::lha("lha"),
        ToolProfile::lzx("unlzx", ToolVariant::Unknown(String::new())).unavailable(),
    )
}

/// Source and destination roots for one test.
pub struct Fixture {
    pub src: TempDir,
    pub dst: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            src: TempDir::new().expect("Failed to create source dir"),
            dst: TempDir::new().expect("Failed to create destination dir"),
        }
    }

    pub fn src_str(&self) -> String {
        self.src.path().to_str().unwrap().to_string()
    }

    pub fn dst_str(&self) -> String {
        self.dst.path().to_str().unwrap().to_string()
    }

    /// Creates a file below the source root, with parent directories.
    pub fn add_source_file(&self, relative: &str) -> PathBuf {
        let path = self.src.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"archive bytes").unwrap();
        path
    }

    pub fn root(&self) -> ScanRoot {
        ScanRoot::new(self.src_str(), self.dst_str())
    }
}

/// Runs a walk over the fixture with the given collaborators.
pub fn run_walk(
    fixture: &Fixture,
    options: &WalkOptions,
    tools: &ToolSet,
    runner: &mut FakeRunner,
    space: &dyn FreeSpace,
) -> RunSummary {
    let progress_cb = |_: &ProgressEvent| {};
    run_walk_with_progress(fixture, options, tools, runner, space, &progress_cb, Arc::new(AtomicBool::new(false)))
}

/// Runs a walk over an explicit pair of roots.
pub fn run_walk_with_root(
    root: ScanRoot,
    options: &WalkOptions,
    tools: &ToolSet,
    runner: &mut FakeRunner,
    space: &dyn FreeSpace,
) -> RunSummary {
    let progress_cb = |_: &ProgressEvent| {};
    Walker::new(
        root,
        options,
        tools,
        runner,
        space,
        &progress_cb,
        Arc::new(AtomicBool::new(false)),
    )
    .run()
}

pub fn run_walk_with_progress(
    fixture: &Fixture,
    options: &WalkOptions,
    tools: &ToolSet,
    runner: &mut FakeRunner,
    space: &dyn FreeSpace,
    progress_cb: &whd_extractor::ProgressCallback,
    cancel_flag: Arc<AtomicBool>,
) -> RunSummary {
    Walker::new(
        fixture.root(),
        options,
        tools,
        runner,
        space,
        progress_cb,
        cancel_flag,
    )
    .run()
}

/// Collects progress events for later assertions.
pub fn event_log() -> Arc<Mutex<Vec<ProgressEvent>>> {
    Arc::new(Mutex::new(Vec::new()))
}
