//! External extraction tool profiles and command construction.
//!
//! LHA archives are always handled by `lha` with a fixed flag set. LZX
//! archives are handled by `unlzx`, whose two common generations take
//! incompatible arguments, so the installed one is probed once at startup.

use crate::error::ExtractError;
use crate::path;
use crate::types::{ArchiveKind, ExtractMode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Default program name for LHA archives.
pub const LHA_PROGRAM: &str = "lha";

/// Default program name for LZX archives.
pub const LZX_PROGRAM: &str = "unlzx";

/// Known generations of the LZX extraction tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolVariant {
    /// `UnLZX 2.16`: `-x` to extract, `-o <dir>` for the target
    UnLzx216,
    /// `LZX 1.21`: `-q -x e`, target directory given positionally
    Lzx121,
    /// Anything else, carrying the reported version line
    Unknown(String),
}

impl ToolVariant {
    /// Maps a version line reported by the tool to a variant.
    pub fn from_version_line(line: &str) -> Self {
        let line = line.trim();
        if line.contains("UnLZX 2.16") {
            ToolVariant::UnLzx216
        } else if line.contains("LZX 1.21") {
            ToolVariant::Lzx121
        } else {
            ToolVariant::Unknown(line.to_string())
        }
    }
}

impl fmt::Display for ToolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolVariant::UnLzx216 => f.write_str("UnLZX 2.16"),
            ToolVariant::Lzx121 => f.write_str("LZX 1.21"),
            ToolVariant::Unknown(line) if line.is_empty() => f.write_str("unknown version"),
            ToolVariant::Unknown(line) => write!(f, "unknown version ({line})"),
        }
    }
}

/// How to drive the extraction tool for one archive kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProfile {
    /// Archive kind this profile handles
    pub kind: ArchiveKind,

    /// Program to launch
    pub program: String,

    /// Detected tool generation (LZX only)
    pub variant: Option<ToolVariant>,

    /// Flags placed before the archive path when extracting
    pub extract_flags: Vec<String>,

    /// Flags placed before the archive path when only testing
    pub test_flags: Vec<String>,

    /// Flags that list archive contents (empty if unsupported)
    pub list_flags: Vec<String>,

    /// Flag placed between the archive path and the destination
    pub target_dir_flag: Option<String>,

    /// Whether the program was found. Unavailable profiles must not be run.
    pub available: bool,
}

impl ToolProfile {
    /// Fixed profile for `lha`.
    pub fn lha(program: impl Into<String>) -> Self {
        Self {
            kind: ArchiveKind::Lha,
            program: program.into(),
            variant: None,
            extract_flags: flags(&["-T", "-M", "-N", "-m", "x"]),
            test_flags: flags(&["t"]),
            list_flags: flags(&["vq"]),
            target_dir_flag: None,
            available: true,
        }
    }

    /// Profile for `unlzx`, shaped by the detected variant.
    pub fn lzx(program: impl Into<String>, variant: ToolVariant) -> Self {
        let (extract_flags, target_dir_flag) = match &variant {
            ToolVariant::UnLzx216 => (flags(&["-x"]), Some("-o".to_string())),
            ToolVariant::Lzx121 => (flags(&["-q", "-x", "e"]), None),
            ToolVariant::Unknown(_) => (flags(&["e"]), None),
        };

        Self {
            kind: ArchiveKind::Lzx,
            program: program.into(),
            variant: Some(variant),
            extract_flags,
            test_flags: flags(&["-v"]),
            list_flags: Vec::new(),
            target_dir_flag,
            available: true,
        }
    }

    /// Marks the profile as unusable because the program is missing.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    fn mode_flags(&self, mode: ExtractMode) -> &[String] {
        match mode {
            ExtractMode::Extract => &self.extract_flags,
            ExtractMode::TestOnly => &self.test_flags,
        }
    }
}

fn flags(list: &[&str]) -> Vec<String> {
    list.iter().map(|f| f.to_string()).collect()
}

/// One token of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A flag or sub-command, passed verbatim
    Flag(String),
    /// A normalized path, quoted when rendered
    Path(String),
}

impl Arg {
    /// Token text without quoting.
    pub fn as_str(&self) -> &str {
        match self {
            Arg::Flag(s) | Arg::Path(s) => s,
        }
    }
}

/// An ordered command line, serialized only when it is run or displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<Arg>,
}

impl CommandLine {
    /// Starts a command line for `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends flags.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(flags.into_iter().map(|f| Arg::Flag(f.into())));
        self
    }

    /// Appends a path after normalizing it.
    pub fn path(mut self, path: &str) -> Result<Self, ExtractError> {
        self.args.push(Arg::Path(path::normalize(path)?));
        Ok(self)
    }

    /// Program to launch.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument tokens in order.
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Path tokens in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Path(p) => Some(p.as_str()),
            Arg::Flag(_) => None,
        })
    }

    /// Renders the command as a single normalized string with quoted paths.
    pub fn render(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            match arg {
                Arg::Flag(flag) => out.push_str(flag),
                Arg::Path(p) => {
                    out.push('"');
                    out.push_str(p);
                    out.push('"');
                }
            }
        }
        path::collapse(&out)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Builds the extraction or test command for one archive.
///
/// Token order is program, mode flags, archive path, target-directory flag
/// (if the tool has one), destination path.
pub fn build_extraction_command(
    profile: &ToolProfile,
    archive: &str,
    destination: &str,
    mode: ExtractMode,
) -> Result<CommandLine, ExtractError> {
    let mut cmd = CommandLine::new(profile.program.clone())
        .flags(profile.mode_flags(mode).iter().cloned())
        .path(archive)?;

    if let Some(flag) = &profile.target_dir_flag {
        cmd = cmd.flags([flag.clone()]);
    }

    cmd.path(destination)
}

/// Builds the command that lists an archive's contents, if the tool has one.
pub fn build_listing_command(
    profile: &ToolProfile,
    archive: &str,
) -> Result<Option<CommandLine>, ExtractError> {
    if profile.list_flags.is_empty() {
        return Ok(None);
    }
    CommandLine::new(profile.program.clone())
        .flags(profile.list_flags.iter().cloned())
        .path(archive)
        .map(Some)
}

/// Discovers external tools and their versions.
pub trait ToolProbe {
    /// Resolves a program name or path to an executable, if installed.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Returns the first line the tool prints to identify itself.
    fn version_line(&self, program: &Path) -> Option<String>;
}

/// Probe backed by `PATH` lookup and real process launches.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl ToolProbe for SystemProbe {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn version_line(&self, program: &Path) -> Option<String> {
        // Both unlzx generations print their banner when run without arguments.
        let output = Command::new(program)
            .stdin(Stdio::null())
            .output()
            .ok()?;

        let text = [output.stdout, output.stderr]
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect::<Vec<_>>()
            .join("\n");

        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

/// Optional explicit tool locations.
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    /// Location of `lha`
    pub lha: Option<PathBuf>,
    /// Location of `unlzx`
    pub unlzx: Option<PathBuf>,
}

/// Resolves the profile for one archive kind.
///
/// A missing `lha` is an error because nothing can be extracted without it.
/// A missing `unlzx` yields an unavailable profile; its archives are deferred.
pub fn resolve_tool_profile(
    kind: ArchiveKind,
    program: Option<&Path>,
    probe: &dyn ToolProbe,
) -> Result<ToolProfile, ExtractError> {
    let name = match (kind, program) {
        (_, Some(p)) => p.to_string_lossy().into_owned(),
        (ArchiveKind::Lha, None) => LHA_PROGRAM.to_string(),
        (ArchiveKind::Lzx, None) => LZX_PROGRAM.to_string(),
    };

    let located = probe.locate(&name);
    debug!(program = %name, located = ?located, "probed extraction tool");

    match kind {
        ArchiveKind::Lha => {
            let found = located.ok_or_else(|| ExtractError::ToolNotFound(name))?;
            Ok(ToolProfile::lha(found.to_string_lossy()))
        }
        ArchiveKind::Lzx => {
            let Some(found) = located else {
                info!(
                    program = %name,
                    "LZX tool not installed, LZX archives will be counted but not extracted"
                );
                return Ok(ToolProfile::lzx(name, ToolVariant::Unknown(String::new())).unavailable());
            };

            let line = probe.version_line(&found).unwrap_or_default();
            let variant = ToolVariant::from_version_line(&line);
            match &variant {
                ToolVariant::Unknown(_) => info!(
                    version = %line,
                    "Unknown UnLZX version, defaulting extraction command to \"e\""
                ),
                known => info!("UnLZX version recognised as {known}"),
            }

            Ok(ToolProfile::lzx(found.to_string_lossy(), variant))
        }
    }
}

/// Resolved profiles for every archive kind.
#[derive(Debug, Clone)]
pub struct ToolSet {
    lha: ToolProfile,
    lzx: ToolProfile,
}

impl ToolSet {
    /// Builds a tool set from explicit profiles.
    pub fn new(lha: ToolProfile, lzx: ToolProfile) -> Self {
        Self { lha, lzx }
    }

    /// Probes every tool once.
    pub fn resolve(paths: &ToolPaths, probe: &dyn ToolProbe) -> Result<Self, ExtractError> {
        Ok(Self {
            lha: resolve_tool_profile(ArchiveKind::Lha, paths.lha.as_deref(), probe)?,
            lzx: resolve_tool_profile(ArchiveKind::Lzx, paths.unlzx.as_deref(), probe)?,
        })
    }

    /// Profile for one kind.
    pub fn profile(&self, kind: ArchiveKind) -> &ToolProfile {
        match kind {
            ArchiveKind::Lha => &self.lha,
            ArchiveKind::Lzx => &self.lzx,
        }
    }
}
