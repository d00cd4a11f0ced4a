//! Launching external tools.

use crate::error::ExtractError;
use crate::tool::{Arg, CommandLine};
use std::fs::File;
use std::process::{Command, Stdio};

/// Runs command lines and reports their exit status.
///
/// Every call blocks until the child exits. `Ok(None)` means the child was
/// terminated without an exit code.
pub trait CommandRunner {
    /// Runs a command, leaving its output on the console.
    fn run(&mut self, cmd: &CommandLine) -> Result<Option<i32>, ExtractError>;

    /// Runs a command with its standard output written to `out`.
    fn run_to_file(&mut self, cmd: &CommandLine, out: &mut File) -> Result<Option<i32>, ExtractError>;
}

/// Runner that launches real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(cmd: &CommandLine) -> Command {
        let mut command = Command::new(cmd.program());
        command
            .args(cmd.args().iter().map(Arg::as_str))
            .stdin(Stdio::null());
        command
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &CommandLine) -> Result<Option<i32>, ExtractError> {
        let status = Self::command(cmd)
            .status()
            .map_err(|source| ExtractError::ToolLaunch {
                program: cmd.program().to_string(),
                source,
            })?;
        Ok(status.code())
    }

    fn run_to_file(&mut self, cmd: &CommandLine, out: &mut File) -> Result<Option<i32>, ExtractError> {
        let stdout = out.try_clone()?;
        let status = Self::command(cmd)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::null())
            .status()
            .map_err(|source| ExtractError::ToolLaunch {
                program: cmd.program().to_string(),
                source,
            })?;
        Ok(status.code())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    #[test]
    fn test_system_runner_exit_codes() {
        let mut runner = SystemRunner;
        let ok = CommandLine::new("true");
        assert_eq!(runner.run(&ok).unwrap(), Some(0));

        let fail = CommandLine::new("sh").flags(["-c", "exit 10"]);
        assert_eq!(runner.run(&fail).unwrap(), Some(10));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let mut runner = SystemRunner;
        let cmd = CommandLine::new("definitely-not-an-installed-tool-xyz");
        assert!(matches!(runner.run(&cmd), Err(ExtractError::ToolLaunch { .. })));
    }

    #[test]
    fn test_system_runner_captures_to_file() {
        let mut runner = SystemRunner;
        let mut out = tempfile::tempfile().unwrap();
        let cmd = CommandLine::new("echo").flags(["Game/readme"]);
        assert_eq!(runner.run_to_file(&cmd, &mut out).unwrap(), Some(0));

        out.seek(SeekFrom::Start(0)).unwrap();
        let mut text = String::new();
        out.read_to_string(&mut text).unwrap();
        assert_eq!(text.trim(), "Game/readme");
    }
}
