//! Repository state checks run before a release.
//!
//! Both checks shell out to an external tool, capture its merged
//! stdout/stderr through [`run_captured_in`], and look for marker lines in
//! the captured output. There is no timeout: a hung tool hangs the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use tracing::{debug, error, info};

use crate::config::{BuildTool, Settings};
use crate::error::{ReleaseError, Result};

const NOT_A_REPOSITORY: &str = "not a git repository";
const WORKING_TREE_CLEAN: &str = "nothing to commit, working tree clean";

/// Run `command`, capturing stdout and stderr into one temporary file in
/// `scratch_dir`, and return the captured lines with surrounding whitespace
/// trimmed.
///
/// A non-zero exit status is not an error; only a failure to start the
/// process is. The capture file is removed on every path out of this function.
pub fn run_captured_in(command: &mut Command, scratch_dir: &Path) -> Result<Vec<String>> {
    let capture = tempfile::Builder::new()
        .prefix("temp_log_up_to_date")
        .tempfile_in(scratch_dir)
        .map_err(|e| ReleaseError::fs(scratch_dir, e))?;
    let capture_path = capture.path().to_path_buf();

    let stdout = capture
        .as_file()
        .try_clone()
        .map_err(|e| ReleaseError::fs(&capture_path, e))?;
    let stderr = capture
        .as_file()
        .try_clone()
        .map_err(|e| ReleaseError::fs(&capture_path, e))?;

    let program = command.get_program().to_string_lossy().into_owned();
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|e| {
            error!(error = ?e, program = %program, "Failed to launch command");
            ReleaseError::state(format!("could not run `{program}`: {e}"))
        })?;
    debug!(program = %program, status = ?status, "Captured command finished");

    let raw = fs::read(&capture_path).map_err(|e| ReleaseError::fs(&capture_path, e))?;
    capture
        .close()
        .map_err(|e| ReleaseError::fs(&capture_path, e))?;

    Ok(String::from_utf8_lossy(&raw)
        .lines()
        .map(|line| line.trim().to_string())
        .collect())
}

/// [`run_captured_in`] using the system temporary directory.
pub fn run_captured(command: &mut Command) -> Result<Vec<String>> {
    run_captured_in(command, &std::env::temp_dir())
}

fn any_line_matches(pattern: &Regex, lines: &[String]) -> bool {
    lines.iter().any(|line| pattern.is_match(line))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| ReleaseError::state(format!("invalid marker pattern `{pattern}`: {e}")))
}

/// Runs the build-tool dry run and the version-control status query in a
/// working directory.
#[derive(Debug, Clone)]
pub struct StateChecker {
    work_dir: PathBuf,
    scratch_dir: PathBuf,
    build_tool: BuildTool,
}

impl StateChecker {
    pub fn new(work_dir: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            work_dir: work_dir.into(),
            scratch_dir: settings.scratch_dir(),
            build_tool: settings.build_tool.clone(),
        }
    }

    /// Dry-run the build tool and report whether every target is up to date.
    ///
    /// Fails with [`ReleaseError::StateCheck`] when the project file is missing
    /// or when the tool never printed its start-of-run marker.
    pub fn build_up_to_date(&self) -> Result<bool> {
        let tool = &self.build_tool;
        if let Some(project_file) = &tool.project_file {
            if !self.work_dir.join(project_file).is_file() {
                return Err(ReleaseError::state(format!(
                    "{} must be run in a directory containing {}",
                    tool.program,
                    project_file.display()
                )));
            }
        }

        let mut command = Command::new(&tool.program);
        command.args(&tool.args).current_dir(&self.work_dir);
        let log = run_captured_in(&mut command, &self.scratch_dir)?;

        if !any_line_matches(&compile(&tool.start_marker)?, &log) {
            error!(program = %tool.program, lines = log.len(), "Build tool did not start");
            return Err(ReleaseError::state(format!(
                "{} must be able to begin the build process",
                tool.program
            )));
        }
        let up_to_date = any_line_matches(&compile(&tool.up_to_date_marker)?, &log);
        info!(program = %tool.program, up_to_date, "Build dry run checked");
        Ok(up_to_date)
    }

    /// Report whether `git status` shows a clean working tree.
    pub fn version_control_clean(&self) -> Result<bool> {
        let mut command = Command::new("git");
        command
            .arg("status")
            .env("LC_ALL", "C")
            .current_dir(&self.work_dir);
        let log = run_captured_in(&mut command, &self.scratch_dir)?;

        if log
            .iter()
            .any(|line| line.to_ascii_lowercase().contains(NOT_A_REPOSITORY))
        {
            return Err(ReleaseError::state(format!(
                "{} is not a git repository",
                self.work_dir.display()
            )));
        }
        let clean = log.iter().any(|line| line.contains(WORKING_TREE_CLEAN));
        info!(work_dir = %self.work_dir.display(), clean, "Version control status checked");
        Ok(clean)
    }
}
