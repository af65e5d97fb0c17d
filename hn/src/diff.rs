//! Line differs
//!
//! Both implementations produce a unified diff with 8 lines of context and
//! caller-supplied header labels. Identical input yields an empty string;
//! differing input that is not UTF-8 yields a single `Binary files` line.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

use similar::TextDiff;
use tracing::debug;

use crate::config::{Config, DiffTool};
use crate::error::{NotifyError, Result};

/// Lines of context around each hunk
pub const CONTEXT_LINES: usize = 8;

/// Produces a unified diff between two blobs
pub trait LineDiffer: Send + Sync {
    fn diff_lines(&self, old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> Result<String>;
}

/// Build the differ selected by configuration
pub fn create_differ(config: &Config) -> Box<dyn LineDiffer> {
    match config.diff_tool {
        DiffTool::InProcess => Box::new(InProcessDiffer),
        DiffTool::External => Box::new(ExternalDiffer::new(&config.diff_program, &config.scratch_dir)),
    }
}

/// Computes the diff in-process
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessDiffer;

impl LineDiffer for InProcessDiffer {
    fn diff_lines(&self, old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> Result<String> {
        debug!(old_len = old.len(), new_len = new.len(), "InProcessDiffer::diff_lines: called");
        if old == new {
            return Ok(String::new());
        }

        let (Ok(old_text), Ok(new_text)) = (std::str::from_utf8(old), std::str::from_utf8(new)) else {
            debug!("InProcessDiffer::diff_lines: non-UTF-8 content, reporting as binary");
            return Ok(format!("Binary files {} and {} differ\n", old_label, new_label));
        };

        let diff = TextDiff::from_lines(old_text, new_text);
        let output = diff
            .unified_diff()
            .context_radius(CONTEXT_LINES)
            .header(old_label, new_label)
            .to_string();

        debug!(diff_len = output.len(), "InProcessDiffer::diff_lines: done");
        Ok(output)
    }
}

/// Shells out to a `diff` compatible program
///
/// Both blobs are written to temporary files inside the scratch directory and
/// removed once the program exits.
#[derive(Debug, Clone)]
pub struct ExternalDiffer {
    program: String,
    scratch_dir: PathBuf,
}

impl ExternalDiffer {
    pub fn new(program: impl Into<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    fn scratch_file(&self, content: &[u8]) -> Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("hn-")
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| NotifyError::file_access(&self.scratch_dir, e))?;
        file.write_all(content)
            .map_err(|e| NotifyError::file_access(file.path(), e))?;
        Ok(file)
    }
}

impl LineDiffer for ExternalDiffer {
    fn diff_lines(&self, old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> Result<String> {
        debug!(program = %self.program, scratch_dir = %self.scratch_dir.display(), "ExternalDiffer::diff_lines: called");
        fs::create_dir_all(&self.scratch_dir).map_err(|e| NotifyError::file_access(&self.scratch_dir, e))?;

        let old_file = self.scratch_file(old)?;
        let new_file = self.scratch_file(new)?;

        let output = Command::new(&self.program)
            .arg("-U")
            .arg(CONTEXT_LINES.to_string())
            .arg("-p")
            .args(["--label", old_label, "--label", new_label])
            .arg(old_file.path())
            .arg(new_file.path())
            .output()
            .map_err(|e| NotifyError::DiffTool(format!("cannot run {}: {}", self.program, e)))?;

        // diff exits 0 for identical input, 1 for differences, 2 for trouble
        match output.status.code() {
            Some(0) | Some(1) => {
                let text = String::from_utf8_lossy(&output.stdout).into_owned();
                debug!(diff_len = text.len(), "ExternalDiffer::diff_lines: done");
                Ok(text)
            }
            code => Err(NotifyError::DiffTool(format!(
                "{} exited with {:?}: {}",
                self.program,
                code,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }
}
