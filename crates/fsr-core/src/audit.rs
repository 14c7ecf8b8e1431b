use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Append-only audit log for one script run: one line per significant event
/// (script start, document load, request issued, response status, assertion
/// outcome, test outcome, run summary).
///
/// Lines are kept in memory as well so the log can be inspected after a run
/// without re-reading the file. One log per run context; never shared.
#[derive(Debug)]
pub struct AuditLog {
    file: Option<File>,
    path: Option<PathBuf>,
    lines: Vec<String>,
}

impl AuditLog {
    /// In-memory only. Used by tests and by runs without a results dir.
    pub fn buffered() -> Self {
        Self { file: None, path: None, lines: Vec::new() }
    }

    /// Create `{dir}/test_results_{timestamp}.txt` and log into it.
    pub fn create_in(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).with_context(|| format!("create results dir {}", dir.display()))?;
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let path = dir.join(format!("test_results_{stamp}.txt"));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open audit log {}", path.display()))?;
        writeln!(file, "FHIR Test Log - {}", chrono::Local::now().to_rfc3339())?;
        Ok(Self { file: Some(file), path: Some(path), lines: Vec::new() })
    }

    pub fn event(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "audit", "{message}");
        if let Some(f) = self.file.as_mut() {
            // A failed write must not take the run down with it.
            if let Err(e) = writeln!(f, "{message}") {
                tracing::warn!("audit log write failed: {e}");
            }
        }
        self.lines.push(message);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
