//! Append-only rename event log.
//!
//! Every previewed, applied and undone rename produces one line:
//!
//! ```text
//! 2024-01-15T10:30:00+01:00	apply	/photos/a.jpg	/photos/IMG_a.jpg	ok
//! ```
//!
//! Columns are tab-separated: timestamp, operation kind, source path, target
//! path, outcome (`ok` or `failed: <reason>`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default log file name.
pub const LOG_FILENAME: &str = "rename.log";

/// Which engine operation produced a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Preview,
    Apply,
    Undo,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Apply => "apply",
            Self::Undo => "undo",
        }
    }
}

/// Result recorded for a log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Failed(String),
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Writes rename events to a log file, or nowhere when disabled.
#[derive(Debug, Clone)]
pub struct RenameLog {
    path: Option<PathBuf>,
}

impl RenameLog {
    /// Appends to the log file at `path`, creating it on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A log that discards every event.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Records one event.
    ///
    /// Write failures are reported as warnings and never interrupt the
    /// operation being logged.
    pub fn record(&self, kind: OperationKind, source: &Path, target: &Path, outcome: &Outcome) {
        let Some(path) = &self.path else {
            return;
        };

        let line = format_line(
            &chrono::Local::now().to_rfc3339(),
            kind,
            source,
            target,
            outcome,
        );

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            log::warn!("Could not write to rename log {}: {}", path.display(), e);
        }
    }
}

/// Renders a path for the log. Names that are not valid UTF-8 are written in
/// escaped form (`"caf\xE9.txt"`) so the line still identifies the file.
fn path_field(path: &Path) -> String {
    match path.to_str() {
        Some(text) => text.to_string(),
        None => format!("{:?}", path),
    }
}

/// Tabs and newlines inside fields would break the column layout.
fn sanitize(field: &str) -> String {
    field.replace(['\t', '\n', '\r'], " ")
}

fn format_line(
    timestamp: &str,
    kind: OperationKind,
    source: &Path,
    target: &Path,
    outcome: &Outcome,
) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\n",
        timestamp,
        kind.as_str(),
        sanitize(&path_field(source)),
        sanitize(&path_field(target)),
        sanitize(&outcome.to_string())
    )
}
