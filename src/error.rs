/// Error kinds raised by the renaming engine.
///
/// Per-entry problems (invalid names, collisions) are not errors: they are
/// recorded on the plan entries. The variants below are the conditions that
/// stop an operation or reject its input outright.
use std::path::PathBuf;

#[derive(Debug)]
pub enum RenameError {
    /// The date format specifier is malformed.
    Format { format: String, reason: String },
    /// The rename configuration was rejected before any file was touched.
    InvalidConfig(String),
    /// Apply was called on a plan holding entries that are not `ok`.
    PlanNotExecutable { blocked: Vec<PathBuf> },
    /// A single rename failed at execution time.
    Filesystem {
        source: PathBuf,
        target: PathBuf,
        error: std::io::Error,
    },
    /// Undo was requested with no undo record available.
    NoUndoAvailable,
    /// The persisted undo record could not be read or written.
    UndoRecordIo(String),
}

impl std::fmt::Display for RenameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format { format, reason } => {
                write!(f, "Invalid date format '{}': {}", format, reason)
            }
            Self::InvalidConfig(reason) => write!(f, "Invalid configuration: {}", reason),
            Self::PlanNotExecutable { blocked } => {
                write!(
                    f,
                    "Plan is not executable: {} {} blocked by naming problems",
                    blocked.len(),
                    if blocked.len() == 1 { "entry is" } else { "entries are" }
                )
            }
            Self::Filesystem {
                source,
                target,
                error,
            } => {
                write!(
                    f,
                    "Failed to rename {} to {}: {}",
                    source.display(),
                    target.display(),
                    error
                )
            }
            Self::NoUndoAvailable => write!(f, "No rename operation available to undo"),
            Self::UndoRecordIo(reason) => write!(f, "Undo record error: {}", reason),
        }
    }
}

impl std::error::Error for RenameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filesystem { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type RenameResult<T> = Result<T, RenameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_not_executable_counts_entries() {
        let err = RenameError::PlanNotExecutable {
            blocked: vec![PathBuf::from("/a.jpg"), PathBuf::from("/b.jpg")],
        };
        assert_eq!(
            err.to_string(),
            "Plan is not executable: 2 entries are blocked by naming problems"
        );
    }

    #[test]
    fn filesystem_error_exposes_io_source() {
        use std::error::Error;

        let err = RenameError::Filesystem {
            source: PathBuf::from("/a.jpg"),
            target: PathBuf::from("/b.jpg"),
            error: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/a.jpg"));
    }
}
