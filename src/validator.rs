//! File name validation.
//!
//! Candidate names are checked against the rules of the most restrictive
//! common filesystems so a plan computed on one platform stays valid when
//! the files are later copied elsewhere.

use std::path::Path;

/// Characters rejected in any file name.
pub const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names reserved on Windows, compared case-insensitively.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Longest file name (in bytes) accepted by common filesystems.
pub const MAX_NAME_LEN: usize = 255;

/// Default limit on the full path length.
pub const DEFAULT_MAX_PATH_LEN: usize = if cfg!(windows) { 260 } else { 4096 };

/// Why a candidate name was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidName {
    Empty,
    IllegalCharacter(char),
    ControlCharacter,
    ReservedName(String),
    TrailingDotOrSpace,
    NameTooLong { len: usize, max: usize },
    PathTooLong { len: usize, max: usize },
    /// The current name is not valid UTF-8 and cannot be rebuilt faithfully.
    NotUtf8,
}

impl std::fmt::Display for InvalidName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "name is empty"),
            Self::IllegalCharacter(c) => write!(f, "name contains illegal character '{}'", c),
            Self::ControlCharacter => write!(f, "name contains a control character"),
            Self::ReservedName(name) => write!(f, "'{}' is a reserved device name", name),
            Self::TrailingDotOrSpace => write!(f, "name ends with a dot or space"),
            Self::NameTooLong { len, max } => {
                write!(f, "name is {} bytes long (max {})", len, max)
            }
            Self::PathTooLong { len, max } => {
                write!(f, "path is {} bytes long (max {})", len, max)
            }
            Self::NotUtf8 => write!(f, "current name is not valid UTF-8"),
        }
    }
}

/// Outcome of validating one candidate name.
pub type ValidationResult = Result<(), InvalidName>;

/// Checks candidate names against filesystem naming rules.
#[derive(Debug, Clone, Copy)]
pub struct NameValidator {
    max_path_len: usize,
}

impl Default for NameValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PATH_LEN)
    }
}

impl NameValidator {
    pub fn new(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Validates a proposed base name and the extension it will carry.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulk_rename::validator::{InvalidName, NameValidator};
    ///
    /// let validator = NameValidator::default();
    /// assert!(validator.validate("holiday_001", ".jpg").is_ok());
    /// assert_eq!(validator.validate("", ".jpg"), Err(InvalidName::Empty));
    /// assert_eq!(
    ///     validator.validate("aux", ".txt"),
    ///     Err(InvalidName::ReservedName("aux".to_string()))
    /// );
    /// ```
    pub fn validate(&self, proposed_base_name: &str, extension: &str) -> ValidationResult {
        if proposed_base_name.trim().is_empty() {
            return Err(InvalidName::Empty);
        }

        let file_name = format!("{}{}", proposed_base_name, extension);

        if let Some(c) = file_name.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
            return Err(InvalidName::IllegalCharacter(c));
        }
        if file_name.chars().any(char::is_control) {
            return Err(InvalidName::ControlCharacter);
        }

        let stem = file_name.split('.').next().unwrap_or_default();
        if RESERVED_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(stem.trim_end()))
        {
            return Err(InvalidName::ReservedName(stem.trim_end().to_string()));
        }

        if file_name.ends_with('.') || file_name.ends_with(' ') {
            return Err(InvalidName::TrailingDotOrSpace);
        }
        if file_name.len() > MAX_NAME_LEN {
            return Err(InvalidName::NameTooLong {
                len: file_name.len(),
                max: MAX_NAME_LEN,
            });
        }

        Ok(())
    }

    /// Validates the name and the full path it produces inside `directory`.
    pub fn validate_in(
        &self,
        directory: &Path,
        proposed_base_name: &str,
        extension: &str,
    ) -> ValidationResult {
        self.validate(proposed_base_name, extension)?;

        let len = directory
            .join(format!("{}{}", proposed_base_name, extension))
            .as_os_str()
            .len();
        if len > self.max_path_len {
            return Err(InvalidName::PathTooLong {
                len,
                max: self.max_path_len,
            });
        }
        Ok(())
    }
}
