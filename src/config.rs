//! Rename rules and settings-file configuration.
//!
//! This module defines the [`RenameConfig`] value object the engine consumes
//! and loads it, together with scan options, from TOML settings files.
//!
//! # Configuration File Format
//!
//! ```toml
//! [scan]
//! extensions = ["jpg", "png"]
//! recursive = false
//! include_hidden = false
//! exclude = ["cache/**"]
//! sort = "path"
//!
//! [rename]
//! prefix = "IMG_"
//! suffix = ""
//!
//! [rename.numbering]
//! enabled = true
//! start = 1
//! padding = 3
//!
//! [rename.find_replace]
//! find = "2023"
//! replace = "2024"
//! case_sensitive = true
//!
//! [rename.date]
//! enabled = false
//! source = "creation"
//! format = "%Y-%m-%d"
//!
//! [rename.mode]
//! kind = "pattern"
//! pattern = "{date}_{prefix}_{name}_{num}"
//! separator = "_"
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::date_format::{self, DateSource};
use crate::error::RenameError;
use crate::pattern::{Pattern, PatternElement};
use crate::scanner::ScanOptions;
use crate::validator::{DEFAULT_MAX_PATH_LEN, ILLEGAL_CHARS, NameValidator};

/// Largest accepted numbering start value.
pub const MAX_START_NUMBER: u32 = 999_999;
/// Accepted range of zero-padding widths.
pub const PADDING_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_SEPARATOR: &str = "_";

/// Name of the settings file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".bulkrenamerc.toml";

/// Errors that can occur while loading a settings file or scan filters.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// IO error while reading configuration or a directory.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(
                    f,
                    "Invalid glob pattern '{}': expected *.ext or dir/**",
                    pattern
                )
            }
            ConfigError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Sequential numbering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Numbering {
    pub enabled: bool,
    pub start: u32,
    /// Minimum number of digits, zero-padded.
    pub padding: usize,
}

impl Default for Numbering {
    fn default() -> Self {
        Self {
            enabled: false,
            start: 1,
            padding: 3,
        }
    }
}

/// Find-and-replace settings. An empty `find` disables replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindReplace {
    pub find: String,
    pub replace: String,
    pub case_sensitive: bool,
}

impl Default for FindReplace {
    fn default() -> Self {
        Self {
            find: String::new(),
            replace: String::new(),
            case_sensitive: true,
        }
    }
}

/// Date insertion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRule {
    pub enabled: bool,
    pub source: DateSource,
    pub format: String,
}

impl Default for DateRule {
    fn default() -> Self {
        Self {
            enabled: false,
            source: DateSource::Creation,
            format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

/// How a new base name is synthesized. The two modes are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NamingMode {
    /// Prefix, suffix, find/replace, date, number, applied in that order.
    #[default]
    Discrete,
    /// Ordered token template joined with `separator`.
    Pattern {
        #[serde(default)]
        pattern: Pattern,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

/// Complete set of rename rules handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    pub prefix: String,
    pub suffix: String,
    pub numbering: Numbering,
    pub find_replace: FindReplace,
    pub date: DateRule,
    pub mode: NamingMode,
    /// Longest full path a proposed name may produce.
    pub max_path_len: usize,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            numbering: Numbering::default(),
            find_replace: FindReplace::default(),
            date: DateRule::default(),
            mode: NamingMode::Discrete,
            max_path_len: DEFAULT_MAX_PATH_LEN,
        }
    }
}

impl RenameConfig {
    /// Returns true if the configuration would change any name.
    pub fn is_configured(&self) -> bool {
        !self.prefix.is_empty()
            || !self.suffix.is_empty()
            || self.numbering.enabled
            || !self.find_replace.find.is_empty()
            || self.date.enabled
            || matches!(self.mode, NamingMode::Pattern { .. })
    }

    /// Whether any rule needs a per-file date.
    pub fn needs_date(&self) -> bool {
        match &self.mode {
            NamingMode::Discrete => self.date.enabled,
            NamingMode::Pattern { pattern, .. } => pattern
                .elements()
                .iter()
                .any(|element| *element == PatternElement::Date),
        }
    }

    /// Validates the configuration and prepares it for plan computation.
    ///
    /// # Errors
    ///
    /// `RenameError::InvalidConfig` for out-of-range numbering, an invalid
    /// pattern or illegal characters in fixed text; `RenameError::Format`
    /// for a malformed date format.
    pub fn compile(&self) -> Result<CompiledConfig, RenameError> {
        if self.numbering.start > MAX_START_NUMBER {
            return Err(RenameError::InvalidConfig(format!(
                "start number must be at most {}",
                MAX_START_NUMBER
            )));
        }
        if !PADDING_RANGE.contains(&self.numbering.padding) {
            return Err(RenameError::InvalidConfig(format!(
                "padding must be between {} and {}",
                PADDING_RANGE.start(),
                PADDING_RANGE.end()
            )));
        }

        check_fixed_text("prefix", &self.prefix)?;
        check_fixed_text("suffix", &self.suffix)?;
        check_fixed_text("replacement", &self.find_replace.replace)?;

        if self.needs_date() {
            date_format::validate_format(&self.date.format)?;
        }

        if let NamingMode::Pattern { pattern, separator } = &self.mode {
            pattern.validate()?;
            check_fixed_text("separator", separator)?;
        }

        let matcher = if self.find_replace.find.is_empty() {
            None
        } else if self.find_replace.case_sensitive {
            Some(FindMatcher::Exact(self.find_replace.find.clone()))
        } else {
            let regex = RegexBuilder::new(&regex::escape(&self.find_replace.find))
                .case_insensitive(true)
                .build()
                .map_err(|e| RenameError::InvalidConfig(format!("find text: {}", e)))?;
            Some(FindMatcher::IgnoreCase(regex))
        };

        Ok(CompiledConfig {
            config: self.clone(),
            matcher,
            validator: NameValidator::new(self.max_path_len),
        })
    }
}

fn check_fixed_text(label: &str, text: &str) -> Result<(), RenameError> {
    match text
        .chars()
        .find(|c| ILLEGAL_CHARS.contains(c) || c.is_control())
    {
        Some(c) => Err(RenameError::InvalidConfig(format!(
            "{} contains invalid character {:?}",
            label, c
        ))),
        None => Ok(()),
    }
}

enum FindMatcher {
    Exact(String),
    IgnoreCase(Regex),
}

/// A validated [`RenameConfig`] ready for plan computation.
pub struct CompiledConfig {
    pub config: RenameConfig,
    matcher: Option<FindMatcher>,
    pub validator: NameValidator,
}

impl CompiledConfig {
    /// Applies find/replace to `name`, treating both texts literally.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulk_rename::config::RenameConfig;
    ///
    /// let mut config = RenameConfig::default();
    /// config.find_replace.find = "IMG".to_string();
    /// config.find_replace.replace = "photo".to_string();
    /// config.find_replace.case_sensitive = false;
    ///
    /// let compiled = config.compile().unwrap();
    /// assert_eq!(compiled.replace("img_01_Img"), "photo_01_photo");
    /// ```
    pub fn replace(&self, name: &str) -> String {
        let replacement = self.config.find_replace.replace.as_str();
        match &self.matcher {
            None => name.to_string(),
            Some(FindMatcher::Exact(find)) => name.replace(find.as_str(), replacement),
            Some(FindMatcher::IgnoreCase(regex)) => regex
                .replace_all(name, regex::NoExpand(replacement))
                .into_owned(),
        }
    }

    /// Formats a sequence number with the configured padding.
    pub fn format_number(&self, number: u64) -> String {
        format!("{:0width$}", number, width = self.config.numbering.padding)
    }
}

/// Contents of a settings file: scan options plus rename rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scan: ScanOptions,
    pub rename: RenameConfig,
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.bulkrenamerc.toml` in the current directory
    /// 3. Look for `~/.config/bulk-rename/config.toml` in home directory
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file is found or explicitly provided
    /// but cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("bulk-rename")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        log::debug!("Loading settings from {}", path.display());

        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SortKey;

    #[test]
    fn test_default_config_is_discrete_and_valid() {
        let config = RenameConfig::default();
        assert_eq!(config.mode, NamingMode::Discrete);
        assert!(!config.is_configured());
        assert!(config.compile().is_ok());
    }

    #[test]
    fn test_padding_out_of_range_rejected() {
        let mut config = RenameConfig::default();
        config.numbering.padding = 0;
        assert!(matches!(
            config.compile(),
            Err(RenameError::InvalidConfig(_))
        ));
        config.numbering.padding = 11;
        assert!(config.compile().is_err());
    }

    #[test]
    fn test_start_number_limit() {
        let mut config = RenameConfig::default();
        config.numbering.start = MAX_START_NUMBER;
        assert!(config.compile().is_ok());
        config.numbering.start = MAX_START_NUMBER + 1;
        assert!(config.compile().is_err());
    }

    #[test]
    fn test_bad_date_format_only_checked_when_used() {
        let mut config = RenameConfig::default();
        config.date.format = "%Y-%".to_string();
        assert!(config.compile().is_ok());

        config.date.enabled = true;
        assert!(matches!(config.compile(), Err(RenameError::Format { .. })));
    }

    #[test]
    fn test_prefix_with_slash_rejected() {
        let config = RenameConfig {
            prefix: "a/b".to_string(),
            ..Default::default()
        };
        assert!(config.compile().is_err());
    }

    #[test]
    fn test_case_sensitive_replace() {
        let config = RenameConfig {
            find_replace: FindReplace {
                find: "2023".to_string(),
                replace: "2024".to_string(),
                case_sensitive: true,
            },
            ..Default::default()
        };
        let compiled = config.compile().expect("Should compile");
        assert_eq!(
            compiled.replace("vacation_2023_beach"),
            "vacation_2024_beach"
        );
    }

    #[test]
    fn test_replace_treats_text_literally() {
        let config = RenameConfig {
            find_replace: FindReplace {
                find: "a.b".to_string(),
                replace: "$1".to_string(),
                case_sensitive: false,
            },
            ..Default::default()
        };
        let compiled = config.compile().expect("Should compile");
        assert_eq!(compiled.replace("A.B-axb"), "$1-axb");
    }

    #[test]
    fn test_format_number_padding() {
        let config = RenameConfig {
            numbering: Numbering {
                enabled: true,
                start: 1,
                padding: 3,
            },
            ..Default::default()
        };
        let compiled = config.compile().expect("Should compile");
        assert_eq!(compiled.format_number(7), "007");
        assert_eq!(compiled.format_number(12345), "12345");
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = Settings::from_toml(
            r#"
            [scan]
            extensions = ["jpg"]
            sort = "name"

            [rename]
            prefix = "IMG_"

            [rename.numbering]
            enabled = true

            [rename.mode]
            kind = "pattern"
            pattern = "{prefix}_{name}_{num}"
            "#,
        )
        .expect("Should parse");

        assert_eq!(settings.scan.extensions, vec!["jpg"]);
        assert_eq!(settings.scan.sort, SortKey::Name);
        assert_eq!(settings.rename.prefix, "IMG_");
        assert_eq!(settings.rename.numbering.padding, 3);
        match &settings.rename.mode {
            NamingMode::Pattern { pattern, separator } => {
                assert_eq!(pattern.to_string(), "{prefix}_{name}_{num}");
                assert_eq!(separator, "_");
            }
            other => panic!("Expected pattern mode, got {:?}", other),
        }
    }

    #[test]
    fn test_settings_rejects_unknown_placeholder() {
        let result = Settings::from_toml(
            r#"
            [rename.mode]
            kind = "pattern"
            pattern = "{name}{camera}"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_explicit_missing_config_file() {
        let result = Settings::load(Some(Path::new("/no/such/config.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }
}
