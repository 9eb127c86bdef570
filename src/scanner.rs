//! Directory scanning.
//!
//! Produces the ordered list of [`FileEntry`] snapshots the renaming engine
//! works on. Scanning supports:
//! - Extension filtering (case-insensitive, leading dot optional)
//! - Recursive walks
//! - Hidden-file exclusion
//! - Glob exclusion patterns
//! - Re-sorting by name, path, extension, size or modification date

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ConfigError;

/// Immutable snapshot of a file selected for renaming.
///
/// Taken at scan time; it goes stale if the file is changed externally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file when it was scanned.
    pub original_path: PathBuf,
    /// Directory containing the file.
    pub directory: PathBuf,
    /// File name without its extension.
    pub base_name: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
}

impl FileEntry {
    /// Builds an entry from a file path, splitting off the last extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulk_rename::scanner::FileEntry;
    /// use std::path::Path;
    ///
    /// let entry = FileEntry::from_path(Path::new("/photos/beach.tar.gz"));
    /// assert_eq!(entry.base_name, "beach.tar");
    /// assert_eq!(entry.extension, ".gz");
    /// ```
    pub fn from_path(path: &Path) -> Self {
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self {
            original_path: path.to_path_buf(),
            directory,
            base_name,
            extension,
        }
    }

    /// Returns the full file name (base name plus extension).
    pub fn file_name(&self) -> String {
        format!("{}{}", self.base_name, self.extension)
    }
}

/// Sort criteria for a scanned file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    #[default]
    Path,
    Extension,
    Size,
    Date,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "path" => Ok(Self::Path),
            "extension" | "ext" => Ok(Self::Extension),
            "size" => Ok(Self::Size),
            "date" => Ok(Self::Date),
            other => Err(format!(
                "unknown sort key '{}' (expected name, path, extension, size or date)",
                other
            )),
        }
    }
}

/// Options controlling which files a scan selects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Extensions to include. Empty selects every file.
    pub extensions: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Include files whose name starts with a dot.
    pub include_hidden: bool,
    /// Glob patterns of paths to leave out.
    pub exclude: Vec<String>,
    /// Order of the resulting list.
    pub sort: SortKey,
    /// Reverse the sort order.
    pub reverse: bool,
}

impl ScanOptions {
    /// Parses a comma-separated extension list such as `".jpg, png"`.
    pub fn parse_extensions(list: &str) -> Vec<String> {
        list.split(',')
            .map(str::trim)
            .filter(|ext| !ext.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Compiled form of [`ScanOptions`] used while walking a directory.
struct ScanFilter {
    extensions: Vec<String>,
    include_hidden: bool,
    exclude: Vec<Pattern>,
}

impl ScanFilter {
    fn new(options: &ScanOptions) -> Result<Self, ConfigError> {
        let exclude = options
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            extensions: options
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            include_hidden: options.include_hidden,
            exclude,
        })
    }

    fn matches(&self, root: &Path, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        if !self.extensions.is_empty() {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !self.extensions.contains(&ext) {
                return false;
            }
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        !self
            .exclude
            .iter()
            .any(|pattern| pattern.matches_path(relative) || pattern.matches_path(path))
    }
}

/// Scans `directory` for files matching `options`.
///
/// The directory is made absolute first so every entry carries an absolute
/// path. Unreadable subdirectories in a recursive walk are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or an exclusion glob is
/// invalid.
pub fn scan(directory: &Path, options: &ScanOptions) -> Result<Vec<FileEntry>, ConfigError> {
    let root = std::path::absolute(directory).map_err(|e| ConfigError::IoError(e.to_string()))?;
    if !root.is_dir() {
        return Err(ConfigError::IoError(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let filter = ScanFilter::new(options)?;
    let mut paths = Vec::new();

    if options.recursive {
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && filter.matches(&root, entry.path()) {
                paths.push(entry.into_path());
            }
        }
    } else {
        let entries = fs::read_dir(&root)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", root.display(), e)))?;
        for entry in entries.flatten() {
            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                let path = entry.path();
                if filter.matches(&root, &path) {
                    paths.push(path);
                }
            }
        }
    }

    paths.sort();
    let mut files: Vec<FileEntry> = paths.iter().map(|p| FileEntry::from_path(p)).collect();

    if options.sort != SortKey::Path || options.reverse {
        sort_entries(&mut files, options.sort, options.reverse);
    }

    log::info!("Scanned {} files from {}", files.len(), root.display());
    Ok(files)
}

/// Sorts entries in place. The sort is stable, so ties keep path order.
pub fn sort_entries(files: &mut [FileEntry], key: SortKey, reverse: bool) {
    match key {
        SortKey::Name => files.sort_by(|a, b| a.base_name.cmp(&b.base_name)),
        SortKey::Path => files.sort_by(|a, b| a.original_path.cmp(&b.original_path)),
        SortKey::Extension => files.sort_by(|a, b| a.extension.cmp(&b.extension)),
        SortKey::Size => files.sort_by_key(|f| {
            fs::metadata(&f.original_path)
                .map(|m| m.len())
                .unwrap_or(0)
        }),
        SortKey::Date => files.sort_by_key(|f| {
            fs::metadata(&f.original_path)
                .and_then(|m| m.modified())
                .ok()
        }),
    }

    if reverse {
        files.reverse();
    }
}
