//! Rename plan computation.
//!
//! A plan maps every scanned file to its proposed new path and flags any
//! entry that must not be executed: invalid names, two files mapping to the
//! same target, or a target that already exists on disk. Problems are
//! recorded per entry, never raised, so the caller can show all of them at
//! once. Collisions are never auto-resolved.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{CompiledConfig, NamingMode, RenameConfig};
use crate::date_format::{self, DateError};
use crate::error::RenameResult;
use crate::pattern::{TokenValues, render_pattern};
use crate::scanner::FileEntry;
use crate::validator::InvalidName;

/// Whether a plan entry may be executed, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Ok,
    /// Another file already exists at the proposed path.
    CollisionWithExisting,
    /// Another entry of this plan proposes the same path.
    CollisionWithinBatch,
    InvalidName(InvalidName),
    /// The source could not be inspected while building its name.
    SourceUnreadable(String),
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::CollisionWithExisting => write!(f, "collision with existing file"),
            Self::CollisionWithinBatch => write!(f, "collision within batch"),
            Self::InvalidName(reason) => write!(f, "invalid name: {}", reason),
            Self::SourceUnreadable(reason) => write!(f, "source unreadable: {}", reason),
        }
    }
}

/// One file's proposed rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlanEntry {
    pub source: FileEntry,
    pub proposed_path: PathBuf,
    /// Sequence number assigned to this entry (start value + scan index).
    pub sequence_number: u64,
    /// True when the requested date source was unavailable and the
    /// modification time was used instead.
    pub date_fallback: bool,
    pub status: EntryStatus,
}

impl RenamePlanEntry {
    pub fn is_ok(&self) -> bool {
        self.status == EntryStatus::Ok
    }

    /// True when the proposed path is the file's current path.
    pub fn is_unchanged(&self) -> bool {
        self.proposed_path == self.source.original_path
    }

    /// The proposed file name, for display.
    pub fn proposed_name(&self) -> String {
        self.proposed_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Counts of plan entries by status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub total: usize,
    pub ok: usize,
    pub unchanged: usize,
    pub collision_with_existing: usize,
    pub collision_within_batch: usize,
    pub invalid_name: usize,
    pub source_unreadable: usize,
    pub date_fallbacks: usize,
}

/// The full proposed mapping for a batch, in scan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    entries: Vec<RenamePlanEntry>,
}

impl RenamePlan {
    pub fn new(entries: Vec<RenamePlanEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RenamePlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every entry has status `ok`.
    pub fn is_executable(&self) -> bool {
        self.entries.iter().all(RenamePlanEntry::is_ok)
    }

    /// Source paths of the entries that block execution.
    pub fn blocked(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_ok())
            .map(|entry| entry.source.original_path.clone())
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            total: self.entries.len(),
            ..Default::default()
        };

        for entry in &self.entries {
            match entry.status {
                EntryStatus::Ok if entry.is_unchanged() => summary.unchanged += 1,
                EntryStatus::Ok => summary.ok += 1,
                EntryStatus::CollisionWithExisting => summary.collision_with_existing += 1,
                EntryStatus::CollisionWithinBatch => summary.collision_within_batch += 1,
                EntryStatus::InvalidName(_) => summary.invalid_name += 1,
                EntryStatus::SourceUnreadable(_) => summary.source_unreadable += 1,
            }
            if entry.date_fallback {
                summary.date_fallbacks += 1;
            }
        }

        summary
    }
}

/// Computes the rename plan for `files` under `config`.
///
/// Entries keep scan order; the sequence number of the entry at index `i`
/// is `numbering.start + i`. The result depends only on the inputs and the
/// current filesystem state, so repeated calls return identical plans.
///
/// # Errors
///
/// Only a malformed configuration is an error; it is rejected before any
/// file is inspected.
///
/// # Examples
///
/// ```no_run
/// use bulk_rename::config::RenameConfig;
/// use bulk_rename::plan::compute_plan;
/// use bulk_rename::scanner::{scan, ScanOptions};
/// use std::path::Path;
///
/// let files = scan(Path::new("/photos"), &ScanOptions::default()).unwrap();
/// let config = RenameConfig {
///     prefix: "IMG_".to_string(),
///     ..Default::default()
/// };
/// let plan = compute_plan(&files, &config).unwrap();
/// for entry in plan.entries() {
///     println!("{} -> {}", entry.source.file_name(), entry.proposed_name());
/// }
/// ```
pub fn compute_plan(files: &[FileEntry], config: &RenameConfig) -> RenameResult<RenamePlan> {
    let compiled = config.compile()?;
    let start = u64::from(config.numbering.start);

    let mut entries = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let sequence_number = start + index as u64;
        entries.push(plan_entry(file, sequence_number, &compiled)?);
    }

    flag_batch_collisions(&mut entries);
    flag_existing_collisions(&mut entries);

    let plan = RenamePlan::new(entries);
    log::debug!("Computed plan: {:?}", plan.summary());
    Ok(plan)
}

fn plan_entry(
    file: &FileEntry,
    sequence_number: u64,
    compiled: &CompiledConfig,
) -> RenameResult<RenamePlanEntry> {
    let mut entry = RenamePlanEntry {
        source: file.clone(),
        proposed_path: file.original_path.clone(),
        sequence_number,
        date_fallback: false,
        status: EntryStatus::Ok,
    };

    // Names are rebuilt from UTF-8 text; a lossy rebuild would rename the
    // file even when no rule applies.
    if file.original_path.file_name().and_then(OsStr::to_str).is_none() {
        log::warn!(
            "Skipping {}: name is not valid UTF-8",
            file.original_path.display()
        );
        entry.status = EntryStatus::InvalidName(InvalidName::NotUtf8);
        return Ok(entry);
    }

    let (base_name, date_fallback) = match synthesize_name(file, sequence_number, compiled) {
        Ok(result) => result,
        Err(DateError::Format(e)) => return Err(e),
        Err(DateError::Unreadable(e)) => {
            entry.status = EntryStatus::SourceUnreadable(e.to_string());
            return Ok(entry);
        }
    };

    entry.date_fallback = date_fallback;
    entry.proposed_path = file
        .directory
        .join(format!("{}{}", base_name, file.extension));

    if let Err(reason) = compiled
        .validator
        .validate_in(&file.directory, &base_name, &file.extension)
    {
        entry.status = EntryStatus::InvalidName(reason);
    }

    Ok(entry)
}

/// Builds the new base name for one file. Returns the name and whether the
/// date came from a fallback source.
fn synthesize_name(
    file: &FileEntry,
    sequence_number: u64,
    compiled: &CompiledConfig,
) -> Result<(String, bool), DateError> {
    let config = &compiled.config;

    let date = if config.needs_date() {
        Some(date_format::format_date(
            file,
            config.date.source,
            &config.date.format,
        )?)
    } else {
        None
    };
    let date_fallback = date.as_ref().is_some_and(|d| d.fallback);
    let date_text = date.map(|d| d.text).unwrap_or_default();

    let name = match &config.mode {
        NamingMode::Discrete => {
            let mut name = compiled.replace(&format!(
                "{}{}{}",
                config.prefix, file.base_name, config.suffix
            ));
            if config.date.enabled && !date_text.is_empty() {
                name = format!("{}_{}", name, date_text);
            }
            if config.numbering.enabled {
                name = format!("{}_{}", name, compiled.format_number(sequence_number));
            }
            name
        }
        NamingMode::Pattern { pattern, separator } => {
            let values = TokenValues {
                prefix: config.prefix.clone(),
                name: compiled.replace(&file.base_name),
                suffix: config.suffix.clone(),
                num: compiled.format_number(sequence_number),
                date: date_text,
            };
            render_pattern(pattern.elements(), separator, &values)
        }
    };

    Ok((name, date_fallback))
}

/// Flags every entry whose proposed path is shared with another entry.
fn flag_batch_collisions(entries: &mut [RenamePlanEntry]) {
    let mut counts: HashMap<PathBuf, usize> = HashMap::new();
    for entry in entries.iter().filter(|e| e.is_ok()) {
        *counts.entry(entry.proposed_path.clone()).or_insert(0) += 1;
    }

    for entry in entries.iter_mut().filter(|e| e.is_ok()) {
        if counts.get(&entry.proposed_path).copied().unwrap_or(0) > 1 {
            entry.status = EntryStatus::CollisionWithinBatch;
        }
    }
}

/// Flags entries whose target is occupied by a file other than the source.
///
/// A target held by another entry of the same batch counts as occupied even
/// if that entry would move away first, so shifting renames such as
/// `1.txt -> 2.txt, 2.txt -> 3.txt` are blocked.
fn flag_existing_collisions(entries: &mut [RenamePlanEntry]) {
    for entry in entries.iter_mut().filter(|e| e.is_ok() && !e.is_unchanged()) {
        if target_occupied(&entry.proposed_path, &entry.source.original_path) {
            entry.status = EntryStatus::CollisionWithExisting;
        }
    }
}

/// True when something other than `source` sits at `target`.
pub(crate) fn target_occupied(target: &Path, source: &Path) -> bool {
    if fs::symlink_metadata(target).is_err() {
        return false;
    }
    // A case-only rename on a case-insensitive filesystem finds the source
    // itself at the target path.
    match (fs::canonicalize(target), fs::canonicalize(source)) {
        (Ok(t), Ok(s)) => t != s,
        _ => true,
    }
}
