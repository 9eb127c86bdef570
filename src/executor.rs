/// Apply and undo execution for rename plans.
///
/// The executor owns the rename log and the single undo slot. Applying a
/// plan renames files one at a time in plan order and stops at the first
/// runtime failure; files renamed before the failure stay renamed and are
/// covered by the new undo record. Undo reverses the most recent batch on a
/// best-effort basis.
use crate::config::RenameConfig;
use crate::error::{RenameError, RenameResult};
use crate::plan::{self, RenamePlan, compute_plan};
use crate::rename_log::{OperationKind, Outcome, RenameLog};
use crate::scanner::FileEntry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name used to persist an undo record between runs.
pub const UNDO_RECORD_FILENAME: &str = ".bulk_rename_undo.json";

/// One applied rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamedPair {
    /// Where the file lives after the rename.
    pub new_path: PathBuf,
    /// Where the file lived before the rename.
    pub original_path: PathBuf,
}

/// The renames performed by the most recent apply, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    /// RFC 3339 timestamp of when the batch was applied.
    pub timestamp: String,
    pub renames: Vec<RenamedPair>,
}

impl Default for UndoRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoRecord {
    pub fn new() -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            renames: Vec::new(),
        }
    }

    pub fn push(&mut self, pair: RenamedPair) {
        self.renames.push(pair);
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// Returns the path of the persisted record for a directory.
    pub fn file_path(directory: &Path) -> PathBuf {
        directory.join(UNDO_RECORD_FILENAME)
    }

    /// Saves this record as JSON inside `directory`.
    pub fn save(&self, directory: &Path) -> RenameResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RenameError::UndoRecordIo(format!("JSON serialization failed: {}", e)))?;

        let path = Self::file_path(directory);
        fs::write(&path, json).map_err(|e| {
            RenameError::UndoRecordIo(format!("Could not write {}: {}", path.display(), e))
        })
    }

    /// Loads the record persisted inside `directory`, if there is one.
    pub fn load(directory: &Path) -> RenameResult<Option<Self>> {
        let path = Self::file_path(directory);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path).map_err(|e| {
            RenameError::UndoRecordIo(format!("Could not read {}: {}", path.display(), e))
        })?;
        let record = serde_json::from_str(&json)
            .map_err(|e| RenameError::UndoRecordIo(format!("JSON parse error: {}", e)))?;

        Ok(Some(record))
    }

    /// Deletes the record persisted inside `directory`.
    pub fn delete(directory: &Path) -> RenameResult<()> {
        let path = Self::file_path(directory);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                RenameError::UndoRecordIo(format!("Could not delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Outcome of applying a plan.
#[derive(Debug, Default)]
pub struct ApplyResult {
    /// Renames that completed, in plan order.
    pub succeeded: Vec<RenamedPair>,
    /// The rename that stopped the batch, if any.
    pub failed: Option<RenameError>,
    /// Sources that were never attempted because of the failure.
    pub not_attempted: Vec<PathBuf>,
    /// Sources whose proposed path equals their current path.
    pub unchanged: Vec<PathBuf>,
}

impl ApplyResult {
    /// Returns true if every entry was renamed or left unchanged.
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

/// Outcome of undoing the most recent batch.
#[derive(Debug, Default)]
pub struct UndoResult {
    /// Files moved back to their original path, in undo order.
    pub restored: Vec<RenamedPair>,
    /// Steps that could not be reversed.
    pub failed: Vec<RenameError>,
}

impl UndoResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs previews, applies and undos, logging every step.
#[derive(Debug)]
pub struct Executor {
    log: RenameLog,
    undo_record: Option<UndoRecord>,
}

impl Executor {
    /// Creates an executor with an empty undo slot.
    pub fn new(log: RenameLog) -> Self {
        Self {
            log,
            undo_record: None,
        }
    }

    /// Seeds the undo slot, typically with a record persisted by an
    /// earlier run.
    pub fn with_undo_record(mut self, record: UndoRecord) -> Self {
        self.undo_record = Some(record);
        self
    }

    pub fn log(&self) -> &RenameLog {
        &self.log
    }

    pub fn undo_record(&self) -> Option<&UndoRecord> {
        self.undo_record.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_record.is_some()
    }

    /// Computes the plan for `files` and logs every proposed rename.
    ///
    /// Nothing on disk changes.
    pub fn preview(&self, files: &[FileEntry], config: &RenameConfig) -> RenameResult<RenamePlan> {
        let plan = compute_plan(files, config)?;

        for entry in plan.entries() {
            let outcome = if entry.is_ok() {
                Outcome::Ok
            } else {
                Outcome::Failed(entry.status.to_string())
            };
            self.log.record(
                OperationKind::Preview,
                &entry.source.original_path,
                &entry.proposed_path,
                &outcome,
            );
        }

        Ok(plan)
    }

    /// Executes `plan`.
    ///
    /// # Errors
    ///
    /// Returns `PlanNotExecutable` without touching the filesystem if any
    /// entry is not `ok`. Runtime rename failures are not errors; they are
    /// reported in the returned [`ApplyResult`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bulk_rename::config::RenameConfig;
    /// use bulk_rename::executor::Executor;
    /// use bulk_rename::rename_log::RenameLog;
    /// use bulk_rename::scanner::{scan, ScanOptions};
    /// use std::path::Path;
    ///
    /// let files = scan(Path::new("/photos"), &ScanOptions::default()).unwrap();
    /// let config = RenameConfig {
    ///     prefix: "IMG_".to_string(),
    ///     ..Default::default()
    /// };
    ///
    /// let mut executor = Executor::new(RenameLog::new("rename.log"));
    /// let plan = executor.preview(&files, &config).unwrap();
    /// let result = executor.apply(&plan).unwrap();
    /// println!("Renamed {} files", result.succeeded.len());
    /// ```
    pub fn apply(&mut self, plan: &RenamePlan) -> RenameResult<ApplyResult> {
        self.apply_with_progress(plan, |_, _| {})
    }

    /// Like [`Executor::apply`], calling `progress(done, total)` after each
    /// entry is processed.
    pub fn apply_with_progress<F>(
        &mut self,
        plan: &RenamePlan,
        mut progress: F,
    ) -> RenameResult<ApplyResult>
    where
        F: FnMut(usize, usize),
    {
        if !plan.is_executable() {
            return Err(RenameError::PlanNotExecutable {
                blocked: plan.blocked(),
            });
        }

        let total = plan.len();
        let mut result = ApplyResult::default();
        let mut record = UndoRecord::new();

        for (index, entry) in plan.entries().iter().enumerate() {
            let source = &entry.source.original_path;
            let target = &entry.proposed_path;

            if result.failed.is_some() {
                result.not_attempted.push(source.clone());
                continue;
            }

            if entry.is_unchanged() {
                result.unchanged.push(source.clone());
                progress(index + 1, total);
                continue;
            }

            match rename_file(source, target) {
                Ok(()) => {
                    self.log
                        .record(OperationKind::Apply, source, target, &Outcome::Ok);
                    let pair = RenamedPair {
                        new_path: target.clone(),
                        original_path: source.clone(),
                    };
                    record.push(pair.clone());
                    result.succeeded.push(pair);
                }
                Err(e) => {
                    self.log.record(
                        OperationKind::Apply,
                        source,
                        target,
                        &Outcome::Failed(e.to_string()),
                    );
                    log::error!(
                        "Rename failed, stopping batch: {} -> {}: {}",
                        source.display(),
                        target.display(),
                        e
                    );
                    result.failed = Some(RenameError::Filesystem {
                        source: source.clone(),
                        target: target.clone(),
                        error: e,
                    });
                }
            }
            progress(index + 1, total);
        }

        if !record.is_empty() {
            self.undo_record = Some(record);
        }

        log::info!(
            "Applied {} renames ({} unchanged, {} not attempted)",
            result.succeeded.len(),
            result.unchanged.len(),
            result.not_attempted.len()
        );
        Ok(result)
    }

    /// Reverses the most recent batch, newest rename first.
    ///
    /// A step that fails is reported and the remaining steps still run. The
    /// undo slot is cleared afterwards whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns `NoUndoAvailable` if the undo slot is empty.
    pub fn undo(&mut self) -> RenameResult<UndoResult> {
        let record = self.undo_record.take().ok_or(RenameError::NoUndoAvailable)?;

        let mut result = UndoResult::default();
        for pair in record.renames.iter().rev() {
            match restore_file(pair) {
                Ok(()) => {
                    self.log.record(
                        OperationKind::Undo,
                        &pair.new_path,
                        &pair.original_path,
                        &Outcome::Ok,
                    );
                    result.restored.push(pair.clone());
                }
                Err(e) => {
                    self.log.record(
                        OperationKind::Undo,
                        &pair.new_path,
                        &pair.original_path,
                        &Outcome::Failed(e.to_string()),
                    );
                    log::warn!(
                        "Could not restore {} to {}: {}",
                        pair.new_path.display(),
                        pair.original_path.display(),
                        e
                    );
                    result.failed.push(RenameError::Filesystem {
                        source: pair.new_path.clone(),
                        target: pair.original_path.clone(),
                        error: e,
                    });
                }
            }
        }

        log::info!(
            "Undo restored {} of {} files",
            result.restored.len(),
            record.len()
        );
        Ok(result)
    }
}

/// Renames `source` to `target`, refusing to replace another file.
///
/// The target is checked immediately before the rename so a file created
/// after the plan was computed is not overwritten.
fn rename_file(source: &Path, target: &Path) -> io::Result<()> {
    if plan::target_occupied(target, source) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "target already exists",
        ));
    }
    fs::rename(source, target)
}

fn restore_file(pair: &RenamedPair) -> io::Result<()> {
    if fs::symlink_metadata(&pair.new_path).is_err() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "file not found at expected location",
        ));
    }
    rename_file(&pair.new_path, &pair.original_path)
}
