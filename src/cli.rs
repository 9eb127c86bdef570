//! Command-line interface module for bulk-rename.
//!
//! This module handles all CLI-related functionality including:
//! - Command definitions and flag parsing
//! - Merging flags over the settings file
//! - Preview, apply and undo orchestration
//! - Persisting the undo record between runs

use crate::config::{NamingMode, RenameConfig, Settings};
use crate::date_format::DateSource;
use crate::executor::{Executor, UndoRecord};
use crate::output::OutputFormatter;
use crate::pattern::Pattern;
use crate::plan::{RenamePlan, compute_plan};
use crate::rename_log::{LOG_FILENAME, RenameLog};
use crate::scanner::{FileEntry, ScanOptions, SortKey, scan};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bulk-rename")]
#[command(version)]
#[command(about = "Rename batches of files by prefix, suffix, numbering, find/replace, date or pattern")]
pub struct Cli {
    /// Increase verbosity (-v=INFO, -vv=DEBUG, -vvv=TRACE)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file (default: .bulkrenamerc.toml, then ~/.config/bulk-rename/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Rename log file (default: rename.log in the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Do not write the rename log
    #[arg(long, global = true)]
    pub no_log: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Represents a CLI command to execute.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the proposed new names without changing anything
    Preview(RenameArgs),
    /// Rename the files
    Apply(RenameArgs),
    /// Revert the most recent apply in a directory
    Undo {
        /// Directory the apply ran in
        dir: PathBuf,
    },
}

/// Directory, scan filters and rename rules shared by preview and apply.
///
/// Every rule flag overrides the matching settings-file value.
#[derive(Args, Debug, Clone, Default)]
pub struct RenameArgs {
    /// Directory holding the files to rename
    pub dir: PathBuf,

    /// Text added before the name
    #[arg(long)]
    pub prefix: Option<String>,

    /// Text added after the name
    #[arg(long)]
    pub suffix: Option<String>,

    /// Append a sequence number
    #[arg(short = 'n', long)]
    pub number: bool,

    /// First sequence number
    #[arg(long, value_name = "N")]
    pub start: Option<u32>,

    /// Zero-pad sequence numbers to this many digits
    #[arg(long, value_name = "DIGITS")]
    pub pad: Option<usize>,

    /// Text to find in the name
    #[arg(long)]
    pub find: Option<String>,

    /// Replacement for the found text
    #[arg(long)]
    pub replace: Option<String>,

    /// Match the find text case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Append a date taken from: creation, modification or exif
    #[arg(long, value_name = "SOURCE")]
    pub date: Option<DateSource>,

    /// strftime-style date format, e.g. %Y%m%d
    #[arg(long, value_name = "FORMAT")]
    pub date_format: Option<String>,

    /// Build names from a template such as "{date}{prefix}{name}{num}"
    #[arg(long, value_name = "TEMPLATE")]
    pub pattern: Option<String>,

    /// Separator placed between pattern tokens
    #[arg(long)]
    pub separator: Option<String>,

    /// Comma-separated extensions to include, e.g. "jpg,png"
    #[arg(long, value_name = "LIST")]
    pub ext: Option<String>,

    /// Include files in subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Include hidden files
    #[arg(long)]
    pub hidden: bool,

    /// Glob pattern of files to leave out (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Order files by: name, path, extension, size or date
    #[arg(long, value_name = "KEY")]
    pub sort: Option<SortKey>,

    /// Reverse the sort order
    #[arg(long)]
    pub reverse: bool,
}

impl RenameArgs {
    /// Creates arguments for `dir` with no overrides.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Applies the flags on top of `settings`.
    pub fn merge_into(&self, settings: &mut Settings) -> Result<(), String> {
        merge_scan(self, &mut settings.scan);
        merge_rename(self, &mut settings.rename)
    }
}

fn merge_scan(args: &RenameArgs, scan: &mut ScanOptions) {
    if let Some(ext) = &args.ext {
        scan.extensions = ScanOptions::parse_extensions(ext);
    }
    if args.recursive {
        scan.recursive = true;
    }
    if args.hidden {
        scan.include_hidden = true;
    }
    scan.exclude.extend(args.exclude.iter().cloned());
    if let Some(sort) = args.sort {
        scan.sort = sort;
    }
    if args.reverse {
        scan.reverse = true;
    }
}

fn merge_rename(args: &RenameArgs, config: &mut RenameConfig) -> Result<(), String> {
    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(suffix) = &args.suffix {
        config.suffix = suffix.clone();
    }

    if args.number {
        config.numbering.enabled = true;
    }
    if let Some(start) = args.start {
        config.numbering.start = start;
    }
    if let Some(pad) = args.pad {
        config.numbering.padding = pad;
    }

    if let Some(find) = &args.find {
        config.find_replace.find = find.clone();
    }
    if let Some(replace) = &args.replace {
        config.find_replace.replace = replace.clone();
    }
    if args.ignore_case {
        config.find_replace.case_sensitive = false;
    }

    if let Some(source) = args.date {
        config.date.enabled = true;
        config.date.source = source;
    }
    if let Some(format) = &args.date_format {
        config.date.format = format.clone();
    }

    if let Some(template) = &args.pattern {
        let pattern: Pattern = template
            .parse()
            .map_err(|e| format!("Invalid pattern '{}': {}", template, e))?;
        let separator = match &config.mode {
            NamingMode::Pattern { separator, .. } => separator.clone(),
            NamingMode::Discrete => crate::config::DEFAULT_SEPARATOR.to_string(),
        };
        config.mode = NamingMode::Pattern { pattern, separator };
    }
    if let Some(new_separator) = &args.separator {
        match &mut config.mode {
            NamingMode::Pattern { separator, .. } => *separator = new_separator.clone(),
            NamingMode::Discrete => {
                return Err("--separator only applies with --pattern".to_string());
            }
        }
    }

    Ok(())
}

/// Runs the CLI application with the parsed command line.
///
/// # Examples
///
/// ```no_run
/// use bulk_rename::cli::{Cli, run_cli};
/// use clap::Parser;
///
/// let cli = Cli::parse_from(["bulk-rename", "preview", "/photos", "--prefix", "IMG_", "-n"]);
/// match run_cli(&cli) {
///     Ok(()) => println!("Operation completed successfully"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<(), String> {
    let log = if cli.no_log {
        RenameLog::disabled()
    } else {
        RenameLog::new(
            cli.log_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(LOG_FILENAME)),
        )
    };

    match &cli.command {
        Command::Preview(args) => preview_renames(args, cli.config.as_deref(), log),
        Command::Apply(args) => apply_renames(args, cli.config.as_deref(), log),
        Command::Undo { dir } => undo_renames(dir, log),
    }
}

/// Shows what `apply` would do. No file is renamed.
pub fn preview_renames(
    args: &RenameArgs,
    config_path: Option<&Path>,
    log: RenameLog,
) -> Result<(), String> {
    let (settings, files) = load_files(args, config_path, &log)?;
    if files.is_empty() {
        OutputFormatter::info("No files found to rename.");
        return Ok(());
    }

    let executor = Executor::new(log);
    let plan = executor
        .preview(&files, &settings.rename)
        .map_err(|e| e.to_string())?;

    OutputFormatter::preview_notice(&format!(
        "{} files in {}",
        files.len(),
        args.dir.display()
    ));
    show_plan(&plan);

    if plan.is_executable() {
        OutputFormatter::success("Preview complete. No files were modified.");
    } else {
        OutputFormatter::warning("Some entries are blocked; adjust the rules before applying.");
    }
    Ok(())
}

/// Computes the plan, renames the files and saves the undo record.
pub fn apply_renames(
    args: &RenameArgs,
    config_path: Option<&Path>,
    log: RenameLog,
) -> Result<(), String> {
    let (settings, files) = load_files(args, config_path, &log)?;
    if files.is_empty() {
        OutputFormatter::info("No files found to rename.");
        return Ok(());
    }

    let plan = compute_plan(&files, &settings.rename).map_err(|e| e.to_string())?;
    show_plan(&plan);
    if !plan.is_executable() {
        return Err(crate::error::RenameError::PlanNotExecutable {
            blocked: plan.blocked(),
        }
        .to_string());
    }

    let mut executor = Executor::new(log);
    let pb = OutputFormatter::create_progress_bar(plan.len() as u64);
    let result = executor
        .apply_with_progress(&plan, |done, _| pb.set_position(done as u64))
        .map_err(|e| e.to_string())?;
    pb.finish_and_clear();

    OutputFormatter::apply_report(&result);

    if !result.succeeded.is_empty()
        && let Some(record) = executor.undo_record()
    {
        let undo_dir = undo_dir(&args.dir)?;
        match record.save(&undo_dir) {
            Ok(()) => OutputFormatter::plain(&format!(
                "Use 'bulk-rename undo {}' to revert.",
                args.dir.display()
            )),
            Err(e) => OutputFormatter::warning(&format!("Undo will not be available: {}", e)),
        }
    }

    match result.failed {
        Some(e) => Err(e.to_string()),
        None => Ok(()),
    }
}

/// Reverts the apply recorded in `dir`.
pub fn undo_renames(dir: &Path, log: RenameLog) -> Result<(), String> {
    let undo_dir = undo_dir(dir)?;
    let record = UndoRecord::load(&undo_dir)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| crate::error::RenameError::NoUndoAvailable.to_string())?;

    OutputFormatter::info(&format!(
        "Undoing {} renames applied at {}",
        record.len(),
        record.timestamp
    ));

    let mut executor = Executor::new(log).with_undo_record(record);
    let result = executor.undo().map_err(|e| e.to_string());

    // The record no longer describes what can be recovered.
    if let Err(e) = UndoRecord::delete(&undo_dir) {
        OutputFormatter::warning(&e.to_string());
    }

    let result = result?;
    OutputFormatter::undo_report(&result);
    if result.is_complete() {
        Ok(())
    } else {
        Err(format!("{} files could not be restored", result.failed.len()))
    }
}

/// Loads settings, applies the flags and scans the directory.
///
/// The rename log and the undo record are never offered for renaming.
fn load_files(
    args: &RenameArgs,
    config_path: Option<&Path>,
    log: &RenameLog,
) -> Result<(Settings, Vec<FileEntry>), String> {
    let mut settings =
        Settings::load(config_path).map_err(|e| format!("Error loading configuration: {}", e))?;
    args.merge_into(&mut settings)?;

    let mut files = scan(&args.dir, &settings.scan)
        .map_err(|e| format!("Error scanning {}: {}", args.dir.display(), e))?;

    let mut reserved = vec![UndoRecord::file_path(&undo_dir(&args.dir)?)];
    if let Some(path) = log.path()
        && let Ok(path) = std::path::absolute(path)
    {
        reserved.push(path);
    }
    files.retain(|file| !reserved.contains(&file.original_path));

    log::info!("{} files selected in {}", files.len(), args.dir.display());
    Ok((settings, files))
}

fn undo_dir(dir: &Path) -> Result<PathBuf, String> {
    std::path::absolute(dir).map_err(|e| format!("Invalid directory {}: {}", dir.display(), e))
}

fn show_plan(plan: &RenamePlan) {
    OutputFormatter::header("RENAME PLAN");
    OutputFormatter::plan_table(plan);
    OutputFormatter::plan_summary(&plan.summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("Failed to parse arguments")
    }

    #[test]
    fn test_parse_apply_flags() {
        let cli = parse(&[
            "bulk-rename",
            "apply",
            "photos",
            "--prefix",
            "IMG_",
            "-n",
            "--pad",
            "4",
            "--date",
            "exif",
            "-vv",
        ]);

        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply command");
        };
        assert_eq!(args.dir, PathBuf::from("photos"));
        assert_eq!(args.prefix.as_deref(), Some("IMG_"));
        assert!(args.number);
        assert_eq!(args.pad, Some(4));
        assert_eq!(args.date, Some(DateSource::Exif));
    }

    #[test]
    fn test_invalid_date_source_rejected() {
        assert!(Cli::try_parse_from(["bulk-rename", "preview", ".", "--date", "never"]).is_err());
    }

    #[test]
    fn test_merge_overrides_settings() {
        let mut settings = Settings::from_toml(
            r#"
            [scan]
            extensions = ["png"]

            [rename]
            prefix = "old_"

            [rename.numbering]
            padding = 2
            "#,
        )
        .expect("Failed to parse settings");

        let args = RenameArgs {
            prefix: Some("new_".to_string()),
            number: true,
            ext: Some("jpg, .jpeg".to_string()),
            sort: Some(SortKey::Size),
            ..RenameArgs::new(".")
        };
        args.merge_into(&mut settings).expect("Merge failed");

        assert_eq!(settings.rename.prefix, "new_");
        assert!(settings.rename.numbering.enabled);
        assert_eq!(settings.rename.numbering.padding, 2);
        assert_eq!(settings.scan.extensions, vec!["jpg", ".jpeg"]);
        assert_eq!(settings.scan.sort, SortKey::Size);
    }

    #[test]
    fn test_pattern_flag_selects_pattern_mode() {
        let mut settings = Settings::default();
        let args = RenameArgs {
            pattern: Some("{date}{name}".to_string()),
            separator: Some("-".to_string()),
            ..RenameArgs::new(".")
        };
        args.merge_into(&mut settings).expect("Merge failed");

        let NamingMode::Pattern { pattern, separator } = &settings.rename.mode else {
            panic!("expected pattern mode");
        };
        assert_eq!(pattern.to_string(), "{date}{name}");
        assert_eq!(separator, "-");
    }

    #[test]
    fn test_separator_without_pattern_rejected() {
        let mut settings = Settings::default();
        let args = RenameArgs {
            separator: Some("-".to_string()),
            ..RenameArgs::new(".")
        };
        assert!(args.merge_into(&mut settings).is_err());
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let mut settings = Settings::default();
        let args = RenameArgs {
            pattern: Some("{name}{bogus}".to_string()),
            ..RenameArgs::new(".")
        };
        assert!(args.merge_into(&mut settings).is_err());
    }
}
