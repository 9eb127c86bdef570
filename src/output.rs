//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output: colored status
//! messages, the rename plan table, the apply progress bar and the result
//! summaries.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::executor::{ApplyResult, UndoResult};
use crate::plan::{EntryStatus, PlanSummary, RenamePlan};

/// Manages all CLI output with consistent styling and formatting.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bulk_rename::output::OutputFormatter;
    /// OutputFormatter::success("Renamed 12 files");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for apply.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of plan entries to process
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bulk_rename::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.set_position(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// Prints a preview notice.
    pub fn preview_notice(message: &str) {
        println!("{}", format!("[PREVIEW] {}", message).yellow());
    }

    /// Prints every plan entry as `old -> new`, marking the blocked ones.
    pub fn plan_table(plan: &RenamePlan) {
        let width = plan
            .entries()
            .iter()
            .map(|entry| entry.source.file_name().chars().count())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "  {:<width$}   {}",
            "Original".bold(),
            "New name".bold(),
            width = width
        );
        println!("  {}", "-".repeat(width + 20));

        for entry in plan.entries() {
            let original = entry.source.file_name();
            let proposed = entry.proposed_name();
            let marker = if entry.date_fallback { " *" } else { "" };

            match &entry.status {
                EntryStatus::Ok if entry.is_unchanged() => println!(
                    "  {:<width$} = {}",
                    original,
                    "(unchanged)".dimmed(),
                    width = width
                ),
                EntryStatus::Ok => println!(
                    "  {:<width$} → {}{}",
                    original,
                    proposed.green(),
                    marker,
                    width = width
                ),
                status => println!(
                    "  {:<width$} → {} {}",
                    original,
                    proposed.red(),
                    format!("[{}]", status).red(),
                    width = width
                ),
            }
        }
    }

    /// Prints plan counts by status.
    pub fn plan_summary(summary: &PlanSummary) {
        Self::header("SUMMARY");
        println!("  Files:        {}", summary.total);
        println!("  To rename:    {}", summary.ok.to_string().green());
        if summary.unchanged > 0 {
            println!("  Unchanged:    {}", summary.unchanged);
        }

        let problems = [
            ("Existing file collisions", summary.collision_with_existing),
            ("Batch collisions", summary.collision_within_batch),
            ("Invalid names", summary.invalid_name),
            ("Unreadable sources", summary.source_unreadable),
        ];
        for (label, count) in problems {
            if count > 0 {
                println!("  {}: {}", label, count.to_string().red());
            }
        }

        if summary.date_fallbacks > 0 {
            println!(
                "  * {} {} used modification time because the requested date was unavailable",
                summary.date_fallbacks,
                if summary.date_fallbacks == 1 { "file" } else { "files" }
            );
        }
    }

    /// Prints the outcome of an apply.
    pub fn apply_report(result: &ApplyResult) {
        let renamed = result.succeeded.len();
        Self::success(&format!(
            "Renamed {} {}",
            renamed,
            if renamed == 1 { "file" } else { "files" }
        ));
        if !result.unchanged.is_empty() {
            Self::plain(&format!("  Unchanged: {}", result.unchanged.len()));
        }

        if let Some(error) = &result.failed {
            Self::error(&error.to_string());
            Self::warning(&format!(
                "Stopped after the failure; {} not attempted",
                result.not_attempted.len()
            ));
            for path in &result.not_attempted {
                Self::plain(&format!("    - {}", path.display()));
            }
        }
    }

    /// Prints the outcome of an undo.
    pub fn undo_report(result: &UndoResult) {
        Self::success(&format!("Restored {} files", result.restored.len()));
        if !result.is_complete() {
            Self::warning(&format!("{} files could not be restored:", result.failed.len()));
            for error in &result.failed {
                Self::plain(&format!("    - {}", error));
            }
        }
    }
}
