//! bulk-rename - A batch file renaming engine
//!
//! This library computes safe, collision-checked rename plans from a set of
//! rules (prefix, suffix, numbering, find/replace, date insertion or a token
//! pattern), previews them, applies them with logging, and undoes the most
//! recent batch.

pub mod cli;
pub mod config;
pub mod date_format;
pub mod error;
pub mod executor;
pub mod output;
pub mod pattern;
pub mod plan;
pub mod rename_log;
pub mod scanner;
pub mod validator;

pub use config::{ConfigError, NamingMode, RenameConfig, Settings};
pub use date_format::DateSource;
pub use error::{RenameError, RenameResult};
pub use executor::{ApplyResult, Executor, UndoRecord, UndoResult};
pub use pattern::{Pattern, PatternElement};
pub use plan::{EntryStatus, RenamePlan, RenamePlanEntry, compute_plan};
pub use rename_log::RenameLog;
pub use scanner::{FileEntry, ScanOptions, scan};
pub use validator::{InvalidName, NameValidator};

pub use cli::{Cli, Command, run_cli};
