//! Rich CLI output: the leveled logger, the analysis spinner, and the
//! result/diagnostic tables.
//!
//! Log lines go to stderr so stdout stays clean for the report tables.

use crate::analyzer::FunctionRegistry;
use crate::ir::{FuncId, Program};
use crate::rules::Role;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// Log verbosity levels, in increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-instruction walk tracing.
    Trace,
    /// Diagnostic detail.
    Debug,
    /// Phase progress.
    Info,
    /// Recoverable oddities (missing dependency packages and the like).
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    fn tag(self) -> colored::ColoredString {
        match self {
            LogLevel::Trace => "[TRACE]".dimmed(),
            LogLevel::Debug => "[DEBUG]".magenta(),
            LogLevel::Info => "[INFO]".cyan(),
            LogLevel::Warn => "[WARN]".yellow().bold(),
            LogLevel::Error => "[ERROR]".red().bold(),
        }
    }
}

/// Minimal leveled logger; lines below the configured level are dropped.
#[derive(Debug, Clone)]
pub struct Logger {
    level: LogLevel,
}

impl Logger {
    /// Creates a logger that emits `level` and above.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Logs at trace level.
    pub fn trace(&self, msg: &str) {
        self.log(LogLevel::Trace, msg);
    }

    /// Logs at debug level.
    pub fn debug(&self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    /// Logs at info level.
    pub fn info(&self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    /// Logs at warn level.
    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    /// Logs at error level.
    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    fn log(&self, level: LogLevel, msg: &str) {
        if level >= self.level {
            eprintln!("{} {msg}", level.tag());
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

/// Create a spinner for the parallel filtering phase.
///
/// In test mode, returns a hidden progress bar to avoid polluting test output.
#[must_use]
pub fn create_spinner() -> ProgressBar {
    if cfg!(test) {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("filtering risky handlers…");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print the risky-handler table, or a short note when there are none.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_risky_handlers(
    writer: &mut impl Write,
    program: &Program,
    risky: &[FuncId],
) -> std::io::Result<()> {
    if risky.is_empty() {
        return writeln!(writer, "{}", "no risky handlers found".green());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Handler").add_attribute(Attribute::Bold),
            Cell::new("Signature").add_attribute(Attribute::Bold),
        ]);
    for &id in risky {
        if let Some(f) = program.func(id) {
            table.add_row(vec![
                f.package.clone(),
                f.name.clone(),
                f.sig.to_string(),
            ]);
        }
    }
    writeln!(
        writer,
        "{} {}",
        "risky handlers:".red().bold(),
        risky.len()
    )?;
    writeln!(writer, "{table}")
}

/// Print the Debug-mode per-category function listing from the registry
/// buckets: one row per recorded function with its active/risky flags.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_function_listing(
    writer: &mut impl Write,
    program: &Program,
    registry: &FunctionRegistry,
) -> std::io::Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Role").add_attribute(Attribute::Bold),
            Cell::new("Function").add_attribute(Attribute::Bold),
            Cell::new("Active").add_attribute(Attribute::Bold),
            Cell::new("Risky").add_attribute(Attribute::Bold),
        ]);

    for role in [Role::Init, Role::Main, Role::Handler, Role::Source, Role::Sink] {
        let mut rows: Vec<_> = registry.bucket(role).iter().collect();
        rows.sort_by_key(|(id, _)| **id);
        for (id, status) in rows {
            table.add_row(vec![
                role.label().to_owned(),
                program.describe(*id),
                flag(status.active),
                flag(status.risky),
            ]);
        }
    }
    writeln!(writer, "{table}")
}

fn flag(set: bool) -> String {
    if set { "yes".to_owned() } else { "-".to_owned() }
}
