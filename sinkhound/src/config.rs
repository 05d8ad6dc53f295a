//! Engine configuration: work modes and signature rules.

use crate::output::LogLevel;
use crate::rules::{builtin, RuleError, SigRule};
use serde::Deserialize;
use std::fs;
use std::ops::{BitOr, BitOrAssign};
use std::path::Path;

/// Analyzer work modes, combinable as a bitset. Modes are additive and no
/// combination is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode(u32);

impl Mode {
    /// No mode set.
    pub const NONE: Mode = Mode(0);
    /// Raise log verbosity to debug and print per-category function
    /// listings after analysis.
    pub const DEBUG: Mode = Mode(1);
    /// Trace-level logging of the call-graph walks.
    pub const TRACE_LOG: Mode = Mode(1 << 1);
    /// Build the program from all packages in the dump instead of only the
    /// main packages and their transitive imports.
    pub const ULTIMATE: Mode = Mode(1 << 2);

    /// Whether any of `other`'s bits are set.
    #[must_use]
    pub fn contains(self, other: Mode) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Mode {
    type Output = Mode;

    fn bitor(self, rhs: Mode) -> Mode {
        Mode(self.0 | rhs.0)
    }
}

impl BitOrAssign for Mode {
    fn bitor_assign(&mut self, rhs: Mode) {
        self.0 |= rhs.0;
    }
}

/// Engine configuration. The default carries the builtin rule set and no
/// modes; everything is adjustable through the `with_*` builders.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Active work modes.
    pub mode: Mode,
    /// Entry package override: the named package path is treated as a main
    /// package regardless of its package name.
    pub entry: Option<String>,
    /// Handler signature rules.
    pub handler_rules: Vec<SigRule>,
    /// Source signature rules.
    pub source_rules: Vec<SigRule>,
    /// Sink signature rules.
    pub sink_rules: Vec<SigRule>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::NONE,
            entry: None,
            handler_rules: builtin::handler_rules(),
            source_rules: builtin::source_rules(),
            sink_rules: builtin::sink_rules(),
        }
    }
}

impl AnalyzerConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds work modes.
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode |= mode;
        self
    }

    /// Sets the entry package override.
    #[must_use]
    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    /// Replaces builtin rule lists with the non-empty lists of a rule file.
    #[must_use]
    pub fn with_rules(mut self, rules: RuleFile) -> Self {
        if !rules.handlers.is_empty() {
            self.handler_rules = rules.handlers;
        }
        if !rules.sources.is_empty() {
            self.source_rules = rules.sources;
        }
        if !rules.sinks.is_empty() {
            self.sink_rules = rules.sinks;
        }
        self
    }

    /// Whether any of `mode`'s bits are active.
    #[must_use]
    pub fn check_mode(&self, mode: Mode) -> bool {
        self.mode.contains(mode)
    }

    /// Log level implied by the active modes.
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        if self.check_mode(Mode::TRACE_LOG) {
            LogLevel::Trace
        } else if self.check_mode(Mode::DEBUG) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// A TOML rule file. Lists left empty keep the builtin rules for that role.
///
/// ```toml
/// [[handlers]]
/// frame = "hertz"
/// params = ["^context\\.Context$", "^\\*[\\w./]*app\\.RequestContext$"]
/// results = []
///
/// [[sinks]]
/// frame = "diy"
/// name = "^SQLInject$"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleFile {
    /// Handler rules.
    #[serde(default)]
    pub handlers: Vec<SigRule>,
    /// Source rules.
    #[serde(default)]
    pub sources: Vec<SigRule>,
    /// Sink rules.
    #[serde(default)]
    pub sinks: Vec<SigRule>,
}

impl RuleFile {
    /// Reads a rule file from disk.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let text = fs::read_to_string(path).map_err(|source| RuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| RuleError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}
