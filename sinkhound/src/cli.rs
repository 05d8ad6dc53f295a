//! Command-line interface definition.

use crate::config::Mode;
use clap::{Args, Parser};
use std::path::PathBuf;

/// Help text describing the rule-file format, shown at the bottom of --help.
const RULES_HELP: &str = "\
RULE FILE (TOML):
  Each [[handlers]] / [[sources]] / [[sinks]] entry is a signature rule;
  non-empty lists replace the builtin rules for that role.

  [[handlers]]
  frame = \"hertz\"
  params = [\"^context\\\\.Context$\", \"^\\\\*[\\\\w./]*app\\\\.RequestContext$\"]
  results = []

  [[sinks]]
  frame = \"diy\"
  name = \"^SQLInject$\"
";

/// Work-mode flags. Modes are additive.
#[derive(Args, Debug, Default, Clone)]
pub struct ModeOptions {
    /// Raise log verbosity and print per-category function listings.
    #[arg(long)]
    pub debug: bool,

    /// Trace-level logging of the call-graph walks.
    #[arg(long)]
    pub trace: bool,

    /// Build the program from all packages in the dump, not just the main
    /// packages and their imports.
    #[arg(long)]
    pub ultimate: bool,
}

impl ModeOptions {
    /// Folds the flags into a [`Mode`] bitset.
    #[must_use]
    pub fn mode(&self) -> Mode {
        let mut mode = Mode::NONE;
        if self.debug {
            mode |= Mode::DEBUG;
        }
        if self.trace {
            mode |= Mode::TRACE_LOG;
        }
        if self.ultimate {
            mode |= Mode::ULTIMATE;
        }
        mode
    }
}

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = RULES_HELP)]
pub struct Cli {
    /// IR dump to analyze: a JSON file, or a directory containing
    /// program.json.
    #[arg(long, value_name = "PATH")]
    pub path: PathBuf,

    /// Entry package override; the named package path is treated as a main
    /// package.
    #[arg(long, value_name = "PKG")]
    pub entry: Option<String>,

    /// Rule file overriding the builtin signature rules.
    #[arg(long, value_name = "FILE")]
    pub rules: Option<PathBuf>,

    /// Work-mode flags.
    #[command(flatten)]
    pub modes: ModeOptions,
}
