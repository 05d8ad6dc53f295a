//! Core library for the `sinkhound` static analysis tool.
//!
//! Sinkhound triages server codebases for injection-style risk: given an
//! SSA-form IR dump of a program, it finds the framework request handlers
//! that are actually registered and reachable from the program's entries,
//! then keeps the ones whose transitive call graphs touch both an
//! attacker-controlled input source and a dangerous sink. The output is a
//! review list, not a proof; dataflow through individual values is out of
//! scope.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// The analysis engine: orchestrator, registry, risk records and the
/// call-graph passes.
pub mod analyzer;

/// Command-line interface definition.
pub mod cli;

/// Engine configuration: modes and rule files.
pub mod config;

/// The SSA-style IR model, its JSON loader and the programmatic builder.
pub mod ir;

/// Logger, spinner and result tables.
pub mod output;

/// Signature rules and the role matcher.
pub mod rules;

pub use analyzer::{AnalysisReport, AnalyzeError, Analyzer, CancelToken};
pub use config::{AnalyzerConfig, Mode};

use std::path::Path;

/// Analyzes the program dump at `path` with a default-configured engine.
/// Convenience over [`Analyzer`]; construct one explicitly to set modes,
/// rules or a cancel token.
pub fn analyze(path: &Path) -> Result<AnalysisReport, AnalyzeError> {
    Analyzer::new(AnalyzerConfig::default())?.analyze_path(path)
}
