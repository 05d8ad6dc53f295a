//! The analysis engine.
//!
//! [`Analyzer`] sequences the phases over a loaded program: entry
//! discovery, active-handler collection, and the parallel risk filter,
//! with the registry carrying all shared state. Construct one per run; the
//! crate-level [`crate::analyze`] convenience wraps a default instance.

mod chain;
mod collect;
mod entries;
mod filter;
mod registry;
mod risk;
mod visit;

pub use chain::Chain;
pub use registry::{FuncStatus, FunctionRegistry};
pub use risk::{Latch, RiskInfo};
pub use visit::visit_instructions;

use crate::config::{AnalyzerConfig, Mode};
use crate::ir::loader::{self, LoadError};
use crate::ir::{FuncId, Program};
use crate::output::{self, Logger};
use crate::rules::{Matcher, Role, RuleError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Errors surfaced by the engine. Rule and load failures abort before any
/// phase runs; the others are raised at phase boundaries.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// Rule loading failed.
    #[error("load rules fail: {0}")]
    Rules(#[from] RuleError),
    /// The program dump could not be obtained.
    #[error("build program fail: {0}")]
    Load(#[from] LoadError),
    /// The cancel token fired before a phase started.
    #[error("analysis canceled before {phase}")]
    Canceled {
        /// Phase that was about to run.
        phase: &'static str,
    },
    /// One or more filter workers panicked.
    #[error("{count} analysis worker(s) panicked; first: {first}")]
    WorkerPanic {
        /// Number of failed workers.
        count: usize,
        /// Message of the first failure.
        first: String,
    },
}

/// Cooperative cancellation flag, tested at phase boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What one analysis run produced.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Discovered entry functions, `main` entries first.
    pub entries: Vec<FuncId>,
    /// Handlers reached from the entries.
    pub active_handlers: Vec<FuncId>,
    /// Active handlers reaching both a source and a sink.
    pub risky_handlers: Vec<FuncId>,
    /// Captured worker panics; when non-empty the run is partial.
    pub failures: Vec<String>,
}

impl AnalysisReport {
    /// Aggregates captured worker failures into a single error, if any.
    /// The report's other fields remain usable either way.
    #[must_use]
    pub fn aggregate_failure(&self) -> Option<AnalyzeError> {
        let first = self.failures.first()?;
        Some(AnalyzeError::WorkerPanic {
            count: self.failures.len(),
            first: first.clone(),
        })
    }
}

/// The whole-program risky-handler discovery engine.
pub struct Analyzer {
    config: AnalyzerConfig,
    matcher: Matcher,
    registry: FunctionRegistry,
    cancel: CancelToken,
    logger: Logger,
}

impl Analyzer {
    /// Builds an engine from a configuration, compiling its rules once.
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        let matcher = Matcher::load_rules(
            &config.handler_rules,
            &config.source_rules,
            &config.sink_rules,
        )?;
        let logger = Logger::new(config.log_level());
        Ok(Self {
            config,
            matcher,
            registry: FunctionRegistry::new(),
            cancel: CancelToken::new(),
            logger,
        })
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The compiled matcher.
    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// The function registry; populated by [`Analyzer::analyze`].
    #[must_use]
    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// The engine's logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Loads a program dump from `path` and analyzes it. Unless Ultimate
    /// mode is set, the dump is restricted to the main packages and their
    /// transitive imports first.
    pub fn analyze_path(&mut self, path: &Path) -> Result<AnalysisReport, AnalyzeError> {
        self.logger
            .info(&format!("analyzing path {}", path.display()));
        let program = self.build_program(path)?;
        self.analyze(&program)
    }

    /// Loads and prepares a program dump without analyzing it.
    pub fn build_program(&self, path: &Path) -> Result<Program, AnalyzeError> {
        self.logger.info("building program...");
        let started = Instant::now();

        let program = loader::load_program(path)?;
        let program = if self.config.check_mode(Mode::ULTIMATE) {
            program
        } else {
            loader::restrict_to_initial(program, self.config.entry.as_deref())
        };

        self.logger
            .info(&format!("build program cost: {:?}", started.elapsed()));
        Ok(program)
    }

    /// Runs the full pipeline over a prepared program.
    pub fn analyze(&mut self, program: &Program) -> Result<AnalysisReport, AnalyzeError> {
        let started = Instant::now();

        self.ensure_not_canceled("entry discovery")?;
        let entries = self.collect_entries(program);

        self.ensure_not_canceled("handler collection")?;
        let handlers = self.collect_handlers(program, &entries);

        self.ensure_not_canceled("risk filtering")?;
        let outcome = self.filter_risky(program, &handlers);

        if self.config.check_mode(Mode::DEBUG) {
            self.registry.mark_active(Role::Handler, &handlers);
            self.registry.mark_risky(&outcome.risky);
            self.record_matched_functions(program);
        }

        let chains = chain::walk_chains(program, &self.config, &self.logger, &outcome.risky);
        if self.config.check_mode(Mode::DEBUG) {
            for chain in &chains {
                self.logger.debug(&chain.output(program));
            }
        }

        self.logger
            .info(&format!("analyze program cost: {:?}", started.elapsed()));

        Ok(AnalysisReport {
            entries,
            active_handlers: handlers,
            risky_handlers: outcome.risky,
            failures: outcome.failures,
        })
    }

    fn collect_entries(&mut self, program: &Program) -> Vec<FuncId> {
        self.logger.info("collecting entries...");
        let started = Instant::now();

        let entries = entries::collect_entries(
            program,
            &self.matcher,
            self.config.entry.as_deref(),
            &self.logger,
        );

        if self.config.check_mode(Mode::DEBUG) {
            for &entry in &entries {
                let role = program
                    .func(entry)
                    .filter(|f| self.matcher.match_main(f))
                    .map_or(Role::Init, |_| Role::Main);
                self.registry.mark_active(role, &[entry]);
            }
        }

        self.logger
            .info(&format!("collect entries cost: {:?}", started.elapsed()));
        entries
    }

    fn collect_handlers(&mut self, program: &Program, entries: &[FuncId]) -> Vec<FuncId> {
        self.logger.info("collecting handlers...");
        let started = Instant::now();

        let handlers = collect::collect_handlers(program, &self.matcher, entries, &self.logger);
        if handlers.is_empty() {
            self.logger.info("handlers not found");
        }

        self.logger
            .info(&format!("collect handlers cost: {:?}", started.elapsed()));
        handlers
    }

    fn filter_risky(&mut self, program: &Program, handlers: &[FuncId]) -> filter::FilterOutcome {
        self.logger.info("filtering risky handlers...");
        let started = Instant::now();
        let spinner = output::create_spinner();

        let outcome = filter::filter_risky(
            program,
            &self.matcher,
            &self.registry,
            handlers,
            &self.logger,
        );

        spinner.finish_and_clear();
        for failure in &outcome.failures {
            self.logger.error(failure);
        }
        self.logger.info(&format!(
            "filter risky handlers cost: {:?}",
            started.elapsed()
        ));
        outcome
    }

    /// Records every rule-matched function in its role bucket so the Debug
    /// listing also shows handlers that never became active.
    fn record_matched_functions(&mut self, program: &Program) {
        for id in program.func_ids() {
            let Some(f) = program.func(id) else { continue };
            match self.matcher.classify(f) {
                Some(role @ (Role::Handler | Role::Source | Role::Sink)) => {
                    self.registry.record(role, &[id]);
                }
                _ => {}
            }
        }
    }

    fn ensure_not_canceled(&self, phase: &'static str) -> Result<(), AnalyzeError> {
        if self.cancel.is_canceled() {
            return Err(AnalyzeError::Canceled { phase });
        }
        Ok(())
    }
}
