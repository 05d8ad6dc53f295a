//! Taint-chain reconstruction over risky handlers.
//!
//! Chain reporting itself lives outside the discovery engine; the walk
//! here only surfaces the handlers it would start from.

use crate::config::{AnalyzerConfig, Mode};
use crate::ir::{FuncId, Program};
use crate::output::Logger;
use std::time::Instant;

/// A call chain from a handler towards a sink.
#[derive(Debug, Clone)]
pub struct Chain {
    funcs: Vec<FuncId>,
}

impl Chain {
    /// Builds a chain, handler first.
    #[must_use]
    pub fn new(funcs: Vec<FuncId>) -> Self {
        Self { funcs }
    }

    /// The chain's functions, handler first.
    #[must_use]
    pub fn funcs(&self) -> &[FuncId] {
        &self.funcs
    }

    /// Renders the chain as `a -> b -> c`.
    #[must_use]
    pub fn output(&self, program: &Program) -> String {
        self.funcs
            .iter()
            .map(|&id| program.describe(id))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Walks the risky handlers ahead of chain reporting.
// TODO: reconstruct the source-to-sink call chains instead of only
// surfacing the handlers.
pub(crate) fn walk_chains(
    program: &Program,
    config: &AnalyzerConfig,
    logger: &Logger,
    risky: &[FuncId],
) -> Vec<Chain> {
    logger.info("walk risky handlers...");
    let started = Instant::now();

    if config.check_mode(Mode::DEBUG) {
        for &handler in risky {
            logger.debug(&program.dump_function(handler));
        }
    }

    logger.info(&format!(
        "walk risky handlers cost: {:?}",
        started.elapsed()
    ));
    Vec::new()
}
