//! The parallel risk filter: which active handlers transitively reach
//! both a source and a sink.

use super::registry::FunctionRegistry;
use super::risk::RiskInfo;
use super::visit::visit_instructions;
use crate::ir::{FuncId, Instr, Program};
use crate::output::Logger;
use crate::rules::Matcher;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// What the filter phase produced: the risky subset plus any worker
/// failures captured at the pool boundary.
#[derive(Debug, Default)]
pub(crate) struct FilterOutcome {
    /// Handlers reaching both a source and a sink.
    pub risky: Vec<FuncId>,
    /// Panic messages of failed workers; results of the others are kept.
    pub failures: Vec<String>,
}

/// Runs one job per active handler on the rayon pool. Jobs share only the
/// registry's risk map; a panicking job is captured and reported without
/// discarding the rest.
pub(crate) fn filter_risky(
    program: &Program,
    matcher: &Matcher,
    registry: &FunctionRegistry,
    handlers: &[FuncId],
    logger: &Logger,
) -> FilterOutcome {
    let results: Vec<Result<Option<FuncId>, String>> = handlers
        .par_iter()
        .map(|&handler| {
            catch_unwind(AssertUnwindSafe(|| {
                inspect_handler(program, matcher, registry, handler, logger)
            }))
            .map_err(|payload| {
                format!(
                    "worker panicked while filtering {}: {}",
                    program.describe(handler),
                    panic_message(payload.as_ref())
                )
            })
        })
        .collect();

    let mut outcome = FilterOutcome::default();
    for result in results {
        match result {
            Ok(Some(handler)) => outcome.risky.push(handler),
            Ok(None) => {}
            Err(msg) => outcome.failures.push(msg),
        }
    }
    outcome
}

/// Rolls up the handler's reachable sub-graph into a job-local record and
/// reports the handler iff that record is risky.
fn inspect_handler(
    program: &Program,
    matcher: &Matcher,
    registry: &FunctionRegistry,
    handler: FuncId,
    logger: &Logger,
) -> Option<FuncId> {
    let root = Arc::new(RiskInfo::new(handler));
    descend(program, matcher, registry, handler, handler, &root, logger);
    root.uniq();

    if root.risky() {
        Some(handler)
    } else {
        logger.debug(&format!(
            "active no risk handler: {}",
            program.describe(handler)
        ));
        None
    }
}

/// Visits `func`'s instructions under entry `entry`, materializing one
/// memoized [`RiskInfo`] per encountered callee and rolling findings up
/// into `parent`. Stops early once `parent` is risky.
fn descend(
    program: &Program,
    matcher: &Matcher,
    registry: &FunctionRegistry,
    entry: FuncId,
    func: FuncId,
    parent: &Arc<RiskInfo>,
    logger: &Logger,
) {
    let Some(f) = program.func(func) else { return };

    visit_instructions(f, &mut |instr| {
        let Instr::Call {
            callee: Some(callee),
            ..
        } = instr
        else {
            return false;
        };
        let Some(cf) = program.func(*callee) else {
            return false;
        };

        let (risk, _inserted) = match registry.get_risk(*callee) {
            Some(existing) => (existing, false),
            None => {
                let fresh = if matcher.match_source(cf) {
                    RiskInfo::source(*callee)
                } else if matcher.match_sink(cf) {
                    RiskInfo::sink(*callee)
                } else {
                    RiskInfo::new(*callee)
                };
                registry.add_risk(Arc::new(fresh))
            }
        };

        // Descend at most once per (entry, callee): the entry is recorded
        // before descending so call cycles short-circuit here. Source and
        // sink records are born finished and are never descended into. A
        // peer worker may have created the record under a different entry
        // without exploring it under ours, so an unfinished record is
        // re-entered rather than trusted.
        if !risk.done() && risk.record_entry(entry) {
            logger.trace(&format!("descend {} -> {}", f.name, cf.name));
            descend(program, matcher, registry, entry, *callee, &risk, logger);
            risk.finish();
        }

        if risk.is_source() || risk.has_source() {
            parent.add_source(Arc::clone(&risk));
        }
        if risk.is_sink() || risk.has_sink() {
            parent.add_sink(Arc::clone(&risk));
        }
        parent.risky()
    });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}
