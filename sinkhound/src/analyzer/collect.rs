//! Active-handler collection: which registered handlers are actually
//! reached from the entries.

use super::visit::visit_instructions;
use crate::ir::{FuncId, Instr, Program};
use crate::output::Logger;
use crate::rules::Matcher;
use rustc_hash::FxHashSet;

/// Walks the static call graph from each entry and records every handler
/// it finds: callees matching a handler rule, handlers passed as call
/// arguments (possibly behind casts), and handlers stored through wrapper
/// values. Traversal does not descend past a discovered handler; handler
/// bodies are inspected by the risk filter instead.
///
/// The result is de-duplicated; callers must not rely on its order.
pub(crate) fn collect_handlers(
    program: &Program,
    matcher: &Matcher,
    entries: &[FuncId],
    logger: &Logger,
) -> Vec<FuncId> {
    let mut found = Vec::new();
    let mut seen = FxHashSet::default();
    for &entry in entries {
        // per-entry visited set over callees, so call cycles terminate
        let mut visited = FxHashSet::default();
        walk(program, matcher, entry, &mut visited, &mut |h| {
            if seen.insert(h) {
                found.push(h);
            }
        }, logger);
    }
    found
}

fn walk(
    program: &Program,
    matcher: &Matcher,
    func: FuncId,
    visited: &mut FxHashSet<FuncId>,
    record: &mut impl FnMut(FuncId),
    logger: &Logger,
) {
    if !visited.insert(func) {
        return;
    }
    let Some(f) = program.func(func) else { return };

    let mut callees = Vec::new();
    visit_instructions(f, &mut |instr| {
        match instr {
            Instr::Call {
                callee: Some(callee),
                args,
            } => {
                let Some(cf) = program.func(*callee) else {
                    return false;
                };
                logger.trace(&format!("collect handler from {} -> {}", f.name, cf.name));

                if matcher.match_handler(cf) {
                    record(*callee);
                    return false;
                }

                for arg in args {
                    if let Some(g) = arg.as_function() {
                        if program.func(g).is_some_and(|gf| matcher.match_handler(gf)) {
                            record(g);
                        }
                    }
                }
                callees.push(*callee);
            }
            _ => {
                if let Some(g) = instr.wrapped_function() {
                    if program.func(g).is_some_and(|gf| matcher.match_handler(gf)) {
                        record(g);
                    }
                }
            }
        }
        false
    });

    for callee in callees {
        walk(program, matcher, callee, visited, record, logger);
    }
}
