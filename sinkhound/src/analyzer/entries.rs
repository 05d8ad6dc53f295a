//! Entry discovery: `main` and per-package `init` functions across the
//! reachable package DAG.

use crate::ir::{FuncId, Member, Package, Program};
use crate::output::Logger;
use crate::rules::Matcher;
use rustc_hash::FxHashMap;

/// Gathers entry functions for every main package (package name `main`, or
/// the entry override path). `main` entries come before `init` entries so
/// `main` is processed first; each dependency package is visited at most
/// once across the whole program. An empty result is a valid outcome.
pub(crate) fn collect_entries(
    program: &Program,
    matcher: &Matcher,
    entry: Option<&str>,
    logger: &Logger,
) -> Vec<FuncId> {
    let mut dependencies: FxHashMap<&str, Option<&Package>> = FxHashMap::default();
    let mut main_pkgs = Vec::new();

    for pkg in program.packages() {
        if pkg.name == "main" || entry.is_some_and(|e| e == pkg.path) {
            logger.info(&format!("find main package path: {}", pkg.path));
            main_pkgs.push(pkg);
        } else {
            dependencies.insert(pkg.path.as_str(), Some(pkg));
        }
    }

    let mut entries = Vec::new();
    for main in main_pkgs {
        entries.extend(collect_main_and_init(
            program,
            matcher,
            main,
            &mut dependencies,
            logger,
        ));
    }
    entries
}

fn collect_main_and_init<'p>(
    program: &'p Program,
    matcher: &Matcher,
    pkg: &'p Package,
    dependencies: &mut FxHashMap<&'p str, Option<&'p Package>>,
    logger: &Logger,
) -> Vec<FuncId> {
    logger.trace(&format!(
        "collecting main and init functions in package {}",
        pkg.path
    ));

    let mut funcs = Vec::new();
    for member in &pkg.members {
        let Member::Function { func } = member else {
            continue;
        };
        // ignore non-function members and body-less functions
        let Some(f) = program.func(*func) else {
            continue;
        };
        if f.is_external() {
            continue;
        }

        if matcher.match_init(f) {
            funcs.push(*func);
        } else if matcher.match_main(f) {
            funcs.insert(0, *func);
        }
    }

    for import in &pkg.imports {
        match dependencies.get_mut(import.as_str()) {
            None => logger.warn(&format!("dependence package {import} not found")),
            Some(slot) => {
                // mark as visited by taking the package out of the slot
                let Some(dep) = slot.take() else { continue };
                funcs.extend(collect_main_and_init(
                    program,
                    matcher,
                    dep,
                    dependencies,
                    logger,
                ));
            }
        }
    }
    funcs
}
