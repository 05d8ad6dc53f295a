//! Loading and validating serialized IR dumps.
//!
//! The interchange form is the JSON serialization of [`Program`]. A dump is
//! either a single `.json` file or a directory containing [`PROGRAM_FILE`].

use super::{FuncId, Instr, Member, Operand, Program};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// File name probed when the load path is a directory.
pub const PROGRAM_FILE: &str = "program.json";

/// Errors surfaced while obtaining a program. All of them are fatal; the
/// orchestrator aborts before any analysis phase runs.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The dump could not be read from disk.
    #[error("failed to read IR dump {}: {source}", path.display())]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The dump is not valid program JSON.
    #[error("failed to parse IR dump {}: {source}", path.display())]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The dump parsed but references functions outside the arena or
    /// declares the same package path twice.
    #[error("invalid IR: {0}")]
    Invalid(String),
}

/// Reads and validates a program dump.
pub fn load_program(path: &Path) -> Result<Program, LoadError> {
    let file = if path.is_dir() {
        path.join(PROGRAM_FILE)
    } else {
        path.to_path_buf()
    };
    let text = fs::read_to_string(&file).map_err(|source| LoadError::Io {
        path: file.clone(),
        source,
    })?;
    let program: Program = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: file,
        source,
    })?;
    validate(&program)?;
    Ok(program)
}

/// Structural validation: every `FuncId` in members, call sites and operands
/// must resolve into the arena, and package paths must be unique.
pub fn validate(program: &Program) -> Result<(), LoadError> {
    let mut paths = FxHashSet::default();
    for pkg in program.packages() {
        if !paths.insert(pkg.path.as_str()) {
            return Err(LoadError::Invalid(format!(
                "duplicate package path {}",
                pkg.path
            )));
        }
        for member in &pkg.members {
            if let Member::Function { func } = member {
                check_id(program, *func, &pkg.path)?;
            }
        }
    }
    for (i, f) in program.functions().iter().enumerate() {
        let Some(blocks) = &f.blocks else { continue };
        for block in blocks {
            for instr in &block.instrs {
                let at = || format!("function #{i} ({})", f.name);
                match instr {
                    Instr::Call { callee, args } => {
                        if let Some(c) = callee {
                            check_id(program, *c, &at())?;
                        }
                        for arg in args {
                            check_operand(program, arg, &at())?;
                        }
                    }
                    Instr::ChangeType { value }
                    | Instr::Store { value }
                    | Instr::Slice { value } => check_operand(program, value, &at())?,
                    Instr::Opaque => {}
                }
            }
        }
    }
    Ok(())
}

/// Drops packages unreachable from the main packages (or the overridden
/// entry package) via import edges. This is the default build variant; the
/// Ultimate mode keeps the dump as-is. The function arena is left intact so
/// ids stay stable.
#[must_use]
pub fn restrict_to_initial(mut program: Program, entry: Option<&str>) -> Program {
    let by_path: FxHashMap<&str, usize> = program
        .packages
        .iter()
        .enumerate()
        .map(|(i, p)| (p.path.as_str(), i))
        .collect();

    let mut keep = FxHashSet::default();
    let mut queue: VecDeque<usize> = program
        .packages
        .iter()
        .enumerate()
        .filter(|(_, p)| p.name == "main" || entry.is_some_and(|e| e == p.path))
        .map(|(i, _)| i)
        .collect();
    keep.extend(queue.iter().copied());

    while let Some(idx) = queue.pop_front() {
        for import in &program.packages[idx].imports {
            if let Some(&dep) = by_path.get(import.as_str()) {
                if keep.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }
    }

    let mut idx = 0;
    program.packages.retain(|_| {
        let kept = keep.contains(&idx);
        idx += 1;
        kept
    });
    program
}

fn check_id(program: &Program, id: FuncId, at: &str) -> Result<(), LoadError> {
    if program.func(id).is_none() {
        return Err(LoadError::Invalid(format!(
            "dangling function id {id} referenced from {at}"
        )));
    }
    Ok(())
}

fn check_operand(program: &Program, operand: &Operand, at: &str) -> Result<(), LoadError> {
    match operand {
        Operand::Func { func } => check_id(program, *func, at),
        Operand::Cast { value } => check_operand(program, value, at),
        Operand::Opaque => Ok(()),
    }
}
