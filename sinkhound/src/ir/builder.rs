//! Programmatic IR construction.
//!
//! Frontends embedding the engine (and the crate's own tests) assemble
//! programs with [`ProgramBuilder`] instead of going through JSON.

use super::{Block, FuncId, Function, Member, Package, Program, Signature};
use rustc_hash::FxHashMap;

/// Incrementally builds a [`Program`].
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    packages: Vec<Package>,
    functions: Vec<Function>,
    by_path: FxHashMap<String, usize>,
}

impl ProgramBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package. Import edges reference other packages by path; they
    /// may be added in any order.
    ///
    /// # Panics
    ///
    /// Panics if a package with the same path was already added.
    pub fn add_package(&mut self, name: &str, path: &str, imports: &[&str]) -> &mut Self {
        assert!(
            !self.by_path.contains_key(path),
            "duplicate package path {path}"
        );
        self.by_path.insert(path.to_owned(), self.packages.len());
        self.packages.push(Package {
            name: name.to_owned(),
            path: path.to_owned(),
            imports: imports.iter().map(|&i| i.to_owned()).collect(),
            members: Vec::new(),
        });
        self
    }

    /// Adds a function with an empty body to `pkg_path` and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `pkg_path` is unknown.
    pub fn add_function(&mut self, pkg_path: &str, name: &str, sig: Signature) -> FuncId {
        self.insert_function(pkg_path, name, sig, Some(Vec::new()))
    }

    /// Adds an external (body-less) function and returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `pkg_path` is unknown.
    pub fn add_external_function(&mut self, pkg_path: &str, name: &str, sig: Signature) -> FuncId {
        self.insert_function(pkg_path, name, sig, None)
    }

    /// Adds a non-function member to a package.
    ///
    /// # Panics
    ///
    /// Panics if `pkg_path` is unknown.
    pub fn add_global(&mut self, pkg_path: &str, name: &str) -> &mut Self {
        let pkg = self.package_mut(pkg_path);
        pkg.members.push(Member::Global {
            name: name.to_owned(),
        });
        self
    }

    /// Replaces the body of `func` with the given blocks.
    ///
    /// # Panics
    ///
    /// Panics if `func` is not an id returned by this builder.
    pub fn set_body(&mut self, func: FuncId, blocks: Vec<Block>) -> &mut Self {
        let f = self
            .functions
            .get_mut(func.0 as usize)
            .unwrap_or_else(|| panic!("unknown function {func}"));
        f.blocks = Some(blocks);
        self
    }

    /// Convenience for the common one-block body.
    ///
    /// # Panics
    ///
    /// Panics if `func` is not an id returned by this builder.
    pub fn set_instrs(&mut self, func: FuncId, instrs: Vec<super::Instr>) -> &mut Self {
        self.set_body(func, vec![Block::new(instrs)])
    }

    /// Finishes building.
    #[must_use]
    pub fn build(self) -> Program {
        Program {
            packages: self.packages,
            functions: self.functions,
        }
    }

    fn insert_function(
        &mut self,
        pkg_path: &str,
        name: &str,
        sig: Signature,
        blocks: Option<Vec<Block>>,
    ) -> FuncId {
        let id = FuncId(u32::try_from(self.functions.len()).unwrap_or_else(|_| {
            panic!("function arena overflow");
        }));
        self.functions.push(Function {
            name: name.to_owned(),
            package: pkg_path.to_owned(),
            sig,
            blocks,
        });
        self.package_mut(pkg_path)
            .members
            .push(Member::Function { func: id });
        id
    }

    fn package_mut(&mut self, pkg_path: &str) -> &mut Package {
        let idx = *self
            .by_path
            .get(pkg_path)
            .unwrap_or_else(|| panic!("unknown package {pkg_path}"));
        &mut self.packages[idx]
    }
}
