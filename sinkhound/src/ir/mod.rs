//! SSA-style intermediate representation consumed by the analysis engine.
//!
//! The engine never builds IR from source itself; a frontend produces it
//! (the reference interchange form is JSON, see [`loader`]) or a caller
//! assembles it programmatically with [`builder::ProgramBuilder`]. Functions
//! live in a single arena inside [`Program`] and are referenced everywhere
//! by [`FuncId`], which is the map key for all analysis state.

pub mod builder;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a function inside a [`Program`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FuncId(pub u32);

impl FuncId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A whole program: its package DAG plus the function arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// All packages of the build, in load order.
    #[serde(default)]
    pub packages: Vec<Package>,
    /// Function arena; `FuncId(n)` is the function at index `n`.
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Program {
    /// All packages of the program.
    #[must_use]
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Looks up a function by id. Returns `None` for a dangling id; callers
    /// in the analysis skip such instructions rather than fail.
    #[must_use]
    pub fn func(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    /// The function arena.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Ids of every function in the arena.
    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> + '_ {
        (0..self.functions.len()).map(|i| FuncId(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// Renders `(pkg).Name(params) (results)` for log lines and tables.
    #[must_use]
    pub fn describe(&self, id: FuncId) -> String {
        match self.func(id) {
            Some(f) => format!("({}).{}{}", f.package, f.name, f.sig),
            None => format!("<unknown {id}>"),
        }
    }

    /// Debug dump of a function body, one instruction per line.
    #[must_use]
    pub fn dump_function(&self, id: FuncId) -> String {
        let Some(f) = self.func(id) else {
            return format!("<unknown {id}>");
        };
        let mut out = format!("func ({}).{}{}:\n", f.package, f.name, f.sig);
        match &f.blocks {
            None => out.push_str("  <external>\n"),
            Some(blocks) => {
                for (i, block) in blocks.iter().enumerate() {
                    out.push_str(&format!("  b{i}:\n"));
                    for instr in &block.instrs {
                        out.push_str(&format!("    {instr:?}\n"));
                    }
                }
            }
        }
        out
    }
}

/// A package: name, import path, imported package paths, and members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Package name (`main` marks an entry package).
    pub name: String,
    /// Unique import path.
    pub path: String,
    /// Import paths of direct dependencies.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Package-level members; only functions matter to the analysis.
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A package-level member. Non-function members are carried so a frontend
/// can dump its full member table; discovery skips them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Member {
    /// A function in the arena.
    Function {
        /// Arena id of the member function.
        func: FuncId,
    },
    /// A package-level variable.
    Global {
        /// Member name.
        name: String,
    },
    /// A named type.
    Type {
        /// Member name.
        name: String,
    },
}

/// A single function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    /// Unqualified function name.
    pub name: String,
    /// Import path of the owning package.
    pub package: String,
    /// Stringified-type signature.
    #[serde(default)]
    pub sig: Signature,
    /// Basic blocks in declaration order; `None` marks an external function
    /// with no body.
    #[serde(default)]
    pub blocks: Option<Vec<Block>>,
}

impl Function {
    /// Whether the function has no body (declared but defined elsewhere).
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.blocks.is_none()
    }
}

/// Signature as ordered stringified types. Receiver is `None` for free
/// functions; matching treats that as the empty string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signature {
    /// Receiver type, e.g. `*app.RequestContext`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    /// Parameter types in order.
    #[serde(default)]
    pub params: Vec<String>,
    /// Result types in order.
    #[serde(default)]
    pub results: Vec<String>,
}

impl Signature {
    /// Builds a signature from parameter and result type lists.
    pub fn new<P, R>(params: P, results: R) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            receiver: None,
            params: params.into_iter().map(Into::into).collect(),
            results: results.into_iter().map(Into::into).collect(),
        }
    }

    /// Attaches a receiver type.
    #[must_use]
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Receiver type string, empty for free functions.
    #[must_use]
    pub fn receiver_or_empty(&self) -> &str {
        self.receiver.as_deref().unwrap_or("")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.params.join(", "))?;
        if !self.results.is_empty() {
            write!(f, " ({})", self.results.join(", "))?;
        }
        Ok(())
    }
}

/// A basic block: instructions in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Instructions of the block.
    #[serde(default)]
    pub instrs: Vec<Instr>,
}

impl Block {
    /// Builds a block from instructions.
    #[must_use]
    pub fn new(instrs: Vec<Instr>) -> Self {
        Self { instrs }
    }
}

/// An instruction. Only the shapes the analysis interprets are modeled;
/// everything else a frontend emits collapses to `Opaque`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instr {
    /// A call site. `callee` is the statically resolved target, `None` when
    /// the target is dynamic (interface dispatch, function value).
    Call {
        /// Statically known callee, if any.
        #[serde(default)]
        callee: Option<FuncId>,
        /// Call arguments in order.
        #[serde(default)]
        args: Vec<Operand>,
    },
    /// A value cast.
    ChangeType {
        /// The converted value.
        value: Operand,
    },
    /// A store through a pointer.
    Store {
        /// The stored value.
        value: Operand,
    },
    /// A slice operation.
    Slice {
        /// The sliced value.
        value: Operand,
    },
    /// Any instruction the analysis does not interpret.
    Opaque,
}

impl Instr {
    /// Shorthand for a call with a static callee and no interesting args.
    #[must_use]
    pub fn call(callee: FuncId) -> Self {
        Instr::Call {
            callee: Some(callee),
            args: Vec::new(),
        }
    }

    /// Shorthand for a call with arguments.
    #[must_use]
    pub fn call_with_args(callee: FuncId, args: Vec<Operand>) -> Self {
        Instr::Call {
            callee: Some(callee),
            args,
        }
    }

    /// Resolves a function value wrapped by this instruction: a cast of a
    /// function, or a store whose stored value is one. Calls resolve
    /// through their arguments instead, and other shapes yield nothing.
    #[must_use]
    pub fn wrapped_function(&self) -> Option<FuncId> {
        match self {
            Instr::ChangeType { value } | Instr::Store { value } => value.as_function(),
            _ => None,
        }
    }
}

/// An instruction operand, as much of the value tree as the analysis needs:
/// function references and cast wrappers around them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// A direct function reference.
    Func {
        /// Arena id of the referenced function.
        func: FuncId,
    },
    /// A cast wrapping another operand.
    Cast {
        /// The wrapped operand.
        value: Box<Operand>,
    },
    /// Any other value.
    Opaque,
}

impl Operand {
    /// A function reference operand.
    #[must_use]
    pub fn func(id: FuncId) -> Self {
        Operand::Func { func: id }
    }

    /// A function reference wrapped in a cast, the shape a registration
    /// call like `router.GET(path, handler)` produces.
    #[must_use]
    pub fn cast_func(id: FuncId) -> Self {
        Operand::Cast {
            value: Box::new(Operand::Func { func: id }),
        }
    }

    /// Unwraps cast chains down to the underlying function, if any.
    #[must_use]
    pub fn as_function(&self) -> Option<FuncId> {
        match self {
            Operand::Func { func } => Some(*func),
            Operand::Cast { value } => value.as_function(),
            Operand::Opaque => None,
        }
    }
}
