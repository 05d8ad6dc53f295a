//! Signature rules and the function-role matcher.
//!
//! A rule is a set of regular expressions over a function's stringified
//! signature: receiver type, name, parameter types and result types. Rules
//! classify IR functions into roles; `main` and `init` are reserved names
//! and never rule-driven.

pub mod builtin;

use crate::ir::Function;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reserved name of the program entry function.
pub const MAIN_FUNC: &str = "main";
/// Reserved name of package initializer functions.
pub const INIT_FUNC: &str = "init";

/// The role a function plays in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A package initializer.
    Init,
    /// The program entry function.
    Main,
    /// A framework request handler.
    Handler,
    /// A function returning attacker-controlled input.
    Source,
    /// A function whose argument is security-sensitive.
    Sink,
}

impl Role {
    /// Lowercase label used in logs and listings.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::Init => "init",
            Role::Main => "main",
            Role::Handler => "handler",
            Role::Source => "source",
            Role::Sink => "sink",
        }
    }
}

/// A signature rule as configured. Empty or absent patterns leave that
/// field unconstrained; `params`/`results` match element-by-element and a
/// length mismatch is a non-match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigRule {
    /// Framework the rule belongs to (informational, kept for listings).
    pub frame: String,
    /// Pattern over the receiver type; matched against `""` for free
    /// functions.
    #[serde(default)]
    pub receiver: Option<String>,
    /// Pattern over the function name.
    #[serde(default)]
    pub name: Option<String>,
    /// Per-element patterns over the parameter type list.
    #[serde(default)]
    pub params: Option<Vec<String>>,
    /// Per-element patterns over the result type list.
    #[serde(default)]
    pub results: Option<Vec<String>>,
}

/// Errors raised while loading rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A configured pattern failed to compile.
    #[error("rule for frame `{frame}`: invalid pattern `{pattern}`: {source}")]
    Pattern {
        /// Frame of the offending rule.
        frame: String,
        /// The pattern that failed to compile.
        pattern: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },
    /// A rule file could not be read.
    #[error("failed to read rule file {}: {source}", path.display())]
    Read {
        /// Path of the rule file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A rule file is not valid TOML.
    #[error("failed to parse rule file {}: {source}", path.display())]
    Parse {
        /// Path of the rule file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// A [`SigRule`] with every pattern compiled exactly once, at matcher init.
#[derive(Debug)]
pub struct CompiledSig {
    frame: String,
    receiver: Option<Regex>,
    name: Option<Regex>,
    params: Option<Vec<Regex>>,
    results: Option<Vec<Regex>>,
}

impl CompiledSig {
    fn compile(rule: &SigRule) -> Result<Self, RuleError> {
        Ok(Self {
            frame: rule.frame.clone(),
            receiver: compile_one(&rule.frame, rule.receiver.as_deref())?,
            name: compile_one(&rule.frame, rule.name.as_deref())?,
            params: compile_list(&rule.frame, rule.params.as_deref())?,
            results: compile_list(&rule.frame, rule.results.as_deref())?,
        })
    }

    /// Framework the rule belongs to.
    #[must_use]
    pub fn frame(&self) -> &str {
        &self.frame
    }

    /// Whether every constrained field of the rule matches `f`.
    #[must_use]
    pub fn matches(&self, f: &Function) -> bool {
        if let Some(re) = &self.receiver {
            if !re.is_match(f.sig.receiver_or_empty()) {
                return false;
            }
        }
        if let Some(re) = &self.name {
            if !re.is_match(&f.name) {
                return false;
            }
        }
        if !match_list(self.params.as_deref(), &f.sig.params) {
            return false;
        }
        match_list(self.results.as_deref(), &f.sig.results)
    }
}

fn compile_one(frame: &str, pattern: Option<&str>) -> Result<Option<Regex>, RuleError> {
    match pattern {
        None | Some("") => Ok(None),
        Some(p) => Regex::new(p).map(Some).map_err(|source| RuleError::Pattern {
            frame: frame.to_owned(),
            pattern: p.to_owned(),
            source,
        }),
    }
}

fn compile_list(frame: &str, patterns: Option<&[String]>) -> Result<Option<Vec<Regex>>, RuleError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    let mut out = Vec::with_capacity(patterns.len());
    for p in patterns {
        out.push(Regex::new(p).map_err(|source| RuleError::Pattern {
            frame: frame.to_owned(),
            pattern: p.clone(),
            source,
        })?);
    }
    Ok(Some(out))
}

fn match_list(patterns: Option<&[Regex]>, types: &[String]) -> bool {
    let Some(patterns) = patterns else {
        return true;
    };
    patterns.len() == types.len()
        && patterns
            .iter()
            .zip(types)
            .all(|(re, ty)| re.is_match(ty))
}

/// Classifies IR functions against three compiled rule lists.
#[derive(Debug)]
pub struct Matcher {
    handler_sigs: Vec<CompiledSig>,
    source_sigs: Vec<CompiledSig>,
    sink_sigs: Vec<CompiledSig>,
}

impl Matcher {
    /// Compiles three independent rule lists. A compile failure on any
    /// pattern aborts loading and identifies the offending rule.
    pub fn load_rules(
        handlers: &[SigRule],
        sources: &[SigRule],
        sinks: &[SigRule],
    ) -> Result<Self, RuleError> {
        let compile = |rules: &[SigRule]| {
            rules
                .iter()
                .map(CompiledSig::compile)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            handler_sigs: compile(handlers)?,
            source_sigs: compile(sources)?,
            sink_sigs: compile(sinks)?,
        })
    }

    /// Whether `f` is the program entry function.
    #[must_use]
    pub fn match_main(&self, f: &Function) -> bool {
        f.name == MAIN_FUNC
    }

    /// Whether `f` is a package initializer.
    #[must_use]
    pub fn match_init(&self, f: &Function) -> bool {
        f.name == INIT_FUNC
    }

    /// Whether any handler rule matches `f`. The reserved names `main` and
    /// `init` never classify as handlers.
    #[must_use]
    pub fn match_handler(&self, f: &Function) -> bool {
        !self.is_reserved(f) && self.handler_sigs.iter().any(|sig| sig.matches(f))
    }

    /// Whether any source rule matches `f`.
    #[must_use]
    pub fn match_source(&self, f: &Function) -> bool {
        !self.is_reserved(f) && self.source_sigs.iter().any(|sig| sig.matches(f))
    }

    /// Whether any sink rule matches `f`.
    #[must_use]
    pub fn match_sink(&self, f: &Function) -> bool {
        !self.is_reserved(f) && self.sink_sigs.iter().any(|sig| sig.matches(f))
    }

    /// First role that classifies `f`, tested in the order
    /// Main, Init, Handler, Source, Sink.
    #[must_use]
    pub fn classify(&self, f: &Function) -> Option<Role> {
        if self.match_main(f) {
            Some(Role::Main)
        } else if self.match_init(f) {
            Some(Role::Init)
        } else if self.match_handler(f) {
            Some(Role::Handler)
        } else if self.match_source(f) {
            Some(Role::Source)
        } else if self.match_sink(f) {
            Some(Role::Sink)
        } else {
            None
        }
    }

    fn is_reserved(&self, f: &Function) -> bool {
        f.name == MAIN_FUNC || f.name == INIT_FUNC
    }
}
