//! Compilation of formulas into decision diagrams.

use std::collections::HashMap;

use crate::abstraction::Abstraction;
use crate::backend::DiagramBackend;
use crate::error::{Result, TddError};
use crate::formula::{Formula, Kind};

/// Memoized walk from formulas to diagram nodes.
///
/// The memo is keyed by sub-formula and survives across calls, so compiling
/// the formula and then its lemmas shares every common sub-formula.
pub struct Compiler<'a, B: DiagramBackend> {
    backend: &'a B,
    abstraction: &'a Abstraction,
    memo: HashMap<Formula, B::Node>,
}

impl<'a, B: DiagramBackend> Compiler<'a, B> {
    pub fn new(backend: &'a B, abstraction: &'a Abstraction) -> Self {
        Self {
            backend,
            abstraction,
            memo: HashMap::new(),
        }
    }

    /// Number of distinct sub-formulas compiled so far.
    pub fn memo_size(&self) -> usize {
        self.memo.len()
    }

    pub fn compile(&mut self, formula: &Formula) -> Result<B::Node> {
        if let Some(&node) = self.memo.get(formula) {
            return Ok(node);
        }

        let backend = self.backend;
        let node = match formula.kind() {
            Kind::True => backend.constant(true),
            Kind::False => backend.constant(false),
            Kind::Atom(atom) => {
                let prop = self
                    .abstraction
                    .prop(atom)
                    .ok_or_else(|| TddError::MissingAbstraction(atom.clone()))?;
                backend.var(prop)
            }
            Kind::Not(f) => {
                let f = self.compile(f)?;
                backend.negate(f)
            }
            Kind::And(args) => {
                let mut res = backend.constant(true);
                for arg in args {
                    let f = self.compile(arg)?;
                    res = backend.conjoin(res, f);
                }
                res
            }
            Kind::Or(args) => {
                let mut res = backend.constant(false);
                for arg in args {
                    let f = self.compile(arg)?;
                    res = backend.disjoin(res, f);
                }
                res
            }
            Kind::Implies(a, b) => {
                let a = self.compile(a)?;
                let b = self.compile(b)?;
                backend.implies(a, b)
            }
            Kind::Iff(a, b) => {
                let a = self.compile(a)?;
                let b = self.compile(b)?;
                backend.equiv(a, b)
            }
        };

        self.memo.insert(formula.clone(), node);
        Ok(node)
    }
}
