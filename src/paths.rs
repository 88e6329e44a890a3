//! Iterators over satisfying paths and total models of a BDD.
//!
//! A path is a cube of DIMACS-style literals leading to the `1` terminal;
//! variables skipped by the path are don't-cares. Paths of a BDD are pairwise
//! disjoint, so expanding every path over all of its don't-cares enumerates
//! each total model exactly once.
//!
//! # Example
//!
//! ```
//! use theory_dd::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let x = bdd.mk_var(1);
//! let y = bdd.mk_var(2);
//!
//! // x ∨ y has two paths: {x} and {¬x, y}
//! let f = bdd.apply_or(x, y);
//! assert_eq!(bdd.paths(f).count(), 2);
//!
//! // ...but three total models.
//! assert_eq!(bdd.models(f, 2).count(), 3);
//! ```

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Returns an iterator over all paths to the `1` terminal.
    pub fn paths(&self, f: Ref) -> BddPaths<'_> {
        BddPaths::new(self, f)
    }

    /// Returns an iterator over all total assignments to `1..=num_vars`
    /// satisfying `f`.
    ///
    /// Each item is indexed by `variable - 1`.
    pub fn models(&self, f: Ref, num_vars: usize) -> BddModels<'_> {
        BddModels::new(self, f, num_vars)
    }
}

#[derive(Debug, Clone, Copy)]
enum Branch {
    High,
    Low,
}

#[derive(Debug)]
struct StackFrame {
    node: Ref,
    /// Which branch to explore next (`None` when both are done).
    next_branch: Option<Branch>,
}

/// Depth-first iterator over the paths of a BDD.
///
/// The current path is kept in a single vector that grows and shrinks with
/// the traversal.
pub struct BddPaths<'a> {
    bdd: &'a Bdd,
    stack: Vec<StackFrame>,
    current_path: Vec<i32>,
}

impl<'a> BddPaths<'a> {
    pub fn new(bdd: &'a Bdd, f: Ref) -> Self {
        BddPaths {
            bdd,
            stack: vec![StackFrame {
                node: f,
                next_branch: Some(Branch::High),
            }],
            current_path: Vec::new(),
        }
    }

    fn backtrack(&mut self) {
        self.stack.pop();
        if !self.stack.is_empty() {
            self.current_path.pop();
        }
    }
}

impl Iterator for BddPaths<'_> {
    type Item = Vec<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let node = frame.node;

            if self.bdd.is_one(node) {
                let result = self.current_path.clone();
                self.backtrack();
                return Some(result);
            }

            if self.bdd.is_zero(node) {
                self.backtrack();
                continue;
            }

            let var = self.bdd.variable(node.index()) as i32;

            match frame.next_branch {
                Some(Branch::High) => {
                    frame.next_branch = Some(Branch::Low);
                    let high = self.bdd.high_node(node);
                    self.current_path.push(var);
                    self.stack.push(StackFrame {
                        node: high,
                        next_branch: Some(Branch::High),
                    });
                }
                Some(Branch::Low) => {
                    frame.next_branch = None;
                    let low = self.bdd.low_node(node);
                    self.current_path.push(-var);
                    self.stack.push(StackFrame {
                        node: low,
                        next_branch: Some(Branch::High),
                    });
                }
                None => self.backtrack(),
            }
        }
    }
}

/// Iterator over total models of a BDD, expanding the don't-cares of each path.
pub struct BddModels<'a> {
    paths: BddPaths<'a>,
    num_vars: usize,
    /// Assignment for the current path; don't-care positions are overwritten
    /// by the odometer.
    base: Vec<bool>,
    free: Vec<usize>,
    /// Odometer over the free positions (`None` once the current path is exhausted).
    counter: Option<Vec<bool>>,
}

impl<'a> BddModels<'a> {
    pub fn new(bdd: &'a Bdd, f: Ref, num_vars: usize) -> Self {
        BddModels {
            paths: BddPaths::new(bdd, f),
            num_vars,
            base: Vec::new(),
            free: Vec::new(),
            counter: None,
        }
    }

    fn load_path(&mut self, path: &[i32]) {
        let mut fixed = vec![false; self.num_vars];
        self.base = vec![false; self.num_vars];
        for &lit in path {
            let i = lit.unsigned_abs() as usize - 1;
            assert!(i < self.num_vars, "Variable {} is out of range 1..={}", i + 1, self.num_vars);
            fixed[i] = true;
            self.base[i] = lit > 0;
        }
        self.free = (0..self.num_vars).filter(|&i| !fixed[i]).collect();
        self.counter = Some(vec![false; self.free.len()]);
    }
}

impl Iterator for BddModels<'_> {
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(counter) = &mut self.counter {
                let mut model = self.base.clone();
                for (&i, &value) in self.free.iter().zip(counter.iter()) {
                    model[i] = value;
                }

                // Advance the odometer; a full carry means the path is exhausted.
                let mut carry = true;
                for bit in counter.iter_mut() {
                    if !carry {
                        break;
                    }
                    carry = *bit;
                    *bit = !*bit;
                }
                if carry {
                    self.counter = None;
                }

                return Some(model);
            }

            let path = self.paths.next()?;
            self.load_path(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_log::test;

    use super::*;

    #[test]
    fn test_paths_single_cube() {
        let bdd = Bdd::default();
        let f = bdd.apply_and(bdd.apply_and(bdd.mk_var(1), -bdd.mk_var(2)), bdd.mk_var(3));

        let paths: Vec<_> = bdd.paths(f).collect();
        assert_eq!(paths, vec![vec![1, -2, 3]]);
    }

    #[test]
    fn test_paths_constants() {
        let bdd = Bdd::default();

        let paths: Vec<_> = bdd.paths(bdd.one).collect();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_empty());

        assert_eq!(bdd.paths(bdd.zero).count(), 0);
    }

    #[test]
    fn test_paths_or() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        let paths: Vec<_> = bdd.paths(bdd.apply_or(x, y)).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.contains(&vec![1]));
        assert!(paths.contains(&vec![-1, 2]));
    }

    #[test]
    fn test_paths_negated_function() {
        let bdd = Bdd::default();
        let f = bdd.apply_and(bdd.apply_and(-bdd.mk_var(1), -bdd.mk_var(2)), -bdd.mk_var(3));

        assert_eq!(bdd.paths(f).count(), 1);
        assert_eq!(bdd.paths(-f).count(), 3);
    }

    #[test]
    fn test_models_expand_dont_cares() {
        let bdd = Bdd::default();
        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_or(x, y);

        let models: Vec<_> = bdd.models(f, 3).collect();
        assert_eq!(models.len(), 6);

        let unique: HashSet<_> = models.iter().cloned().collect();
        assert_eq!(unique.len(), models.len());
        for m in &models {
            assert_eq!(m.len(), 3);
            assert!(m[0] || m[1]);
        }
    }

    #[test]
    fn test_models_constants() {
        let bdd = Bdd::default();

        assert_eq!(bdd.models(bdd.zero, 2).count(), 0);
        assert_eq!(bdd.models(bdd.one, 2).count(), 4);
        assert_eq!(bdd.models(bdd.one, 0).collect::<Vec<_>>(), vec![Vec::<bool>::new()]);
    }

    #[test]
    fn test_models_match_sat_count() {
        let bdd = Bdd::default();
        let f = bdd.apply_eq(bdd.apply_and(bdd.mk_var(1), bdd.mk_var(3)), bdd.mk_var(4));

        let n = bdd.models(f, 5).count();
        assert_eq!(num_bigint::BigUint::from(n), bdd.sat_count(f, 5));
    }
}
