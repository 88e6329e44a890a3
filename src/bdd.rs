//! Binary Decision Diagram manager.
//!
//! All operations go through the [`Bdd`] manager, which owns the unique table
//! (hash consing) and the computed table. Nodes are referenced by lightweight
//! [`Ref`] handles with complement edges: `-f` is the negation of `f` and costs
//! nothing. Variables are 1-indexed; the variable index is also its level, so
//! smaller indices sit closer to the root.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::{debug, trace};

use crate::cache::Cache;
use crate::node::Node;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

type OpKey = (Ref, Ref, Ref);

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        pairing3(self.0.unsigned() as u64, self.1.unsigned() as u64, self.2.unsigned() as u64)
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<OpKey, Ref>>,
    pub zero: Ref,
    pub one: Ref,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        assert!(storage_bits <= 31, "Storage bits should be in the range 0..=31");

        let mut storage = Table::new(storage_bits);

        // Allocate the terminal node:
        let one = storage.add(Node::default());
        assert_eq!(one, 1); // Make sure the terminal node is (1).
        let one = Ref::positive(one as u32);

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(min(storage_bits, 16))),
            zero: -one,
            one,
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(16)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd").field("size", &storage.size()).finish()
    }
}

impl Bdd {
    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    /// Total number of nodes allocated in the manager, including the terminal.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == self.one.index()
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        trace!("mk(v = {}, low = {}, high = {})", v, low, high);

        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node { variable: v, low, high });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, self.zero, self.one)
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        trace!("apply_ite(f = {}, g = {}, h = {})", f, g, h);

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            self.one
        } else if g == -f {
            self.zero
        } else {
            g
        };
        let h = if h == f {
            self.zero
        } else if h == -f {
            self.one
        } else {
            h
        };

        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, n) = if g.is_negated() { (-g, -h, true) } else { (g, h, false) };

        let key = (f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return if n { -res } else { res };
        }

        // Determine the top variable:
        let m = [g, h]
            .into_iter()
            .filter(|&x| !self.is_terminal(x))
            .map(|x| self.variable(x.index()))
            .fold(self.variable(f.index()), min);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);

        let res = self.mk_node(m, e, t);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.zero)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, self.one, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, self.one)
    }

    /// Existential quantification: `∃ vars. f`.
    pub fn exists(&self, f: Ref, vars: &[u32]) -> Ref {
        let mut vars = vars.to_vec();
        vars.sort_unstable();
        vars.dedup();
        debug!("exists(f = {}, vars = {:?})", f, vars);
        let mut cache = HashMap::new();
        self.exists_(f, &vars, &mut cache)
    }

    fn exists_(&self, f: Ref, vars: &[u32], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        let v = self.variable(f.index());
        // Variables above the top of `f` do not occur in it.
        let vars = &vars[vars.partition_point(|&x| x < v)..];
        if vars.is_empty() {
            return f;
        }

        // The remaining slice is determined by the level of `f`, so `f` alone is a sound key.
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.exists_(self.low_node(f), vars, cache);
        let high = self.exists_(self.high_node(f), vars, cache);
        let res = if vars[0] == v {
            self.apply_or(low, high)
        } else {
            self.mk_node(v, low, high)
        };

        cache.insert(f, res);
        res
    }

    /// Indices of all nodes reachable from the given roots, including the terminal.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) && !self.is_terminal(node) {
                queue.push_back(self.low(i));
                queue.push_back(self.high(i));
            }
        }

        visited
    }

    /// Number of nodes (including the terminal) reachable from `f`.
    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_literals_and_terminals() {
        let bdd = Bdd::new(10);
        assert!(bdd.is_terminal(bdd.zero) && bdd.is_terminal(bdd.one));
        assert_eq!(bdd.zero, -bdd.one);

        let p = bdd.mk_var(4);
        assert_eq!(bdd.variable(p.index()), 4);
        assert_eq!((bdd.low_node(p), bdd.high_node(p)), (bdd.zero, bdd.one));
        // Complemented handle, same node.
        assert_eq!((bdd.low_node(-p), bdd.high_node(-p)), (bdd.one, bdd.zero));
        assert_eq!(bdd.mk_var(4), p);
        assert_eq!(bdd.num_nodes(), 2);
    }

    #[test]
    fn test_derived_operators() {
        let bdd = Bdd::new(10);
        let p = bdd.mk_var(1);
        let q = bdd.mk_var(2);

        assert_eq!(bdd.apply_imply(p, q), bdd.apply_or(-p, q));
        assert_eq!(bdd.apply_eq(p, q), bdd.apply_eq(-p, -q));
        assert_eq!(bdd.apply_eq(p, p), bdd.one);
        assert_eq!(bdd.apply_eq(p, -p), bdd.zero);
        assert_eq!(bdd.apply_not(bdd.apply_and(p, q)), bdd.apply_or(-p, -q));
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one, g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero, g, h), h);

        let f = bdd.mk_node(1, bdd.one, h);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));
        assert_eq!(bdd.apply_ite(f, -g, bdd.one), -bdd.apply_and(f, g));

        let f = bdd.mk_var(5);
        let g = bdd.mk_var(7);
        let h = bdd.mk_var(8);
        let result = bdd.mk_node(5, -g, -h);
        assert_eq!(bdd.apply_ite(-f, -g, -h), result);
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);
        let x3 = bdd.mk_var(3);

        // ∃x2. (x1 ∧ x2) ∨ (¬x2 ∧ x3) = x1 ∨ x3
        let f = bdd.apply_or(bdd.apply_and(x1, x2), bdd.apply_and(-x2, x3));
        assert_eq!(bdd.exists(f, &[2]), bdd.apply_or(x1, x3));

        // ∃x1,x3. f = 1
        assert_eq!(bdd.exists(f, &[3, 1]), bdd.one);

        // Quantifying a variable not in the support is the identity.
        let g = bdd.apply_and(x1, x3);
        assert_eq!(bdd.exists(g, &[2]), g);

        // ∃x. x ∧ ¬x = 0
        assert_eq!(bdd.exists(bdd.apply_and(x2, -x2), &[2]), bdd.zero);
    }

    #[test]
    fn test_size() {
        let bdd = Bdd::new(10);
        let p = bdd.mk_var(1);
        let q = bdd.mk_var(2);

        assert_eq!(bdd.size(bdd.zero), 1);
        assert_eq!(bdd.size(-p), 2);
        assert_eq!(bdd.size(bdd.apply_or(p, q)), 3);
        // Both polarities of `q` share one node.
        assert_eq!(bdd.size(bdd.apply_eq(p, q)), 3);
        assert_eq!(bdd.descendants([p, q]).len(), 3);
    }

    #[test]
    fn test_complemented_operands_hit_the_same_entry() {
        let bdd = Bdd::new(10);
        let p = bdd.mk_var(1);
        let q = bdd.mk_var(2);

        let f = bdd.apply_eq(p, q);
        let before = bdd.num_nodes();
        assert_eq!(bdd.apply_eq(-p, -q), f);
        assert_eq!(bdd.apply_ite(-p, -q, q), f);
        assert_eq!(bdd.num_nodes(), before);
    }
}
