//! Zero-suppressed decision diagrams over a fixed variable universe.
//!
//! A ZDD represents a set of combinations (subsets of `1..=n`). Reading a
//! combination as the set of variables assigned `true`, a ZDD over the full
//! universe is a boolean function: the empty set is `false`, the power set of
//! the universe is `true`, and negation is the difference with the power set.
//!
//! Unlike the BDD manager, there are no complement edges, and there is no
//! native existential quantification.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

use log::debug;
use num_bigint::BigUint;

use crate::cache::Cache;
use crate::dot::escape_label;
use crate::error::{Result, TddError};
use crate::io::{parse_header, parse_number};
use crate::node::Node;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Op {
    Union,
    Intersect,
    Diff,
}

type OpKey = (Op, Ref, Ref);

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        pairing3(self.0 as u64, self.1.unsigned() as u64, self.2.unsigned() as u64)
    }
}

pub struct Zdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<OpKey, Ref>>,
    num_vars: u32,
    pub zero: Ref,
    pub one: Ref,
    /// Power set of the universe.
    pub top: Ref,
}

impl Zdd {
    pub fn new(num_vars: u32, storage_bits: usize) -> Self {
        assert!(storage_bits <= 31, "Storage bits should be in the range 0..=31");

        let mut storage = Table::new(storage_bits);
        let zero = Ref::positive(storage.add(Node::default()) as u32);
        let one = Ref::positive(storage.add(Node::default()) as u32);

        let mut zdd = Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(min(storage_bits, 16))),
            num_vars,
            zero,
            one,
            top: one,
        };

        let mut top = one;
        for v in (1..=num_vars).rev() {
            top = zdd.mk_node(v, top, top);
        }
        zdd.top = top;
        zdd
    }

    /// Number of variables in the universe.
    pub fn num_vars(&self) -> u32 {
        self.num_vars
    }
}

// Basic operations over sets of combinations P and Q:
//   0 -- the empty set (`zero`).
//   1 -- the set holding only the empty combination (`one`).
//   P.union(Q), P.intersect(Q), P.diff(Q) -- the usual set operations.
//   P.count -- the number of combinations in P.

impl Zdd {
    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == self.zero
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == self.one
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        self.is_zero(node) || self.is_one(node)
    }

    /// Variable of the node, with terminals below every variable.
    fn level(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    pub fn mk_node(&self, var: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(var, 0, "Variable index should not be zero");

        // Zero-suppression
        if self.is_zero(high) {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node { variable: var, low, high });
        Ref::positive(i as u32)
    }

    /// All combinations of the universe that contain `var`.
    pub fn var(&self, var: u32) -> Ref {
        assert!(var >= 1 && var <= self.num_vars, "Variable {} is outside the universe", var);
        let mut current = self.one;
        for v in (1..=self.num_vars).rev() {
            current = if v == var {
                self.mk_node(v, self.zero, current)
            } else {
                self.mk_node(v, current, current)
            };
        }
        current
    }

    pub fn union(&self, f: Ref, g: Ref) -> Ref {
        if self.is_zero(f) {
            return g;
        }
        if self.is_zero(g) || f == g {
            return f;
        }

        let key = (Op::Union, min(f, g), f.max(g));
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let i = self.level(f);
        let j = self.level(g);
        let res = if i < j {
            let low = self.union(self.low(f.index()), g);
            self.mk_node(i, low, self.high(f.index()))
        } else if i > j {
            let low = self.union(f, self.low(g.index()));
            self.mk_node(j, low, self.high(g.index()))
        } else {
            let low = self.union(self.low(f.index()), self.low(g.index()));
            let high = self.union(self.high(f.index()), self.high(g.index()));
            self.mk_node(i, low, high)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    pub fn intersect(&self, f: Ref, g: Ref) -> Ref {
        if self.is_zero(f) || self.is_zero(g) {
            return self.zero;
        }
        if f == g {
            return f;
        }

        let key = (Op::Intersect, min(f, g), f.max(g));
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let i = self.level(f);
        let j = self.level(g);
        let res = if i < j {
            self.intersect(self.low(f.index()), g)
        } else if i > j {
            self.intersect(f, self.low(g.index()))
        } else {
            let low = self.intersect(self.low(f.index()), self.low(g.index()));
            let high = self.intersect(self.high(f.index()), self.high(g.index()));
            self.mk_node(i, low, high)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    pub fn diff(&self, f: Ref, g: Ref) -> Ref {
        if self.is_zero(f) || f == g {
            return self.zero;
        }
        if self.is_zero(g) {
            return f;
        }

        let key = (Op::Diff, f, g);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let i = self.level(f);
        let j = self.level(g);
        let res = if i < j {
            let low = self.diff(self.low(f.index()), g);
            self.mk_node(i, low, self.high(f.index()))
        } else if i > j {
            self.diff(f, self.low(g.index()))
        } else {
            let low = self.diff(self.low(f.index()), self.low(g.index()));
            let high = self.diff(self.high(f.index()), self.high(g.index()));
            self.mk_node(i, low, high)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Complement with respect to the power set of the universe.
    pub fn not(&self, f: Ref) -> Ref {
        self.diff(self.top, f)
    }

    /// Number of combinations in `f`.
    pub fn count(&self, f: Ref) -> BigUint {
        let mut cache = HashMap::new();
        self.count_(f, &mut cache)
    }

    fn count_(&self, f: Ref, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(f) {
            return BigUint::ZERO;
        }
        if self.is_one(f) {
            return BigUint::from(1u32);
        }
        if let Some(res) = cache.get(&f) {
            return res.clone();
        }

        let index = f.index();
        let res = self.count_(self.low(index), cache) + self.count_(self.high(index), cache);
        cache.insert(f, res.clone());
        res
    }

    /// Indices of all nodes reachable from the given roots, terminals included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node.index()) && !self.is_terminal(node) {
                queue.push_back(self.low(node.index()));
                queue.push_back(self.high(node.index()));
            }
        }

        visited
    }

    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }
}

impl Zdd {
    pub fn combinations(&self, node: Ref) -> ZddCombinations<'_> {
        ZddCombinations::new(self, node)
    }
}

/// Iterator over the combinations of a ZDD, each as an increasing list of variables.
pub struct ZddCombinations<'a> {
    zdd: &'a Zdd,
    stack: Vec<(Ref, Vec<u32>)>,
}

impl<'a> ZddCombinations<'a> {
    pub fn new(zdd: &'a Zdd, node: Ref) -> Self {
        ZddCombinations {
            zdd,
            stack: vec![(node, vec![])],
        }
    }
}

impl Iterator for ZddCombinations<'_> {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, subset)) = self.stack.pop() {
            if self.zdd.is_zero(node) {
                continue;
            } else if self.zdd.is_one(node) {
                return Some(subset);
            }

            let index = node.index();
            let v = self.zdd.variable(index);
            self.stack.push((self.zdd.low(index), subset.clone()));

            let mut subset = subset;
            subset.push(v);
            self.stack.push((self.zdd.high(index), subset));
        }
        None
    }
}

impl Zdd {
    pub fn to_dot(&self, roots: &[Ref], label: &dyn Fn(u32) -> String) -> Result<String, std::fmt::Error> {
        let name = |r: Ref| -> String {
            if self.is_zero(r) {
                "0".to_string()
            } else if self.is_one(r) {
                "1".to_string()
            } else {
                format!("n{}", r.index())
            }
        };

        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape=ellipse];")?;
        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape=square, label=\"0\"];")?;
        writeln!(dot, "1 [shape=square, label=\"1\"];")?;
        writeln!(dot, "}}")?;

        let mut nodes: Vec<u32> = self
            .descendants(roots.iter().copied())
            .into_iter()
            .filter(|&i| !self.is_terminal(Ref::positive(i)))
            .collect();
        nodes.sort_unstable();

        for &i in &nodes {
            let node = Ref::positive(i);
            writeln!(dot, "{} [label=\"{}\"];", name(node), escape_label(&label(self.variable(i))))?;
        }
        for &i in &nodes {
            let node = Ref::positive(i);
            writeln!(dot, "{} -- {} [style=solid];", name(node), name(self.high(i)))?;
            writeln!(dot, "{} -- {} [style=dashed];", name(node), name(self.low(i)))?;
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, root) in roots.iter().enumerate() {
            writeln!(dot, "r{} [shape=rect, label=\"{}\"];", i, root)?;
        }
        writeln!(dot, "}}")?;
        for (i, &root) in roots.iter().enumerate() {
            writeln!(dot, "r{} -- {};", i, name(root))?;
        }
        writeln!(dot, "}}")?;
        Ok(dot)
    }

    /// Serializes `f` as `zdd <nodes> <vars>`, then bottom-up node lines, then
    /// the root. Local ids `0` and `1` are the terminals.
    pub fn dump(&self, f: Ref) -> String {
        let mut ids = HashMap::from([(self.zero.index(), 0usize), (self.one.index(), 1usize)]);
        let mut order = Vec::new();
        let mut stack = vec![(f, false)];
        while let Some((node, expanded)) = stack.pop() {
            let i = node.index();
            if ids.contains_key(&i) {
                continue;
            }
            if expanded {
                ids.insert(i, order.len() + 2);
                order.push(i);
            } else {
                stack.push((node, true));
                stack.push((self.high(i), false));
                stack.push((self.low(i), false));
            }
        }

        let mut out = format!("zdd {} {}\n", order.len(), self.num_vars);
        for &i in &order {
            out.push_str(&format!(
                "{} {} {} {}\n",
                ids[&i],
                self.variable(i),
                ids[&self.low(i).index()],
                ids[&self.high(i).index()]
            ));
        }
        out.push_str(&format!("root {}\n", ids[&f.index()]));
        out
    }

    /// Rebuilds a dumped set in this manager; the universe sizes must agree.
    pub fn restore(&self, text: &str) -> Result<Ref> {
        let (num_nodes, num_vars) = parse_header(text, "zdd")?;
        if num_vars != self.num_vars as usize {
            return Err(TddError::Parse(format!(
                "dump is over {} variables, but the universe has {}",
                num_vars, self.num_vars
            )));
        }

        let mut refs = vec![self.zero, self.one];
        let lookup = |refs: &[Ref], id: usize| -> Result<Ref> {
            refs.get(id)
                .copied()
                .ok_or_else(|| TddError::Parse(format!("dangling node reference {}", id)))
        };

        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty()).skip(1);
        for _ in 0..num_nodes {
            let line = lines.next().ok_or_else(|| TddError::Parse("truncated diagram dump".to_string()))?;
            let fields: Vec<usize> = line.split_whitespace().map(parse_number).collect::<Result<_>>()?;
            if fields.len() != 4 || fields[0] != refs.len() || fields[1] == 0 || fields[1] > num_vars {
                return Err(TddError::Parse(format!("invalid node line: '{}'", line)));
            }
            let low = lookup(&refs, fields[2])?;
            let high = lookup(&refs, fields[3])?;
            refs.push(self.mk_node(fields[1] as u32, low, high));
        }

        let root = match lines.next().map(|line| line.split_whitespace().collect::<Vec<_>>()) {
            Some(fields) if fields.len() == 2 && fields[0] == "root" => lookup(&refs, parse_number(fields[1])?)?,
            _ => return Err(TddError::Parse("missing root line".to_string())),
        };
        debug!("restored ZDD with {} nodes over {} variables", num_nodes, num_vars);
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_terminals() {
        let zdd = Zdd::new(3, 10);

        assert_eq!(zdd.count(zdd.zero), BigUint::from(0u32));
        assert_eq!(zdd.count(zdd.one), BigUint::from(1u32));
        assert_eq!(zdd.count(zdd.top), BigUint::from(8u32));
    }

    #[test]
    fn test_union_and_combinations() {
        let zdd = Zdd::new(2, 10);

        // {{1}} and {{2}}: exactly one of the two variables.
        let only1 = zdd.intersect(zdd.var(1), zdd.not(zdd.var(2)));
        let only2 = zdd.diff(zdd.var(2), zdd.var(1));
        let f = zdd.union(only1, only2);
        assert_eq!(zdd.count(f), BigUint::from(2u32));

        let mut combinations: Vec<_> = zdd.combinations(f).collect();
        combinations.sort();
        assert_eq!(combinations, vec![vec![1], vec![2]]);
        assert_eq!(zdd.combinations(zdd.one).collect::<Vec<_>>(), vec![Vec::<u32>::new()]);
    }

    #[test]
    fn test_var_as_boolean_function() {
        let zdd = Zdd::new(3, 10);

        let x1 = zdd.var(1);
        let x2 = zdd.var(2);
        assert_eq!(zdd.count(x1), BigUint::from(4u32));
        assert_eq!(zdd.count(zdd.intersect(x1, x2)), BigUint::from(2u32));
        assert_eq!(zdd.count(zdd.union(x1, x2)), BigUint::from(6u32));
        assert_eq!(zdd.count(zdd.not(x1)), BigUint::from(4u32));
        assert_eq!(zdd.not(zdd.not(x1)), x1);
        assert_eq!(zdd.union(x1, zdd.not(x1)), zdd.top);
        assert_eq!(zdd.intersect(x1, zdd.not(x1)), zdd.zero);
    }

    #[test]
    fn test_de_morgan() {
        let zdd = Zdd::new(4, 10);

        let x = zdd.var(2);
        let y = zdd.var(4);
        assert_eq!(zdd.not(zdd.intersect(x, y)), zdd.union(zdd.not(x), zdd.not(y)));
    }

    #[test]
    fn test_dump_restore() {
        let zdd = Zdd::new(3, 10);
        let f = zdd.union(zdd.intersect(zdd.var(1), zdd.var(3)), zdd.not(zdd.var(2)));

        let text = zdd.dump(f);
        let other = Zdd::new(3, 10);
        let g = other.restore(&text).unwrap();
        assert_eq!(other.count(g), zdd.count(f));
        assert_eq!(other.size(g), zdd.size(f));
        assert_eq!(other.dump(g), text);

        assert!(Zdd::new(4, 10).restore(&text).is_err());
    }

    #[test]
    fn test_to_dot() {
        let zdd = Zdd::new(2, 10);
        let f = zdd.union(zdd.var(1), zdd.var(2));
        let dot = zdd.to_dot(&[f], &|v| format!("x{}", v)).unwrap();
        assert!(dot.contains("label=\"x1\""));
        assert!(dot.contains("label=\"x2\""));
    }
}
