//! Integer difference logic.
//!
//! Atoms are constraints `x - y rel c` over integer variables and the zero
//! term. A conjunction of such literals is a graph where the constraint
//! `v - u <= w` is the edge `u → v` of weight `w`; the conjunction is
//! satisfiable iff the graph has no negative cycle (Bellman-Ford).

use std::collections::{BTreeMap, HashMap};

use log::trace;

use crate::formula::{Atom, DiffAtom, Formula, Rel, Term};
use crate::normalize::AtomConverter;

/// Canonicalizes difference atoms.
///
/// A canonical atom has the form `x - y <= c` with `x < y` (the zero term
/// orders first). Every other atom is rewritten to a canonical one, possibly
/// negated, and ground atoms (`x - x rel c`) fold to a constant.
#[derive(Debug, Default, Copy, Clone)]
pub struct DiffConverter;

impl AtomConverter for DiffConverter {
    fn convert(&self, atom: &Atom) -> Formula {
        match atom {
            Atom::Bool(_) => Formula::atom(atom.clone()),
            Atom::Diff(diff) => canonical(diff),
        }
    }
}

fn canonical(atom: &DiffAtom) -> Formula {
    if atom.lhs == atom.rhs {
        let holds = match atom.rel {
            Rel::Lt => 0 < atom.bound,
            Rel::Le => 0 <= atom.bound,
            Rel::Gt => 0 > atom.bound,
            Rel::Ge => 0 >= atom.bound,
        };
        return if holds { Formula::top() } else { Formula::bottom() };
    }

    let (x, y, k) = upper_bound(atom, true);
    if x < y {
        Formula::diff(x, y, Rel::Le, k)
    } else {
        // x - y <= k  iff  not (y - x <= -k - 1)
        Formula::not(Formula::diff(y, x, Rel::Le, (-k).saturating_sub(1)))
    }
}

/// Rewrites a literal as `x - y <= k`, returned as `(x, y, k)`.
fn upper_bound(atom: &DiffAtom, value: bool) -> (Term, Term, i64) {
    let lhs = atom.lhs.clone();
    let rhs = atom.rhs.clone();
    let c = atom.bound;
    match (atom.rel, value) {
        (Rel::Le, true) | (Rel::Gt, false) => (lhs, rhs, c),
        (Rel::Lt, true) | (Rel::Ge, false) => (lhs, rhs, c.saturating_sub(1)),
        (Rel::Ge, true) | (Rel::Lt, false) => (rhs, lhs, c.saturating_neg()),
        (Rel::Gt, true) | (Rel::Le, false) => (rhs, lhs, c.saturating_neg().saturating_sub(1)),
    }
}

/// A difference literal: an atom with its assigned polarity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub atom: DiffAtom,
    pub value: bool,
}

impl Literal {
    pub fn new(atom: DiffAtom, value: bool) -> Self {
        Self { atom, value }
    }

    /// The formula asserting this literal.
    pub fn to_formula(&self) -> Formula {
        let f = Formula::atom(Atom::Diff(self.atom.clone()));
        if self.value {
            f
        } else {
            Formula::not(f)
        }
    }

    /// The formula asserting the opposite literal.
    pub fn negated_formula(&self) -> Formula {
        Literal::new(self.atom.clone(), !self.value).to_formula()
    }
}

/// Edge `from → to` of the constraint graph, standing for `to - from <= weight`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: Term,
    pub to: Term,
    pub weight: i64,
    /// The literal this edge was built from.
    pub literal: Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Consistency {
    /// A witness: an integer value for every variable.
    Consistent(BTreeMap<String, i64>),
    /// The edges of a negative cycle, in cycle order.
    Conflict(Vec<Edge>),
}

/// Decides whether a conjunction of difference literals has an integer model.
pub fn check(literals: &[Literal]) -> Consistency {
    let mut nodes: Vec<Term> = Vec::new();
    let mut index: HashMap<Term, usize> = HashMap::new();
    let mut node = |t: Term| -> usize {
        *index.entry(t.clone()).or_insert_with(|| {
            nodes.push(t);
            nodes.len() - 1
        })
    };

    let mut edges = Vec::with_capacity(literals.len());
    let mut arcs = Vec::with_capacity(literals.len());
    for literal in literals {
        let (x, y, k) = upper_bound(&literal.atom, literal.value);
        arcs.push((node(y.clone()), node(x.clone()), k));
        edges.push(Edge {
            from: y,
            to: x,
            weight: k,
            literal: literal.clone(),
        });
    }

    let n = nodes.len();
    // All distances start at 0, as if from a virtual source linked to every node.
    let mut dist = vec![0i64; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];
    let mut last = None;
    for _ in 0..=n {
        last = None;
        for (i, &(u, v, w)) in arcs.iter().enumerate() {
            let d = dist[u].saturating_add(w);
            if d < dist[v] {
                dist[v] = d;
                pred[v] = Some(i);
                last = Some(v);
            }
        }
        if last.is_none() {
            break;
        }
    }

    match last {
        None => {
            let zero = index.get(&Term::Zero).map_or(0, |&i| dist[i]);
            let witness = nodes
                .iter()
                .zip(dist.iter())
                .filter_map(|(t, &d)| match t {
                    Term::Var(name) => Some((name.clone(), d - zero)),
                    Term::Zero => None,
                })
                .collect();
            Consistency::Consistent(witness)
        }
        Some(v) => {
            let cycle = negative_cycle(v, n, &arcs, &pred).unwrap_or_else(|| (0..edges.len()).collect());
            trace!("negative cycle of {} edges", cycle.len());
            Consistency::Conflict(cycle.into_iter().map(|i| edges[i].clone()).collect())
        }
    }
}

/// Follows predecessor edges from a node relaxed in the last round onto the cycle.
fn negative_cycle(mut v: usize, n: usize, arcs: &[(usize, usize, i64)], pred: &[Option<usize>]) -> Option<Vec<usize>> {
    for _ in 0..n {
        v = arcs[pred[v]?].0;
    }
    let start = v;
    let mut cycle = Vec::new();
    loop {
        let e = pred[v]?;
        cycle.push(e);
        v = arcs[e].0;
        if v == start || cycle.len() > n {
            break;
        }
    }
    if v != start {
        return None;
    }
    cycle.reverse();
    Some(cycle)
}

/// The constraint implied by two consecutive edges `a → b → c`, i.e. `c - a <= w1 + w2`,
/// as a canonical formula.
pub fn implied(first: &Edge, second: &Edge) -> Formula {
    let atom = DiffAtom::new(
        second.to.clone(),
        first.from.clone(),
        Rel::Le,
        first.weight.saturating_add(second.weight),
    );
    canonical(&atom)
}
