//! The capability set a decision-diagram manager offers to the T-DD.
//!
//! Variables are propositions `1..=num_vars`. A session is created per T-DD
//! and is never shared between builds.

use std::fmt::Debug;
use std::hash::Hash;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::error::{Result, TddError};
use crate::reference::Ref;
use crate::zdd::Zdd;

pub trait DiagramBackend: Sized {
    /// Short name of the variant, used in dumps, metadata and error messages.
    const VARIANT: &'static str;

    type Node: Copy + Eq + Hash + Debug;

    /// Creates a session able to hold the propositions `1..=num_vars`.
    fn with_vars(num_vars: usize, storage_bits: usize) -> Self;

    fn constant(&self, value: bool) -> Self::Node;
    fn var(&self, prop: u32) -> Self::Node;

    fn negate(&self, f: Self::Node) -> Self::Node;
    fn conjoin(&self, f: Self::Node, g: Self::Node) -> Self::Node;
    fn disjoin(&self, f: Self::Node, g: Self::Node) -> Self::Node;

    fn equiv(&self, f: Self::Node, g: Self::Node) -> Self::Node {
        let both = self.conjoin(f, g);
        let neither = self.conjoin(self.negate(f), self.negate(g));
        self.disjoin(both, neither)
    }

    fn implies(&self, f: Self::Node, g: Self::Node) -> Self::Node {
        self.disjoin(self.negate(f), g)
    }

    /// Existential elimination of the given propositions.
    fn exists(&self, _f: Self::Node, _props: &[u32]) -> Result<Self::Node> {
        Err(TddError::NotSupported {
            variant: Self::VARIANT,
            operation: "existential elimination",
        })
    }

    fn is_false(&self, f: Self::Node) -> bool {
        f == self.constant(false)
    }

    fn is_true(&self, f: Self::Node) -> bool {
        f == self.constant(true)
    }

    /// Number of models over `1..=num_vars`; the support of `f` must lie within.
    fn model_count(&self, f: Self::Node, num_vars: usize) -> BigUint;

    /// All models over `1..=num_vars`, each indexed by `prop - 1`.
    fn models(&self, f: Self::Node, num_vars: usize) -> Box<dyn Iterator<Item = Vec<bool>> + '_>;

    /// One model over `1..=num_vars`, if any.
    fn pick(&self, f: Self::Node, num_vars: usize) -> Option<Vec<bool>> {
        self.models(f, num_vars).next()
    }

    /// Reachable decision nodes.
    fn node_count(&self, f: Self::Node) -> usize;

    /// Reachable nodes, terminals included.
    fn vertex_count(&self, f: Self::Node) -> usize;

    fn to_dot(&self, f: Self::Node, label: &dyn Fn(u32) -> String) -> Result<String>;

    fn dump(&self, f: Self::Node) -> String;

    /// Rebuilds a dumped diagram in a new session.
    fn restore(text: &str, storage_bits: usize) -> Result<(Self, Self::Node)>;
}

/// Complement-edge BDD: the primary variant.
pub struct BddSession {
    pub manager: Bdd,
    num_vars: usize,
}

impl BddSession {
    pub fn num_vars(&self) -> usize {
        self.num_vars
    }
}

impl DiagramBackend for BddSession {
    const VARIANT: &'static str = "bdd";

    type Node = Ref;

    fn with_vars(num_vars: usize, storage_bits: usize) -> Self {
        Self {
            manager: Bdd::new(storage_bits),
            num_vars,
        }
    }

    fn constant(&self, value: bool) -> Ref {
        if value {
            self.manager.one
        } else {
            self.manager.zero
        }
    }

    fn var(&self, prop: u32) -> Ref {
        self.manager.mk_var(prop)
    }

    fn negate(&self, f: Ref) -> Ref {
        self.manager.apply_not(f)
    }

    fn conjoin(&self, f: Ref, g: Ref) -> Ref {
        self.manager.apply_and(f, g)
    }

    fn disjoin(&self, f: Ref, g: Ref) -> Ref {
        self.manager.apply_or(f, g)
    }

    fn equiv(&self, f: Ref, g: Ref) -> Ref {
        self.manager.apply_eq(f, g)
    }

    fn implies(&self, f: Ref, g: Ref) -> Ref {
        self.manager.apply_imply(f, g)
    }

    fn exists(&self, f: Ref, props: &[u32]) -> Result<Ref> {
        Ok(self.manager.exists(f, props))
    }

    fn model_count(&self, f: Ref, num_vars: usize) -> BigUint {
        self.manager.sat_count(f, num_vars)
    }

    fn models(&self, f: Ref, num_vars: usize) -> Box<dyn Iterator<Item = Vec<bool>> + '_> {
        Box::new(self.manager.models(f, num_vars))
    }

    fn pick(&self, f: Ref, num_vars: usize) -> Option<Vec<bool>> {
        // Variables skipped by the path are free; they are set to false.
        let mut model = vec![false; num_vars];
        for literal in self.manager.one_sat(f)? {
            if literal > 0 && literal as usize <= num_vars {
                model[literal as usize - 1] = true;
            }
        }
        Some(model)
    }

    fn node_count(&self, f: Ref) -> usize {
        self.manager.size(f) as usize - 1
    }

    fn vertex_count(&self, f: Ref) -> usize {
        // The single terminal is reached as both `0` and `1` by non-constant functions.
        if self.manager.is_terminal(f) {
            1
        } else {
            self.manager.size(f) as usize + 1
        }
    }

    fn to_dot(&self, f: Ref, label: &dyn Fn(u32) -> String) -> Result<String> {
        self.manager
            .to_dot(&[f], label)
            .map_err(|e| TddError::Parse(format!("DOT rendering failed: {}", e)))
    }

    fn dump(&self, f: Ref) -> String {
        self.manager.dump(f, self.num_vars)
    }

    fn restore(text: &str, storage_bits: usize) -> Result<(Self, Ref)> {
        let manager = Bdd::new(storage_bits);
        let (root, num_vars) = manager.restore(text)?;
        Ok((Self { manager, num_vars }, root))
    }
}

/// ZDD over the universe `1..=num_vars`: the alternate variant.
pub struct ZddSession {
    pub manager: Zdd,
}

impl DiagramBackend for ZddSession {
    const VARIANT: &'static str = "zdd";

    type Node = Ref;

    fn with_vars(num_vars: usize, storage_bits: usize) -> Self {
        Self {
            manager: Zdd::new(num_vars as u32, storage_bits),
        }
    }

    fn constant(&self, value: bool) -> Ref {
        if value {
            self.manager.top
        } else {
            self.manager.zero
        }
    }

    fn var(&self, prop: u32) -> Ref {
        self.manager.var(prop)
    }

    fn negate(&self, f: Ref) -> Ref {
        self.manager.not(f)
    }

    fn conjoin(&self, f: Ref, g: Ref) -> Ref {
        self.manager.intersect(f, g)
    }

    fn disjoin(&self, f: Ref, g: Ref) -> Ref {
        self.manager.union(f, g)
    }

    fn model_count(&self, f: Ref, num_vars: usize) -> BigUint {
        let universe = self.manager.num_vars() as usize;
        assert!(num_vars <= universe, "Cannot count over more variables than the universe holds");
        // Propositions beyond `num_vars` are unconstrained, hence each model appears 2^(universe - num_vars) times.
        self.manager.count(f) >> (universe - num_vars)
    }

    fn models(&self, f: Ref, num_vars: usize) -> Box<dyn Iterator<Item = Vec<bool>> + '_> {
        Box::new(self.manager.combinations(f).filter_map(move |combination| {
            if combination.iter().any(|&v| v as usize > num_vars) {
                return None;
            }
            let mut model = vec![false; num_vars];
            for v in combination {
                model[v as usize - 1] = true;
            }
            Some(model)
        }))
    }

    fn node_count(&self, f: Ref) -> usize {
        self.manager
            .descendants([f])
            .into_iter()
            .filter(|&i| !self.manager.is_terminal(Ref::positive(i)))
            .count()
    }

    fn vertex_count(&self, f: Ref) -> usize {
        self.manager.size(f) as usize
    }

    fn to_dot(&self, f: Ref, label: &dyn Fn(u32) -> String) -> Result<String> {
        self.manager
            .to_dot(&[f], label)
            .map_err(|e| TddError::Parse(format!("DOT rendering failed: {}", e)))
    }

    fn dump(&self, f: Ref) -> String {
        self.manager.dump(f)
    }

    fn restore(text: &str, storage_bits: usize) -> Result<(Self, Ref)> {
        let (_, num_vars) = crate::io::parse_header(text, Self::VARIANT)?;
        let session = Self::with_vars(num_vars, storage_bits);
        let root = session.manager.restore(text)?;
        Ok((session, root))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn exercise<B: DiagramBackend>() {
        let session = B::with_vars(3, 10);
        let x1 = session.var(1);
        let x2 = session.var(2);
        let x3 = session.var(3);

        let f = session.conjoin(session.disjoin(x1, x2), session.implies(x2, x3));
        assert_eq!(session.model_count(f, 3), BigUint::from(4u32));
        assert_eq!(session.models(f, 3).count(), 4);
        for m in session.models(f, 3) {
            assert!(m[0] || m[1]);
            assert!(!m[1] || m[2]);
        }

        assert!(session.is_true(session.disjoin(x1, session.negate(x1))));
        assert!(session.is_false(session.conjoin(x1, session.negate(x1))));
        assert!(session.is_true(session.equiv(x2, x2)));

        let text = session.dump(f);
        let (other, g) = B::restore(&text, 10).unwrap();
        assert_eq!(other.model_count(g, 3), session.model_count(f, 3));
        assert_eq!(other.node_count(g), session.node_count(f));
    }

    #[test]
    fn test_bdd_session() {
        exercise::<BddSession>();
    }

    #[test]
    fn test_zdd_session() {
        exercise::<ZddSession>();
    }

    #[test]
    fn test_pick_is_a_model() {
        let session = BddSession::with_vars(3, 10);
        let f = session.conjoin(session.negate(session.var(1)), session.disjoin(session.var(2), session.var(3)));
        let model = session.pick(f, 3).unwrap();
        assert!(session.models(f, 3).any(|m| m == model));
        assert!(!model[0]);

        assert_eq!(session.pick(session.constant(false), 3), None);
        assert_eq!(session.pick(session.constant(true), 2), Some(vec![false, false]));

        let zdd = ZddSession::with_vars(3, 10);
        let g = zdd.conjoin(zdd.negate(zdd.var(1)), zdd.disjoin(zdd.var(2), zdd.var(3)));
        let model = zdd.pick(g, 3).unwrap();
        assert!(!model[0] && (model[1] || model[2]));
    }

    #[test]
    fn test_bdd_exists() {
        let session = BddSession::with_vars(2, 10);
        let f = session.conjoin(session.var(1), session.var(2));
        let g = session.exists(f, &[2]).unwrap();
        assert_eq!(g, session.var(1));
        assert_eq!(session.model_count(g, 1), BigUint::from(1u32));
    }

    #[test]
    fn test_zdd_exists_not_supported() {
        let session = ZddSession::with_vars(2, 10);
        let f = session.var(1);
        match session.exists(f, &[2]) {
            Err(TddError::NotSupported { variant, .. }) => assert_eq!(variant, "zdd"),
            other => panic!("expected NotSupported, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zdd_count_over_prefix() {
        let session = ZddSession::with_vars(3, 10);
        let f = session.var(1);
        assert_eq!(session.model_count(f, 1), BigUint::from(1u32));
        assert_eq!(session.models(f, 1).collect::<Vec<_>>(), vec![vec![true]]);
        assert_eq!(session.model_count(f, 3), BigUint::from(4u32));
    }
}
