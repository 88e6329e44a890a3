//! Canonicalization of the atoms of a formula.

use std::collections::HashMap;

use crate::formula::{Atom, Formula, Kind};

/// Chooses the canonical representative of an atom.
///
/// The result is a formula because canonicalization may flip the polarity of
/// an atom or decide it outright (e.g. `x - x <= 3` is simply `true`).
/// Converting the atoms of an already converted formula must be a no-op.
pub trait AtomConverter {
    fn convert(&self, atom: &Atom) -> Formula;
}

/// Rewrites every atom occurrence of `formula` to its canonical representative.
///
/// Equal sub-formulas are rewritten once, so sharing survives normalization.
pub fn normalize(formula: &Formula, converter: &dyn AtomConverter) -> Formula {
    let mut memo = HashMap::new();
    normalize_(formula, converter, &mut memo)
}

fn normalize_(formula: &Formula, converter: &dyn AtomConverter, memo: &mut HashMap<Formula, Formula>) -> Formula {
    if let Some(res) = memo.get(formula) {
        return res.clone();
    }

    let mut go = |f: &Formula| normalize_(f, converter, memo);
    let res = match formula.kind() {
        Kind::True | Kind::False => formula.clone(),
        Kind::Atom(atom) => converter.convert(atom),
        Kind::Not(f) => Formula::not(go(f)),
        Kind::And(args) => Formula::and(args.iter().map(&mut go).collect::<Vec<_>>()),
        Kind::Or(args) => Formula::or(args.iter().map(&mut go).collect::<Vec<_>>()),
        Kind::Implies(a, b) => {
            let a = go(a);
            Formula::implies(a, go(b))
        }
        Kind::Iff(a, b) => {
            let a = go(a);
            Formula::iff(a, go(b))
        }
    };

    memo.insert(formula.clone(), res.clone());
    res
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    struct Identity;

    impl AtomConverter for Identity {
        fn convert(&self, atom: &Atom) -> Formula {
            Formula::atom(atom.clone())
        }
    }

    struct Rename;

    impl AtomConverter for Rename {
        fn convert(&self, atom: &Atom) -> Formula {
            match atom {
                Atom::Bool(name) if name == "q" => Formula::not(Formula::var("p")),
                _ => Formula::atom(atom.clone()),
            }
        }
    }

    #[test]
    fn test_identity() {
        let f = Formula::parse("(and (or x y) (=> y (<= (- a b) 3)))").unwrap();
        assert_eq!(normalize(&f, &Identity), f);
    }

    #[test]
    fn test_rewrites_every_occurrence() {
        let f = Formula::parse("(and (or q x) (= q (not x)))").unwrap();
        let g = normalize(&f, &Rename);
        assert_eq!(g.to_string(), "(and (or (not p) x) (= (not p) (not x)))");
    }

    #[test]
    fn test_idempotent() {
        let f = Formula::parse("(or q (not q) r)").unwrap();
        let once = normalize(&f, &Rename);
        let twice = normalize(&once, &Rename);
        assert_eq!(once, twice);
    }
}
