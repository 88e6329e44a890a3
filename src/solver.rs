//! Exhaustive theory-aware model enumeration (All-SMT).

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace};

use crate::error::{Result, TddError};
use crate::formula::{Atom, Formula};
use crate::normalize::{normalize, AtomConverter};
use crate::theory::{check, implied, Consistency, DiffConverter, Edge, Literal};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SatResult {
    Sat,
    Unsat,
}

/// A total assignment over the enumeration vocabulary.
pub type Model = BTreeMap<Atom, bool>;

/// Boolean propositions (by name), each standing for an atom of the formula.
pub type BooleanMapping = BTreeMap<String, Atom>;

/// The theory collaborator of the T-DD.
pub trait TheoryEnumerator {
    /// Enumerates every assignment over the vocabulary (the atoms of `phi`, or
    /// the propositions of `mapping`) that extends to a theory model of `phi`.
    ///
    /// Replaces the lemmas and models of any previous call.
    fn check_all_sat(&mut self, phi: &Formula, mapping: Option<&BooleanMapping>) -> Result<SatResult>;

    /// Theory lemmas collected by the last enumeration.
    fn get_theory_lemmas(&self) -> &[Formula];

    /// Models found by the last enumeration.
    fn get_models(&self) -> &[Model];

    fn get_converter(&self) -> &dyn AtomConverter;
}

/// Ensures every mapped atom occurs in `phi`, either as written or in its
/// canonical form.
pub fn validate_mapping(phi: &Formula, mapping: &BooleanMapping, converter: &dyn AtomConverter) -> Result<()> {
    let raw: HashSet<Atom> = phi.atoms().into_iter().collect();
    let canonical: HashSet<Atom> = normalize(phi, converter).atoms().into_iter().collect();

    for atom in mapping.values() {
        if raw.contains(atom) {
            continue;
        }
        let atoms = converter.convert(atom).atoms();
        if atoms.is_empty() || !atoms.iter().all(|a| canonical.contains(a)) {
            return Err(TddError::UnknownMappedAtom(atom.clone()));
        }
    }
    Ok(())
}

/// All-SMT enumerator for boolean structure over integer difference logic.
///
/// The search assigns the vocabulary depth-first, pruning a branch as soon as
/// the formula evaluates to false or the assigned difference literals are
/// inconsistent. Each inconsistency is a negative cycle and yields the lemma
/// "not all of these literals", which is kept.
#[derive(Debug, Default)]
pub struct DiffLogicSolver {
    derive_transitive_lemmas: bool,
    converter: DiffConverter,
    lemmas: Vec<Formula>,
    known: HashSet<Formula>,
    models: Vec<Model>,
}

impl DiffLogicSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also learn, for each pair of consecutive edges `a → b → c` of a conflict,
    /// the lemma `l1 ∧ l2 → (c - a <= w1 + w2)`. The implied atom may be fresh.
    pub fn with_transitive_lemmas() -> Self {
        Self {
            derive_transitive_lemmas: true,
            ..Self::default()
        }
    }

    fn learn(&mut self, lemma: Formula) {
        if self.known.insert(lemma.clone()) {
            trace!("lemma: {}", lemma);
            self.lemmas.push(lemma);
        }
    }

    fn learn_conflict(&mut self, cycle: &[Edge]) {
        let mut clause: Vec<Formula> = cycle.iter().map(|e| e.literal.negated_formula()).collect();
        clause.sort();
        clause.dedup();
        self.learn(Formula::or(clause));

        if self.derive_transitive_lemmas {
            for pair in cycle.windows(2) {
                let consequence = implied(&pair[0], &pair[1]);
                if consequence.is_true() || consequence.is_false() {
                    continue;
                }
                self.learn(Formula::or([
                    pair[0].literal.negated_formula(),
                    pair[1].literal.negated_formula(),
                    consequence,
                ]));
            }
        }
    }

    /// Checks the theory part of a partial assignment, learning from conflicts.
    fn consistent(&mut self, assignment: &[(Atom, bool)]) -> bool {
        let literals: Vec<Literal> = assignment
            .iter()
            .filter_map(|(atom, value)| match atom {
                Atom::Diff(diff) => Some(Literal::new(diff.clone(), *value)),
                Atom::Bool(_) => None,
            })
            .collect();
        match check(&literals) {
            Consistency::Consistent(_) => true,
            Consistency::Conflict(cycle) => {
                self.learn_conflict(&cycle);
                false
            }
        }
    }

    fn enumerate(&mut self, formula: &Formula, vocabulary: &[Atom], rest: &[Atom], assignment: &mut Vec<(Atom, bool)>) {
        if evaluate(formula, assignment) == Some(false) || !self.consistent(assignment) {
            return;
        }

        let depth = assignment.len();
        if depth == vocabulary.len() {
            if self.extends(formula, rest, assignment) {
                self.models.push(assignment[..vocabulary.len()].iter().cloned().collect());
            }
            return;
        }

        for value in [true, false] {
            assignment.push((vocabulary[depth].clone(), value));
            self.enumerate(formula, vocabulary, rest, assignment);
            assignment.pop();
        }
    }

    /// Whether the assignment extends over `rest` to a theory model of the formula.
    ///
    /// Every completion is visited, so the conflicts of all of them are learned.
    fn extends(&mut self, formula: &Formula, rest: &[Atom], assignment: &mut Vec<(Atom, bool)>) -> bool {
        if evaluate(formula, assignment) == Some(false) {
            return false;
        }

        let Some((atom, rest)) = rest.split_first() else {
            return evaluate(formula, assignment) == Some(true);
        };
        let mut found = false;
        for value in [true, false] {
            assignment.push((atom.clone(), value));
            if self.consistent(assignment) && self.extends(formula, rest, assignment) {
                found = true;
            }
            assignment.pop();
        }
        found
    }
}

fn evaluate(formula: &Formula, assignment: &[(Atom, bool)]) -> Option<bool> {
    formula.evaluate(&|atom| assignment.iter().find(|(a, _)| a == atom).map(|&(_, v)| v))
}

impl TheoryEnumerator for DiffLogicSolver {
    fn check_all_sat(&mut self, phi: &Formula, mapping: Option<&BooleanMapping>) -> Result<SatResult> {
        if let Some(mapping) = mapping {
            validate_mapping(phi, mapping, &self.converter)?;
        }

        self.lemmas.clear();
        self.known.clear();
        self.models.clear();

        let phi = normalize(phi, &self.converter);
        let (formula, vocabulary) = match mapping {
            None => (phi.clone(), phi.atoms()),
            Some(mapping) => {
                let mut conjuncts = vec![phi.clone()];
                let mut vocabulary = Vec::with_capacity(mapping.len());
                for (name, atom) in mapping {
                    let prop = Formula::var(name.clone());
                    conjuncts.push(Formula::iff(prop, self.converter.convert(atom)));
                    vocabulary.push(Atom::Bool(name.clone()));
                }
                (Formula::and(conjuncts), vocabulary)
            }
        };
        let rest: Vec<Atom> = formula.atoms().into_iter().filter(|a| !vocabulary.contains(a)).collect();

        debug!(
            "All-SAT over {} vocabulary atoms ({} more existentially)",
            vocabulary.len(),
            rest.len()
        );
        let mut assignment = Vec::with_capacity(vocabulary.len() + rest.len());
        self.enumerate(&formula, &vocabulary, &rest, &mut assignment);
        debug!("All-SAT found {} models and {} lemmas", self.models.len(), self.lemmas.len());

        Ok(if self.models.is_empty() {
            SatResult::Unsat
        } else {
            SatResult::Sat
        })
    }

    fn get_theory_lemmas(&self) -> &[Formula] {
        &self.lemmas
    }

    fn get_models(&self) -> &[Model] {
        &self.models
    }

    fn get_converter(&self) -> &dyn AtomConverter {
        &self.converter
    }
}
