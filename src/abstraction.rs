//! Boolean abstraction of theory atoms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TddError};
use crate::formula::{Atom, Formula};

/// One row of the persisted abstraction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractionEntry {
    pub atom: Atom,
    pub prop: u32,
}

/// Bijection between atoms and diagram variables.
///
/// The atoms of the formula get the propositions `1..=k` in order of first
/// occurrence; atoms that only occur in lemmas (qvars) follow as `k+1..=n`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Abstraction {
    abstraction: BTreeMap<Atom, u32>,
    refinement: BTreeMap<u32, Atom>,
    num_phi_vars: usize,
}

impl Abstraction {
    pub fn new(phi: &Formula, lemmas: &[Formula]) -> Self {
        let mut result = Self::default();
        for atom in phi.atoms() {
            result.insert(atom);
        }
        result.num_phi_vars = result.refinement.len();
        for lemma in lemmas {
            for atom in lemma.atoms() {
                result.insert(atom);
            }
        }
        result
    }

    fn insert(&mut self, atom: Atom) {
        if !self.abstraction.contains_key(&atom) {
            let prop = self.refinement.len() as u32 + 1;
            self.abstraction.insert(atom.clone(), prop);
            self.refinement.insert(prop, atom);
        }
    }

    /// Rebuilds an abstraction from persisted entries.
    ///
    /// The propositions must be exactly `1..=n` and the atoms pairwise distinct.
    pub fn from_entries(entries: Vec<AbstractionEntry>, num_phi_vars: usize) -> Result<Self> {
        let mut result = Self::default();
        for entry in entries {
            if result.abstraction.insert(entry.atom.clone(), entry.prop).is_some() {
                return Err(TddError::Parse(format!("atom '{}' is abstracted twice", entry.atom)));
            }
            if result.refinement.insert(entry.prop, entry.atom).is_some() {
                return Err(TddError::Parse(format!("proposition {} is used twice", entry.prop)));
            }
        }
        let n = result.refinement.len() as u32;
        if result.refinement.keys().copied().ne(1..=n) {
            return Err(TddError::Parse("abstraction propositions are not contiguous from 1".to_string()));
        }
        if num_phi_vars > n as usize {
            return Err(TddError::Parse(format!(
                "{} formula propositions declared, but only {} exist",
                num_phi_vars, n
            )));
        }
        result.num_phi_vars = num_phi_vars;
        Ok(result)
    }

    pub fn entries(&self) -> Vec<AbstractionEntry> {
        self.refinement
            .iter()
            .map(|(&prop, atom)| AbstractionEntry { atom: atom.clone(), prop })
            .collect()
    }

    pub fn prop(&self, atom: &Atom) -> Option<u32> {
        self.abstraction.get(atom).copied()
    }

    pub fn atom(&self, prop: u32) -> Option<&Atom> {
        self.refinement.get(&prop)
    }

    /// Atom to proposition.
    pub fn abstraction(&self) -> &BTreeMap<Atom, u32> {
        &self.abstraction
    }

    /// Proposition to atom.
    pub fn refinement(&self) -> &BTreeMap<u32, Atom> {
        &self.refinement
    }

    pub fn num_vars(&self) -> usize {
        self.refinement.len()
    }

    /// Number of propositions standing for atoms of the formula.
    pub fn num_phi_vars(&self) -> usize {
        self.num_phi_vars
    }

    /// Atoms introduced by lemmas only.
    pub fn qvars(&self) -> Vec<Atom> {
        self.refinement.range(self.num_phi_vars as u32 + 1..).map(|(_, atom)| atom.clone()).collect()
    }

    pub fn qvar_props(&self) -> Vec<u32> {
        (self.num_phi_vars as u32 + 1..=self.num_vars() as u32).collect()
    }
}
