//! Theory Decision Diagrams.
//!
//! A T-DD is the decision diagram of `phi ∧ ∃ qvars. AND(lemmas)` over the
//! boolean abstraction of `phi` and its theory lemmas. Its models are exactly
//! the abstractions of `phi` that extend to a theory model.
//!
//! ```
//! use theory_dd::formula::Formula;
//! use theory_dd::solver::DiffLogicSolver;
//! use theory_dd::tdd::{TddOptions, TheoryBdd, TheoryDD};
//!
//! let phi = Formula::parse("(or (< (- x y) 0) (< (- y x) 0))").unwrap();
//! let mut solver = DiffLogicSolver::new();
//! let (tdd, _diagnostics) = TheoryBdd::build(&phi, &mut solver, TddOptions::default()).unwrap();
//!
//! // x < y and y < x cannot hold together.
//! assert_eq!(tdd.count_models(), 2u32.into());
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;

use log::{debug, info};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::abstraction::{Abstraction, AbstractionEntry};
use crate::backend::{BddSession, DiagramBackend, ZddSession};
use crate::compile::Compiler;
use crate::diagnostics::{keys, Diagnostics};
use crate::error::{Result, TddError};
use crate::formula::{Atom, Formula};
use crate::lemma::{extract, pad_lemmas, AllSatVocabulary, LemmaSource, Lemmas};
use crate::normalize::normalize;
use crate::solver::{SatResult, TheoryEnumerator};

const DIAGRAM_FILE: &str = "diagram.dd";
const ABSTRACTION_FILE: &str = "abstraction.json";
const METADATA_FILE: &str = "metadata.json";

/// Largest table size accepted by the managers, as a power of two.
pub const MAX_STORAGE_BITS: usize = 31;

/// An assignment of truth values to atoms.
pub type Assignment = BTreeMap<Atom, bool>;

/// Build configuration.
#[derive(Debug, Clone)]
pub struct TddOptions {
    pub lemmas: LemmaSource,
    /// A verdict known in advance; overrides the one computed with the lemmas.
    pub sat_result: Option<SatResult>,
    pub vocabulary: AllSatVocabulary,
    /// Initial capacity of the node table, as a power of two.
    pub storage_bits: usize,
    pub log_target: String,
}

impl TddOptions {
    fn storage_bits(&self) -> Result<usize> {
        if self.storage_bits > MAX_STORAGE_BITS {
            return Err(TddError::InvalidStorageBits(self.storage_bits));
        }
        Ok(self.storage_bits)
    }
}

impl Default for TddOptions {
    fn default() -> Self {
        Self {
            lemmas: LemmaSource::Compute,
            sat_result: None,
            vocabulary: AllSatVocabulary::Atoms,
            storage_bits: 16,
            log_target: "theory_dd".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    variant: String,
    node_count: usize,
    /// Decimal, since the count may exceed any machine integer.
    model_count: String,
    num_vars: usize,
    num_phi_vars: usize,
    qvars: Vec<Atom>,
}

/// A built T-DD over the backend `B`.
pub struct TheoryDd<B: DiagramBackend> {
    manager: B,
    root: B::Node,
    abstraction: Abstraction,
    log_target: String,
}

/// T-DD over the complement-edge BDD backend.
pub type TheoryBdd = TheoryDd<BddSession>;

/// T-DD over the ZDD backend. It cannot eliminate fresh atoms.
pub type TheoryZdd = TheoryDd<ZddSession>;

impl<B: DiagramBackend> TheoryDd<B> {
    pub fn build(
        phi: &Formula,
        enumerator: &mut dyn TheoryEnumerator,
        options: TddOptions,
    ) -> Result<(Self, Diagnostics)> {
        let storage_bits = options.storage_bits()?;
        let target = options.log_target.as_str();
        let mut diagnostics = Diagnostics::default();
        let total = Instant::now();
        info!(target: target, "Building {} T-DD", B::VARIANT);

        let start = Instant::now();
        let phi = normalize(phi, enumerator.get_converter());
        diagnostics.record_time(keys::PHI_NORMALIZATION_TIME, start.elapsed());
        info!(target: target, "Normalized phi in {:?}", start.elapsed());

        let start = Instant::now();
        let Lemmas { lemmas, sat_result } = extract(
            &phi,
            enumerator,
            &options.lemmas,
            &options.vocabulary,
            &mut diagnostics,
            target,
        )?;
        let converter = enumerator.get_converter();
        let lemmas = pad_lemmas(lemmas.iter().map(|lemma| normalize(lemma, converter)).collect());
        diagnostics.record_time(keys::LEMMAS_LOADING_TIME, start.elapsed());
        info!(target: target, "Prepared {} lemmas in {:?}", lemmas.len(), start.elapsed());
        let sat_result = options.sat_result.or(sat_result);

        let start = Instant::now();
        let abstraction = Abstraction::new(&phi, &lemmas);
        let manager = B::with_vars(abstraction.num_vars(), storage_bits);
        diagnostics.record_time(keys::VARIABLE_MAPPING_TIME, start.elapsed());
        info!(
            target: target,
            "Abstraction with {} propositions ({} fresh) in {:?}",
            abstraction.num_vars(),
            abstraction.num_vars() - abstraction.num_phi_vars(),
            start.elapsed()
        );

        let root = {
            let mut compiler = Compiler::new(&manager, &abstraction);

            if sat_result == Some(SatResult::Unsat) {
                let start = Instant::now();
                let root = compiler.compile(&Formula::bottom())?;
                diagnostics.record_time(keys::UNSAT_DD_TIME, start.elapsed());
                info!(target: target, "phi is UNSAT, built the false diagram in {:?}", start.elapsed());
                root
            } else {
                let start = Instant::now();
                let phi_dd = compiler.compile(&phi)?;
                diagnostics.record_time(keys::PHI_DD_TIME, start.elapsed());
                info!(target: target, "Built phi DD in {:?}", start.elapsed());

                let start = Instant::now();
                let lemmas_dd = compiler.compile(&Formula::big_and(&lemmas))?;
                diagnostics.record_time(keys::LEMMAS_DD_TIME, start.elapsed());
                info!(target: target, "Built lemmas DD in {:?}", start.elapsed());

                let start = Instant::now();
                let qvars = abstraction.qvar_props();
                let lemmas_dd = if qvars.is_empty() {
                    lemmas_dd
                } else {
                    manager.exists(lemmas_dd, &qvars)?
                };
                diagnostics.record_time(keys::QUANTIFICATION_TIME, start.elapsed());
                info!(target: target, "Eliminated {} fresh atoms in {:?}", qvars.len(), start.elapsed());

                let start = Instant::now();
                let root = manager.conjoin(phi_dd, lemmas_dd);
                diagnostics.record_time(keys::JOINING_TIME, start.elapsed());
                info!(target: target, "Joined phi and lemmas DDs in {:?}", start.elapsed());
                root
            }
        };

        diagnostics.record_time(keys::TOTAL_TIME, total.elapsed());
        info!(target: target, "Built {} T-DD in {:?}", B::VARIANT, total.elapsed());

        let tdd = Self {
            manager,
            root,
            abstraction,
            log_target: options.log_target.clone(),
        };
        Ok((tdd, diagnostics))
    }

    /// Reloads a T-DD written by [`TheoryDD::save_to_folder`].
    pub fn load_from_folder(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_folder_with(path, &TddOptions::default())
    }

    /// Like [`TheoryDd::load_from_folder`], taking the storage size and log target from `options`.
    pub fn load_from_folder_with(path: impl AsRef<Path>, options: &TddOptions) -> Result<Self> {
        let path = path.as_ref();
        let storage_bits = options.storage_bits()?;
        let invalid = |reason: String| TddError::InvalidFolder {
            path: path.to_path_buf(),
            reason,
        };
        if !path.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }

        let metadata: Metadata = serde_json::from_str(&fs::read_to_string(path.join(METADATA_FILE))?)?;
        if metadata.variant != B::VARIANT {
            return Err(invalid(format!(
                "saved as '{}', loading as '{}'",
                metadata.variant,
                B::VARIANT
            )));
        }

        let entries: Vec<AbstractionEntry> = serde_json::from_str(&fs::read_to_string(path.join(ABSTRACTION_FILE))?)?;
        let abstraction = Abstraction::from_entries(entries, metadata.num_phi_vars)?;
        if abstraction.num_vars() != metadata.num_vars || abstraction.qvars() != metadata.qvars {
            return Err(invalid("abstraction table disagrees with the metadata".to_string()));
        }

        let text = fs::read_to_string(path.join(DIAGRAM_FILE))?;
        let (_, num_vars) = crate::io::parse_header(&text, B::VARIANT)?;
        if num_vars != metadata.num_vars {
            return Err(invalid(format!(
                "diagram is over {} variables, the metadata records {}",
                num_vars, metadata.num_vars
            )));
        }
        let (manager, root) = B::restore(&text, storage_bits)?;
        let tdd = Self {
            manager,
            root,
            abstraction,
            log_target: options.log_target.clone(),
        };

        let model_count = BigUint::from_str(&metadata.model_count)
            .map_err(|_| invalid(format!("invalid model count '{}'", metadata.model_count)))?;
        if tdd.count_nodes() != metadata.node_count || tdd.count_models() != model_count {
            return Err(invalid("diagram disagrees with the metadata".to_string()));
        }

        info!(target: tdd.log_target.as_str(), "Loaded {} T-DD from {}", B::VARIANT, path.display());
        Ok(tdd)
    }

    pub fn root(&self) -> B::Node {
        self.root
    }

    pub fn manager(&self) -> &B {
        &self.manager
    }

    fn refine(&self, bits: &[bool]) -> Assignment {
        bits.iter()
            .enumerate()
            .filter_map(|(i, &value)| self.abstraction.atom(i as u32 + 1).map(|atom| (atom.clone(), value)))
            .collect()
    }

    fn label(&self, prop: u32) -> String {
        match self.abstraction.atom(prop) {
            Some(atom) => atom.to_string(),
            None => format!("x{}", prop),
        }
    }
}

/// The query and persistence surface shared by every T-DD variant.
#[allow(clippy::len_without_is_empty)]
pub trait TheoryDD {
    fn variant(&self) -> &'static str;

    /// Reachable decision nodes.
    fn count_nodes(&self) -> usize;

    /// Reachable nodes, terminals included.
    fn count_vertices(&self) -> usize;

    fn len(&self) -> usize {
        self.count_nodes()
    }

    /// Models over the propositions of the formula's atoms.
    fn count_models(&self) -> BigUint;

    /// One model, translated back to atoms.
    fn pick(&self) -> Option<Assignment>;

    fn pick_all(&self) -> Vec<Assignment> {
        self.pick_all_iter().collect()
    }

    /// Lazily enumerates all models. Every call starts a new traversal.
    fn pick_all_iter(&self) -> Box<dyn Iterator<Item = Assignment> + '_>;

    fn is_sat(&self) -> bool;

    fn is_valid(&self) -> bool;

    fn abstraction(&self) -> &BTreeMap<Atom, u32>;

    fn refinement(&self) -> &BTreeMap<u32, Atom>;

    fn qvars(&self) -> Vec<Atom>;

    fn get_mapping(&self) -> &Abstraction;

    fn save_to_folder(&self, path: &Path) -> Result<()>;

    /// Writes the diagram as a Graphviz file labelled with atoms.
    fn graphic_dump(&self, path: &Path) -> Result<()>;
}

impl<B: DiagramBackend> TheoryDD for TheoryDd<B> {
    fn variant(&self) -> &'static str {
        B::VARIANT
    }

    fn count_nodes(&self) -> usize {
        self.manager.node_count(self.root)
    }

    fn count_vertices(&self) -> usize {
        self.manager.vertex_count(self.root)
    }

    fn count_models(&self) -> BigUint {
        self.manager.model_count(self.root, self.abstraction.num_phi_vars())
    }

    fn pick(&self) -> Option<Assignment> {
        let bits = self.manager.pick(self.root, self.abstraction.num_phi_vars())?;
        Some(self.refine(&bits))
    }

    fn pick_all_iter(&self) -> Box<dyn Iterator<Item = Assignment> + '_> {
        let models = self.manager.models(self.root, self.abstraction.num_phi_vars());
        Box::new(models.map(move |bits| self.refine(&bits)))
    }

    fn is_sat(&self) -> bool {
        !self.manager.is_false(self.root)
    }

    fn is_valid(&self) -> bool {
        self.manager.is_true(self.root)
    }

    fn abstraction(&self) -> &BTreeMap<Atom, u32> {
        self.abstraction.abstraction()
    }

    fn refinement(&self) -> &BTreeMap<u32, Atom> {
        self.abstraction.refinement()
    }

    fn qvars(&self) -> Vec<Atom> {
        self.abstraction.qvars()
    }

    fn get_mapping(&self) -> &Abstraction {
        &self.abstraction
    }

    fn save_to_folder(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;

        fs::write(path.join(DIAGRAM_FILE), self.manager.dump(self.root))?;
        fs::write(
            path.join(ABSTRACTION_FILE),
            serde_json::to_string_pretty(&self.abstraction.entries())?,
        )?;

        let metadata = Metadata {
            variant: B::VARIANT.to_string(),
            node_count: self.count_nodes(),
            model_count: self.count_models().to_string(),
            num_vars: self.abstraction.num_vars(),
            num_phi_vars: self.abstraction.num_phi_vars(),
            qvars: self.qvars(),
        };
        fs::write(path.join(METADATA_FILE), serde_json::to_string_pretty(&metadata)?)?;

        info!(target: self.log_target.as_str(), "Saved {} T-DD to {}", B::VARIANT, path.display());
        Ok(())
    }

    fn graphic_dump(&self, path: &Path) -> Result<()> {
        let dot = self.manager.to_dot(self.root, &|prop| self.label(prop))?;
        fs::write(path, dot)?;
        debug!(target: self.log_target.as_str(), "Wrote DOT to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::solver::DiffLogicSolver;

    fn build(text: &str, options: TddOptions) -> (TheoryBdd, Diagnostics) {
        let phi = Formula::parse(text).unwrap();
        let mut solver = DiffLogicSolver::new();
        TheoryBdd::build(&phi, &mut solver, options).unwrap()
    }

    #[test]
    fn test_trivial_atom_scenario() {
        // `a` is a ground atom: it folds to true and needs no lemmas.
        let (tdd, _) = build("(and (or x y) (=> y (<= (- z z) 1)))", TddOptions::default());

        assert_eq!(tdd.count_models(), BigUint::from(3u32));
        assert!(tdd.is_sat());
        assert!(!tdd.is_valid());

        let x = Atom::Bool("x".to_string());
        let y = Atom::Bool("y".to_string());
        let mut models: Vec<(bool, bool)> = tdd.pick_all().iter().map(|m| (m[&x], m[&y])).collect();
        models.sort();
        assert_eq!(models, vec![(false, true), (true, false), (true, true)]);
    }

    #[test]
    fn test_unsat_verdict_gives_false() {
        let (tdd, diagnostics) = build(
            "(and (< (- x y) 0) (< (- y z) 0) (< (- z x) 0))",
            TddOptions::default(),
        );
        assert!(!tdd.is_sat());
        assert_eq!(tdd.count_models(), BigUint::from(0u32));
        assert_eq!(tdd.pick(), None);
        assert!(diagnostics.time(keys::UNSAT_DD_TIME).is_some());
        assert!(diagnostics.time(keys::PHI_DD_TIME).is_none());
    }

    #[test]
    fn test_diagnostics_keys() {
        let (_, diagnostics) = build("(or (< (- x y) 0) p)", TddOptions::default());
        for key in [
            keys::PHI_NORMALIZATION_TIME,
            keys::LEMMAS_LOADING_TIME,
            keys::VARIABLE_MAPPING_TIME,
            keys::PHI_DD_TIME,
            keys::LEMMAS_DD_TIME,
            keys::QUANTIFICATION_TIME,
            keys::JOINING_TIME,
            keys::TOTAL_TIME,
            keys::ALL_SMT_TIME,
        ] {
            assert!(diagnostics.time(key).is_some(), "missing {}", key);
        }
        assert_eq!(diagnostics.get(keys::ALL_SMT_MODE), Some(&serde_json::json!("computed")));
    }

    #[test]
    fn test_pick_all_iter_restarts() {
        let (tdd, _) = build("(or p q r)", TddOptions::default());
        let first: Vec<_> = tdd.pick_all_iter().collect();
        let second: Vec<_> = tdd.pick_all_iter().collect();
        assert_eq!(first.len(), 7);
        assert_eq!(first, second);
        let picked = tdd.pick().unwrap();
        assert!(first.contains(&picked));
    }

    #[test]
    fn test_storage_bits_out_of_range() {
        let phi = Formula::parse("(or p q)").unwrap();
        let options = TddOptions {
            storage_bits: 40,
            ..TddOptions::default()
        };
        assert!(matches!(
            TheoryBdd::build(&phi, &mut DiffLogicSolver::new(), options.clone()),
            Err(TddError::InvalidStorageBits(40))
        ));
        assert!(matches!(
            TheoryZdd::build(&phi, &mut DiffLogicSolver::new(), options.clone()),
            Err(TddError::InvalidStorageBits(40))
        ));

        let dir = tempfile::tempdir().unwrap();
        let (tdd, _) = build("(or p q)", TddOptions::default());
        tdd.save_to_folder(dir.path()).unwrap();
        assert!(matches!(
            TheoryBdd::load_from_folder_with(dir.path(), &options),
            Err(TddError::InvalidStorageBits(40))
        ));

        let options = TddOptions {
            storage_bits: MAX_STORAGE_BITS,
            ..TddOptions::default()
        };
        assert_eq!(options.storage_bits().unwrap(), MAX_STORAGE_BITS);
    }

    #[test]
    fn test_sizes() {
        let (tdd, _) = build("(and p q)", TddOptions::default());
        assert_eq!(tdd.count_nodes(), 2);
        assert_eq!(tdd.len(), 2);
        assert_eq!(tdd.count_vertices(), 4);

        let (tdd, _) = build("(or p (not p))", TddOptions::default());
        assert!(tdd.is_valid());
        assert_eq!(tdd.count_nodes(), 0);
        assert_eq!(tdd.count_vertices(), 1);
    }
}
