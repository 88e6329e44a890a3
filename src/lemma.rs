//! Where the theory lemmas of a T-DD come from.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::info;

use crate::diagnostics::{keys, Diagnostics};
use crate::error::Result;
use crate::formula::Formula;
use crate::solver::{validate_mapping, BooleanMapping, SatResult, TheoryEnumerator};

/// Source of the theory lemmas, in priority order.
#[derive(Debug, Clone, Default)]
pub enum LemmaSource {
    /// Lemmas given by the caller.
    Supplied(Vec<Formula>),
    /// A lemma file, as written by [`save_lemmas`].
    File(PathBuf),
    /// Run All-SAT on the theory enumerator.
    #[default]
    Compute,
}

/// Vocabulary of the All-SAT enumeration.
#[derive(Debug, Clone, Default)]
pub enum AllSatVocabulary {
    /// Enumerate over the atoms of the formula.
    #[default]
    Atoms,
    /// Enumerate over the given propositions, each bound to an atom of the formula.
    Mapping(BooleanMapping),
}

/// Lemmas, together with the verdict when they were computed.
#[derive(Debug, Clone)]
pub struct Lemmas {
    pub lemmas: Vec<Formula>,
    pub sat_result: Option<SatResult>,
}

/// Resolves the lemmas for `phi` from `source`.
///
/// Records `ALL SMT mode` and, for computed lemmas, the All-SMT time and the
/// lemma and model counts.
pub fn extract(
    phi: &Formula,
    enumerator: &mut dyn TheoryEnumerator,
    source: &LemmaSource,
    vocabulary: &AllSatVocabulary,
    diagnostics: &mut Diagnostics,
    log_target: &str,
) -> Result<Lemmas> {
    match source {
        LemmaSource::Supplied(lemmas) => {
            info!(target: log_target, "Using {} supplied lemmas", lemmas.len());
            diagnostics.record(keys::ALL_SMT_MODE, "loaded");
            Ok(Lemmas {
                lemmas: lemmas.clone(),
                sat_result: None,
            })
        }
        LemmaSource::File(path) => {
            let lemmas = read_lemmas(path)?;
            info!(target: log_target, "Loaded {} lemmas from {}", lemmas.len(), path.display());
            diagnostics.record(keys::ALL_SMT_MODE, "loaded");
            Ok(Lemmas {
                lemmas,
                sat_result: None,
            })
        }
        LemmaSource::Compute => {
            let mapping = match vocabulary {
                AllSatVocabulary::Atoms => None,
                AllSatVocabulary::Mapping(mapping) => {
                    validate_mapping(phi, mapping, enumerator.get_converter())?;
                    Some(mapping)
                }
            };

            info!(target: log_target, "Computing All-SMT");
            let start = Instant::now();
            let sat_result = enumerator.check_all_sat(phi, mapping)?;
            diagnostics.record_time(keys::ALL_SMT_TIME, start.elapsed());

            let lemmas = enumerator.get_theory_lemmas().to_vec();
            diagnostics.record(keys::ALL_SMT_MODE, "computed");
            diagnostics.record(keys::LEMMAS_AMOUNT, lemmas.len());
            diagnostics.record(keys::MODELS_AMOUNT, enumerator.get_models().len());
            info!(
                target: log_target,
                "All-SMT: {:?} with {} models and {} lemmas",
                sat_result,
                enumerator.get_models().len(),
                lemmas.len()
            );
            Ok(Lemmas {
                lemmas,
                sat_result: Some(sat_result),
            })
        }
    }
}

/// Reads a lemma file: one `(assert ...)` per lemma.
pub fn read_lemmas(path: impl AsRef<Path>) -> Result<Vec<Formula>> {
    let text = fs::read_to_string(path)?;
    Formula::parse_script(&text)
}

/// Writes lemmas in the format read by [`read_lemmas`].
pub fn save_lemmas(path: impl AsRef<Path>, lemmas: &[Formula]) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    for lemma in lemmas {
        writeln!(file, "(assert {})", lemma)?;
    }
    file.flush()?;
    Ok(())
}

/// Pads the lemma list with `true` up to two elements.
pub fn pad_lemmas(mut lemmas: Vec<Formula>) -> Vec<Formula> {
    while lemmas.len() < 2 {
        lemmas.push(Formula::top());
    }
    lemmas
}
