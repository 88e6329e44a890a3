use std::path::PathBuf;

use thiserror::Error;

use crate::formula::Atom;

pub type Result<T, E = TddError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum TddError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error: {0}")]
    Parse(String),

    /// A boolean mapping names an atom that does not occur in the enumerated formula.
    #[error("boolean mapping refers to '{0}', which does not occur in the formula")]
    UnknownMappedAtom(Atom),

    /// A formula reached the compiler with an atom that has no abstraction entry.
    #[error("atom '{0}' has no abstraction entry")]
    MissingAbstraction(Atom),

    #[error("{operation} is not supported by the {variant} variant")]
    NotSupported { variant: &'static str, operation: &'static str },

    #[error("storage size of 2^{0} slots is out of range 0..=31")]
    InvalidStorageBits(usize),

    #[error("invalid T-DD folder {path}: {reason}")]
    InvalidFolder { path: PathBuf, reason: String },
}
