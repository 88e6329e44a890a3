//! # theory-dd: Theory Decision Diagrams
//!
//! A **Theory Decision Diagram** (T-DD) is a canonical decision diagram whose
//! models are exactly the theory-consistent truth assignments to the atoms of
//! a formula. It is built in the following steps:
//!
//! 1. Normalize the formula, so that equivalent atoms become identical.
//! 2. Extract theory lemmas by All-SAT enumeration (or load them).
//! 3. Abstract every atom to a boolean proposition.
//! 4. Compile the formula and the conjunction of lemmas.
//! 5. Existentially eliminate the atoms that occur only in lemmas.
//! 6. Conjoin the results.
//!
//! Two diagram variants are provided: complement-edge BDDs
//! ([`TheoryBdd`][crate::tdd::TheoryBdd]) and ZDDs ([`TheoryZdd`][crate::tdd::TheoryZdd]).
//!
//! ## Basic Usage
//!
//! ```rust
//! use theory_dd::formula::Formula;
//! use theory_dd::solver::DiffLogicSolver;
//! use theory_dd::tdd::{TddOptions, TheoryBdd, TheoryDD};
//!
//! let phi = Formula::parse("(and (or p (< (- x y) 0)) (< (- y x) 0))").unwrap();
//! let mut solver = DiffLogicSolver::new();
//! let (tdd, diagnostics) = TheoryBdd::build(&phi, &mut solver, TddOptions::default()).unwrap();
//!
//! // y < x forces x < y to be false, hence p.
//! assert_eq!(tdd.count_models(), 1u32.into());
//! assert!(tdd.is_sat());
//! assert!(diagnostics.time("total DD building time").is_some());
//! ```
//!
//! ## Core Components
//!
//! - **[`tdd`]**: Building, querying and persisting T-DDs.
//! - **[`solver`]**: The All-SAT theory enumerator for difference logic.
//! - **[`backend`]**: The decision-diagram interface and its BDD and ZDD sessions.
//! - **[`bdd`]**, **[`zdd`]**: The diagram managers.

pub mod abstraction;
pub mod backend;
pub mod bdd;
pub mod cache;
pub mod compile;
pub mod diagnostics;
pub mod dot;
pub mod error;
pub mod formula;
pub mod io;
pub mod lemma;
pub mod node;
pub mod normalize;
pub mod paths;
pub mod reference;
pub mod sat;
pub mod solver;
pub mod table;
pub mod tdd;
pub mod theory;
pub mod utils;
pub mod zdd;
