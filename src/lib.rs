//! Reachable return-value solver for boolean-parameterized decision
//! functions.
//!
//! Given a small decision program (integer result variable, `if` branches
//! over a boolean parameter vector, single final `return`), the solver
//! computes the exact set of values the program can return over all
//! parameter assignments. Two engines are available: a path-sensitive
//! static analysis over the program's CFG with a bounded literal-set
//! lattice, and an exhaustive parallel execution over all parameter
//! vectors. A heuristic picks between them; a soundness audit triggers
//! fallback from static to exhaustive when the lattice cap loses
//! precision.

pub mod analysis;
pub mod audit;
pub mod cfg;
pub mod error;
pub mod eval;
pub mod exec;
pub mod lattice;
pub mod normalize;
pub mod parser;
pub mod profile;
pub mod program;
pub mod solver;
pub mod strategy;

pub use error::SolveError;
pub use parser::Diagnostic;
pub use solver::{solve, Solution};
pub use strategy::Strategy;
