//! Solver error taxonomy.

use thiserror::Error;

use crate::eval::RuntimeFault;
use crate::parser::Diagnostic;

#[derive(Debug, Error)]
pub enum SolveError {
    /// The source did not compile; diagnostics carry the details.
    #[error("compilation failed with {} diagnostic(s)", .0.len())]
    Compilation(Vec<Diagnostic>),

    /// Too many parameters for exhaustive enumeration.
    #[error("cannot enumerate {count} parameters (limit {max})")]
    Capacity { count: usize, max: usize },

    /// Static analysis lost precision and was explicitly requested.
    #[error("static analysis cannot produce a sound result for this program")]
    Unsound,

    /// A concrete execution faulted during enumeration.
    #[error("execution fault: {0}")]
    RuntimeFault(String),
}

impl From<RuntimeFault> for SolveError {
    fn from(fault: RuntimeFault) -> Self {
        SolveError::RuntimeFault(fault.0)
    }
}
