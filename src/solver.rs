//! Solve pipeline: compile, normalize, profile, pick a strategy, run the
//! chosen engine and package the result.

use std::collections::BTreeSet;
use std::time::Instant;

use log::debug;

use crate::analysis::{analyze, Verdict};
use crate::cfg::Cfg;
use crate::error::SolveError;
use crate::exec;
use crate::normalize::normalize;
use crate::parser::compile;
use crate::profile::{self, ParamProfile};
use crate::program::Program;
use crate::strategy::{self, Strategy};

/// A solved program: the strategy that produced the answer and the set of
/// reachable return values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub strategy: Strategy,
    pub values: BTreeSet<i64>,
}

/// Computes the reachable return values of a decision program.
///
/// `forced` pins the strategy; otherwise the heuristic picks one, and an
/// unsound static result falls back to exhaustive execution. With
/// `dry_run` the pipeline stops after strategy selection and reports an
/// empty value set.
pub fn solve(
    source: &str,
    forced: Option<Strategy>,
    dry_run: bool,
) -> Result<Solution, SolveError> {
    let start = Instant::now();

    let mut program = compile(source).map_err(SolveError::Compilation)?;
    normalize(&mut program);
    let profile = profile::extract(&program);

    let chosen = forced.unwrap_or_else(|| strategy::select(&program, &profile));
    if dry_run {
        debug!("dry run, stopping after strategy selection");
        return Ok(Solution {
            strategy: chosen,
            values: BTreeSet::new(),
        });
    }

    let solution = match chosen {
        Strategy::Static => match analyze(&Cfg::build(&program)) {
            Verdict::Sound(values) => Solution {
                strategy: Strategy::Static,
                values,
            },
            Verdict::Unsound if forced.is_some() => return Err(SolveError::Unsound),
            Verdict::Unsound => {
                debug!("static analysis unsound, falling back to exhaustive execution");
                run_dynamic(&program, &profile)?
            }
        },
        Strategy::Dynamic => run_dynamic(&program, &profile)?,
    };

    debug!(
        "solved with {:?} strategy in {:.2?}: {} value(s)",
        solution.strategy,
        start.elapsed(),
        solution.values.len()
    );
    Ok(solution)
}

fn run_dynamic(program: &Program, profile: &ParamProfile) -> Result<Solution, SolveError> {
    let values = exec::execute_all_cases(|args| program.run(args), profile.count)?;
    Ok(Solution {
        strategy: Strategy::Dynamic,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_compilation_failure_short_circuits() {
        let err = solve("x = ;", None, false).unwrap_err();
        match err {
            SolveError::Compilation(diags) => assert!(!diags.is_empty()),
            other => panic!("expected compilation error, got {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_reports_strategy_only() {
        let solution = solve(
            "x = 1; if (p[0] && p[20]) { x = 2; } return x;",
            None,
            true,
        )
        .unwrap();
        assert_eq!(solution.strategy, Strategy::Static);
        assert!(solution.values.is_empty());
    }

    #[test]
    fn test_forced_strategy_wins_in_dry_run() {
        let solution = solve(
            "x = 1; if (p[0] && p[20]) { x = 2; } return x;",
            Some(Strategy::Dynamic),
            true,
        )
        .unwrap();
        assert_eq!(solution.strategy, Strategy::Dynamic);
    }
}
