//! Strategy selection.
//!
//! Chooses between static analysis and exhaustive execution. Exhaustive
//! execution is exact but exponential in the parameter count; static
//! analysis is linear but can lose precision. The heuristic prefers the
//! analyzer only for wide programs it is known to handle well: all
//! parameter indices statically known and in range, at least
//! [`STATIC_PARAM_THRESHOLD`] parameters, and no arithmetic over the result
//! variable inside branch conditions.

use log::debug;

use crate::profile::ParamProfile;
use crate::program::Program;

/// How the reachable-value set gets computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Dataflow analysis over the CFG.
    Static,
    /// Exhaustive execution over all parameter vectors.
    Dynamic,
}

/// Minimum parameter count before static analysis pays off.
pub const STATIC_PARAM_THRESHOLD: usize = 20;

/// Picks the strategy for a program with the given parameter profile.
pub fn select(program: &Program, profile: &ParamProfile) -> Strategy {
    let chosen = if profile.indices_known
        && !profile.out_of_bounds()
        && profile.count >= STATIC_PARAM_THRESHOLD
        && !has_arithmetic_with_result_var(program)
    {
        Strategy::Static
    } else {
        Strategy::Dynamic
    };
    debug!("selected strategy {:?}", chosen);
    chosen
}

/// Whether any branch condition both reads the result variable and contains
/// a binary expression strictly below the condition root. `x == 2` narrows
/// cleanly; `x + 1 - 1 == 2` does not, and exhaustive execution is the
/// better fit for such programs.
pub fn has_arithmetic_with_result_var(program: &Program) -> bool {
    let mut found = false;
    program.for_each_cond(&mut |cond| {
        if cond.contains_var() && cond.has_binary_descendant() {
            found = true;
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::compile;
    use crate::profile;

    fn select_for(source: &str) -> Strategy {
        let program = compile(source).unwrap();
        let profile = profile::extract(&program);
        select(&program, &profile)
    }

    #[test]
    fn test_narrow_program_is_dynamic() {
        // Below the parameter threshold.
        assert_eq!(
            select_for("x = 1; if (p[0]) { x = 2; } return x;"),
            Strategy::Dynamic
        );
    }

    #[test]
    fn test_wide_program_is_static() {
        assert_eq!(
            select_for("x = 1; if (p[0] && p[20]) { x = 2; } return x;"),
            Strategy::Static
        );
    }

    #[test]
    fn test_unknown_index_is_dynamic() {
        assert_eq!(
            select_for(
                "x = 1;\n\
                 if (p[22]) {\n\
                     x = 2;\n\
                     if (p[24 - x]) { x = 3; }\n\
                 }\n\
                 return x;",
            ),
            Strategy::Dynamic
        );
    }

    #[test]
    fn test_negative_index_is_dynamic() {
        assert_eq!(
            select_for("x = 1; if (p[-1] && p[20]) { x = 2; } return x;"),
            Strategy::Dynamic
        );
    }

    #[test]
    fn test_plain_result_equality_is_static() {
        // `x == 2` has no binary expression below the comparison root.
        assert_eq!(
            select_for(
                "x = 1;\n\
                 if (p[30]) {\n\
                     x = 2;\n\
                     if (x == 2) { x = 3; }\n\
                 }\n\
                 return x;",
            ),
            Strategy::Static
        );
    }

    #[test]
    fn test_result_arithmetic_is_dynamic() {
        assert_eq!(
            select_for(
                "x = 1;\n\
                 if (p[30]) {\n\
                     x = 2;\n\
                     if (x + 1 - 1 == 2) { x = 3; }\n\
                 }\n\
                 return x;",
            ),
            Strategy::Dynamic
        );
    }

    #[test]
    fn test_no_params_is_dynamic() {
        // Zero parameters never reach the threshold.
        assert_eq!(select_for("x = 1; return x;"), Strategy::Dynamic);
    }
}
