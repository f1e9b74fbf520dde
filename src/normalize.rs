//! Predicate normalizer.
//!
//! The literal-tracking analyzer only narrows on equality comparisons
//! against a tracked variable; a bare boolean parameter read in an `if`
//! condition would pass through un-narrowed. This pass rewrites every
//! `p[e]` inside `if` conditions into `p[e] == true` so that
//! `p[0] && !p[0]` folds to never-taken the same way
//! `p[0] == true && p[0] == false` does. The rewrite is
//! semantics-preserving at runtime and a precision aid only.

use crate::program::{Cond, Program, Stmt};

/// Rewrites every bare parameter read in an `if` condition into an
/// explicit `== true` comparison. Total over the program shape.
pub fn normalize(program: &mut Program) {
    normalize_stmts(&mut program.body);
}

fn normalize_stmts(stmts: &mut [Stmt]) {
    for stmt in stmts {
        if let Stmt::If {
            cond,
            then_body,
            else_body,
        } = stmt
        {
            normalize_cond(cond);
            normalize_stmts(then_body);
            normalize_stmts(else_body);
        }
    }
}

fn normalize_cond(cond: &mut Cond) {
    match cond {
        Cond::Param(index) => {
            let index = std::mem::replace(index, crate::program::IntExpr::Lit(0));
            *cond = Cond::ParamEq(index, true);
        }
        Cond::Not(inner) => normalize_cond(inner),
        Cond::And(a, b) | Cond::Or(a, b) => {
            normalize_cond(a);
            normalize_cond(b);
        }
        // Already an equality, or opaque to the analyzer: left untouched.
        Cond::ParamEq(_, _) | Cond::Cmp(_, _, _) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::compile;
    use crate::program::IntExpr;

    fn normalized(source: &str) -> Program {
        let mut program = compile(source).unwrap();
        normalize(&mut program);
        program
    }

    #[test]
    fn test_bare_read_is_wrapped() {
        let program = normalized("x = 1; if (p[0]) { x = 2; } return x;");
        let mut conds = Vec::new();
        program.for_each_cond(&mut |c| conds.push(c.clone()));
        assert_eq!(conds, vec![Cond::ParamEq(IntExpr::Lit(0), true)]);
    }

    #[test]
    fn test_negated_and_conjoined_reads_are_wrapped() {
        let program = normalized("x = 1; if (p[0] && !p[0]) { x = 2; } return x;");
        let mut conds = Vec::new();
        program.for_each_cond(&mut |c| conds.push(c.clone()));
        assert_eq!(
            conds[0],
            Cond::And(
                Box::new(Cond::ParamEq(IntExpr::Lit(0), true)),
                Box::new(Cond::Not(Box::new(Cond::ParamEq(IntExpr::Lit(0), true)))),
            )
        );
    }

    #[test]
    fn test_existing_equality_untouched() {
        let program = normalized("x = 1; if (p[0] == false) { x = 2; } return x;");
        let mut conds = Vec::new();
        program.for_each_cond(&mut |c| conds.push(c.clone()));
        assert_eq!(conds, vec![Cond::ParamEq(IntExpr::Lit(0), false)]);
    }

    #[test]
    fn test_nested_if_conditions_are_wrapped() {
        let program = normalized(
            "x = 1;\n\
             if (p[0]) {\n\
                 if (!p[1]) { x = 2; }\n\
             }\n\
             return x;",
        );
        let mut conds = Vec::new();
        program.for_each_cond(&mut |c| conds.push(c.clone()));
        assert_eq!(conds.len(), 2);
        assert_eq!(
            conds[1],
            Cond::Not(Box::new(Cond::ParamEq(IntExpr::Lit(1), true)))
        );
    }

    #[test]
    fn test_opaque_comparison_untouched() {
        let program = normalized("x = 1; if (x + 1 - 1 == 2) { x = 2; } return x;");
        let mut conds = Vec::new();
        program.for_each_cond(&mut |c| conds.push(c.clone()));
        assert!(matches!(conds[0], Cond::Cmp(_, _, _)));
    }
}
