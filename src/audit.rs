//! Soundness audit of the dataflow result.
//!
//! The literal-set cap widens to "may be non-literal" when a join grows too
//! large. That widening is indistinguishable, at a return point, from a
//! value that was genuinely never literal, so the audit looks for the
//! telltale shape of cap loss: a block entered with a non-literal variable
//! whose reachable predecessors all exit with that variable fully literal.
//! Such a state can only be produced by the capped join itself.

use log::debug;

use crate::analysis::BlockStates;
use crate::cfg::Cfg;

/// Whether any block shows cap-induced precision loss.
pub fn has_precision_loss(cfg: &Cfg, states: &BlockStates) -> bool {
    for (id, block) in cfg.blocks.iter().enumerate() {
        let Some(entering) = &states.entry[id] else {
            continue;
        };
        for (var, value) in entering.tracked() {
            if !value.may_be_non_literal {
                continue;
            }
            // Predecessors that were never reached have no exit state and
            // contributed nothing to this block's entering join.
            let reachable_preds: Vec<_> = block
                .preds
                .iter()
                .filter(|&&pred| states.exit[pred].is_some())
                .collect();
            // The entry block has no predecessors; its non-literal values
            // are initial, not cap-induced.
            if reachable_preds.is_empty() {
                continue;
            }
            let all_preds_literal = reachable_preds.iter().all(|&&pred| {
                states.exit[pred]
                    .as_ref()
                    .is_some_and(|exit| exit.tracks(var) && exit.get(var).is_fully_literal())
            });
            if all_preds_literal {
                debug!(
                    "block {} enters with non-literal {:?} but every predecessor exits literal",
                    id, var
                );
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::analysis::{analyze, Verdict};
    use crate::cfg::Cfg;
    use crate::normalize::normalize;
    use crate::parser::compile;
    use test_log::test;

    fn verdict_of(source: &str) -> Verdict {
        let mut program = compile(source).unwrap();
        normalize(&mut program);
        analyze(&Cfg::build(&program))
    }

    fn cascade(branches: usize) -> String {
        let mut source = String::from("x = 1;\n");
        for i in 0..branches {
            source.push_str(&format!("if (p[{}]) {{ x = {}; }}\n", i, i + 2));
        }
        source.push_str("return x;");
        source
    }

    #[test]
    fn test_loss_flagged_when_join_exceeds_cap() {
        // Ten branches produce eleven candidate values at the final join.
        assert_eq!(verdict_of(&cascade(10)), Verdict::Unsound);
    }

    #[test]
    fn test_no_loss_at_exactly_the_cap() {
        assert!(matches!(verdict_of(&cascade(9)), Verdict::Sound(_)));
    }

    #[test]
    fn test_dead_branch_does_not_trigger_loss() {
        // The contradictory branch never runs; its block is unreachable and
        // must not count as a literal predecessor of the join.
        let verdict = verdict_of(
            "x = 1;\n\
             if (p[0] && !p[0]) { x = 2; }\n\
             return x;",
        );
        assert_eq!(verdict, Verdict::Sound([1].into_iter().collect()));
    }
}
