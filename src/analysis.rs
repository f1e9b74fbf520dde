//! Reachable-value analysis.
//!
//! Forward dataflow fixpoint over the CFG, tracking the literal-set value of
//! the result variable plus one synthetic variable per statically-indexed
//! parameter. Branch edges narrow the tracked variables on equality
//! predicates; a contradiction makes the edge dead, so the target join never
//! sees that contribution and dead-branch elimination falls out of the
//! lattice rather than a separate pass.
//!
//! Arithmetic and non-equality comparisons are treated as fully opaque
//! predicates: both edges stay reachable and nothing is narrowed.

use std::collections::{BTreeSet, VecDeque};

use log::debug;

use crate::audit;
use crate::cfg::{BasicBlock, Cfg, Terminator};
use crate::lattice::{AbstractState, LitSet, Literal, TrackedVar, LITERAL_CAP};
use crate::program::{CmpOp, Cond, IntExpr};

/// Outcome of static analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The exact, complete set of reachable return values.
    Sound(BTreeSet<i64>),
    /// Precision was lost somewhere the result depends on; the computed set
    /// cannot be trusted as complete and exact.
    Unsound,
}

/// Entering and exiting abstract state per block. `None` means the block
/// (or its exit) was never reached.
#[derive(Debug)]
pub struct BlockStates {
    pub entry: Vec<Option<AbstractState>>,
    pub exit: Vec<Option<AbstractState>>,
}

/// Analyzes a CFG and produces the reachable-value verdict, including the
/// soundness audit of the per-block lattice states.
pub fn analyze(cfg: &Cfg) -> Verdict {
    let states = run_dataflow(cfg);

    if audit::has_precision_loss(cfg, &states) {
        debug!("audit detected cap-induced precision loss");
        return Verdict::Unsound;
    }

    collect_returns(cfg, &states)
}

/// Iterate-to-convergence worklist pass. The lattice has finite height
/// (literal sets are capped), so this terminates.
pub fn run_dataflow(cfg: &Cfg) -> BlockStates {
    let n = cfg.blocks.len();
    let mut entry: Vec<Option<AbstractState>> = vec![None; n];
    let mut exit: Vec<Option<AbstractState>> = vec![None; n];

    entry[cfg.entry] = Some(AbstractState::entry());
    let mut queued = vec![false; n];
    queued[cfg.entry] = true;
    let mut worklist = VecDeque::from([cfg.entry]);

    while let Some(id) = worklist.pop_front() {
        queued[id] = false;
        let Some(in_state) = entry[id].clone() else {
            continue;
        };
        let out = transfer_block(&cfg.blocks[id], in_state);
        exit[id] = Some(out.clone());

        for (succ, edge) in cfg.successors(id) {
            let edge_state = match edge {
                None => Some(out.clone()),
                Some((cond, polarity)) => assume(&out, cond, polarity),
            };
            // A dead edge contributes nothing to the successor join.
            let Some(edge_state) = edge_state else {
                continue;
            };
            let merged = match &entry[succ] {
                None => edge_state,
                Some(old) => old.join(&edge_state),
            };
            if entry[succ].as_ref() != Some(&merged) {
                entry[succ] = Some(merged);
                if !queued[succ] {
                    queued[succ] = true;
                    worklist.push_back(succ);
                }
            }
        }
    }

    BlockStates { entry, exit }
}

fn collect_returns(cfg: &Cfg, states: &BlockStates) -> Verdict {
    let mut values = BTreeSet::new();
    for (id, block) in cfg.blocks.iter().enumerate() {
        if !matches!(block.term, Terminator::Return) {
            continue;
        }
        let Some(exit) = &states.exit[id] else {
            continue;
        };
        let result = exit.get(TrackedVar::Result);
        if result.may_be_non_literal {
            debug!("return point in block {} is not fully literal", id);
            return Verdict::Unsound;
        }
        for lit in &result.literals {
            match lit {
                Literal::Int(n) => {
                    values.insert(*n);
                }
                Literal::Bool(_) => return Verdict::Unsound,
            }
        }
    }
    debug!("static analysis collected return values {:?}", values);
    Verdict::Sound(values)
}

fn transfer_block(block: &BasicBlock, mut state: AbstractState) -> AbstractState {
    for expr in &block.assigns {
        let value = abstract_eval(expr, &state);
        state.set(TrackedVar::Result, value);
    }
    state
}

/// Constant-domain evaluation of an assignment right-hand side: pairwise
/// arithmetic over the literal sets, widening on overflow or cap excess.
///
/// Overflow widens to non-literal here while the concrete interpreter
/// faults on it, so an overflow-reaching program ends [`Verdict::Unsound`]
/// under this engine and [`RuntimeFault`](crate::eval::RuntimeFault) under
/// exhaustive execution.
fn abstract_eval(expr: &IntExpr, state: &AbstractState) -> LitSet {
    match expr {
        IntExpr::Lit(n) => LitSet::literal(Literal::Int(*n)),
        IntExpr::Var => state.get(TrackedVar::Result),
        IntExpr::Neg(e) => {
            let inner = abstract_eval(e, state);
            lift_unary(&inner, i64::checked_neg)
        }
        IntExpr::Add(a, b) => lift_binary(
            &abstract_eval(a, state),
            &abstract_eval(b, state),
            i64::checked_add,
        ),
        IntExpr::Sub(a, b) => lift_binary(
            &abstract_eval(a, state),
            &abstract_eval(b, state),
            i64::checked_sub,
        ),
        IntExpr::Mul(a, b) => lift_binary(
            &abstract_eval(a, state),
            &abstract_eval(b, state),
            i64::checked_mul,
        ),
    }
}

fn int_literals(set: &LitSet) -> Option<Vec<i64>> {
    set.literals
        .iter()
        .map(|lit| match lit {
            Literal::Int(n) => Some(*n),
            Literal::Bool(_) => None,
        })
        .collect()
}

fn lift_unary(a: &LitSet, f: impl Fn(i64) -> Option<i64>) -> LitSet {
    if a.may_be_non_literal {
        return LitSet::unknown();
    }
    let Some(values) = int_literals(a) else {
        return LitSet::unknown();
    };
    let mut out = BTreeSet::new();
    for x in values {
        let Some(v) = f(x) else {
            return LitSet::unknown();
        };
        out.insert(Literal::Int(v));
        if out.len() > LITERAL_CAP {
            return LitSet::unknown();
        }
    }
    LitSet::from_literals(out)
}

fn lift_binary(a: &LitSet, b: &LitSet, f: impl Fn(i64, i64) -> Option<i64>) -> LitSet {
    if a.may_be_non_literal || b.may_be_non_literal {
        return LitSet::unknown();
    }
    let (Some(av), Some(bv)) = (int_literals(a), int_literals(b)) else {
        return LitSet::unknown();
    };
    let mut out = BTreeSet::new();
    for &x in &av {
        for &y in &bv {
            let Some(v) = f(x, y) else {
                return LitSet::unknown();
            };
            out.insert(Literal::Int(v));
            if out.len() > LITERAL_CAP {
                return LitSet::unknown();
            }
        }
    }
    LitSet::from_literals(out)
}

/// Refines `state` under `cond` evaluated with the given polarity.
///
/// Returns `None` when the condition contradicts the state, which marks the
/// edge dead. Only equality predicates narrow; everything else passes the
/// state through unchanged.
fn assume(state: &AbstractState, cond: &Cond, polarity: bool) -> Option<AbstractState> {
    match cond {
        // Bare reads survive only in un-normalized programs; treat them as
        // the equality the normalizer would have produced.
        Cond::Param(index) => assume_param(state, index, true, polarity),
        Cond::ParamEq(index, b) => assume_param(state, index, *b, polarity),
        Cond::Not(inner) => assume(state, inner, !polarity),
        Cond::And(a, b) => {
            if polarity {
                let state = assume(state, a, true)?;
                assume(&state, b, true)
            } else {
                // The negation of a conjunction is a disjunction of cases;
                // the reference lattice does not split them.
                Some(state.clone())
            }
        }
        Cond::Or(a, b) => {
            if polarity {
                Some(state.clone())
            } else {
                let state = assume(state, a, false)?;
                assume(&state, b, false)
            }
        }
        Cond::Cmp(lhs, op, rhs) => assume_cmp(state, lhs, *op, rhs, polarity),
    }
}

fn assume_param(
    state: &AbstractState,
    index: &IntExpr,
    b: bool,
    polarity: bool,
) -> Option<AbstractState> {
    // Non-constant or negative indices are opaque to the analyzer.
    let Some(i) = index.const_eval().and_then(|i| usize::try_from(i).ok()) else {
        return Some(state.clone());
    };
    let var = TrackedVar::Param(i);
    let want = Literal::Bool(b == polarity);

    let current = state.get(var);
    if current.is_fully_literal() && !current.contains(want) {
        return None;
    }
    let mut next = state.clone();
    next.set(var, LitSet::literal(want));
    Some(next)
}

fn assume_cmp(
    state: &AbstractState,
    lhs: &IntExpr,
    op: CmpOp,
    rhs: &IntExpr,
    polarity: bool,
) -> Option<AbstractState> {
    // Only `x == n` / `x != n` (either operand order) narrow the result
    // variable; anything involving arithmetic or ordering is opaque.
    let n = match (lhs, rhs) {
        (IntExpr::Var, IntExpr::Lit(n)) | (IntExpr::Lit(n), IntExpr::Var) => *n,
        _ => return Some(state.clone()),
    };
    let want_equal = match op {
        CmpOp::Eq => polarity,
        CmpOp::Ne => !polarity,
        _ => return Some(state.clone()),
    };

    let current = state.get(TrackedVar::Result);
    if want_equal {
        if current.is_fully_literal() && !current.contains(Literal::Int(n)) {
            return None;
        }
        let mut next = state.clone();
        next.set(TrackedVar::Result, LitSet::literal(Literal::Int(n)));
        Some(next)
    } else {
        if current.may_be_non_literal {
            return Some(state.clone());
        }
        let mut literals = current.literals.clone();
        literals.remove(&Literal::Int(n));
        if literals.is_empty() {
            return None;
        }
        let mut next = state.clone();
        next.set(TrackedVar::Result, LitSet::from_literals(literals));
        Some(next)
    }
}
