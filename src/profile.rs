//! Parameter profile extraction.
//!
//! Scans every parameter read in the program and attempts constant
//! evaluation of its index expression. The resulting profile drives the
//! strategy heuristic only; it never sizes actual execution when the
//! indices are not statically known.

use log::debug;

use crate::program::Program;

/// Conservative parameter-count cap used when an index expression is not a
/// compile-time constant.
pub const MAX_PARAM_COUNT: usize = 50;

/// How many parameters the program observes, and how reliably.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamProfile {
    /// `max(index) + 1` when all indices are known, else [`MAX_PARAM_COUNT`].
    pub count: usize,
    /// Whether every parameter index is a compile-time constant.
    pub indices_known: bool,
    /// Smallest observed index, when all indices are known.
    pub min_index: Option<i64>,
}

impl ParamProfile {
    /// Whether some known index is negative.
    pub fn out_of_bounds(&self) -> bool {
        self.indices_known && self.min_index.is_some_and(|min| min < 0)
    }
}

/// Derives the parameter profile of a program. Purely informational.
pub fn extract(program: &Program) -> ParamProfile {
    let mut indices = Vec::new();
    let mut all_known = true;
    program.for_each_param_index(&mut |expr| match expr.const_eval() {
        Some(index) => indices.push(index),
        None => all_known = false,
    });

    let profile = if !all_known {
        ParamProfile {
            count: MAX_PARAM_COUNT,
            indices_known: false,
            min_index: None,
        }
    } else if indices.is_empty() {
        ParamProfile {
            count: 0,
            indices_known: true,
            min_index: None,
        }
    } else {
        let max = indices.iter().copied().max().unwrap_or(0);
        let min = indices.iter().copied().min().unwrap_or(0);
        // Negative-only maxima give count 0; the +1 happens after the
        // usize conversion so an i64::MAX index cannot overflow.
        let count = usize::try_from(max)
            .ok()
            .and_then(|max| max.checked_add(1))
            .unwrap_or(0);
        ParamProfile {
            count,
            indices_known: true,
            min_index: Some(min),
        }
    };

    debug!(
        "parameter profile: count={}, indices_known={}, min_index={:?}",
        profile.count, profile.indices_known, profile.min_index
    );
    profile
}
