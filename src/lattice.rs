//! Bounded literal-set lattice.
//!
//! Each tracked variable is mapped to the set of literal values it may hold
//! at a program point. The set is capped at [`LITERAL_CAP`] elements: a join
//! whose union would exceed the cap clears the set and forces
//! `may_be_non_literal`, which is the (monotone) top of the lattice. The
//! finite height guarantees fixpoint termination; the soundness auditor
//! later distinguishes cap-induced widening from genuinely unknown values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Maximum literal-set size before widening to non-literal.
pub const LITERAL_CAP: usize = 10;

/// A literal value a tracked variable may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Literal {
    Bool(bool),
    Int(i64),
}

/// Set of possible literal values of one variable at one program point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LitSet {
    pub literals: BTreeSet<Literal>,
    /// Whether the variable may hold a value outside `literals`.
    pub may_be_non_literal: bool,
}

impl LitSet {
    /// No value assigned yet: empty set, fully literal.
    pub fn uninit() -> Self {
        LitSet {
            literals: BTreeSet::new(),
            may_be_non_literal: false,
        }
    }

    /// Unconstrained value (top).
    pub fn unknown() -> Self {
        LitSet {
            literals: BTreeSet::new(),
            may_be_non_literal: true,
        }
    }

    /// Exactly one known literal.
    pub fn literal(lit: Literal) -> Self {
        LitSet {
            literals: BTreeSet::from([lit]),
            may_be_non_literal: false,
        }
    }

    pub fn from_literals(literals: impl IntoIterator<Item = Literal>) -> Self {
        let literals: BTreeSet<Literal> = literals.into_iter().collect();
        if literals.len() > LITERAL_CAP {
            LitSet::unknown()
        } else {
            LitSet {
                literals,
                may_be_non_literal: false,
            }
        }
    }

    pub fn is_fully_literal(&self) -> bool {
        !self.may_be_non_literal
    }

    pub fn contains(&self, lit: Literal) -> bool {
        self.literals.contains(&lit)
    }

    /// Lattice join: capped union. Exceeding the cap widens to non-literal.
    pub fn join(&self, other: &LitSet) -> LitSet {
        let literals: BTreeSet<Literal> =
            self.literals.union(&other.literals).copied().collect();
        if literals.len() > LITERAL_CAP {
            return LitSet::unknown();
        }
        LitSet {
            literals,
            may_be_non_literal: self.may_be_non_literal || other.may_be_non_literal,
        }
    }
}

impl fmt::Display for LitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, lit) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match lit {
                Literal::Bool(b) => write!(f, "{}", b)?,
                Literal::Int(n) => write!(f, "{}", n)?,
            }
        }
        write!(f, "}}")?;
        if self.may_be_non_literal {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A variable tracked by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackedVar {
    /// The mutable result variable.
    Result,
    /// Synthetic variable for one statically-indexed parameter, used to
    /// detect statically-dead branches.
    Param(usize),
}

/// Per-block mapping from tracked variable to its literal-set value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AbstractState {
    vars: BTreeMap<TrackedVar, LitSet>,
}

impl AbstractState {
    /// Entry state: the result variable has no value yet, parameters are
    /// unconstrained (implicitly, by the `get` default).
    pub fn entry() -> Self {
        let mut state = AbstractState::default();
        state.set(TrackedVar::Result, LitSet::uninit());
        state
    }

    pub fn get(&self, var: TrackedVar) -> LitSet {
        self.vars.get(&var).cloned().unwrap_or(match var {
            TrackedVar::Result => LitSet::uninit(),
            TrackedVar::Param(_) => LitSet::unknown(),
        })
    }

    /// The variables this state explicitly tracks.
    pub fn tracked(&self) -> impl Iterator<Item = (TrackedVar, &LitSet)> {
        self.vars.iter().map(|(var, set)| (*var, set))
    }

    /// Whether the state explicitly tracks `var`.
    pub fn tracks(&self, var: TrackedVar) -> bool {
        self.vars.contains_key(&var)
    }

    pub fn set(&mut self, var: TrackedVar, value: LitSet) {
        self.vars.insert(var, value);
    }

    /// Pointwise lattice join over the union of tracked variables.
    pub fn join(&self, other: &AbstractState) -> AbstractState {
        let mut vars: BTreeSet<TrackedVar> = self.vars.keys().copied().collect();
        vars.extend(other.vars.keys().copied());

        let mut result = AbstractState::default();
        for var in vars {
            result.set(var, self.get(var).join(&other.get(var)));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: impl IntoIterator<Item = i64>) -> LitSet {
        LitSet::from_literals(values.into_iter().map(Literal::Int))
    }

    #[test]
    fn test_join_unions_literals() {
        let a = ints([1, 2]);
        let b = ints([2, 3]);
        let joined = a.join(&b);
        assert_eq!(joined, ints([1, 2, 3]));
        assert!(joined.is_fully_literal());
    }

    #[test]
    fn test_join_at_cap_stays_literal() {
        let a = ints(1..=LITERAL_CAP as i64 - 1);
        let b = ints([LITERAL_CAP as i64]);
        let joined = a.join(&b);
        assert_eq!(joined.literals.len(), LITERAL_CAP);
        assert!(joined.is_fully_literal());
    }

    #[test]
    fn test_join_over_cap_widens() {
        let a = ints(1..=LITERAL_CAP as i64);
        let b = ints([LITERAL_CAP as i64 + 1]);
        let joined = a.join(&b);
        assert!(joined.may_be_non_literal);
        assert!(joined.literals.is_empty());
    }

    #[test]
    fn test_join_propagates_non_literal() {
        let a = ints([1]);
        let joined = a.join(&LitSet::unknown());
        assert!(joined.may_be_non_literal);
        // Literals are kept alongside the non-literal flag.
        assert!(joined.contains(Literal::Int(1)));
    }

    #[test]
    fn test_state_defaults() {
        let state = AbstractState::entry();
        assert_eq!(state.get(TrackedVar::Result), LitSet::uninit());
        assert_eq!(state.get(TrackedVar::Param(0)), LitSet::unknown());
        assert!(state.tracks(TrackedVar::Result));
        assert!(!state.tracks(TrackedVar::Param(0)));
    }

    #[test]
    fn test_state_join_pointwise() {
        let mut a = AbstractState::entry();
        a.set(TrackedVar::Result, ints([1]));
        a.set(TrackedVar::Param(0), LitSet::literal(Literal::Bool(true)));

        let mut b = AbstractState::entry();
        b.set(TrackedVar::Result, ints([2]));

        let joined = a.join(&b);
        assert_eq!(joined.get(TrackedVar::Result), ints([1, 2]));
        // Param(0) is literal on one side, unconstrained on the other.
        let p0 = joined.get(TrackedVar::Param(0));
        assert!(p0.may_be_non_literal);
        assert!(p0.contains(Literal::Bool(true)));
    }
}
