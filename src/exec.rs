//! Exhaustive execution engine.
//!
//! Runs the program once for every counter value in `0..2^n` and collects
//! the distinct return values. Cases are independent, so the sweep is
//! parallelized with rayon and deduplicated through a lock-free set.

use std::collections::BTreeSet;

use dashmap::DashSet;
use log::debug;
use rayon::prelude::*;

use crate::error::SolveError;
use crate::eval::RuntimeFault;

/// Hard limit on the enumerable parameter count. The case counter is a
/// `u64`; two bits of headroom keep `1 << n` well-defined.
pub const MAX_ENUM_PARAMS: usize = 62;

/// Collects every value returned by `entry` over all `param_count`-wide
/// argument vectors. The first faulting case aborts the sweep.
pub fn execute_all_cases<F>(entry: F, param_count: usize) -> Result<BTreeSet<i64>, SolveError>
where
    F: Fn(&[bool]) -> Result<i64, RuntimeFault> + Sync,
{
    if param_count > MAX_ENUM_PARAMS {
        return Err(SolveError::Capacity {
            count: param_count,
            max: MAX_ENUM_PARAMS,
        });
    }
    if param_count == 0 {
        let value = entry(&[])?;
        return Ok(BTreeSet::from([value]));
    }

    let cases: u64 = 1 << param_count;
    debug!("executing {} cases over {} parameters", cases, param_count);

    let values: DashSet<i64> = DashSet::new();
    (0..cases).into_par_iter().try_for_each(|counter| {
        let args = decode_counter(counter, param_count);
        let value = entry(&args).map_err(SolveError::from)?;
        values.insert(value);
        Ok::<(), SolveError>(())
    })?;

    Ok(values.into_iter().collect())
}

/// Expands a case counter into an argument vector: the counter's minimal
/// binary representation, most significant digit first, fills the low
/// indices; the remaining positions stay false. The leading digit of every
/// nonzero counter is 1, so the mapping is not a bijection: counters 1 and
/// 2 both decode to `[true, false, false]`, and vectors that start with
/// false (other than all-false) are never produced. Kept bit-for-bit
/// compatible with the historical enumeration order.
fn decode_counter(counter: u64, param_count: usize) -> Vec<bool> {
    let mut args = vec![false; param_count];
    let digits = if counter == 0 {
        1
    } else {
        64 - counter.leading_zeros() as usize
    };
    for pos in 0..digits.min(param_count) {
        args[pos] = (counter >> (digits - 1 - pos)) & 1 == 1;
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_decode_zero() {
        assert_eq!(decode_counter(0, 3), vec![false, false, false]);
    }

    #[test]
    fn test_decode_places_digits_low_first() {
        // 0b110 -> [true, true, false]
        assert_eq!(decode_counter(6, 4), vec![true, true, false, false]);
        // 0b101 -> [true, false, true]
        assert_eq!(decode_counter(5, 3), vec![true, false, true]);
    }

    #[test]
    fn test_decode_image_is_skewed() {
        // The sweep's image over two parameters misses [false, true].
        let seen: std::collections::BTreeSet<Vec<bool>> =
            (0..4).map(|counter| decode_counter(counter, 2)).collect();
        assert_eq!(
            seen,
            std::collections::BTreeSet::from([
                vec![false, false],
                vec![true, false],
                vec![true, true],
            ])
        );
    }

    #[test]
    fn test_zero_params_runs_once() {
        let values = execute_all_cases(|args| {
            assert!(args.is_empty());
            Ok(7)
        }, 0)
        .unwrap();
        assert_eq!(values, BTreeSet::from([7]));
    }

    #[test]
    fn test_collects_distinct_values() {
        // Value 1 would need [false, true, _], which the counter decoding
        // never produces.
        let values = execute_all_cases(
            |args| Ok(args[0] as i64 * 2 + args[1] as i64),
            3,
        )
        .unwrap();
        assert_eq!(values, BTreeSet::from([0, 2, 3]));
    }

    #[test]
    fn test_capacity_limit() {
        let err = execute_all_cases(|_| Ok(0), MAX_ENUM_PARAMS + 1).unwrap_err();
        assert!(matches!(
            err,
            SolveError::Capacity { count: 63, max: 62 }
        ));
    }

    #[test]
    fn test_fault_aborts_sweep() {
        let err = execute_all_cases(
            |args| {
                if args[0] {
                    Err(RuntimeFault("boom".into()))
                } else {
                    Ok(0)
                }
            },
            2,
        )
        .unwrap_err();
        assert!(matches!(err, SolveError::RuntimeFault(_)));
    }
}
