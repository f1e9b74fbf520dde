//! Concrete execution of a decision program.
//!
//! [`Program::run`] is the compiled entry point consumed by the exhaustive
//! executor: it takes a boolean parameter vector, evaluates the program, and
//! returns the value of the result variable. It is pure and safe to invoke
//! concurrently with independent arguments.

use thiserror::Error;

use crate::program::{CmpOp, Cond, IntExpr, Program, Stmt};

/// An unexpected fault raised while executing a decision program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RuntimeFault(pub String);

impl RuntimeFault {
    fn new(message: impl Into<String>) -> Self {
        RuntimeFault(message.into())
    }
}

impl Program {
    /// Executes the program against a boolean parameter vector.
    ///
    /// Faults on out-of-range parameter reads, reads of the result variable
    /// before its first assignment, and integer overflow.
    pub fn run(&self, params: &[bool]) -> Result<i64, RuntimeFault> {
        let mut result: Option<i64> = None;
        exec_stmts(self, &self.body, params, &mut result)?;
        result.ok_or_else(|| {
            RuntimeFault::new(format!(
                "result variable `{}` was never assigned",
                self.result_var
            ))
        })
    }
}

fn exec_stmts(
    program: &Program,
    stmts: &[Stmt],
    params: &[bool],
    result: &mut Option<i64>,
) -> Result<(), RuntimeFault> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign(expr) => {
                *result = Some(eval_int(program, expr, params, result)?);
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                if eval_cond(program, cond, params, result)? {
                    exec_stmts(program, then_body, params, result)?;
                } else {
                    exec_stmts(program, else_body, params, result)?;
                }
            }
        }
    }
    Ok(())
}

fn eval_cond(
    program: &Program,
    cond: &Cond,
    params: &[bool],
    result: &Option<i64>,
) -> Result<bool, RuntimeFault> {
    match cond {
        Cond::Param(index) => read_param(program, index, params, result),
        Cond::ParamEq(index, b) => Ok(read_param(program, index, params, result)? == *b),
        Cond::Not(inner) => Ok(!eval_cond(program, inner, params, result)?),
        Cond::And(a, b) => {
            Ok(eval_cond(program, a, params, result)? && eval_cond(program, b, params, result)?)
        }
        Cond::Or(a, b) => {
            Ok(eval_cond(program, a, params, result)? || eval_cond(program, b, params, result)?)
        }
        Cond::Cmp(lhs, op, rhs) => {
            let l = eval_int(program, lhs, params, result)?;
            let r = eval_int(program, rhs, params, result)?;
            Ok(match op {
                CmpOp::Eq => l == r,
                CmpOp::Ne => l != r,
                CmpOp::Lt => l < r,
                CmpOp::Le => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::Ge => l >= r,
            })
        }
    }
}

fn read_param(
    program: &Program,
    index: &IntExpr,
    params: &[bool],
    result: &Option<i64>,
) -> Result<bool, RuntimeFault> {
    let i = eval_int(program, index, params, result)?;
    usize::try_from(i)
        .ok()
        .and_then(|i| params.get(i).copied())
        .ok_or_else(|| {
            RuntimeFault::new(format!(
                "parameter index {} out of range for vector of length {}",
                i,
                params.len()
            ))
        })
}

fn eval_int(
    program: &Program,
    expr: &IntExpr,
    params: &[bool],
    result: &Option<i64>,
) -> Result<i64, RuntimeFault> {
    let fault_overflow = || RuntimeFault::new("integer overflow while evaluating expression");
    match expr {
        IntExpr::Lit(n) => Ok(*n),
        IntExpr::Var => result.ok_or_else(|| {
            RuntimeFault::new(format!(
                "result variable `{}` read before assignment",
                program.result_var
            ))
        }),
        IntExpr::Neg(e) => eval_int(program, e, params, result)?
            .checked_neg()
            .ok_or_else(fault_overflow),
        IntExpr::Add(a, b) => eval_int(program, a, params, result)?
            .checked_add(eval_int(program, b, params, result)?)
            .ok_or_else(fault_overflow),
        IntExpr::Sub(a, b) => eval_int(program, a, params, result)?
            .checked_sub(eval_int(program, b, params, result)?)
            .ok_or_else(fault_overflow),
        IntExpr::Mul(a, b) => eval_int(program, a, params, result)?
            .checked_mul(eval_int(program, b, params, result)?)
            .ok_or_else(fault_overflow),
    }
}
