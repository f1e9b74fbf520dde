//! Decision program AST.
//!
//! A decision program is an ordered sequence of statements over one mutable
//! result variable and a fixed-size boolean parameter vector. The grammar is
//! deliberately small: literal assignments, structured `if`/`else`, and a
//! terminal `return` of the result variable. No loops, no recursion, no side
//! effects beyond the result variable.

/// Integer expression: assignment right-hand sides, comparison operands,
/// and parameter index expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntExpr {
    /// Integer literal
    Lit(i64),
    /// Read of the result variable
    Var,
    /// Negation: -e
    Neg(Box<IntExpr>),
    /// Addition: e1 + e2
    Add(Box<IntExpr>, Box<IntExpr>),
    /// Subtraction: e1 - e2
    Sub(Box<IntExpr>, Box<IntExpr>),
    /// Multiplication: e1 * e2
    Mul(Box<IntExpr>, Box<IntExpr>),
}

impl IntExpr {
    /// Folds a compile-time-constant expression to its value.
    ///
    /// Returns `None` if the expression reads the result variable or
    /// overflows `i64`. This is the constant evaluator consumed by the
    /// parameter profile extractor.
    pub fn const_eval(&self) -> Option<i64> {
        match self {
            IntExpr::Lit(n) => Some(*n),
            IntExpr::Var => None,
            IntExpr::Neg(e) => e.const_eval()?.checked_neg(),
            IntExpr::Add(a, b) => a.const_eval()?.checked_add(b.const_eval()?),
            IntExpr::Sub(a, b) => a.const_eval()?.checked_sub(b.const_eval()?),
            IntExpr::Mul(a, b) => a.const_eval()?.checked_mul(b.const_eval()?),
        }
    }

    /// Whether the expression reads the result variable.
    pub fn contains_var(&self) -> bool {
        match self {
            IntExpr::Lit(_) => false,
            IntExpr::Var => true,
            IntExpr::Neg(e) => e.contains_var(),
            IntExpr::Add(a, b) | IntExpr::Sub(a, b) | IntExpr::Mul(a, b) => {
                a.contains_var() || b.contains_var()
            }
        }
    }

    /// Whether the expression contains a binary arithmetic node.
    pub fn has_binary(&self) -> bool {
        match self {
            IntExpr::Lit(_) | IntExpr::Var => false,
            IntExpr::Neg(e) => e.has_binary(),
            IntExpr::Add(_, _) | IntExpr::Sub(_, _) | IntExpr::Mul(_, _) => true,
        }
    }
}

/// Comparison operator between integer expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean condition of an `if` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cond {
    /// Bare parameter read used as a boolean: `p[e]`
    Param(IntExpr),
    /// Parameter read compared against a boolean literal: `p[e] == true`
    ParamEq(IntExpr, bool),
    /// Negation: !c
    Not(Box<Cond>),
    /// Conjunction: c1 && c2
    And(Box<Cond>, Box<Cond>),
    /// Disjunction: c1 || c2
    Or(Box<Cond>, Box<Cond>),
    /// Integer comparison: e1 <op> e2
    Cmp(IntExpr, CmpOp, IntExpr),
}

impl Cond {
    /// Whether any integer expression inside the condition (including
    /// parameter index expressions) reads the result variable.
    pub fn contains_var(&self) -> bool {
        match self {
            Cond::Param(e) | Cond::ParamEq(e, _) => e.contains_var(),
            Cond::Not(c) => c.contains_var(),
            Cond::And(a, b) | Cond::Or(a, b) => a.contains_var() || b.contains_var(),
            Cond::Cmp(a, _, b) => a.contains_var() || b.contains_var(),
        }
    }

    /// Whether the condition contains a binary expression as a *strict*
    /// descendant of its root node.
    ///
    /// `&&`, `||`, comparisons and arithmetic all count as binary; `!` and
    /// a bare parameter read do not. The root itself is excluded, so
    /// `x == 2` has no binary descendant while `x + 1 - 1 == 2` does.
    pub fn has_binary_descendant(&self) -> bool {
        fn is_binary(c: &Cond) -> bool {
            matches!(
                c,
                Cond::And(_, _) | Cond::Or(_, _) | Cond::ParamEq(_, _) | Cond::Cmp(_, _, _)
            )
        }
        fn below(c: &Cond) -> bool {
            is_binary(c) || c.has_binary_descendant()
        }
        match self {
            Cond::Param(e) | Cond::ParamEq(e, _) => e.has_binary(),
            Cond::Cmp(a, _, b) => a.has_binary() || b.has_binary(),
            Cond::Not(c) => below(c),
            Cond::And(a, b) | Cond::Or(a, b) => below(a) || below(b),
        }
    }

    /// Visits every parameter index expression inside the condition.
    pub fn for_each_param_index<'a>(&'a self, f: &mut impl FnMut(&'a IntExpr)) {
        match self {
            Cond::Param(e) | Cond::ParamEq(e, _) => f(e),
            Cond::Not(c) => c.for_each_param_index(f),
            Cond::And(a, b) | Cond::Or(a, b) => {
                a.for_each_param_index(f);
                b.for_each_param_index(f);
            }
            Cond::Cmp(_, _, _) => {}
        }
    }
}

/// A statement of the decision program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// Assignment to the result variable: `x = e;`
    Assign(IntExpr),
    /// Structured conditional. An absent `else` is an empty body.
    If {
        cond: Cond,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
}

/// A compiled decision program.
///
/// The terminal `return` of the result variable is implicit: it follows the
/// last statement of `body` (the parser enforces its presence in source).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    /// Name of the mutable result variable.
    pub result_var: String,
    /// Name of the boolean parameter vector.
    pub param_vec: String,
    pub body: Vec<Stmt>,
}

impl Program {
    /// Visits every `if` condition in the program, outermost first.
    pub fn for_each_cond<'a>(&'a self, f: &mut impl FnMut(&'a Cond)) {
        fn walk<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Cond)) {
            for stmt in stmts {
                if let Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } = stmt
                {
                    f(cond);
                    walk(then_body, f);
                    walk(else_body, f);
                }
            }
        }
        walk(&self.body, f);
    }

    /// Visits every parameter index expression in the program.
    pub fn for_each_param_index<'a>(&'a self, f: &mut impl FnMut(&'a IntExpr)) {
        self.for_each_cond(&mut |cond| cond.for_each_param_index(f));
    }
}
