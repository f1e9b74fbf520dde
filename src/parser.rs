//! Front end for the decision-function language.
//!
//! Turns source text into a [`Program`] the analyzer can walk and the
//! interpreter can execute. The grammar:
//!
//! ```text
//! program := stmt* 'return' IDENT ';'
//! stmt    := IDENT '=' int_expr ';'
//!          | 'if' '(' cond ')' block ('else' block)?
//! block   := '{' stmt* '}' | stmt
//! cond    := or_cond
//! or_cond := and_cond ('||' and_cond)*
//! and_cond:= not_cond ('&&' not_cond)*
//! not_cond:= '!' not_cond | '(' cond ')' | comparison | IDENT '[' int_expr ']'
//! ```
//!
//! The result variable is whatever identifier is used unindexed; the
//! parameter vector is whatever identifier is indexed. Each must be a single
//! consistent name.

use std::fmt;

use crate::program::{CmpOp, Cond, IntExpr, Program, Stmt};

/// A compilation diagnostic: stable identifier plus human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn new(id: &'static str, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

/// Compiles source text into a decision program.
///
/// On failure, returns the diagnostics describing why the source was
/// rejected. The returned program doubles as the executable entry point via
/// [`Program::run`][crate::eval].
pub fn compile(source: &str) -> Result<Program, Vec<Diagnostic>> {
    let tokens = lex(source).map_err(|d| vec![d])?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        result_var: None,
        param_vec: None,
    };
    let program = parser.parse_program().map_err(|d| vec![d])?;
    check_definite_assignment(&program).map_err(|d| vec![d])?;
    Ok(program)
}

/// Rejects programs that may read or return the result variable before it
/// has been assigned on every path. Guarantees the analyzer's and the
/// interpreter's shared precondition that the result variable is
/// initialized before use.
fn check_definite_assignment(program: &Program) -> Result<(), Diagnostic> {
    fn unassigned_use(program: &Program) -> Diagnostic {
        Diagnostic::new(
            "R012",
            format!(
                "use of possibly unassigned result variable `{}`",
                program.result_var
            ),
        )
    }

    // `assigned` is "definitely assigned on every path reaching here"; an
    // `if` without an `else` never upgrades it.
    fn walk(program: &Program, stmts: &[Stmt], mut assigned: bool) -> Result<bool, Diagnostic> {
        for stmt in stmts {
            match stmt {
                Stmt::Assign(expr) => {
                    if !assigned && expr.contains_var() {
                        return Err(unassigned_use(program));
                    }
                    assigned = true;
                }
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    if !assigned && cond.contains_var() {
                        return Err(unassigned_use(program));
                    }
                    let then_assigned = walk(program, then_body, assigned)?;
                    let else_assigned = walk(program, else_body, assigned)?;
                    assigned = then_assigned && else_assigned;
                }
            }
        }
        Ok(assigned)
    }

    if walk(program, &program.body, false)? {
        Ok(())
    } else {
        Err(unassigned_use(program))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Int(i64),
    True,
    False,
    If,
    Else,
    Return,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Bang,
    AndAnd,
    OrOr,
    Plus,
    Minus,
    Star,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semi,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier `{}`", s),
            Token::Int(n) => write!(f, "integer `{}`", n),
            Token::True => write!(f, "`true`"),
            Token::False => write!(f, "`false`"),
            Token::If => write!(f, "`if`"),
            Token::Else => write!(f, "`else`"),
            Token::Return => write!(f, "`return`"),
            Token::Assign => write!(f, "`=`"),
            Token::EqEq => write!(f, "`==`"),
            Token::NotEq => write!(f, "`!=`"),
            Token::Lt => write!(f, "`<`"),
            Token::Le => write!(f, "`<=`"),
            Token::Gt => write!(f, "`>`"),
            Token::Ge => write!(f, "`>=`"),
            Token::Bang => write!(f, "`!`"),
            Token::AndAnd => write!(f, "`&&`"),
            Token::OrOr => write!(f, "`||`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Star => write!(f, "`*`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
            Token::LBrace => write!(f, "`{{`"),
            Token::RBrace => write!(f, "`}}`"),
            Token::Semi => write!(f, "`;`"),
        }
    }
}

fn lex(source: &str) -> Result<Vec<Token>, Diagnostic> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::EqEq);
                i += 2;
            }
            '=' => {
                tokens.push(Token::Assign);
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Bang);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::AndAnd);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::OrOr);
                i += 2;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            ';' => {
                tokens.push(Token::Semi);
                i += 1;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text.parse::<i64>().map_err(|_| {
                    Diagnostic::new("R001", format!("integer literal `{}` out of range", text))
                })?;
                tokens.push(Token::Int(n));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(match text.as_str() {
                    "if" => Token::If,
                    "else" => Token::Else,
                    "return" => Token::Return,
                    "true" => Token::True,
                    "false" => Token::False,
                    _ => Token::Ident(text),
                });
            }
            _ => {
                return Err(Diagnostic::new(
                    "R002",
                    format!("unexpected character `{}`", c),
                ));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    result_var: Option<String>,
    param_vec: Option<String>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<(), Diagnostic> {
        match self.bump() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(Diagnostic::new(
                "R003",
                format!("expected {}, found {}", expected, tok),
            )),
            None => Err(Diagnostic::new(
                "R004",
                format!("expected {}, found end of input", expected),
            )),
        }
    }

    fn unexpected(&self, context: &str) -> Diagnostic {
        match self.peek() {
            Some(tok) => Diagnostic::new("R003", format!("expected {}, found {}", context, tok)),
            None => Diagnostic::new("R004", format!("expected {}, found end of input", context)),
        }
    }

    fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut body = Vec::new();
        while !matches!(self.peek(), Some(Token::Return) | None) {
            body.push(self.parse_stmt()?);
        }
        self.expect(Token::Return)?;
        let name = self.parse_ident()?;
        self.note_result_var(&name)?;
        self.expect(Token::Semi)?;
        if let Some(tok) = self.peek() {
            return Err(Diagnostic::new(
                "R005",
                format!("unexpected {} after `return` statement", tok),
            ));
        }
        Ok(Program {
            result_var: self.result_var.clone().unwrap_or(name),
            param_vec: self.param_vec.clone().unwrap_or_default(),
            body,
        })
    }

    fn parse_ident(&mut self) -> Result<String, Diagnostic> {
        match self.bump() {
            Some(Token::Ident(name)) => Ok(name),
            Some(tok) => Err(Diagnostic::new(
                "R003",
                format!("expected identifier, found {}", tok),
            )),
            None => Err(Diagnostic::new(
                "R004",
                "expected identifier, found end of input",
            )),
        }
    }

    fn note_result_var(&mut self, name: &str) -> Result<(), Diagnostic> {
        match &self.result_var {
            None => {
                if self.param_vec.as_deref() == Some(name) {
                    return Err(Diagnostic::new(
                        "R006",
                        format!("`{}` is used both indexed and as a scalar", name),
                    ));
                }
                self.result_var = Some(name.to_string());
                Ok(())
            }
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(Diagnostic::new(
                "R007",
                format!(
                    "program must use a single result variable, found both `{}` and `{}`",
                    existing, name
                ),
            )),
        }
    }

    fn note_param_vec(&mut self, name: &str) -> Result<(), Diagnostic> {
        match &self.param_vec {
            None => {
                if self.result_var.as_deref() == Some(name) {
                    return Err(Diagnostic::new(
                        "R006",
                        format!("`{}` is used both indexed and as a scalar", name),
                    ));
                }
                self.param_vec = Some(name.to_string());
                Ok(())
            }
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(Diagnostic::new(
                "R008",
                format!(
                    "program must use a single parameter vector, found both `{}` and `{}`",
                    existing, name
                ),
            )),
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, Diagnostic> {
        match self.peek() {
            Some(Token::If) => self.parse_if(),
            Some(Token::Ident(_)) => {
                let name = self.parse_ident()?;
                self.note_result_var(&name)?;
                self.expect(Token::Assign)?;
                let expr = self.parse_int_expr()?;
                self.expect(Token::Semi)?;
                Ok(Stmt::Assign(expr))
            }
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, Diagnostic> {
        self.expect(Token::If)?;
        self.expect(Token::LParen)?;
        let cond = self.parse_cond()?;
        self.expect(Token::RParen)?;
        let then_body = self.parse_block()?;
        let else_body = if matches!(self.peek(), Some(Token::Else)) {
            self.bump();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        if matches!(self.peek(), Some(Token::LBrace)) {
            self.bump();
            let mut stmts = Vec::new();
            while !matches!(self.peek(), Some(Token::RBrace)) {
                if self.peek().is_none() {
                    return Err(self.unexpected("`}`"));
                }
                stmts.push(self.parse_stmt()?);
            }
            self.bump();
            Ok(stmts)
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_cond(&mut self) -> Result<Cond, Diagnostic> {
        let mut lhs = self.parse_and_cond()?;
        while matches!(self.peek(), Some(Token::OrOr)) {
            self.bump();
            let rhs = self.parse_and_cond()?;
            lhs = Cond::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and_cond(&mut self) -> Result<Cond, Diagnostic> {
        let mut lhs = self.parse_not_cond()?;
        while matches!(self.peek(), Some(Token::AndAnd)) {
            self.bump();
            let rhs = self.parse_not_cond()?;
            lhs = Cond::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not_cond(&mut self) -> Result<Cond, Diagnostic> {
        if matches!(self.peek(), Some(Token::Bang)) {
            self.bump();
            let inner = self.parse_not_cond()?;
            return Ok(Cond::Not(Box::new(inner)));
        }
        self.parse_primary_cond()
    }

    fn parse_primary_cond(&mut self) -> Result<Cond, Diagnostic> {
        // A leading `(` may open a boolean group or an arithmetic operand.
        // Try the boolean reading first and fall back to a comparison.
        if matches!(self.peek(), Some(Token::LParen)) {
            let saved = self.pos;
            self.bump();
            if let Ok(cond) = self.parse_cond() {
                if matches!(self.peek(), Some(Token::RParen))
                    && !matches!(self.peek2(), Some(Token::EqEq | Token::NotEq))
                {
                    self.bump();
                    return Ok(cond);
                }
            }
            self.pos = saved;
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Cond, Diagnostic> {
        // Parameter read, optionally compared against a boolean literal.
        if let (Some(Token::Ident(_)), Some(Token::LBracket)) = (self.peek(), self.peek2()) {
            let index = self.parse_param_read()?;
            return match self.peek() {
                Some(Token::EqEq) => {
                    self.bump();
                    let b = self.parse_bool_literal()?;
                    Ok(Cond::ParamEq(index, b))
                }
                Some(Token::NotEq) => {
                    self.bump();
                    let b = self.parse_bool_literal()?;
                    Ok(Cond::ParamEq(index, !b))
                }
                _ => Ok(Cond::Param(index)),
            };
        }

        let lhs = self.parse_int_expr()?;
        let op = match self.peek() {
            Some(Token::EqEq) => CmpOp::Eq,
            Some(Token::NotEq) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => {
                return Err(Diagnostic::new(
                    "R009",
                    "condition must be a parameter read or a comparison",
                ));
            }
        };
        self.bump();
        let rhs = self.parse_int_expr()?;
        Ok(Cond::Cmp(lhs, op, rhs))
    }

    fn parse_param_read(&mut self) -> Result<IntExpr, Diagnostic> {
        let name = self.parse_ident()?;
        self.note_param_vec(&name)?;
        self.expect(Token::LBracket)?;
        let index = self.parse_int_expr()?;
        self.expect(Token::RBracket)?;
        Ok(index)
    }

    fn parse_bool_literal(&mut self) -> Result<bool, Diagnostic> {
        match self.bump() {
            Some(Token::True) => Ok(true),
            Some(Token::False) => Ok(false),
            _ => Err(Diagnostic::new(
                "R010",
                "a parameter read may only be compared against `true` or `false`",
            )),
        }
    }

    fn parse_int_expr(&mut self) -> Result<IntExpr, Diagnostic> {
        let mut lhs = self.parse_int_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    let rhs = self.parse_int_term()?;
                    lhs = IntExpr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.bump();
                    let rhs = self.parse_int_term()?;
                    lhs = IntExpr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn parse_int_term(&mut self) -> Result<IntExpr, Diagnostic> {
        let mut lhs = self.parse_int_factor()?;
        while matches!(self.peek(), Some(Token::Star)) {
            self.bump();
            let rhs = self.parse_int_factor()?;
            lhs = IntExpr::Mul(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_int_factor(&mut self) -> Result<IntExpr, Diagnostic> {
        match self.peek() {
            Some(Token::Int(_)) => {
                if let Some(Token::Int(n)) = self.bump() {
                    Ok(IntExpr::Lit(n))
                } else {
                    unreachable!()
                }
            }
            Some(Token::Minus) => {
                self.bump();
                let inner = self.parse_int_factor()?;
                Ok(IntExpr::Neg(Box::new(inner)))
            }
            Some(Token::LParen) => {
                self.bump();
                let inner = self.parse_int_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(_)) => {
                if matches!(self.peek2(), Some(Token::LBracket)) {
                    return Err(Diagnostic::new(
                        "R011",
                        "parameter reads are not allowed inside arithmetic expressions",
                    ));
                }
                let name = self.parse_ident()?;
                self.note_result_var(&name)?;
                Ok(IntExpr::Var)
            }
            _ => Err(self.unexpected("an integer expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_program() {
        let program = compile(
            "x = 1;\n\
             if (p[0]) { x = 2; }\n\
             return x;",
        )
        .unwrap();
        assert_eq!(program.result_var, "x");
        assert_eq!(program.param_vec, "p");
        assert_eq!(program.body.len(), 2);
        assert_eq!(program.body[0], Stmt::Assign(IntExpr::Lit(1)));
    }

    #[test]
    fn test_parse_nested_if_else() {
        let program = compile(
            "x = 1;\n\
             if (p[0]) {\n\
                 x = 2;\n\
                 if (p[1]) { x = 3; } else { x = 4; }\n\
             }\n\
             return x;",
        )
        .unwrap();
        match &program.body[1] {
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                assert_eq!(then_body.len(), 2);
                assert!(else_body.is_empty());
                match &then_body[1] {
                    Stmt::If {
                        then_body,
                        else_body,
                        ..
                    } => {
                        assert_eq!(then_body.len(), 1);
                        assert_eq!(else_body.len(), 1);
                    }
                    other => panic!("expected nested if, got {:?}", other),
                }
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_condition_forms() {
        let program = compile(
            "x = 1;\n\
             if (p[0] == true && !p[1] || p[2] != false) { x = 2; }\n\
             if (x == 2) { x = 3; }\n\
             if (x + 1 - 1 == 2) { x = 4; }\n\
             if (p[23 - 1]) { x = 5; }\n\
             return x;",
        )
        .unwrap();
        let mut conds = Vec::new();
        program.for_each_cond(&mut |c| conds.push(c.clone()));
        assert_eq!(conds.len(), 4);
        // p[2] != false normalizes to p[2] == true at parse time
        match &conds[0] {
            Cond::Or(_, rhs) => assert_eq!(**rhs, Cond::ParamEq(IntExpr::Lit(2), true)),
            other => panic!("expected ||, got {:?}", other),
        }
        assert_eq!(
            conds[1],
            Cond::Cmp(IntExpr::Var, CmpOp::Eq, IntExpr::Lit(2))
        );
        assert_eq!(conds[3], Cond::Param(IntExpr::Sub(
            Box::new(IntExpr::Lit(23)),
            Box::new(IntExpr::Lit(1)),
        )));
    }

    #[test]
    fn test_parse_parenthesized_groups() {
        // Boolean grouping
        compile("x = 1; if ((p[0] && p[1]) || p[2]) { x = 2; } return x;").unwrap();
        // Arithmetic grouping inside a comparison
        compile("x = 1; if ((x + 1) * 2 == 4) { x = 2; } return x;").unwrap();
    }

    #[test]
    fn test_parse_line_comments() {
        let program = compile(
            "// header comment\n\
             x = 1; // trailing\n\
             return x;",
        )
        .unwrap();
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn test_reject_missing_return() {
        let err = compile("x = 1;").unwrap_err();
        assert_eq!(err[0].id, "R004");
    }

    #[test]
    fn test_reject_mixed_result_vars() {
        let err = compile("x = 1; y = 2; return x;").unwrap_err();
        assert_eq!(err[0].id, "R007");
    }

    #[test]
    fn test_reject_mixed_param_vectors() {
        let err = compile("x = 1; if (p[0] && q[1]) { x = 2; } return x;").unwrap_err();
        assert_eq!(err[0].id, "R008");
    }

    #[test]
    fn test_reject_bool_literal_against_arithmetic() {
        let err = compile("x = 1; if (x == true) { x = 2; } return x;").unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_reject_param_read_in_arithmetic() {
        let err = compile("x = 1; if (x + 1 == 2) { x = p[0]; } return x;").unwrap_err();
        assert_eq!(err[0].id, "R011");
    }

    #[test]
    fn test_reject_possibly_unassigned_result() {
        // Assigned on one arm only, then returned.
        let err = compile("if (p[20]) { x = 1; } return x;").unwrap_err();
        assert_eq!(err[0].id, "R012");
        // Read on the right-hand side of its own first assignment.
        let err = compile("x = x + 1; return x;").unwrap_err();
        assert_eq!(err[0].id, "R012");
        // Read in a condition before any assignment.
        let err = compile("if (x == 0) { x = 1; } x = 2; return x;").unwrap_err();
        assert_eq!(err[0].id, "R012");
    }

    #[test]
    fn test_accept_assignment_on_both_arms() {
        compile("if (p[0]) { x = 1; } else { x = 2; } return x;").unwrap();
    }

    #[test]
    fn test_reject_unknown_character() {
        let err = compile("x = 1; @ return x;").unwrap_err();
        assert_eq!(err[0].id, "R002");
    }

    #[test]
    fn test_no_params_program() {
        let program = compile("x = 1; return x;").unwrap();
        assert_eq!(program.param_vec, "");
        let mut count = 0;
        program.for_each_param_index(&mut |_| count += 1);
        assert_eq!(count, 0);
    }
}
