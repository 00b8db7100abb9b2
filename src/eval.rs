//! eval.rs — The bundled condition-expression evaluator.
//!
//! This is not the only way to evaluate a `stop only if` expression — any
//! host can implement [`crate::breakpoint::CondEval`] itself against its own
//! language. This module is the crate's built-in fallback, a small
//! C-like expression language good enough for simple comparisons over
//! frame-local variables, with standard precedence:
//!
//! ```text
//! expr       := or
//! or         := and ("||" and)*
//! and        := equality ("&&" equality)*
//! equality   := comparison (("==" | "!=") comparison)*
//! comparison := term (("<" | "<=" | ">" | ">=") term)*
//! term       := factor (("+" | "-") factor)*
//! factor     := unary (("*" | "/" | "%") unary)*
//! unary      := ("!" | "+" | "-") unary | call
//! call       := primary ( "(" args? ")" | "." ident | "[" expr "]" )*
//! primary    := IDENT | NUMBER | STRING | "true" | "false" | "null" | "(" expr ")"
//! ```
//!
//! Evaluation is read-only except through `EvalEnv::call`, which a host may
//! give side effects if it chooses to.

use std::collections::HashMap;
use std::fmt;

use crate::error::{DbgError, DbgResult};
use crate::frame::FrameId;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_number(&self) -> DbgResult<Number> {
        match self {
            Value::Int(i) => Ok(Number::Int(*i)),
            Value::Float(f) => Ok(Number::Float(*f)),
            _ => Err(eval_err(format!("expected a number, found {}", self.type_name()))),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(v) => !v.is_empty(),
            Value::Map(m) => !m.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                if x.fract() == 0.0 {
                    write!(f, "{x:.0}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(v) => {
                write!(f, "[")?;
                for (i, el) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{el}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                let mut it = m.iter().peekable();
                while let Some((k, v)) = it.next() {
                    write!(f, "{k}: {v}")?;
                    if it.peek().is_some() {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "}}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

fn eval_err(msg: impl Into<String>) -> DbgError {
    DbgError::Eval(msg.into())
}

/// Name/field/index/call resolution, provided by whoever is evaluating an
/// expression (a frame-bound adapter in this crate's `session` module, or a
/// host's own environment).
pub trait EvalEnv {
    fn get_var(&self, name: &str) -> Option<Value>;

    fn get_field(&self, base: &Value, field: &str) -> Option<Value> {
        match base {
            Value::Map(m) => m.get(field).cloned(),
            _ => None,
        }
    }

    fn index(&self, base: &Value, idx: &Value) -> Option<Value> {
        match (base, idx) {
            (Value::Array(v), Value::Int(i)) if *i >= 0 => v.get(*i as usize).cloned(),
            (Value::Map(m), Value::Str(s)) => m.get(s).cloned(),
            _ => None,
        }
    }

    fn call(&self, func: &str, _args: &[Value]) -> DbgResult<Value> {
        Err(eval_err(format!("function calls are not supported here: '{func}'")))
    }
}

/// Resolves frame-local variables for a given [`FrameId`], the host
/// capability condition evaluation ultimately runs against.
pub trait EvalEnvSource: Send + Sync {
    fn get_var(&self, frame: FrameId, name: &str) -> Option<Value>;

    fn get_field(&self, _frame: FrameId, base: &Value, field: &str) -> Option<Value> {
        match base {
            Value::Map(m) => m.get(field).cloned(),
            _ => None,
        }
    }

    fn index(&self, _frame: FrameId, base: &Value, idx: &Value) -> Option<Value> {
        match (base, idx) {
            (Value::Array(v), Value::Int(i)) if *i >= 0 => v.get(*i as usize).cloned(),
            (Value::Map(m), Value::Str(s)) => m.get(s).cloned(),
            _ => None,
        }
    }

    fn call(&self, _frame: FrameId, func: &str, _args: &[Value]) -> DbgResult<Value> {
        Err(eval_err(format!("function calls are not supported here: '{func}'")))
    }
}

struct FrameEnv<'a> {
    source: &'a dyn EvalEnvSource,
    frame: FrameId,
}

impl EvalEnv for FrameEnv<'_> {
    fn get_var(&self, name: &str) -> Option<Value> {
        self.source.get_var(self.frame, name)
    }
    fn get_field(&self, base: &Value, field: &str) -> Option<Value> {
        self.source.get_field(self.frame, base, field)
    }
    fn index(&self, base: &Value, idx: &Value) -> Option<Value> {
        self.source.index(self.frame, base, idx)
    }
    fn call(&self, func: &str, args: &[Value]) -> DbgResult<Value> {
        self.source.call(self.frame, func, args)
    }
}

/// The crate's built-in [`crate::breakpoint::CondEval`], evaluating
/// conditions in this module's expression language against an
/// [`EvalEnvSource`].
pub struct BuiltinCondEval<S> {
    source: S,
}

impl<S: EvalEnvSource> BuiltinCondEval<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: EvalEnvSource> crate::breakpoint::CondEval for BuiltinCondEval<S> {
    fn eval_bool(&self, frame: FrameId, expr: &str) -> DbgResult<bool> {
        let env = FrameEnv { source: &self.source, frame };
        eval_bool(expr, &env)
    }
}

/* ------------------------------- Lexer ------------------------------------ */

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Eof,
}

struct Lexer<'a> {
    s: &'a [u8],
    i: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { s: src.as_bytes(), i: 0 }
    }

    fn next_token(&mut self) -> DbgResult<Tok> {
        self.skip_ws();
        if self.eof() {
            return Ok(Tok::Eof);
        }
        let c = self.peek();

        if is_ident_start(c) {
            let start = self.i;
            self.i += 1;
            while !self.eof() && is_ident_part(self.peek()) {
                self.i += 1;
            }
            let s = std::str::from_utf8(&self.s[start..self.i]).unwrap().to_string();
            return Ok(match s.as_str() {
                "true" => Tok::True,
                "false" => Tok::False,
                "null" => Tok::Null,
                _ => Tok::Ident(s),
            });
        }

        if c.is_ascii_digit() || (c == b'.' && self.peek2().is_some_and(|d| d.is_ascii_digit())) {
            return self.lex_number();
        }

        if c == b'"' {
            return self.lex_string();
        }

        if let Some(op) = self.try_two_char_op() {
            return Ok(op);
        }

        self.i += 1;
        Ok(match c {
            b'(' => Tok::LParen,
            b')' => Tok::RParen,
            b'[' => Tok::LBracket,
            b']' => Tok::RBracket,
            b'.' => Tok::Dot,
            b',' => Tok::Comma,
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'*' => Tok::Star,
            b'/' => Tok::Slash,
            b'%' => Tok::Percent,
            b'!' => Tok::Bang,
            b'<' => Tok::Lt,
            b'>' => Tok::Gt,
            _ => return Err(eval_err(format!("unexpected character: {}", c as char))),
        })
    }

    fn skip_ws(&mut self) {
        while !self.eof() {
            let c = self.peek();
            if c == b' ' || c == b'\t' || c == b'\n' || c == b'\r' {
                self.i += 1;
            } else if c == b'/' && self.peek2() == Some(b'/') {
                self.i += 2;
                while !self.eof() && self.peek() != b'\n' {
                    self.i += 1;
                }
            } else {
                break;
            }
        }
    }

    fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
    fn peek(&self) -> u8 {
        self.s[self.i]
    }
    fn peek2(&self) -> Option<u8> {
        self.s.get(self.i + 1).copied()
    }

    fn lex_number(&mut self) -> DbgResult<Tok> {
        let start = self.i;
        let mut saw_dot = false;
        while !self.eof() {
            let c = self.peek();
            if c.is_ascii_digit() {
                self.i += 1;
                continue;
            }
            if c == b'.' && !saw_dot {
                saw_dot = true;
                self.i += 1;
                continue;
            }
            break;
        }
        let s = std::str::from_utf8(&self.s[start..self.i]).unwrap();
        if saw_dot {
            let v: f64 = s.parse().map_err(|_| eval_err(format!("invalid float: {s}")))?;
            Ok(Tok::Float(v))
        } else {
            let v: i64 = s.parse().map_err(|_| eval_err(format!("invalid int: {s}")))?;
            Ok(Tok::Int(v))
        }
    }

    fn lex_string(&mut self) -> DbgResult<Tok> {
        self.i += 1;
        let mut out = String::new();
        while !self.eof() {
            let c = self.peek();
            self.i += 1;
            match c {
                b'"' => return Ok(Tok::Str(out)),
                b'\\' => {
                    let e = self.peek();
                    self.i += 1;
                    match e {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'0' => out.push('\0'),
                        other => return Err(eval_err(format!("invalid escape: \\{}", other as char))),
                    }
                }
                _ => out.push(c as char),
            }
        }
        Err(eval_err("unterminated string"))
    }

    fn try_two_char_op(&mut self) -> Option<Tok> {
        let two = self.s.get(self.i..self.i + 2)?;
        let t = match two {
            b"&&" => Tok::AndAnd,
            b"||" => Tok::OrOr,
            b"==" => Tok::EqEq,
            b"!=" => Tok::NotEq,
            b"<=" => Tok::Le,
            b">=" => Tok::Ge,
            _ => return None,
        };
        self.i += 2;
        Some(t)
    }
}

fn is_ident_start(c: u8) -> bool {
    c == b'_' || (c as char).is_ascii_alphabetic()
}
fn is_ident_part(c: u8) -> bool {
    is_ident_start(c) || (c as char).is_ascii_digit()
}

/* ------------------------------ Parser ------------------------------------ */

struct Parser<'a> {
    lx: Lexer<'a>,
    look: Tok,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> DbgResult<Self> {
        let mut lx = Lexer::new(src);
        let look = lx.next_token()?;
        Ok(Self { lx, look })
    }

    fn bump(&mut self) -> DbgResult<()> {
        self.look = self.lx.next_token()?;
        Ok(())
    }

    fn expect(&mut self, t: &Tok) -> DbgResult<()> {
        if &self.look == t {
            self.bump()
        } else {
            Err(eval_err(format!("expected {:?}, found {:?}", t, self.look)))
        }
    }

    fn parse_expr(&mut self) -> DbgResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_and()?;
        while matches!(self.look, Tok::OrOr) {
            self.bump()?;
            let r = self.parse_and()?;
            e = Expr::Binary(Box::new(e), BinOp::Or, Box::new(r));
        }
        Ok(e)
    }

    fn parse_and(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_equality()?;
        while matches!(self.look, Tok::AndAnd) {
            self.bump()?;
            let r = self.parse_equality()?;
            e = Expr::Binary(Box::new(e), BinOp::And, Box::new(r));
        }
        Ok(e)
    }

    fn parse_equality(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_comparison()?;
        loop {
            match self.look {
                Tok::EqEq => {
                    self.bump()?;
                    let r = self.parse_comparison()?;
                    e = Expr::Binary(Box::new(e), BinOp::Eq, Box::new(r));
                }
                Tok::NotEq => {
                    self.bump()?;
                    let r = self.parse_comparison()?;
                    e = Expr::Binary(Box::new(e), BinOp::Ne, Box::new(r));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_comparison(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_term()?;
        loop {
            match self.look {
                Tok::Lt => {
                    self.bump()?;
                    let r = self.parse_term()?;
                    e = Expr::Binary(Box::new(e), BinOp::Lt, Box::new(r));
                }
                Tok::Le => {
                    self.bump()?;
                    let r = self.parse_term()?;
                    e = Expr::Binary(Box::new(e), BinOp::Le, Box::new(r));
                }
                Tok::Gt => {
                    self.bump()?;
                    let r = self.parse_term()?;
                    e = Expr::Binary(Box::new(e), BinOp::Gt, Box::new(r));
                }
                Tok::Ge => {
                    self.bump()?;
                    let r = self.parse_term()?;
                    e = Expr::Binary(Box::new(e), BinOp::Ge, Box::new(r));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_term(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_factor()?;
        loop {
            match self.look {
                Tok::Plus => {
                    self.bump()?;
                    let r = self.parse_factor()?;
                    e = Expr::Binary(Box::new(e), BinOp::Add, Box::new(r));
                }
                Tok::Minus => {
                    self.bump()?;
                    let r = self.parse_factor()?;
                    e = Expr::Binary(Box::new(e), BinOp::Sub, Box::new(r));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_factor(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_unary()?;
        loop {
            match self.look {
                Tok::Star => {
                    self.bump()?;
                    let r = self.parse_unary()?;
                    e = Expr::Binary(Box::new(e), BinOp::Mul, Box::new(r));
                }
                Tok::Slash => {
                    self.bump()?;
                    let r = self.parse_unary()?;
                    e = Expr::Binary(Box::new(e), BinOp::Div, Box::new(r));
                }
                Tok::Percent => {
                    self.bump()?;
                    let r = self.parse_unary()?;
                    e = Expr::Binary(Box::new(e), BinOp::Rem, Box::new(r));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_unary(&mut self) -> DbgResult<Expr> {
        match self.look {
            Tok::Bang => {
                self.bump()?;
                Ok(Expr::Unary(UnOp::Not, Box::new(self.parse_unary()?)))
            }
            Tok::Plus => {
                self.bump()?;
                Ok(Expr::Unary(UnOp::Plus, Box::new(self.parse_unary()?)))
            }
            Tok::Minus => {
                self.bump()?;
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_call(),
        }
    }

    fn parse_call(&mut self) -> DbgResult<Expr> {
        let mut e = self.parse_primary()?;
        loop {
            match self.look {
                Tok::LParen => {
                    self.bump()?;
                    let mut args = Vec::new();
                    if !matches!(self.look, Tok::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if matches!(self.look, Tok::Comma) {
                                self.bump()?;
                                continue;
                            }
                            break;
                        }
                    }
                    self.expect(&Tok::RParen)?;
                    e = Expr::Call(Box::new(e), args);
                }
                Tok::Dot => {
                    self.bump()?;
                    let ident = match &self.look {
                        Tok::Ident(s) => {
                            let s2 = s.clone();
                            self.bump()?;
                            s2
                        }
                        _ => return Err(eval_err("expected identifier after '.'")),
                    };
                    e = Expr::Get(Box::new(e), ident);
                }
                Tok::LBracket => {
                    self.bump()?;
                    let idx = self.parse_expr()?;
                    self.expect(&Tok::RBracket)?;
                    e = Expr::Index(Box::new(e), Box::new(idx));
                }
                _ => break,
            }
        }
        Ok(e)
    }

    fn parse_primary(&mut self) -> DbgResult<Expr> {
        let e = match self.look.clone() {
            Tok::True => {
                self.bump()?;
                Expr::Literal(Value::Bool(true))
            }
            Tok::False => {
                self.bump()?;
                Expr::Literal(Value::Bool(false))
            }
            Tok::Null => {
                self.bump()?;
                Expr::Literal(Value::Null)
            }
            Tok::Int(i) => {
                self.bump()?;
                Expr::Literal(Value::Int(i))
            }
            Tok::Float(x) => {
                self.bump()?;
                Expr::Literal(Value::Float(x))
            }
            Tok::Str(s) => {
                self.bump()?;
                Expr::Literal(Value::Str(s))
            }
            Tok::Ident(name) => {
                self.bump()?;
                Expr::Var(name)
            }
            Tok::LParen => {
                self.bump()?;
                let e = self.parse_expr()?;
                self.expect(&Tok::RParen)?;
                e
            }
            other => return Err(eval_err(format!("unexpected token: {other:?}"))),
        };
        Ok(e)
    }
}

/* ------------------------------- AST & Eval ------------------------------- */

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Var(String),
    Unary(UnOp, Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Get(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy)]
enum UnOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Parses and evaluates `src` against `env`.
///
/// # Errors
/// `DbgError::Eval` on any syntax error, unknown name, or type mismatch.
pub fn eval_expr(src: &str, env: &dyn EvalEnv) -> DbgResult<Value> {
    let mut p = Parser::new(src)?;
    let ast = p.parse_expr()?;
    eval(&ast, env)
}

/// `eval_expr` plus truthiness coercion, for `stop only if` conditions.
///
/// # Errors
/// Same as [`eval_expr`].
pub fn eval_bool(src: &str, env: &dyn EvalEnv) -> DbgResult<bool> {
    Ok(eval_expr(src, env)?.truthy())
}

fn eval(ast: &Expr, env: &dyn EvalEnv) -> DbgResult<Value> {
    use Expr::{Binary, Call, Get, Index, Literal, Unary, Var};
    match ast {
        Literal(v) => Ok(v.clone()),
        Var(name) => env.get_var(name).ok_or_else(|| eval_err(format!("unknown variable: {name}"))),
        Unary(op, e) => {
            let v = eval(e, env)?;
            match op {
                UnOp::Not => Ok(Value::Bool(!v.truthy())),
                UnOp::Neg => match v.as_number()? {
                    Number::Int(i) => Ok(Value::Int(-i)),
                    Number::Float(f) => Ok(Value::Float(-f)),
                },
                UnOp::Plus => match v.as_number()? {
                    Number::Int(i) => Ok(Value::Int(i)),
                    Number::Float(f) => Ok(Value::Float(f)),
                },
            }
        }
        Binary(a, op, b) => {
            match op {
                BinOp::And => {
                    let va = eval(a, env)?;
                    if !va.truthy() {
                        return Ok(Value::Bool(false));
                    }
                    let vb = eval(b, env)?;
                    return Ok(Value::Bool(vb.truthy()));
                }
                BinOp::Or => {
                    let va = eval(a, env)?;
                    if va.truthy() {
                        return Ok(Value::Bool(true));
                    }
                    let vb = eval(b, env)?;
                    return Ok(Value::Bool(vb.truthy()));
                }
                _ => {}
            }
            let va = eval(a, env)?;
            let vb = eval(b, env)?;
            match op {
                BinOp::Add => num_bin(va, vb, |x, y| x + y, |x, y| x + y, |s, t| Ok(Value::Str(format!("{s}{t}")))),
                BinOp::Sub => num_bin(va, vb, |x, y| x - y, |x, y| x - y, |_, _| Err(eval_err("subtraction is not defined for strings"))),
                BinOp::Mul => num_bin(va, vb, |x, y| x * y, |x, y| x * y, |_, _| Err(eval_err("multiplication is not defined for strings"))),
                BinOp::Div => num_bin(va, vb, |x, y| x / y, |x, y| x / y, |_, _| Err(eval_err("division is not defined for strings"))),
                BinOp::Rem => num_bin(va, vb, |x, y| x % y, |x, y| x % y, |_, _| Err(eval_err("modulo is not defined for strings"))),
                BinOp::Eq => Ok(Value::Bool(eq_value(&va, &vb))),
                BinOp::Ne => Ok(Value::Bool(!eq_value(&va, &vb))),
                BinOp::Lt => Ok(Value::Bool(cmp_value(&va, &vb, std::cmp::Ordering::is_lt)?)),
                BinOp::Le => Ok(Value::Bool(cmp_value(&va, &vb, |o| !o.is_gt())?)),
                BinOp::Gt => Ok(Value::Bool(cmp_value(&va, &vb, std::cmp::Ordering::is_gt)?)),
                BinOp::Ge => Ok(Value::Bool(cmp_value(&va, &vb, |o| !o.is_lt())?)),
                BinOp::And | BinOp::Or => unreachable!(),
            }
        }
        Call(callee, args) => match callee.as_ref() {
            Expr::Var(name) => {
                let mut vals = Vec::with_capacity(args.len());
                for a in args {
                    vals.push(eval(a, env)?);
                }
                env.call(name, &vals)
            }
            _ => Err(eval_err("calls are only supported on a bare name")),
        },
        Get(base, field) => {
            let b = eval(base, env)?;
            env.get_field(&b, field)
                .ok_or_else(|| eval_err(format!("no such field: {}.{field}", b.type_name())))
        }
        Index(base, idx) => {
            let b = eval(base, env)?;
            let i = eval(idx, env)?;
            env.index(&b, &i)
                .ok_or_else(|| eval_err(format!("invalid index: {}[{i}]", b.type_name())))
        }
    }
}

fn num_bin(
    va: Value,
    vb: Value,
    iop: fn(i64, i64) -> i64,
    fop: fn(f64, f64) -> f64,
    sop: fn(String, String) -> DbgResult<Value>,
) -> DbgResult<Value> {
    match (va, vb) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(iop(a, b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(fop(a, b))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(fop(a as f64, b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(fop(a, b as f64))),
        (Value::Str(a), Value::Str(b)) => sop(a, b),
        (Value::Str(a), b) => sop(a, b.to_string()),
        (a, Value::Str(b)) => sop(a.to_string(), b),
        (a, b) => Err(eval_err(format!("invalid numeric operation between {} and {}", a.type_name(), b.type_name()))),
    }
}

fn eq_value(a: &Value, b: &Value) -> bool {
    use Value::{Bool, Float, Int, Null, Str};
    match (a, b) {
        (Bool(x), Bool(y)) => x == y,
        (Int(x), Int(y)) => x == y,
        (Float(x), Float(y)) => x == y,
        (Int(x), Float(y)) | (Float(y), Int(x)) => (*x as f64) == *y,
        (Str(x), Str(y)) => x == y,
        (Null, Null) => true,
        _ => false,
    }
}

fn cmp_value<F>(a: &Value, b: &Value, pred: F) -> DbgResult<bool>
where
    F: Fn(std::cmp::Ordering) -> bool,
{
    use Value::{Float, Int, Str};
    let ord = match (a, b) {
        (Int(x), Int(y)) => x.cmp(y),
        (Float(x), Float(y)) => x.partial_cmp(y).ok_or_else(|| eval_err("NaN is not comparable"))?,
        (Int(x), Float(y)) => (*x as f64).partial_cmp(y).ok_or_else(|| eval_err("NaN is not comparable"))?,
        (Float(x), Int(y)) => x.partial_cmp(&(*y as f64)).ok_or_else(|| eval_err("NaN is not comparable"))?,
        (Str(x), Str(y)) => x.cmp(y),
        _ => return Err(eval_err(format!("comparison not supported between {} and {}", a.type_name(), b.type_name()))),
    };
    Ok(pred(ord))
}
