//! Filter expressions.
//!
//! ```text
//! or      := and ("||" and)*
//! and     := primary ("&&" primary)*
//! primary := "(" or ")" | path ("==" | "!=") operand
//! operand := "string" | number | true | false | null | identifier
//! ```
//!
//! A bare identifier on the right-hand side names an entry in `filter_vars`.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use super::FilterError;
use crate::object::ConfigObject;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    And,
    Or,
    Eq,
    Ne,
    Str(String),
    Num(Value),
    Ident(String),
}

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| {
        Regex::new(
            r#"^\s*(?:(\()|(\))|(&&)|(\|\|)|(==)|(!=)|"((?:[^"\\]|\\.)*)"|(-?[0-9]+(?:\.[0-9]+)?)|([A-Za-z_][A-Za-z0-9_.]*))"#,
        )
        .unwrap()
    })
}

fn tokenize(src: &str) -> Result<Vec<Token>, FilterError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while !rest.trim_start().is_empty() {
        let caps = token_re().captures(rest).ok_or_else(|| {
            let offset = src.len() - rest.trim_start().len();
            FilterError::Syntax(format!("unexpected input at offset {offset}"))
        })?;
        let token = if caps.get(1).is_some() {
            Token::LParen
        } else if caps.get(2).is_some() {
            Token::RParen
        } else if caps.get(3).is_some() {
            Token::And
        } else if caps.get(4).is_some() {
            Token::Or
        } else if caps.get(5).is_some() {
            Token::Eq
        } else if caps.get(6).is_some() {
            Token::Ne
        } else if let Some(s) = caps.get(7) {
            Token::Str(unescape(s.as_str()))
        } else if let Some(n) = caps.get(8) {
            let value: Value = serde_json::from_str(n.as_str())
                .map_err(|e| FilterError::Syntax(format!("bad number '{}': {e}", n.as_str())))?;
            Token::Num(value)
        } else if let Some(id) = caps.get(9) {
            Token::Ident(id.as_str().to_string())
        } else {
            return Err(FilterError::Syntax("unrecognised token".to_string()));
        };
        tokens.push(token);
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }
    Ok(tokens)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Var(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Cmp {
        path: Vec<String>,
        op: CmpOp,
        rhs: Operand,
    },
}

pub fn parse(src: &str) -> Result<Expr, FilterError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(FilterError::Syntax("empty filter".to_string()));
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or()?;
    if let Some(tok) = parser.peek() {
        return Err(FilterError::Syntax(format!("unexpected trailing {tok:?}")));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn or(&mut self) -> Result<Expr, FilterError> {
        let mut terms = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn and(&mut self) -> Result<Expr, FilterError> {
        let mut terms = vec![self.primary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            terms.push(self.primary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn primary(&mut self) -> Result<Expr, FilterError> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(FilterError::Syntax(format!("expected ')', found {other:?}"))),
                }
            }
            Some(Token::Ident(path)) => {
                let op = match self.advance() {
                    Some(Token::Eq) => CmpOp::Eq,
                    Some(Token::Ne) => CmpOp::Ne,
                    other => {
                        return Err(FilterError::Syntax(format!(
                            "expected '==' or '!=' after '{path}', found {other:?}"
                        )))
                    }
                };
                let rhs = match self.advance() {
                    Some(Token::Str(s)) => Operand::Literal(Value::String(s)),
                    Some(Token::Num(n)) => Operand::Literal(n),
                    Some(Token::Ident(id)) => match id.as_str() {
                        "true" => Operand::Literal(Value::Bool(true)),
                        "false" => Operand::Literal(Value::Bool(false)),
                        "null" => Operand::Literal(Value::Null),
                        _ => Operand::Var(id),
                    },
                    other => {
                        return Err(FilterError::Syntax(format!(
                            "expected a value after '{path}', found {other:?}"
                        )))
                    }
                };
                Ok(Expr::Cmp {
                    path: path.split('.').map(str::to_string).collect(),
                    op,
                    rhs,
                })
            }
            other => Err(FilterError::Syntax(format!(
                "expected a comparison, found {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

impl Expr {
    /// `prefix` is the lower-cased type name every path must start with.
    pub fn eval(
        &self,
        prefix: &str,
        obj: &ConfigObject,
        vars: &Map<String, Value>,
    ) -> Result<bool, FilterError> {
        match self {
            Expr::Or(terms) => {
                for term in terms {
                    if term.eval(prefix, obj, vars)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::And(terms) => {
                for term in terms {
                    if !term.eval(prefix, obj, vars)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Expr::Cmp { path, op, rhs } => {
                let lhs = lookup(prefix, path, obj)?;
                let rhs = match rhs {
                    Operand::Literal(v) => v,
                    Operand::Var(name) => vars
                        .get(name)
                        .ok_or_else(|| FilterError::UnknownVariable(name.clone()))?,
                };
                let equal = values_equal(&lhs, rhs);
                Ok(match op {
                    CmpOp::Eq => equal,
                    CmpOp::Ne => !equal,
                })
            }
        }
    }
}

/// Numbers compare by value, so `2` matches `2.0`.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}

fn lookup(prefix: &str, path: &[String], obj: &ConfigObject) -> Result<Value, FilterError> {
    let joined = || path.join(".");
    match path {
        [head, ..] if head != prefix => Err(FilterError::InvalidPath {
            path: joined(),
            prefix: prefix.to_string(),
        }),
        [_, field] if field == "name" => Ok(Value::String(obj.name.clone())),
        [_, field] if field == "type" => Ok(Value::String(obj.type_name.clone())),
        [_, rest @ ..] if !rest.is_empty() => {
            let segments: Vec<&str> = rest.iter().map(String::as_str).collect();
            Ok(obj.attr(&segments).cloned().unwrap_or(Value::Null))
        }
        _ => Err(FilterError::InvalidPath {
            path: joined(),
            prefix: prefix.to_string(),
        }),
    }
}
