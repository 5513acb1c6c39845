//! # Predicate Expressions
//!
//! Boolean predicates over the two aliased record views of a blocking
//! rule (`l`/`left` and `r`/`right`). A rule predicate is parsed once
//! into an [`Expr`] by the predicate compiler; the reference engine
//! evaluates it against a pair of rows.
//!
//! Grammar (case-insensitive keywords):
//!
//! ```text
//! expr     := term ( OR term )*
//! term     := factor ( AND factor )*
//! factor   := NOT factor | '(' expr ')' | TRUE | FALSE | comparison
//! comparison := operand op operand        op in =, !=, <>, <, <=, >, >=
//! operand  := alias '.' ident | integer | float | 'string'
//! ```

use crate::model::{Row, Value};
use std::cmp::Ordering;
use std::fmt;

/// Which aliased record view a column reference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{}", symbol)
    }
}

/// One side of a comparison: a qualified column or a literal constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column { side: Side, name: String },
    Const(Value),
}

/// A parsed rule predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        lhs: Operand,
        rhs: Operand,
    },
    Literal(bool),
}

impl Expr {
    /// Parse a predicate string. Errors are plain messages; the predicate
    /// compiler wraps them with the rule position.
    pub fn parse(input: &str) -> Result<Expr, String> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        match parser.peek() {
            None => Ok(expr),
            Some(token) => Err(format!("unexpected trailing `{}`", token)),
        }
    }

    /// Evaluate against a pair of rows. Comparisons involving a missing
    /// column or a null value are false, never an error.
    pub fn matches(&self, left: &Row, right: &Row) -> bool {
        match self {
            Expr::And(a, b) => a.matches(left, right) && b.matches(left, right),
            Expr::Or(a, b) => a.matches(left, right) || b.matches(left, right),
            Expr::Not(inner) => !inner.matches(left, right),
            Expr::Literal(value) => *value,
            Expr::Compare { op, lhs, rhs } => {
                let lhs = resolve(lhs, left, right);
                let rhs = resolve(rhs, left, right);
                match (lhs, rhs) {
                    (Some(a), Some(b)) if !a.is_null() && !b.is_null() => {
                        compare(*op, a.order(b))
                    }
                    _ => false,
                }
            }
        }
    }

    /// Visit every column reference in the predicate.
    pub fn visit_columns(&self, visit: &mut impl FnMut(Side, &str)) {
        match self {
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.visit_columns(visit);
                b.visit_columns(visit);
            }
            Expr::Not(inner) => inner.visit_columns(visit),
            Expr::Literal(_) => {}
            Expr::Compare { lhs, rhs, .. } => {
                for operand in [lhs, rhs] {
                    if let Operand::Column { side, name } = operand {
                        visit(*side, name);
                    }
                }
            }
        }
    }

    /// Whether the predicate references `side.column`.
    pub fn references(&self, wanted_side: Side, column: &str) -> bool {
        let mut found = false;
        self.visit_columns(&mut |side, name| {
            if side == wanted_side && name == column {
                found = true;
            }
        });
        found
    }
}

fn resolve<'a>(operand: &'a Operand, left: &'a Row, right: &'a Row) -> Option<&'a Value> {
    match operand {
        Operand::Const(value) => Some(value),
        Operand::Column { side: Side::Left, name } => left.get(name.as_str()),
        Operand::Column { side: Side::Right, name } => right.get(name.as_str()),
    }
}

fn compare(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Op(CompareOp),
    Dot,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Int(v) => write!(f, "{}", v),
            Token::Float(v) => write!(f, "{}", v),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Op(op) => write!(f, "{}", op),
            Token::Dot => write!(f, "."),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '=' => {
                chars.next();
                // Accept both `=` and `==`.
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Op(CompareOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err("expected `=` after `!`".to_string());
                }
                tokens.push(Token::Op(CompareOp::Ne));
            }
            '<' => {
                chars.next();
                match chars.peek() {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Op(CompareOp::Le));
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Op(CompareOp::Ne));
                    }
                    _ => tokens.push(Token::Op(CompareOp::Lt)),
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(CompareOp::Ge));
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(ch) if ch == quote => break,
                        Some(ch) => text.push(ch),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut text = String::new();
                text.push(c);
                chars.next();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        text.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if text.contains('.') {
                    let value: f64 = text
                        .parse()
                        .map_err(|_| format!("invalid number `{}`", text))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value: i64 = text
                        .parse()
                        .map_err(|_| format!("invalid number `{}`", text))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        text.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(text));
            }
            other => return Err(format!("unexpected character `{}`", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_and()?;
        while self.peek_keyword("or") {
            self.next();
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_factor()?;
        while self.peek_keyword("and") {
            self.next();
            let rhs = self.parse_factor()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, String> {
        if self.peek_keyword("not") {
            self.next();
            let inner = self.parse_factor()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        if self.peek() == Some(&Token::LParen) {
            self.next();
            let expr = self.parse_or()?;
            match self.next() {
                Some(Token::RParen) => return Ok(expr),
                _ => return Err("expected `)`".to_string()),
            }
        }
        if self.peek_keyword("true") {
            self.next();
            return Ok(Expr::Literal(true));
        }
        if self.peek_keyword("false") {
            self.next();
            return Ok(Expr::Literal(false));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_operand()?;
        let op = match self.next() {
            Some(Token::Op(op)) => op,
            Some(other) => return Err(format!("expected comparison operator, found `{}`", other)),
            None => return Err("expected comparison operator".to_string()),
        };
        let rhs = self.parse_operand()?;
        Ok(Expr::Compare { op, lhs, rhs })
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        match self.next() {
            Some(Token::Ident(alias)) => {
                let side = parse_side(&alias)
                    .ok_or_else(|| format!("unknown record alias `{}` (use l/left or r/right)", alias))?;
                if self.next() != Some(Token::Dot) {
                    return Err(format!("expected `.` after alias `{}`", alias));
                }
                match self.next() {
                    Some(Token::Ident(name)) => Ok(Operand::Column { side, name }),
                    _ => Err("expected column name after `.`".to_string()),
                }
            }
            Some(Token::Int(value)) => Ok(Operand::Const(Value::Int(value))),
            Some(Token::Float(value)) => Ok(Operand::Const(Value::Float(value))),
            Some(Token::Str(value)) => Ok(Operand::Const(Value::Text(value))),
            Some(other) => Err(format!("expected operand, found `{}`", other)),
            None => Err("expected operand".to_string()),
        }
    }
}

fn parse_side(alias: &str) -> Option<Side> {
    if alias.eq_ignore_ascii_case("l") || alias.eq_ignore_ascii_case("left") {
        Some(Side::Left)
    } else if alias.eq_ignore_ascii_case("r") || alias.eq_ignore_ascii_case("right") {
        Some(Side::Right)
    } else {
        None
    }
}
