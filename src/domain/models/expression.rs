//! Arithmetic expressions over option names.
//!
//! Used by non-Boolean constraints (`threads * 2 <= cores`) and by numeric
//! step functions (`n * 2`). Identifiers resolve through a lookup closure, so
//! an expression never needs to know which options exist.

use std::collections::BTreeSet;
use std::fmt;

/// Binary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
        }
    }

    const fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }
}

/// Parsed arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ident(String),
    Neg(Box<Expr>),
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(ArithOp),
    Open,
    Close,
}

fn tokenize(src: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Op(ArithOp::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Op(ArithOp::Sub));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Op(ArithOp::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Op(ArithOp::Div));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
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
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Expr, String> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ (ArithOp::Add | ArithOp::Sub))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.factor()?;
        while let Some(Token::Op(op @ (ArithOp::Mul | ArithOp::Div))) = self.peek() {
            let op = *op;
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Op(ArithOp::Sub)) => Ok(Expr::Neg(Box::new(self.factor()?))),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected token {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

impl Expr {
    /// Parse an arithmetic expression.
    pub fn parse(src: &str) -> Result<Self, String> {
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err("empty expression".to_string());
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        if parser.pos < parser.tokens.len() {
            return Err(format!(
                "trailing input after position {}",
                parser.pos
            ));
        }
        Ok(expr)
    }

    /// Evaluate the expression, or `None` if any identifier is unassigned.
    pub fn evaluate<F>(&self, lookup: &F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Self::Number(value) => Some(*value),
            Self::Ident(name) => lookup(name),
            Self::Neg(inner) => inner.evaluate(lookup).map(|v| -v),
            Self::Binary { op, lhs, rhs } => {
                Some(op.apply(lhs.evaluate(lookup)?, rhs.evaluate(lookup)?))
            }
        }
    }

    /// All identifiers referenced by the expression.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Number(_) => {}
            Self::Ident(name) => {
                names.insert(name.clone());
            }
            Self::Neg(inner) => inner.collect_identifiers(names),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_identifiers(names);
                rhs.collect_identifiers(names);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Neg(inner) => write!(f, "-{inner}"),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}
