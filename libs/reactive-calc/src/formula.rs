//! Formula compiler
//!
//! Compiles arithmetic expressions such as `=(PRICE - INV) / 12` into an
//! expression tree evaluated against a [`ValueStore`].
//!
//! Grammar:
//!
//! ```text
//! formula := '='? expr
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | identifier | '(' expr ')'
//! ```
//!
//! Identifiers start with a letter of any alphabet and continue with letters
//! or ASCII digits. They are resolved when the formula is evaluated, never
//! when it is compiled, so a formula always sees the current store.

use std::fmt;
use std::str::FromStr;

use crate::error::{CalcError, Result};
use crate::value::ValueStore;

/// A compiled formula
#[derive(Debug, Clone)]
pub struct Formula {
    source: String,
    expr: Expression,
}

impl Formula {
    /// Compile a formula, with or without the leading `=`
    pub fn compile(source: &str) -> Result<Self> {
        let (body, offset) = match source.strip_prefix('=') {
            Some(rest) => (rest, 1),
            None => (source, 0),
        };

        let tokens = tokenize(source, body, offset)?;
        let mut parser = Parser::new(source, tokens);
        let expr = parser.parse_formula()?;

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Evaluate against the current values
    ///
    /// Absent or non-numeric identifiers evaluate to NaN, which propagates.
    pub fn evaluate(&self, values: &ValueStore) -> f64 {
        self.expr.evaluate(values)
    }

    /// The text the formula was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Codes referenced by the formula, in first-use order
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.expr.collect_identifiers(&mut names);
        names
    }
}

impl FromStr for Formula {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// True when `code` is a valid formula identifier
pub fn is_identifier(code: &str) -> bool {
    let mut chars = code.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() => chars.all(is_identifier_char),
        _ => false,
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_alphabetic() || ch.is_ascii_digit()
}

/// Lexical token
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Multiply,
    Divide,
    Remainder,
    LeftParen,
    RightParen,
}

/// Token with its character position in the original source
#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    position: usize,
}

fn tokenize(source: &str, body: &str, offset: usize) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().enumerate().peekable();

    while let Some((index, ch)) = chars.next() {
        let position = index + offset;
        let token = match ch {
            c if c.is_whitespace() => continue,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Multiply,
            '/' => Token::Divide,
            '%' => Token::Remainder,
            '0'..='9' | '.' => {
                let mut number = String::new();
                number.push(ch);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_digit() || next == '.' {
                        number.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = f64::from_str(&number).map_err(|_| {
                    CalcError::syntax(source, position, format!("invalid number '{}'", number))
                })?;
                Token::Number(value)
            },
            c if c.is_alphabetic() => {
                let mut identifier = String::new();
                identifier.push(c);
                while let Some(&(_, next)) = chars.peek() {
                    if is_identifier_char(next) {
                        identifier.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Identifier(identifier)
            },
            other => {
                return Err(CalcError::syntax(
                    source,
                    position,
                    format!("unexpected character '{}'", other),
                ))
            },
        };
        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

/// Expression tree
#[derive(Debug, Clone)]
enum Expression {
    Number(f64),
    Variable(String),
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
    Negate(Box<Expression>),
}

#[derive(Debug, Clone, Copy)]
enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

impl BinaryOperator {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOperator::Add => a + b,
            BinaryOperator::Subtract => a - b,
            BinaryOperator::Multiply => a * b,
            BinaryOperator::Divide => a / b,
            BinaryOperator::Remainder => a % b,
        }
    }
}

impl Expression {
    fn evaluate(&self, values: &ValueStore) -> f64 {
        match self {
            Expression::Number(n) => *n,
            Expression::Variable(name) => values.number(name),
            Expression::Binary {
                left,
                operator,
                right,
            } => operator.apply(left.evaluate(values), right.evaluate(values)),
            Expression::Negate(operand) => -operand.evaluate(values),
        }
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Number(_) => {},
            Expression::Variable(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            },
            Expression::Binary { left, right, .. } => {
                left.collect_identifiers(names);
                right.collect_identifiers(names);
            },
            Expression::Negate(operand) => operand.collect_identifiers(names),
        }
    }
}

/// Recursive-descent parser
struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    current: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Spanned>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
        }
    }

    fn parse_formula(&mut self) -> Result<Expression> {
        let expr = self.parse_expression()?;
        if let Some(spanned) = self.tokens.get(self.current) {
            return Err(self.error_at(
                spanned.position,
                format!("unexpected token {:?}", spanned.token),
            ));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        let mut expr = self.parse_term()?;

        while let Some(token) = self.peek() {
            let operator = match token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expression> {
        let mut expr = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let operator = match token {
                Token::Multiply => BinaryOperator::Multiply,
                Token::Divide => BinaryOperator::Divide,
                Token::Remainder => BinaryOperator::Remainder,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expression::Negate(Box::new(operand)))
            },
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            },
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let end = self.source.chars().count();
        let Some(spanned) = self.advance().cloned() else {
            return Err(self.error_at(end, "unexpected end of formula"));
        };

        match spanned.token {
            Token::Number(n) => Ok(Expression::Number(n)),
            Token::Identifier(name) => Ok(Expression::Variable(name)),
            Token::LeftParen => {
                let expr = self.parse_expression()?;
                if matches!(self.peek(), Some(Token::RightParen)) {
                    self.advance();
                    Ok(expr)
                } else {
                    Err(self.error_at(spanned.position, "unclosed '('"))
                }
            },
            other => Err(self.error_at(
                spanned.position,
                format!("unexpected token {:?}", other),
            )),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let spanned = self.tokens.get(self.current)?;
        self.current += 1;
        Some(spanned)
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> CalcError {
        CalcError::syntax(self.source, position, message)
    }
}
