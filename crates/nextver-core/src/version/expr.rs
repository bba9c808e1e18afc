//! Restricted arithmetic for incremental identifiers.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := NUMBER | IDENT | '(' expr ')'
//! ```
//!
//! Identifiers are looked up in the caller's variable map. There are no
//! functions, comparisons, or assignments.

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors from expression evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    /// A character outside the grammar.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar {
        /// The offending character.
        ch: char,
        /// Byte offset in the source.
        offset: usize,
    },

    /// A numeric literal that does not parse.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    /// The token stream ended or continued where it should not.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// An identifier with no value.
    #[error("unknown variable {0:?}")]
    UnknownVariable(String),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The result is NaN or infinite.
    #[error("expression result is not a finite number")]
    NonFinite,
}

/// Result alias for expression evaluation.
pub type ExprResult<T> = Result<T, ExprError>;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(src: &str) -> ExprResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' | '-' | '*' | '/' | '(' | ')' => {
                chars.next();
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExprError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(name));
            }
            _ => return Err(ExprError::UnexpectedChar { ch, offset }),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    vars: &'a BTreeMap<String, f64>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> ExprResult<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> ExprResult<f64> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> ExprResult<f64> {
        if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            return Ok(-self.unary()?);
        }
        self.atom()
    }

    fn atom(&mut self) -> ExprResult<f64> {
        let vars = self.vars;
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Ident(name)) => vars
                .get(&name)
                .copied()
                .ok_or(ExprError::UnknownVariable(name)),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ExprError::Syntax("expected ')'".to_string())),
                }
            }
            Some(other) => Err(ExprError::Syntax(format!("unexpected token {other:?}"))),
            None => Err(ExprError::Syntax("unexpected end of expression".to_string())),
        }
    }
}

/// Evaluate `src` with the given variables.
pub fn evaluate(src: &str, vars: &BTreeMap<String, f64>) -> ExprResult<f64> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ExprError::Syntax("empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        vars,
    };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(ExprError::Syntax(format!("unexpected trailing token {extra:?}")));
    }
    if !value.is_finite() {
        return Err(ExprError::NonFinite);
    }
    Ok(value)
}
