// src/expression/parser.rs

//! Parser for the textual expression syntax
//!
//! ```text
//! expression := term ( operator term )*
//! operator   := '>'    translate into the project space named by the term
//!             | '|'    apply the editor named by the term
//! term       := word [ '(' [ option ( ',' option )* ] ')' ]
//! option     := word '=' value
//! value      := word | "quoted string"
//! word       := [A-Za-z0-9_.\-/:@+~*]+
//! ```
//!
//! Whitespace between tokens is ignored. Inside quotes, `\"` and `\\` are
//! the only escapes.

use super::term::{Options, Term, is_word_char};
use super::{Expression, Operator, RepositoryExpression};
use std::fmt;

/// A malformed expression, with the byte offset where parsing stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSyntaxError {
    pub text: String,
    pub position: usize,
    pub message: String,
}

impl fmt::Display for ExpressionSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot parse expression '{}' at position {}: {}",
            self.text, self.position, self.message
        )
    }
}

impl std::error::Error for ExpressionSyntaxError {}

/// Parse any expression
pub fn parse_expression(text: &str) -> Result<Expression, ExpressionSyntaxError> {
    let mut parser = Parser::new(text);
    let term = parser.term()?;
    let mut expression = Expression::Repository(RepositoryExpression::new(term));

    loop {
        parser.skip_whitespace();
        let operator = match parser.peek() {
            None => break,
            Some('>') => Operator::Translate,
            Some('|') => Operator::Edit,
            Some(c) => return Err(parser.error(format!("expected '>' or '|', found '{}'", c))),
        };
        parser.bump();
        let term = parser.term()?;
        expression = expression.apply(operator, term);
    }

    Ok(expression)
}

/// Parse an expression that must be a bare repository expression
pub fn parse_repository_expression(
    text: &str,
) -> Result<RepositoryExpression, ExpressionSyntaxError> {
    let mut parser = Parser::new(text);
    let term = parser.term()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!(
            "expected a repository expression, found trailing '{}'",
            c
        )));
    }
    Ok(RepositoryExpression::new(term))
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> ExpressionSyntaxError {
        ExpressionSyntaxError {
            text: self.text.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ExpressionSyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn word(&mut self, what: &str) -> Result<String, ExpressionSyntaxError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.bump();
        }
        if start == self.pos {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected {}, found '{}'", what, c)),
                None => self.error(format!("expected {}, found end of input", what)),
            });
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn quoted(&mut self) -> Result<String, ExpressionSyntaxError> {
        let start = self.pos;
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => return Err(self.error(format!("invalid escape '\\{}'", c))),
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(ExpressionSyntaxError {
            text: self.text.to_string(),
            position: start,
            message: "unterminated quoted string".to_string(),
        })
    }

    fn value(&mut self) -> Result<String, ExpressionSyntaxError> {
        self.skip_whitespace();
        if self.peek() == Some('"') {
            self.quoted()
        } else {
            self.word("option value")
        }
    }

    fn term(&mut self) -> Result<Term, ExpressionSyntaxError> {
        let identifier = self.word("identifier")?;
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Ok(Term::new(identifier, Options::new()));
        }
        self.bump();

        let mut options = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(Term::new(identifier, Options::new()));
        }

        loop {
            let key = self.word("option name")?;
            self.expect('=')?;
            let value = self.value()?;
            options.push((key, value));

            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(')') => break,
                Some(c) => {
                    self.pos -= c.len_utf8();
                    return Err(self.error(format!("expected ',' or ')', found '{}'", c)));
                }
                None => return Err(self.error("unclosed option list")),
            }
        }

        Ok(Term::new(identifier, options.into_iter().collect()))
    }
}
