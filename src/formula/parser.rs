//! Recursive-descent arithmetic evaluator.
//!
//! Formulas arrive here after placeholder substitution and character-class
//! validation. The grammar is deliberately small: `+ - * / ( )`, unary
//! minus, and decimal literals. Nothing else is accepted, so a formula can
//! never execute anything beyond arithmetic.

use std::fmt;

/// Errors produced while parsing or evaluating an arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Unexpected character at the given byte offset.
    UnexpectedChar(char, usize),
    /// Input ended where a value or `)` was expected.
    UnexpectedEnd,
    /// Right-hand side of a division evaluated to zero.
    DivisionByZero,
    /// Leftover input after a complete expression.
    TrailingInput(usize),
    /// A numeric literal failed to parse.
    InvalidNumber(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedChar(c, pos) => {
                write!(f, "Unexpected character '{}' at offset {}", c, pos)
            }
            ParseError::UnexpectedEnd => write!(f, "Unexpected end of expression"),
            ParseError::DivisionByZero => write!(f, "Division by zero"),
            ParseError::TrailingInput(pos) => {
                write!(f, "Trailing input at offset {}", pos)
            }
            ParseError::InvalidNumber(s) => write!(f, "Invalid number: {}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// Evaluates an arithmetic expression.
///
/// # Examples
///
/// ```
/// use apiforge::formula::parser::evaluate;
///
/// assert_eq!(evaluate("3+4*2").unwrap(), 11.0);
/// assert_eq!(evaluate("(1+2)*3").unwrap(), 9.0);
/// assert_eq!(evaluate("-2*5").unwrap(), -10.0);
/// ```
pub fn evaluate(expr: &str) -> Result<f64, ParseError> {
    let mut parser = Parser {
        input: expr.as_bytes(),
        pos: 0,
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.pos < parser.input.len() {
        return Err(ParseError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos] == b' ' {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    /// expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, ParseError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    /// term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, ParseError> {
        let mut value = self.factor()?;
        loop {
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some(b'/') => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(ParseError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    /// factor := '-' factor | '+' factor | '(' expression ')' | number
    fn factor(&mut self) -> Result<f64, ParseError> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expression()?;
                match self.peek() {
                    Some(b')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(c) => Err(ParseError::UnexpectedChar(c as char, self.pos)),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(ParseError::UnexpectedChar(c as char, self.pos)),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_digit() || self.input[self.pos] == b'.')
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("");
        text.parse::<f64>()
            .map_err(|_| ParseError::InvalidNumber(text.to_string()))
    }
}
