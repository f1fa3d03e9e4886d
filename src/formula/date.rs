//! Date-difference formula evaluation.
//!
//! A date formula subtracts one date variable from another and yields the
//! signed number of days between them. After substitution the text must
//! contain exactly two date tokens joined by a single `-` operator.
//! Accepted token forms: `YYYYMMDD`, `YYYY-MM-DD`, `YYYY/MM/DD`, each with
//! an optional trailing time component that is ignored.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Matches one date token with an optional trailing time component.
static DATE_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}[-/]?\d{2}[-/]?\d{2}(?:[ T]\d{1,2}:\d{2}(?::\d{2})?)?")
        .expect("Failed to compile date token regex")
});

/// Errors produced while validating or evaluating a date formula.
#[derive(Debug, Clone, PartialEq)]
pub enum DateFormulaError {
    /// The substituted text contains no `-` at all.
    NoSubtraction,
    /// Expected exactly two date tokens, found a different count.
    TokenCount(usize),
    /// The text between or around the tokens is not a single `-`.
    InvalidOperator(String),
    /// A date token failed to parse.
    InvalidDate(String),
}

impl fmt::Display for DateFormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormulaError::NoSubtraction => {
                write!(f, "Date formula contains no '-' operator")
            }
            DateFormulaError::TokenCount(n) => {
                write!(f, "Expected exactly two date tokens, found {}", n)
            }
            DateFormulaError::InvalidOperator(text) => {
                write!(f, "Expected a single '-' between dates, found '{}'", text)
            }
            DateFormulaError::InvalidDate(token) => write!(f, "Invalid date: {}", token),
        }
    }
}

impl std::error::Error for DateFormulaError {}

/// Evaluates a substituted date formula to a signed day count.
///
/// # Examples
///
/// ```
/// use apiforge::formula::date::evaluate_date;
///
/// assert_eq!(evaluate_date("20250110-20250101").unwrap(), 9);
/// assert_eq!(evaluate_date("2025-01-01 - 2025-01-10").unwrap(), -9);
/// ```
pub fn evaluate_date(text: &str) -> Result<i64, DateFormulaError> {
    if !text.contains('-') {
        return Err(DateFormulaError::NoSubtraction);
    }

    let matches: Vec<regex::Match> = DATE_TOKEN_REGEX.find_iter(text).collect();
    if matches.len() != 2 {
        return Err(DateFormulaError::TokenCount(matches.len()));
    }

    // Exactly one '-' between the tokens, nothing else around them.
    let between = text[matches[0].end()..matches[1].start()].trim();
    let leading = text[..matches[0].start()].trim();
    let trailing = text[matches[1].end()..].trim();
    if between != "-" || !leading.is_empty() || !trailing.is_empty() {
        return Err(DateFormulaError::InvalidOperator(between.to_string()));
    }

    let first = parse_date_token(matches[0].as_str())?;
    let second = parse_date_token(matches[1].as_str())?;

    Ok((first - second).num_days())
}

/// Parses one date token, discarding any trailing time component.
fn parse_date_token(token: &str) -> Result<NaiveDate, DateFormulaError> {
    let date_part = token
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(token);

    let format = if date_part.contains('-') {
        "%Y-%m-%d"
    } else if date_part.contains('/') {
        "%Y/%m/%d"
    } else {
        "%Y%m%d"
    };

    NaiveDate::parse_from_str(date_part, format)
        .map_err(|_| DateFormulaError::InvalidDate(token.to_string()))
}
