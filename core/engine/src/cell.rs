//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` struct, the `CellValue` enum and the compiled
//! `Formula`. It separates the user's input (formula) from the calculated result (value).
//! A formula is parsed once when it is written; recalculation only walks the cached tree.

use formula_parser::{parse, Expression, ParseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the possible errors a cell can hold.
/// Errors are ordinary values: they are stored, rendered and passed to functions like
/// any other result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    /// `#ERROR!`: malformed formula, or a function given the wrong arity or types.
    Generic,
    /// `#DIV/0!`
    Div0,
    /// `#NAME? (<fn>)`: unknown function, carrying the name as written.
    Name(String),
}

impl CellError {
    /// Parses a rendered marker back into an error. Used when restoring stored results.
    pub fn from_marker(marker: &str) -> Option<CellError> {
        match marker {
            "#ERROR!" => Some(CellError::Generic),
            "#DIV/0!" => Some(CellError::Div0),
            _ => marker
                .strip_prefix("#NAME? (")
                .and_then(|rest| rest.strip_suffix(')'))
                .map(|name| CellError::Name(name.to_string())),
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellError::Generic => write!(f, "#ERROR!"),
            CellError::Div0 => write!(f, "#DIV/0!"),
            CellError::Name(name) => write!(f, "#NAME? ({})", name),
        }
    }
}

/// Represents the calculated result or raw data within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Formats a number the way cells render it: integral values without a fractional
/// part, non-finite values spelled out.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A formula as written by the user plus its parsed tree.
/// A formula that fails to parse is still stored; it evaluates to `#ERROR!`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    compiled: Result<Expression, ParseError>,
}

impl Formula {
    /// Parses the formula text once. The text is expected to start with '='.
    pub fn compile(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = parse(&source);
        Formula { source, compiled }
    }

    /// The original text, including the leading '='.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> Result<&Expression, &ParseError> {
        self.compiled.as_ref()
    }
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub formula: Option<Formula>,
    pub value: CellValue,
    /// Presentation attributes, opaque to the engine.
    pub style: Option<serde_json::Value>,
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl Cell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_number(num: f64) -> Self {
        Cell {
            value: CellValue::Number(num),
            ..Self::default()
        }
    }

    pub fn new_text(text: impl Into<String>) -> Self {
        Cell {
            value: CellValue::Text(text.into()),
            ..Self::default()
        }
    }

    /// A formula cell whose value has not been computed yet.
    pub fn new_formula(source: impl Into<String>) -> Self {
        Cell {
            formula: Some(Formula::compile(source)),
            ..Self::default()
        }
    }

    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Returns the display value of the cell as a String.
    pub fn display_value(&self) -> String {
        self.value.to_string()
    }

    /// True when the cell carries nothing worth keeping: no value, no formula, no style.
    pub fn is_blank(&self) -> bool {
        self.formula.is_none() && self.value.is_empty() && self.style.is_none()
    }
}
