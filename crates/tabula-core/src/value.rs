//! Cell values and formula evaluation errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An error produced by formula evaluation.
///
/// Evaluation errors are values, not failures: they propagate through any
/// formula that reads them, and a cached error is as valid a cache entry as
/// a number.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FormulaError {
    /// The formula references an invalid or out-of-range position.
    Ref,
    /// A referenced cell's content is not interpretable as a number.
    Value,
    /// Division by zero, or arithmetic overflowing to a non-finite value.
    Div0,
}

impl FormulaError {
    /// The stable short code used by the render surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value reported by a cell read: text verbatim, an evaluated number,
/// or an evaluation error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(text) => f.write_str(text),
            CellValue::Number(number) => write!(f, "{}", number),
            CellValue::Error(error) => write!(f, "{}", error),
        }
    }
}
