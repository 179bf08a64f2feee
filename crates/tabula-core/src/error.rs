//! Error types for the tabula engine.

use crate::position::Position;
use thiserror::Error;

/// A formula rejected by the parser.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("malformed formula: {0}")]
pub struct FormulaParseError(pub String);

/// Errors raised by sheet operations.
///
/// All of them interrupt the operation and leave the edited cell unchanged.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("invalid position {0}")]
    InvalidPosition(Position),

    #[error("setting {0} would create a circular dependency")]
    CircularDependency(Position),

    #[error(transparent)]
    Formula(#[from] FormulaParseError),
}

pub type Result<T> = std::result::Result<T, SheetError>;
