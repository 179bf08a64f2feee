//! tabula-engine - Formula parsing plus the spreadsheet cell engine.

pub mod engine;
pub mod formula;

pub use engine::{Cell, CellContent, ESCAPE_SIGN, FORMULA_SIGN, Sheet};
pub use formula::Formula;

pub use tabula_core::{
    CellValue, FormulaError, FormulaParseError, Position, Result, SheetError, Size,
};
