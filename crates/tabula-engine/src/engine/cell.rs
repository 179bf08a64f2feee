//! Cell content variants and per-cell state.
//!
//! A cell stores one of three content variants, the memoized result of its
//! last formula evaluation, and the positions of the cells whose formulas
//! currently reference it (the reverse half of the dependency graph).

use std::cell::RefCell;
use std::collections::HashSet;

use tabula_core::{CellValue, FormulaError, FormulaParseError, Position};

use super::sheet::Sheet;
use crate::formula::Formula;

/// Prefix selecting the formula content variant.
pub const FORMULA_SIGN: char = '=';
/// Prefix eliding itself from a text cell's reported value.
pub const ESCAPE_SIGN: char = '\'';

/// The content stored in a cell.
#[derive(Clone, Debug, Default)]
pub enum CellContent {
    #[default]
    Empty,
    Text(String),
    Formula(Formula),
}

impl CellContent {
    /// Choose the content variant for raw input text.
    ///
    /// Empty input is Empty; `=` followed by at least one character parses
    /// as a formula; everything else, a lone `=` included, is text.
    pub fn from_input(text: &str) -> Result<CellContent, FormulaParseError> {
        if text.is_empty() {
            Ok(CellContent::Empty)
        } else if let Some(src) = text.strip_prefix(FORMULA_SIGN)
            && !src.is_empty()
        {
            Ok(CellContent::Formula(Formula::parse(src)?))
        } else {
            Ok(CellContent::Text(text.to_string()))
        }
    }

    /// The positions this content reads, sorted and deduplicated.
    /// Empty and text content read nothing.
    pub fn referenced_cells(&self) -> &[Position] {
        match self {
            CellContent::Formula(formula) => formula.referenced_cells(),
            CellContent::Empty | CellContent::Text(_) => &[],
        }
    }
}

/// A single cell of a sheet.
///
/// The cache slot sits behind a `RefCell` because cache fills happen during
/// shared reads; the borrow is never held across a recursive evaluation,
/// and the acyclicity of the dependency graph rules out re-entrant fills.
#[derive(Debug, Default)]
pub struct Cell {
    content: CellContent,
    cache: RefCell<Option<Result<f64, FormulaError>>>,
    pub(crate) dependents: HashSet<Position>,
}

impl Cell {
    pub(crate) fn new() -> Cell {
        Cell::default()
    }

    /// The cell's value. Formula cells fill the cache on the first read
    /// after an invalidation and answer from it afterwards; a cached error
    /// is returned as-is until invalidated.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Text(String::new()),
            CellContent::Text(text) => {
                let reported = text.strip_prefix(ESCAPE_SIGN).unwrap_or(text);
                CellValue::Text(reported.to_string())
            }
            CellContent::Formula(formula) => {
                // Copy the slot out so no borrow is held across evaluation.
                let cached = *self.cache.borrow();
                let result = match cached {
                    Some(result) => result,
                    None => {
                        let result = formula.evaluate(sheet);
                        *self.cache.borrow_mut() = Some(result);
                        result
                    }
                };
                match result {
                    Ok(number) => CellValue::Number(number),
                    Err(error) => CellValue::Error(error),
                }
            }
        }
    }

    /// The cell's stored form. Formulas print as `=` plus the canonical
    /// expression, not the original source.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula(formula) => {
                format!("{}{}", FORMULA_SIGN, formula.expression())
            }
        }
    }

    /// The positions referenced by the current content.
    pub fn referenced_cells(&self) -> &[Position] {
        self.content.referenced_cells()
    }

    /// Whether any formula currently references this cell.
    pub fn is_referenced(&self) -> bool {
        !self.dependents.is_empty()
    }

    /// Swap in new content. The reverse-dependency set survives the
    /// replacement; the sheet rewrites edges separately.
    pub(crate) fn replace_content(&mut self, content: CellContent) {
        self.content = content;
    }

    pub(crate) fn cache_is_populated(&self) -> bool {
        self.cache.borrow().is_some()
    }

    pub(crate) fn clear_cache(&self) {
        self.cache.borrow_mut().take();
    }
}
