//! Sheet storage, the edit protocol, and bulk rendering.
//!
//! The sheet owns every cell in a row-major grown-on-write table and
//! brokers every lookup. Edits run a fixed sequence: construct the
//! candidate content, detect cycles against the committed graph, commit,
//! rewrite reverse edges, invalidate downstream caches. A failure in the
//! first two steps leaves the edited cell unchanged.

use std::io::{self, Write};

use tabula_core::{Position, Result, SheetError, Size};

use super::cell::{Cell, CellContent};
use super::cycle::creates_cycle;

fn empty_row(cols: usize) -> Vec<Option<Cell>> {
    (0..cols).map(|_| None).collect()
}

/// A spreadsheet: a grown-on-write table of cells plus the printable region.
#[derive(Debug, Default)]
pub struct Sheet {
    cells: Vec<Vec<Option<Cell>>>,
    printable_size: Size,
}

impl Sheet {
    pub fn new() -> Sheet {
        Sheet::default()
    }

    /// Set the cell at `pos` from raw input text.
    ///
    /// Fails with `InvalidPosition`, a formula parse error, or
    /// `CircularDependency`. A rejected edit leaves the cell's content
    /// unchanged, though the target cell and any cells referenced by a
    /// rejected candidate stay materialized as empty.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        self.materialize(pos);
        let candidate = CellContent::from_input(text)?;

        for &referenced in candidate.referenced_cells() {
            self.materialize(referenced);
        }

        if creates_cycle(self, pos, candidate.referenced_cells()) {
            return Err(SheetError::CircularDependency(pos));
        }

        self.commit(pos, candidate);
        self.invalidate_from(pos);
        Ok(())
    }

    /// Look up the cell at `pos`.
    ///
    /// `None` both for positions beyond the current table geometry and for
    /// in-bounds slots that were never materialized.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self.cell_at(pos))
    }

    /// Clear the cell at `pos`.
    ///
    /// The cleared cell stops referencing anything; formulas referencing it
    /// are invalidated and now read it as empty. The entry itself survives
    /// as an empty cell while other formulas still reference it, otherwise
    /// the slot is dropped and the printable region recomputed.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        let Some(cell) = self.cell_at(pos) else {
            return Ok(());
        };

        let old_refs = cell.referenced_cells().to_vec();
        for &referenced in &old_refs {
            if let Some(target) = self.cell_at_mut(referenced) {
                target.dependents.remove(&pos);
            }
        }

        self.invalidate_from(pos);

        let keep_entry = self.cell_at(pos).is_some_and(Cell::is_referenced);
        if keep_entry {
            if let Some(cell) = self.cell_at_mut(pos) {
                cell.replace_content(CellContent::Empty);
            }
        } else {
            self.cells[pos.row][pos.col] = None;
            self.shrink_printable(pos);
        }
        Ok(())
    }

    /// The bounding rectangle of materialized cells, anchored at `(0, 0)`.
    pub fn printable_size(&self) -> Size {
        self.printable_size
    }

    /// Render cell values over the printable region: tab-separated columns,
    /// newline-terminated rows, absent cells as empty strings.
    pub fn print_values(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_with(out, |cell| cell.value(self).to_string())
    }

    /// Render stored cell texts over the printable region, in the same
    /// layout as [`Sheet::print_values`].
    pub fn print_texts(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_with(out, |cell| cell.text())
    }

    fn print_with(
        &self,
        out: &mut impl Write,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        for row in 0..self.printable_size.rows {
            for col in 0..self.printable_size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = &self.cells[row][col] {
                    write!(out, "{}", render(cell))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Unvalidated lookup within the current geometry. Graph maintenance
    /// and formula evaluation resolve references through this.
    pub(crate) fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.cells.get(pos.row)?.get(pos.col)?.as_ref()
    }

    fn cell_at_mut(&mut self, pos: Position) -> Option<&mut Cell> {
        self.cells.get_mut(pos.row)?.get_mut(pos.col)?.as_mut()
    }

    /// Ensure `pos` has a cell entry, growing the table geometry and
    /// raising the printable region as needed. New entries start empty.
    fn materialize(&mut self, pos: Position) {
        if pos.row >= self.cells.len() {
            let rows = (pos.row * 2).max(2);
            let cols = self.cells.first().map_or(0, Vec::len);
            self.cells.resize_with(rows, || empty_row(cols));
        }
        if pos.col >= self.cells.first().map_or(0, Vec::len) {
            let cols = (pos.col * 2).max(2);
            for row in &mut self.cells {
                row.resize_with(cols, || None);
            }
        }

        let slot = &mut self.cells[pos.row][pos.col];
        if slot.is_none() {
            *slot = Some(Cell::new());
        }

        self.printable_size.rows = self.printable_size.rows.max(pos.row + 1);
        self.printable_size.cols = self.printable_size.cols.max(pos.col + 1);
    }

    /// Install the candidate at `pos` and rewrite both halves of every
    /// affected reverse edge: positions no longer referenced forget this
    /// cell, newly referenced ones learn it.
    fn commit(&mut self, pos: Position, candidate: CellContent) {
        let old_refs = self
            .cell_at(pos)
            .map(|cell| cell.referenced_cells().to_vec())
            .unwrap_or_default();
        let new_refs = candidate.referenced_cells().to_vec();

        if let Some(cell) = self.cell_at_mut(pos) {
            cell.replace_content(candidate);
        }

        for &stale in &old_refs {
            if new_refs.contains(&stale) {
                continue;
            }
            if let Some(cell) = self.cell_at_mut(stale) {
                cell.dependents.remove(&pos);
            }
        }
        for &fresh in &new_refs {
            if old_refs.contains(&fresh) {
                continue;
            }
            if let Some(cell) = self.cell_at_mut(fresh) {
                cell.dependents.insert(pos);
            }
        }
    }

    /// Clear the cache at `pos` and sweep downstream over reverse edges.
    /// Branches whose cache is already empty are pruned: their dependents
    /// were swept by an earlier invalidation.
    fn invalidate_from(&self, pos: Position) {
        let Some(cell) = self.cell_at(pos) else {
            return;
        };
        cell.clear_cache();

        let mut to_visit: Vec<Position> = cell.dependents.iter().copied().collect();
        while let Some(current) = to_visit.pop() {
            let Some(cell) = self.cell_at(current) else {
                continue;
            };
            if !cell.cache_is_populated() {
                continue;
            }
            cell.clear_cache();
            to_visit.extend(cell.dependents.iter().copied());
        }
    }

    /// Recompute the printable region after the slot at `pos` was dropped.
    /// Only boundary deletions can shrink it; scan inward for the new edge.
    fn shrink_printable(&mut self, pos: Position) {
        let Size { rows, cols } = self.printable_size;
        if pos.row + 1 == rows {
            let new_rows = (0..rows)
                .rev()
                .find(|&row| (0..cols).any(|col| self.cells[row][col].is_some()))
                .map_or(0, |row| row + 1);
            self.printable_size.rows = new_rows;
            if new_rows == 0 {
                self.printable_size.cols = 0;
                return;
            }
        }
        if pos.col + 1 == cols {
            let rows = self.printable_size.rows;
            let new_cols = (0..cols)
                .rev()
                .find(|&col| (0..rows).any(|row| self.cells[row][col].is_some()))
                .map_or(0, |col| col + 1);
            self.printable_size.cols = new_cols;
            if new_cols == 0 {
                self.printable_size.rows = 0;
            }
        }
    }
}
