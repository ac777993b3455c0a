use super::Sheet;
use crate::error::Result;
use tabula_engine::engine::{Position, Value};

/// Read access to one stored cell.
///
/// A view holds the position, not a borrow of the cell, so it can evaluate
/// formulas that read other cells of the same sheet.
#[derive(Clone, Copy)]
pub struct CellView<'a> {
    sheet: &'a Sheet,
    pos: Position,
}

impl<'a> CellView<'a> {
    pub fn position(&self) -> Position {
        self.pos
    }

    /// Evaluated value; formula results are memoized.
    pub fn value(&self) -> Value {
        self.sheet.cell_value(self.pos).unwrap_or_else(Value::empty)
    }

    /// Text as it would be entered: escape sign kept, formulas canonical.
    pub fn text(&self) -> String {
        self.sheet
            .grid
            .get(&self.pos)
            .map(|cell| cell.text())
            .unwrap_or_default()
    }

    /// Cells this cell's formula reads, in row-major order.
    pub fn referenced_cells(&self) -> Vec<Position> {
        self.sheet
            .grid
            .get(&self.pos)
            .map(|cell| cell.referenced.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Cells whose formulas read this cell, in row-major order.
    pub fn dependent_cells(&self) -> Vec<Position> {
        self.sheet
            .grid
            .get(&self.pos)
            .map(|cell| cell.dependents.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_formula(&self) -> bool {
        self.sheet
            .grid
            .get(&self.pos)
            .is_some_and(|cell| cell.content.is_formula())
    }
}

/// Read and edit access to one stored cell.
pub struct CellViewMut<'a> {
    sheet: &'a mut Sheet,
    pos: Position,
}

impl<'a> CellViewMut<'a> {
    pub fn as_view(&self) -> CellView<'_> {
        CellView {
            sheet: &*self.sheet,
            pos: self.pos,
        }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn value(&self) -> Value {
        self.as_view().value()
    }

    pub fn text(&self) -> String {
        self.as_view().text()
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        self.as_view().referenced_cells()
    }

    pub fn dependent_cells(&self) -> Vec<Position> {
        self.as_view().dependent_cells()
    }

    /// Same as [`Sheet::set_cell`] on this position.
    pub fn set(&mut self, text: &str) -> Result<()> {
        self.sheet.set_cell(self.pos, text)
    }

    /// Reset the content to empty. Unlike [`Sheet::clear_cell`] the cell stays
    /// stored, so the handle remains usable.
    pub fn clear(&mut self) -> Result<()> {
        self.sheet.set_cell(self.pos, "")
    }
}

impl Sheet {
    /// The cell at `pos`, or `None` if nothing is stored there.
    pub fn get_cell(&self, pos: Position) -> Result<Option<CellView<'_>>> {
        Self::check_position(pos)?;
        Ok(self
            .grid
            .contains_key(&pos)
            .then_some(CellView { sheet: self, pos }))
    }

    /// Mutable handle to the cell at `pos`, or `None` if nothing is stored there.
    pub fn get_cell_mut(&mut self, pos: Position) -> Result<Option<CellViewMut<'_>>> {
        Self::check_position(pos)?;
        if !self.grid.contains_key(&pos) {
            return Ok(None);
        }
        Ok(Some(CellViewMut { sheet: self, pos }))
    }

    /// Value at `pos`; empty text where no cell is stored.
    pub fn value(&self, pos: Position) -> Result<Value> {
        Ok(self
            .get_cell(pos)?
            .map(|cell| cell.value())
            .unwrap_or_else(Value::empty))
    }

    /// Text at `pos`; empty where no cell is stored.
    pub fn text(&self, pos: Position) -> Result<String> {
        Ok(self
            .get_cell(pos)?
            .map(|cell| cell.text())
            .unwrap_or_default())
    }
}
