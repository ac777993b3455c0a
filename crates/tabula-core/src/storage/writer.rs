//! Tab-separated rendering of the printable area of a sheet.

use std::collections::BTreeMap;
use std::io::Write;

use crate::error::Result;
use crate::sheet::Sheet;
use tabula_engine::engine::{Grid, Position};

/// Extent of the printable area, in rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

/// Cells with non-empty text, keyed by position, in row-major order.
fn printable_cells(grid: &Grid) -> BTreeMap<Position, String> {
    grid.iter()
        .filter_map(|entry| {
            let text = entry.value().text();
            (!text.is_empty()).then(|| (*entry.key(), text))
        })
        .collect()
}

fn bounding_size<'a>(positions: impl Iterator<Item = &'a Position>) -> Size {
    positions.fold(Size::default(), |size, pos| Size {
        rows: size.rows.max(pos.row + 1),
        cols: size.cols.max(pos.col + 1),
    })
}

/// Smallest rectangle anchored at A1 that holds every cell with non-empty text.
pub fn printable_size(grid: &Grid) -> Size {
    bounding_size(printable_cells(grid).keys())
}

fn write_table<W, F>(out: &mut W, cells: &BTreeMap<Position, String>, mut render: F) -> Result<()>
where
    W: Write,
    F: FnMut(Position, &str) -> String,
{
    let size = bounding_size(cells.keys());
    for row in 0..size.rows {
        let mut line = String::new();
        for col in 0..size.cols {
            if col > 0 {
                line.push('\t');
            }
            let pos = Position::new(row, col);
            if let Some(text) = cells.get(&pos) {
                line.push_str(&render(pos, text));
            }
        }
        line.push('\n');
        out.write_all(line.as_bytes())?;
    }
    Ok(())
}

/// Write the evaluated value of every printable cell.
pub fn write_values<W: Write>(sheet: &Sheet, out: &mut W) -> Result<()> {
    // Collect first: evaluation writes caches and must not run under an
    // iteration guard.
    let cells = printable_cells(&sheet.grid);
    write_table(out, &cells, |pos, _| {
        sheet
            .cell_value(pos)
            .map(|value| value.to_string())
            .unwrap_or_default()
    })
}

/// Write the text of every printable cell.
pub fn write_texts<W: Write>(sheet: &Sheet, out: &mut W) -> Result<()> {
    let cells = printable_cells(&sheet.grid);
    write_table(out, &cells, |_, text| text.to_string())
}

impl Sheet {
    pub fn printable_size(&self) -> Size {
        printable_size(&self.grid)
    }

    pub fn print_values<W: Write>(&self, out: &mut W) -> Result<()> {
        write_values(self, out)
    }

    pub fn print_texts<W: Write>(&self, out: &mut W) -> Result<()> {
        write_texts(self, out)
    }
}
