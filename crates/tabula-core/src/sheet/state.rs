use crate::config::SheetConfig;
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{Grid, Position};

/// A single sheet: sole owner of every cell, keyed by position.
///
/// Edits take `&mut self`, so an edit (cycle check, commit and dependent
/// invalidation) never interleaves with reads or other edits. Reads take
/// `&self` and memoize formula results in place.
pub struct Sheet {
    /// Cell storage. Edges between cells are positions into this map.
    pub(crate) grid: Grid,
    pub(crate) config: SheetConfig,
}

impl Sheet {
    pub fn new() -> Self {
        Self::with_config(SheetConfig::default())
    }

    pub fn with_config(config: SheetConfig) -> Self {
        Sheet {
            grid: Grid::new(),
            config,
        }
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Number of stored cells, including empty cells kept alive by edges.
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Positions of all stored cells in row-major order.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.grid.iter().map(|entry| *entry.key()).collect();
        positions.sort();
        positions
    }

    pub(crate) fn check_position(pos: Position) -> Result<()> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(TabulaError::InvalidPosition(pos))
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}
