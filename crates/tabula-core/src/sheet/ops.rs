use std::collections::{HashSet, VecDeque};

use super::Sheet;
use crate::config::InvalidationPolicy;
use crate::error::{Result, TabulaError};
use tabula_engine::engine::{CellContent, Position, detect_cycle};

impl Sheet {
    /// Set cell contents from input text.
    ///
    /// Fails without touching the sheet if the position is out of range, the
    /// formula does not parse, or the formula would close a reference cycle.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        Self::check_position(pos)?;
        let content = CellContent::from_input(text).map_err(|err| {
            tracing::warn!(%pos, %err, "rejected formula");
            TabulaError::from(err)
        })?;
        let referenced = content.referenced_cells();

        if let Some(path) = detect_cycle(&pos, &referenced, &self.grid) {
            let path: Vec<String> = path.iter().map(Position::to_string).collect();
            tracing::warn!(%pos, cycle = %path.join(" -> "), "rejected circular reference");
            return Err(TabulaError::CircularDependency(pos));
        }

        self.commit(pos, content, &referenced);
        self.invalidate_dependents(pos);
        Ok(())
    }

    /// Clear the specified cell.
    ///
    /// The content is reset as if set to `""`. The storage entry is removed
    /// only when no formula still reads the cell; otherwise an empty cell is
    /// kept so the readers' edges stay valid.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        Self::check_position(pos)?;
        if !self.grid.contains_key(&pos) {
            return Ok(());
        }
        self.commit(pos, CellContent::Empty, &[]);
        self.invalidate_dependents(pos);
        if self
            .grid
            .remove_if(&pos, |_, cell| cell.is_detached())
            .is_some()
        {
            tracing::debug!(%pos, "removed cell");
        }
        Ok(())
    }

    /// Replace the content of `pos` and rewire its outgoing edges.
    /// The caller has already ruled out cycles.
    fn commit(&mut self, pos: Position, content: CellContent, referenced: &[Position]) {
        let old_referenced = self
            .grid
            .get_mut(&pos)
            .map(|mut cell| std::mem::take(&mut cell.referenced))
            .unwrap_or_default();
        for old in &old_referenced {
            if let Some(mut cell) = self.grid.get_mut(old) {
                cell.dependents.remove(&pos);
            }
        }

        {
            let mut cell = self.grid.entry(pos).or_default();
            cell.content = content;
            cell.referenced = referenced.iter().copied().collect();
            cell.cache = None;
        }

        for target in referenced {
            self.grid.entry(*target).or_default().dependents.insert(pos);
        }

        tracing::debug!(%pos, references = referenced.len(), "committed cell");
    }

    /// Every cell that reads `pos`, directly or through other cells.
    fn transitive_dependents(&self, pos: Position) -> Vec<Position> {
        let mut queue: VecDeque<Position> = VecDeque::from([pos]);
        let mut seen: HashSet<Position> = HashSet::from([pos]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            let dependents = match self.grid.get(&current) {
                Some(cell) => cell.dependents.clone(),
                None => continue,
            };
            for dep in dependents {
                if seen.insert(dep) {
                    out.push(dep);
                    queue.push_back(dep);
                }
            }
        }
        out
    }

    fn invalidate_dependents(&mut self, pos: Position) {
        let dependents = self.transitive_dependents(pos);
        if dependents.is_empty() {
            return;
        }

        match self.config.invalidation {
            InvalidationPolicy::CacheOnly => {
                for dep in &dependents {
                    if let Some(mut cell) = self.grid.get_mut(dep) {
                        cell.invalidate_cache();
                    }
                }
            }
            InvalidationPolicy::ClearDependents => {
                // Every reader of a cleared cell is in the set too, so
                // clearing them in any order leaves no stale edges.
                for dep in &dependents {
                    self.commit(*dep, CellContent::Empty, &[]);
                }
            }
        }

        tracing::debug!(
            %pos,
            count = dependents.len(),
            policy = %self.config.invalidation,
            "invalidated dependents"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{InvalidationPolicy, SheetConfig};
    use crate::error::TabulaError;
    use crate::Sheet;
    use tabula_engine::engine::{Position, Value};

    const A1: Position = Position::new(0, 0);
    const B1: Position = Position::new(0, 1);
    const C1: Position = Position::new(0, 2);
    const D1: Position = Position::new(0, 3);

    /// Check that `referenced` and `dependents` are exact inverses and that
    /// no edge points at a missing cell.
    fn assert_edges_consistent(sheet: &Sheet) {
        for pos in sheet.positions() {
            let cell = sheet.grid.get(&pos).unwrap().clone();
            for target in &cell.referenced {
                let other = sheet.grid.get(target).expect("dangling reference");
                assert!(other.dependents.contains(&pos), "{} missing back edge to {}", target, pos);
            }
            for source in &cell.dependents {
                let other = sheet.grid.get(source).expect("dangling dependent");
                assert!(other.referenced.contains(&pos), "{} missing edge to {}", source, pos);
            }
            if !cell.content.is_formula() {
                assert!(cell.referenced.is_empty());
                assert!(cell.cache.is_none());
            }
        }
    }

    fn clearing_sheet() -> Sheet {
        Sheet::with_config(SheetConfig::with_policy(InvalidationPolicy::ClearDependents))
    }

    #[test]
    fn test_set_formula_creates_edges_and_vivifies_targets() {
        let mut sheet = Sheet::new();
        sheet.set_cell(C1, "=A1+B1").unwrap();

        assert_eq!(sheet.positions(), vec![A1, B1, C1]);
        assert_eq!(sheet.text(A1).unwrap(), "");
        assert!(sheet.grid.get(&A1).unwrap().dependents.contains(&C1));
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_rewiring_removes_old_back_edges() {
        let mut sheet = Sheet::new();
        sheet.set_cell(C1, "=A1").unwrap();
        sheet.set_cell(C1, "=B1").unwrap();

        assert!(sheet.grid.get(&A1).unwrap().dependents.is_empty());
        assert!(sheet.grid.get(&B1).unwrap().dependents.contains(&C1));
        assert_edges_consistent(&sheet);

        sheet.set_cell(C1, "plain").unwrap();
        assert!(sheet.grid.get(&B1).unwrap().dependents.is_empty());
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut sheet = Sheet::new();
        sheet.set_cell(A1, "7").unwrap();
        let err = sheet.set_cell(A1, "=A1").unwrap_err();
        assert!(matches!(err, TabulaError::CircularDependency(pos) if pos == A1));
        assert_eq!(sheet.text(A1).unwrap(), "7");
        assert_eq!(sheet.positions(), vec![A1]);
    }

    #[test]
    fn test_cycle_rejection_preserves_state() {
        let mut sheet = Sheet::new();
        sheet.set_cell(A1, "=B1").unwrap();
        let err = sheet.set_cell(B1, "=A1").unwrap_err();
        assert!(matches!(err, TabulaError::CircularDependency(_)));

        assert_eq!(sheet.text(A1).unwrap(), "=B1");
        assert_eq!(sheet.text(B1).unwrap(), "");
        assert!(sheet.grid.get(&B1).unwrap().referenced.is_empty());
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_indirect_cycle_is_rejected_without_new_cells() {
        let mut sheet = Sheet::new();
        sheet.set_cell(A1, "=B1").unwrap();
        sheet.set_cell(B1, "=C1").unwrap();
        let before = sheet.positions();

        assert!(sheet.set_cell(C1, "=D1+A1").is_err());
        assert_eq!(sheet.positions(), before);
        assert_eq!(sheet.text(C1).unwrap(), "");
        assert!(sheet.get_cell(D1).unwrap().is_none());
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_syntax_error_preserves_state() {
        let mut sheet = Sheet::new();
        sheet.set_cell(B1, "=A1").unwrap();
        let err = sheet.set_cell(B1, "=A1+").unwrap_err();
        assert!(matches!(err, TabulaError::Formula(_)));
        assert_eq!(sheet.text(B1).unwrap(), "=A1");

        assert!(sheet.set_cell(C1, "=(").is_err());
        assert!(sheet.get_cell(C1).unwrap().is_none());
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_invalid_position_is_rejected() {
        let mut sheet = Sheet::new();
        let bad = Position::new(Position::MAX_ROWS, 0);
        assert!(matches!(
            sheet.set_cell(bad, "1"),
            Err(TabulaError::InvalidPosition(_))
        ));
        assert!(matches!(
            sheet.clear_cell(bad),
            Err(TabulaError::InvalidPosition(_))
        ));
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_cache_only_keeps_dependent_formulas() {
        let mut sheet = Sheet::new();
        sheet.set_cell(A1, "5").unwrap();
        sheet.set_cell(B1, "=A1+1").unwrap();
        sheet.set_cell(C1, "=B1*2").unwrap();
        assert_eq!(sheet.value(C1).unwrap(), Value::Number(12.0));

        sheet.set_cell(A1, "").unwrap();
        assert_eq!(sheet.text(B1).unwrap(), "=A1+1");
        assert!(sheet.grid.get(&B1).unwrap().cache.is_none());
        assert!(sheet.grid.get(&C1).unwrap().cache.is_none());
        assert_eq!(sheet.value(B1).unwrap(), Value::Number(1.0));
        assert_eq!(sheet.value(C1).unwrap(), Value::Number(2.0));
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_clear_dependents_cascades_to_empty() {
        let mut sheet = clearing_sheet();
        sheet.set_cell(A1, "5").unwrap();
        sheet.set_cell(B1, "=A1+1").unwrap();
        sheet.set_cell(C1, "=B1*2").unwrap();
        assert_eq!(sheet.value(B1).unwrap(), Value::Number(6.0));

        sheet.set_cell(A1, "").unwrap();
        assert_eq!(sheet.text(B1).unwrap(), "");
        assert_eq!(sheet.text(C1).unwrap(), "");
        assert_eq!(sheet.value(B1).unwrap(), Value::empty());
        assert!(sheet.grid.get(&A1).unwrap().dependents.is_empty());
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_clear_dependents_runs_on_any_edit() {
        let mut sheet = clearing_sheet();
        sheet.set_cell(B1, "=A1").unwrap();
        sheet.set_cell(A1, "3").unwrap();
        assert_eq!(sheet.text(B1).unwrap(), "");
    }

    #[test]
    fn test_clear_cell_removes_unreferenced_cell() {
        let mut sheet = Sheet::new();
        sheet.set_cell(B1, "=A1").unwrap();
        sheet.clear_cell(B1).unwrap();
        assert!(sheet.get_cell(B1).unwrap().is_none());
        // A1 was only vivified by B1 and stays as an empty cell.
        assert!(sheet.grid.get(&A1).unwrap().dependents.is_empty());
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_clear_cell_keeps_referenced_node() {
        let mut sheet = Sheet::new();
        sheet.set_cell(A1, "4").unwrap();
        sheet.set_cell(B1, "=A1*2").unwrap();
        assert_eq!(sheet.value(B1).unwrap(), Value::Number(8.0));

        sheet.clear_cell(A1).unwrap();
        let a1 = sheet.get_cell(A1).unwrap().expect("A1 is still read by B1");
        assert_eq!(a1.text(), "");
        assert_eq!(a1.dependent_cells(), vec![B1]);
        assert_eq!(sheet.value(B1).unwrap(), Value::Number(0.0));
        assert_edges_consistent(&sheet);
    }

    #[test]
    fn test_clear_absent_cell_is_noop() {
        let mut sheet = Sheet::new();
        sheet.clear_cell(A1).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_edges_stay_consistent_through_edit_sequence() {
        let mut sheet = Sheet::new();
        let edits = [
            (A1, "=B1+C1"),
            (B1, "=C1*2"),
            (D1, "=A1+B1"),
            (C1, "=D1"),
            (B1, "text"),
            (C1, "3"),
            (A1, ""),
            (D1, "=C1/B1"),
        ];
        for (pos, text) in edits {
            let _ = sheet.set_cell(pos, text);
            assert_edges_consistent(&sheet);
        }
        assert_eq!(sheet.text(C1).unwrap(), "3");
        assert!(sheet.set_cell(C1, "=D1").is_err());
    }
}
