use super::Sheet;
use tabula_engine::engine::{Position, Value};

impl Sheet {
    /// Value of the cell at `pos`, or `None` if no cell is stored there.
    ///
    /// Formula results are memoized on the cell until an edit invalidates
    /// them. No storage guard is held while a formula evaluates, so reads of
    /// referenced cells never contend with the write that stores the result.
    pub(crate) fn cell_value(&self, pos: Position) -> Option<Value> {
        let formula = {
            let cell = self.grid.get(&pos)?;
            if let Some(value) = cell.settled_value() {
                return Some(value);
            }
            cell.formula()?.clone()
        };

        self.settle_references(pos);
        // Every referenced cell is settled now, so this does not recurse
        // further than one level.
        let value = formula.execute(|leaf| self.cell_value(leaf));
        self.store_result(pos, &value);
        Some(value)
    }

    /// Evaluate every uncached formula that `pos` depends on, deepest first.
    ///
    /// Uses an explicit stack so reference chains of any length evaluate in
    /// constant call depth. The graph is acyclic, so a cell is never waiting
    /// on itself.
    fn settle_references(&self, pos: Position) {
        let mut stack: Vec<(Position, bool)> = self.unsettled_references(pos);

        while let Some((current, expanded)) = stack.pop() {
            if !expanded {
                let pending = self.unsettled_references(current);
                stack.push((current, true));
                stack.extend(pending);
                continue;
            }

            let formula = match self.grid.get(&current) {
                Some(cell) if cell.cache.is_none() => match cell.formula() {
                    Some(formula) => formula.clone(),
                    None => continue,
                },
                _ => continue,
            };
            let value = formula.execute(|leaf| {
                self.grid.get(&leaf).and_then(|cell| cell.settled_value())
            });
            self.store_result(current, &value);
        }
    }

    /// Referenced cells of `pos` holding a formula without a cached result.
    fn unsettled_references(&self, pos: Position) -> Vec<(Position, bool)> {
        let referenced = match self.grid.get(&pos) {
            Some(cell) => cell.referenced.clone(),
            None => return Vec::new(),
        };
        referenced
            .into_iter()
            .filter(|target| {
                self.grid
                    .get(target)
                    .is_some_and(|cell| cell.formula().is_some() && cell.cache.is_none())
            })
            .map(|target| (target, false))
            .collect()
    }

    fn store_result(&self, pos: Position, value: &Value) {
        tracing::trace!(%pos, %value, "evaluated formula");
        if let Some(mut cell) = self.grid.get_mut(&pos) {
            cell.cache = Some(value.clone());
        }
    }
}
