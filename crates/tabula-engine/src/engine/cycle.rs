//! Circular dependency detection for formula cells.
//!
//! When a formula is entered, we must verify it doesn't create a cycle
//! (e.g., A1 references B1, B1 references C1, C1 references A1).
//! The check runs before the edit is committed, against the graph as it
//! would look with the new edges, so the stored graph is never cyclic.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{Grid, Position};

/// Check whether giving `origin` the outgoing edges `referenced` would close
/// a cycle.
///
/// A cycle exists exactly when one of `referenced` already reads `origin`,
/// directly or through other cells, so the walk goes breadth-first along
/// the dependent edges of `origin`. Cells missing from the grid have no
/// edges. Returns the cycle as a path starting and ending at `origin` if
/// one is found.
pub fn detect_cycle(
    origin: &Position,
    referenced: &[Position],
    grid: &Grid,
) -> Option<Vec<Position>> {
    let targets: HashSet<Position> = referenced.iter().copied().collect();
    if targets.contains(origin) {
        return Some(vec![*origin, *origin]);
    }

    let mut queue: VecDeque<Position> = VecDeque::from([*origin]);
    let mut visited: HashSet<Position> = HashSet::from([*origin]);
    let mut parents: HashMap<Position, Position> = HashMap::new();

    while let Some(current) = queue.pop_front() {
        let readers = match grid.get(&current) {
            Some(entry) => entry.dependents.clone(),
            None => continue,
        };
        for reader in readers {
            if !visited.insert(reader) {
                continue;
            }
            parents.insert(reader, current);
            if targets.contains(&reader) {
                let mut path = vec![*origin, reader];
                let mut step = reader;
                while step != *origin {
                    step = parents[&step];
                    path.push(step);
                }
                return Some(path);
            }
            queue.push_back(reader);
        }
    }

    None
}
