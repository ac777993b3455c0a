use std::collections::BTreeSet;

use super::parser::Expr;
use super::position::Position;

/// Extract the cells an expression reads, as graph dependencies.
///
/// Invalid references are left out: they surface as `#REF!` at evaluation
/// time, not as edges. The result is de-duplicated and in row-major order.
pub fn extract_dependencies(expr: &Expr) -> Vec<Position> {
    expr.leaves()
        .into_iter()
        .filter(Position::is_valid)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
