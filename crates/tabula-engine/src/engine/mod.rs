//! Spreadsheet engine API.
//!
//! This module provides the core computation engine for the spreadsheet:
//!
//! - [`Cell`], [`CellContent`], [`Grid`] - Data structures for cell storage
//! - [`Position`] - Cell coordinates (A1 notation ↔ row/col indices)
//! - [`Formula`] - Parsed formulas: evaluation, canonical text, references
//! - [`Value`], [`FormulaError`] - Evaluation results
//! - [`detect_cycle`] - Circular dependency detection
//! - [`extract_dependencies`] - Distinct valid references of an expression

mod cell;
mod cycle;
mod deps;
mod eval;
mod parser;
mod position;
mod value;

pub use cell::{Cell, CellContent, ESCAPE_SIGN, FORMULA_SIGN, Grid};
pub use cycle::detect_cycle;
pub use deps::extract_dependencies;
pub use eval::{Formula, coerce_text};
pub use parser::{BinaryOp, Expr, MAX_DEPTH, ParseError, UnaryOp, parse};
pub use position::Position;
pub use value::{FormulaError, Value, format_number};
