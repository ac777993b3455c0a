//! Cell data structures for the spreadsheet grid.
//!
//! This module provides the core data types for representing cells:
//! - [`CellContent`] - What a cell holds (empty, text, or formula)
//! - [`Cell`] - Content plus dependency edges and the memoized formula result
//! - [`Grid`] - Sparse storage for cells (backed by `DashMap`)
//!
//! Edges are stored as positions in both directions. `referenced` lists the
//! cells a formula reads; `dependents` lists the cells whose formulas read
//! this one. The two are kept as exact inverses by the sheet.

use dashmap::DashMap;
use std::collections::BTreeSet;

use super::eval::Formula;
use super::parser::ParseError;
use super::position::Position;
use super::value::Value;

/// Leading character that marks input as a formula.
pub const FORMULA_SIGN: char = '=';
/// Leading character that forces input to be read as literal text.
pub const ESCAPE_SIGN: char = '\'';

/// The content stored in a cell.
#[derive(Clone, Debug, Default)]
pub enum CellContent {
    #[default]
    Empty,
    /// Text as entered, escape sign included.
    Text(String),
    Formula(Formula),
}

impl CellContent {
    /// Classify user input.
    /// - Empty string -> Empty
    /// - '=' followed by at least one character -> Formula (parsed)
    /// - Anything else, including escaped text -> Text, stored verbatim
    pub fn from_input(input: &str) -> Result<CellContent, ParseError> {
        if input.is_empty() {
            return Ok(CellContent::Empty);
        }
        if input.len() > 1 {
            if let Some(expression) = input.strip_prefix(FORMULA_SIGN) {
                return Ok(CellContent::Formula(Formula::parse(expression)?));
            }
        }
        Ok(CellContent::Text(input.to_string()))
    }

    /// The text a user would edit to reproduce this content.
    pub fn text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula(f) => format!("{}{}", FORMULA_SIGN, f.expression()),
        }
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        match self {
            CellContent::Formula(f) => f.referenced_cells(),
            _ => Vec::new(),
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }
}

/// A cell in the spreadsheet grid.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub content: CellContent,
    /// Cells this cell's formula reads (outgoing edges).
    pub referenced: BTreeSet<Position>,
    /// Cells whose formulas read this cell (incoming edges).
    pub dependents: BTreeSet<Position>,
    /// Memoized formula result. Always `None` for non-formula content.
    pub cache: Option<Value>,
}

impl Cell {
    pub fn new_empty() -> Cell {
        Cell::default()
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    /// The value of this cell if it can be produced without evaluation:
    /// the literal value of empty/text content or a cached formula result.
    pub fn settled_value(&self) -> Option<Value> {
        match &self.content {
            CellContent::Empty => Some(Value::empty()),
            CellContent::Text(s) => {
                let shown = s.strip_prefix(ESCAPE_SIGN).unwrap_or(s);
                Some(Value::Text(shown.to_string()))
            }
            CellContent::Formula(_) => self.cache.clone(),
        }
    }

    pub fn formula(&self) -> Option<&Formula> {
        match &self.content {
            CellContent::Formula(f) => Some(f),
            _ => None,
        }
    }

    /// True when the cell holds nothing and no edge touches it.
    pub fn is_detached(&self) -> bool {
        matches!(self.content, CellContent::Empty)
            && self.referenced.is_empty()
            && self.dependents.is_empty()
    }

    /// Drop the memoized result. Returns whether a result was cached.
    pub fn invalidate_cache(&mut self) -> bool {
        self.cache.take().is_some()
    }
}

/// Sparse grid storage.
pub type Grid = DashMap<Position, Cell>;

#[cfg(test)]
mod tests {
    use super::*;

    fn text_cell(input: &str) -> Cell {
        Cell {
            content: CellContent::from_input(input).unwrap(),
            ..Cell::default()
        }
    }

    #[test]
    fn test_from_input_classification() {
        assert!(matches!(CellContent::from_input(""), Ok(CellContent::Empty)));
        assert!(matches!(
            CellContent::from_input("=A1+1"),
            Ok(CellContent::Formula(_))
        ));
        assert!(matches!(CellContent::from_input("="), Ok(CellContent::Text(s)) if s == "="));
        assert!(matches!(CellContent::from_input("'=A1"), Ok(CellContent::Text(s)) if s == "'=A1"));
        assert!(matches!(CellContent::from_input("42"), Ok(CellContent::Text(s)) if s == "42"));
        assert!(CellContent::from_input("=1+").is_err());
    }

    #[test]
    fn test_escaped_text_value_and_text() {
        let cell = text_cell("'123");
        assert_eq!(cell.text(), "'123");
        assert_eq!(cell.settled_value(), Some(Value::Text("123".into())));
    }

    #[test]
    fn test_lone_escape_sign() {
        let cell = text_cell("'");
        assert_eq!(cell.text(), "'");
        assert_eq!(cell.settled_value(), Some(Value::empty()));
    }

    #[test]
    fn test_empty_cell() {
        let cell = Cell::new_empty();
        assert_eq!(cell.text(), "");
        assert_eq!(cell.settled_value(), Some(Value::empty()));
        assert!(cell.is_detached());
    }

    #[test]
    fn test_formula_text_and_references() {
        let cell = text_cell("=(B1)+A1*2");
        assert_eq!(cell.text(), "=B1+A1*2");
        assert_eq!(
            cell.content.referenced_cells(),
            vec![Position::new(0, 0), Position::new(0, 1)]
        );
        assert_eq!(cell.settled_value(), None);
    }

    #[test]
    fn test_invalidate_cache() {
        let mut cell = text_cell("=1");
        assert!(!cell.invalidate_cache());
        cell.cache = Some(Value::Number(1.0));
        assert!(cell.invalidate_cache());
        assert!(cell.cache.is_none());
    }
}
