//! tabula-core - UI-agnostic sheet model.
//!
//! A [`Sheet`] owns its cells, keeps their reference graph acyclic and
//! consistent, memoizes formula results and renders its printable area.

pub mod config;
pub mod error;
pub mod sheet;
pub mod storage;

pub use config::{InvalidationPolicy, SheetConfig};
pub use error::{Result, TabulaError};
pub use sheet::{CellView, CellViewMut, Sheet};
pub use storage::Size;

pub use tabula_engine::engine::{FormulaError, Position, Value};
