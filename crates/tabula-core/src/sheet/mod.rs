//! Sheet state and logic (UI-agnostic).

mod eval;
mod ops;
mod state;
mod view;

pub use state::Sheet;
pub use view::{CellView, CellViewMut};
