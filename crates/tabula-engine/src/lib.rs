//! tabula_engine - Formula parsing, evaluation and the cell dependency graph.

pub mod engine;
