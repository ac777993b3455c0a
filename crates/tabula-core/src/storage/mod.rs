//! Rendering sheets as tab-separated text.

mod writer;

pub use writer::{Size, printable_size, write_texts, write_values};
