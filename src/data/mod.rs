//! Tabular data: named numeric columns and the built-in toy dataset.

mod dataset;
mod mtcars;

pub use dataset::{DataError, Dataset};
pub use mtcars::mtcars;
