//! Utility functions.

mod matrix;

pub use matrix::{center_columns, center_vector, constant_columns, from_rows, row_to_vec};
