//! Model formulas (`y ~ a * b + c`) and design matrix construction.

mod design;
mod parser;

pub use design::design_matrix;
pub use parser::{Formula, FormulaError, Term};
