//! Core types for least squares fits.

mod options;
mod result;

pub use options::{OptionsError, RegressionOptions, RegressionOptionsBuilder};
pub use result::RegressionResult;
