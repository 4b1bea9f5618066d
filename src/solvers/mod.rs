//! Least squares solvers and the formula-level linear model.

mod linear_model;
mod ols;
mod traits;

pub use linear_model::{LinearModel, ModelError};
pub use ols::{FittedOls, OlsRegressor, OlsRegressorBuilder};
pub use traits::{FittedRegressor, RegressionError, Regressor};
