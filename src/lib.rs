//! Predictions, comparisons, slopes and hypothesis tests for linear models.
//!
//! Fit an OLS model from a formula, then ask questions on the scale of the
//! outcome instead of reading raw coefficients. Every quantity comes with
//! delta-method standard errors, test statistics, p-values and confidence
//! intervals.
//!
//! # Example
//!
//! ```rust,ignore
//! use margins_rs::prelude::*;
//!
//! let model = LinearModel::fit("mpg ~ hp * wt * am", &mtcars())?;
//!
//! // Average slope of each predictor, split by transmission
//! let options = SlopeOptions::builder().by(By::columns(["am"])).build()?;
//! let table = avg_slopes(&model, &options)?;
//! println!("{}", format_table(&table, TableStyle::Pipe)?);
//!
//! // Is the weight coefficient twice the horsepower coefficient?
//! let additive = LinearModel::fit("mpg ~ hp + wt", &mtcars())?;
//! let test = additive.hypotheses("b3 = 2 * b2")?;
//! ```

pub mod core;
pub mod data;
pub mod effects;
pub mod formula;
pub mod grid;
pub mod inference;
pub mod report;
pub mod solvers;
pub mod utils;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::{RegressionOptions, RegressionOptionsBuilder, RegressionResult};
    pub use crate::data::{mtcars, DataError, Dataset};
    pub use crate::effects::{
        avg_comparisons, avg_predictions, avg_slopes, comparisons, equivalence, hypotheses,
        predictions, slopes, transform, By, ComparisonFn, ComparisonOptions, Contrast,
        EffectsError, EffectsTable, PredictionOptions, SlopeKind, SlopeOptions, Transform,
    };
    pub use crate::formula::Formula;
    pub use crate::grid::{datagrid, GridValue, Summary};
    pub use crate::inference::Hypothesis;
    pub use crate::report::{
        format_table, plot_predictions, render_svg, Condition, Document, FloatPlacement,
        OutputFormat, ReportError, ReportOptions, SessionInfo, TableStyle,
    };
    pub use crate::solvers::{FittedRegressor, LinearModel, ModelError, OlsRegressor, Regressor};
}

pub use crate::data::{mtcars, Dataset};
pub use crate::effects::{EffectsError, EffectsTable};
pub use crate::solvers::{LinearModel, ModelError};
