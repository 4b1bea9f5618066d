//! Predictions, comparisons and slopes of fitted linear models.
//!
//! Every estimate is a smooth function `g(β)` of the model coefficients,
//! evaluated on a grid of covariate rows. Standard errors come from the delta
//! method (`J V J'`), and each call runs the same post-processing chain:
//!
//! 1. estimates and Jacobian on the evaluation grid,
//! 2. averaging within `by` groups ([`aggregate`]),
//! 3. an optional linear hypothesis ([`hypotheses`]),
//! 4. optional equivalence bounds ([`equivalence`]),
//! 5. an optional transform of estimates and interval bounds.

mod aggregate;
mod comparisons;
mod hypotheses;
mod options;
mod predictions;
mod slopes;
mod table;

pub use aggregate::aggregate;
pub use comparisons::{avg_comparisons, comparisons, ComparisonFn, Contrast};
pub use hypotheses::{equivalence, hypotheses, transform};
pub use options::{
    By, ComparisonOptions, ComparisonOptionsBuilder, InferenceOptions, InferenceOptionsBuilder,
    PredictionOptions, PredictionOptionsBuilder, SlopeOptions, SlopeOptionsBuilder, Transform,
};
pub use predictions::{avg_predictions, predictions};
pub use slopes::{avg_slopes, slopes, SlopeKind};
pub use table::{EffectsRow, EffectsTable, Estimand, RowKey};

use crate::data::{DataError, Dataset};
use crate::inference::HypothesisError;
use crate::solvers::{LinearModel, ModelError};
use thiserror::Error;

/// Errors that can occur when computing effects.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EffectsError {
    #[error("'{0}' is not a predictor in the model")]
    UnknownVariable(String),

    #[error(transparent)]
    Hypothesis(#[from] HypothesisError),

    #[error("newdata has no rows")]
    EmptyNewdata,

    #[error("conf_level must be in (0, 1), got {0}")]
    InvalidConfLevel(f64),

    #[error("degrees of freedom must be positive and finite, got {0}")]
    InvalidDf(f64),

    #[error("equivalence bounds must satisfy low < high, got ({low}, {high})")]
    InvalidBounds { low: f64, high: f64 },

    #[error("`by` needs at least one column")]
    EmptyBy,

    #[error("cannot group by '{0}': rows are not tied to an evaluation grid")]
    NoGrid(String),

    #[error("table has been transformed; aggregate, test or check equivalence before transforming")]
    TransformedTable,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// The rows estimates are evaluated on: `newdata` or the training data.
fn evaluation_grid(
    model: &LinearModel,
    newdata: Option<&Dataset>,
) -> Result<(Dataset, Vec<String>), EffectsError> {
    let (grid, context) = match newdata {
        Some(grid) => (grid.clone(), model.variables()),
        None => (model.data().clone(), Vec::new()),
    };
    if grid.n_rows() == 0 {
        return Err(EffectsError::EmptyNewdata);
    }
    Ok((grid, context))
}

/// Resolve requested variables against the model, in name order.
fn sorted_variables<T: Clone>(
    model: &LinearModel,
    requested: &[(String, T)],
    default: T,
) -> Result<Vec<(String, T)>, EffectsError> {
    let predictors = model.variables();
    let mut variables: Vec<(String, T)> = if requested.is_empty() {
        predictors.iter().map(|v| (v.clone(), default.clone())).collect()
    } else {
        for (name, _) in requested {
            if !predictors.contains(name) {
                return Err(EffectsError::UnknownVariable(name.clone()));
            }
        }
        requested.to_vec()
    };
    variables.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(variables)
}

/// Run the shared post-processing chain on unit-level estimates.
fn finish(table: EffectsTable, options: &InferenceOptions) -> Result<EffectsTable, EffectsError> {
    let mut table = aggregate(&table, &options.by)?;
    if let Some(hypothesis) = &options.hypothesis {
        table = hypotheses(&table, hypothesis.clone())?;
    }
    if let Some((low, high)) = options.equivalence {
        table = equivalence(&table, low, high)?;
    }
    if let Some(t) = options.transform {
        table = transform(&table, t);
    }
    Ok(table)
}
