//! Model predictions on an evaluation grid.

use super::table::{Estimand, RowKey};
use super::{evaluation_grid, finish, By, EffectsError, EffectsTable, PredictionOptions};
use crate::inference::{DeltaMethod, ReferenceDistribution};
use crate::solvers::LinearModel;
use tracing::debug;

/// One prediction per row of `newdata` (the training data by default).
pub fn predictions(
    model: &LinearModel,
    options: &PredictionOptions,
) -> Result<EffectsTable, EffectsError> {
    options.inference.validate()?;
    let (grid, context) = evaluation_grid(model, options.newdata.as_ref())?;

    let x = model.design_matrix(&grid)?;
    let delta = DeltaMethod::linear(&x, model.coefficients());
    let keys = (0..grid.n_rows())
        .map(|i| RowKey {
            row_id: Some(i),
            ..RowKey::default()
        })
        .collect();

    debug!(n_rows = grid.n_rows(), "computed predictions");

    let table = EffectsTable::assemble(
        Estimand::Prediction,
        keys,
        delta,
        model.vcov(),
        ReferenceDistribution::from_df(options.inference.df),
        options.inference.conf_level,
    )
    .with_grid(grid, context);
    finish(table, &options.inference)
}

/// Average predictions: like [`predictions`] with `by` defaulting to
/// [`By::All`].
pub fn avg_predictions(
    model: &LinearModel,
    options: &PredictionOptions,
) -> Result<EffectsTable, EffectsError> {
    let mut options = options.clone();
    if options.inference.by == By::None {
        options.inference.by = By::All;
    }
    predictions(model, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;
    use approx::assert_relative_eq;

    #[test]
    fn test_one_row_per_observation() {
        let model = LinearModel::fit("mpg ~ hp * wt * am", &mtcars()).unwrap();
        let p = predictions(&model, &PredictionOptions::default()).unwrap();
        assert_eq!(p.len(), 32);
        assert_eq!(p.rows()[4].key.row_id, Some(4));
        assert!(p.context_columns().is_empty());
    }

    #[test]
    fn test_average_matches_mean_of_fitted_values() {
        let data = mtcars();
        let model = LinearModel::fit("mpg ~ hp * wt * am", &data).unwrap();
        let avg = avg_predictions(&model, &PredictionOptions::default()).unwrap();
        assert_eq!(avg.len(), 1);
        // OLS with an intercept reproduces the mean response
        assert_relative_eq!(avg.rows()[0].estimate, 20.090625, epsilon = 1e-9);
    }

    #[test]
    fn test_student_t_widens_interval() {
        let model = LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap();
        let z = predictions(&model, &PredictionOptions::default()).unwrap();
        let opts = PredictionOptions::builder().df(5.0).build().unwrap();
        let t = predictions(&model, &opts).unwrap();

        let (rz, rt) = (&z.rows()[0], &t.rows()[0]);
        assert_relative_eq!(rz.std_error, rt.std_error);
        assert!(rt.conf_high - rt.conf_low > rz.conf_high - rz.conf_low);
    }

    #[test]
    fn test_empty_newdata() {
        let data = mtcars();
        let model = LinearModel::fit("mpg ~ wt", &data).unwrap();
        let empty = data.select_rows(&[]).unwrap();
        let opts = PredictionOptions::builder().newdata(empty).build().unwrap();
        assert_eq!(predictions(&model, &opts).unwrap_err(), EffectsError::EmptyNewdata);
    }
}
