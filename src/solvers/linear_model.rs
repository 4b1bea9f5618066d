//! Formula-driven linear models.
//!
//! [`LinearModel`] ties an [`OlsRegressor`] fit to the formula and data it
//! came from, so the effects engine can rebuild design matrices for any
//! evaluation grid and push new coefficient vectors through them.

use super::ols::{FittedOls, OlsRegressor};
use super::traits::{FittedRegressor, RegressionError, Regressor};
use crate::core::RegressionResult;
use crate::data::{DataError, Dataset};
use crate::formula::{design_matrix, Formula, FormulaError};
use crate::inference::{augment_with_intercept, linear_predictor};
use faer::{Col, Mat};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur when fitting or evaluating a [`LinearModel`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Regression(#[from] RegressionError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("expected {expected} coefficients, got {got}")]
    CoefficientLength { expected: usize, got: usize },
}

/// An ordinary least squares fit of a formula to a dataset.
///
/// Coefficients are ordered as [`LinearModel::coefficient_names`]:
/// `(Intercept)` first (unless removed), then the formula terms.
#[derive(Debug, Clone)]
pub struct LinearModel {
    formula: Formula,
    data: Dataset,
    fitted: FittedOls,
    coefficients: Vec<f64>,
    names: Vec<String>,
}

impl LinearModel {
    /// Fit `formula` (e.g. `"mpg ~ hp * wt * am"`) to `data`.
    ///
    /// # Errors
    ///
    /// [`ModelError::Formula`] when the formula does not parse or names a
    /// column missing from `data`; [`ModelError::Regression`] with
    /// [`RegressionError::SingularMatrix`] when the design is rank deficient.
    pub fn fit(formula: &str, data: &Dataset) -> Result<Self, ModelError> {
        let formula = Formula::parse(formula)?;

        let response = data
            .column(formula.response())
            .map_err(|_| FormulaError::UnknownColumn(formula.response().to_string()))?;
        let y = Col::from_fn(response.len(), |i| response[i]);
        let x = design_matrix(&formula, data)?;

        let fitted = OlsRegressor::builder()
            .with_intercept(formula.has_intercept())
            .build()
            .fit(&x, &y)
            .inspect_err(|e| {
                if let RegressionError::SingularMatrix { aliased } = e {
                    let terms: Vec<String> =
                        aliased.iter().map(|&j| formula.terms()[j].label()).collect();
                    warn!(formula = %formula, ?terms, "design matrix is rank deficient");
                }
            })?;

        let coefficients = fitted.result().full_coefficients();
        let names = formula.coefficient_names();

        debug!(
            formula = %formula,
            n_observations = data.n_rows(),
            n_coefficients = coefficients.len(),
            "fitted linear model"
        );

        Ok(Self {
            formula,
            data: data.clone(),
            fitted,
            coefficients,
            names,
        })
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Training data.
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn response(&self) -> &str {
        self.formula.response()
    }

    /// Distinct predictors in formula order.
    pub fn variables(&self) -> Vec<String> {
        self.formula.variables()
    }

    /// β̂, intercept first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn coefficient_names(&self) -> &[String] {
        &self.names
    }

    /// Coefficient covariance σ²(X'X)⁻¹, same order as the coefficients.
    pub fn vcov(&self) -> &Mat<f64> {
        self.fitted.covariance()
    }

    /// Fit statistics and coefficient inference from the solver.
    pub fn result(&self) -> &RegressionResult {
        self.fitted.result()
    }

    pub fn residual_df(&self) -> usize {
        self.result().residual_df()
    }

    /// Full design matrix for `data`, intercept column included.
    pub fn design_matrix(&self, data: &Dataset) -> Result<Mat<f64>, ModelError> {
        let x = design_matrix(&self.formula, data)?;
        Ok(if self.formula.has_intercept() {
            augment_with_intercept(&x)
        } else {
            x
        })
    }

    /// Predictions for `data` under an arbitrary coefficient vector.
    pub fn predict_with(&self, coefficients: &[f64], data: &Dataset) -> Result<Vec<f64>, ModelError> {
        if coefficients.len() != self.coefficients.len() {
            return Err(ModelError::CoefficientLength {
                expected: self.coefficients.len(),
                got: coefficients.len(),
            });
        }
        let x = self.design_matrix(data)?;
        Ok(linear_predictor(&x, coefficients))
    }

    /// Predictions for `data` at β̂.
    pub fn predict(&self, data: &Dataset) -> Result<Vec<f64>, ModelError> {
        self.predict_with(&self.coefficients, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;
    use approx::assert_relative_eq;

    #[test]
    fn test_additive_model_coefficients() {
        let model = LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap();
        assert_eq!(model.coefficient_names(), ["(Intercept)", "hp", "wt"]);

        let b = model.coefficients();
        assert_relative_eq!(b[0], 37.22727, epsilon = 1e-5);
        assert_relative_eq!(b[1], -0.03177295, epsilon = 1e-7);
        assert_relative_eq!(b[2], -3.87783, epsilon = 1e-5);
        assert_eq!(model.residual_df(), 29);
    }

    #[test]
    fn test_vcov_matches_standard_errors() {
        let model = LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap();
        let v = model.vcov();
        assert_relative_eq!(v[(0, 0)].sqrt(), 1.59879, epsilon = 1e-4);
        assert_relative_eq!(v[(1, 1)].sqrt(), 0.00903, epsilon = 1e-5);
        assert_relative_eq!(v[(2, 2)].sqrt(), 0.63273, epsilon = 1e-4);
    }

    #[test]
    fn test_fitted_values_match_predict() {
        let data = mtcars();
        let model = LinearModel::fit("mpg ~ hp * wt * am", &data).unwrap();
        let preds = model.predict(&data).unwrap();
        let fitted = &model.result().fitted_values;
        assert_eq!(preds.len(), 32);
        for (i, p) in preds.iter().enumerate() {
            assert_relative_eq!(*p, fitted[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_unknown_response() {
        let err = LinearModel::fit("price ~ hp", &mtcars()).unwrap_err();
        assert_eq!(err, ModelError::Formula(FormulaError::UnknownColumn("price".into())));
    }

    #[test]
    fn test_singular_design() {
        let data = mtcars();
        let hp = data.column("hp").unwrap().iter().map(|v| 2.0 * v).collect();
        let data = data.with_column("hp2", hp).unwrap();
        let err = LinearModel::fit("mpg ~ hp + hp2", &data).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Regression(RegressionError::SingularMatrix { .. })
        ));
    }

    #[test]
    fn test_predict_with_wrong_length() {
        let model = LinearModel::fit("mpg ~ wt", &mtcars()).unwrap();
        let err = model.predict_with(&[1.0], model.data()).unwrap_err();
        assert_eq!(err, ModelError::CoefficientLength { expected: 2, got: 1 });
    }
}
