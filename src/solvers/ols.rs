//! Ordinary Least Squares regression solver.

use crate::core::{RegressionOptions, RegressionOptionsBuilder, RegressionResult};
use crate::inference::{ols_covariance, CoefficientInference, ReferenceDistribution};
use crate::solvers::traits::{FittedRegressor, RegressionError, Regressor};
use crate::utils::{center_columns, center_vector, constant_columns};
use faer::{Col, Mat};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use tracing::debug;

/// Ordinary Least Squares regression estimator.
///
/// Uses a Householder QR decomposition. Rank-deficient designs are rejected
/// with [`RegressionError::SingularMatrix`].
///
/// # Example
///
/// ```rust,ignore
/// use margins_rs::solvers::{OlsRegressor, Regressor, FittedRegressor};
/// use faer::{Mat, Col};
///
/// let x = Mat::from_fn(32, 2, |i, j| ((i + 1) * (j + 2)) as f64);
/// let y = Col::from_fn(32, |i| 1.0 + 2.0 * i as f64);
///
/// let fitted = OlsRegressor::builder().build().fit(&x, &y)?;
/// println!("R² = {}", fitted.r_squared());
/// ```
#[derive(Debug, Clone)]
pub struct OlsRegressor {
    options: RegressionOptions,
}

impl OlsRegressor {
    /// Create a new OLS regressor with the given options.
    pub fn new(options: RegressionOptions) -> Self {
        Self { options }
    }

    /// Create a builder for configuring the regressor.
    pub fn builder() -> OlsRegressorBuilder {
        OlsRegressorBuilder::default()
    }
}

impl Regressor for OlsRegressor {
    type Fitted = FittedOls;

    fn fit(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Self::Fitted, RegressionError> {
        self.options.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();

        if x.nrows() != y.nrows() {
            return Err(RegressionError::DimensionMismatch {
                x_rows: x.nrows(),
                y_len: y.nrows(),
            });
        }

        if n_samples < 2 {
            return Err(RegressionError::InsufficientObservations {
                needed: 2,
                got: n_samples,
            });
        }

        let with_intercept = self.options.with_intercept;
        let n_params = n_features + usize::from(with_intercept);
        // At least one residual degree of freedom for the variance estimate
        if n_samples <= n_params {
            return Err(RegressionError::InsufficientObservations {
                needed: n_params + 1,
                got: n_samples,
            });
        }

        let constant = constant_columns(x, self.options.rank_tolerance);
        if !with_intercept && n_features > 0 && constant.len() == n_features {
            return Err(RegressionError::AllFeaturesConstant);
        }
        if with_intercept && !constant.is_empty() {
            return Err(RegressionError::SingularMatrix { aliased: constant });
        }

        // With an intercept, solve on centred data and recover the intercept
        // from the means.
        let (coefficients, intercept) = if with_intercept {
            let (x_centered, x_means) = center_columns(x);
            let (y_centered, y_mean) = center_vector(y);
            let coefficients = self.solve_with_qr(&x_centered, &y_centered)?;

            let mut intercept = y_mean;
            for j in 0..n_features {
                intercept -= x_means[j] * coefficients[j];
            }
            (coefficients, Some(intercept))
        } else {
            (self.solve_with_qr(x, y)?, None)
        };

        let fitted_values = predict_linear(x, &coefficients, intercept);
        let residuals = Col::from_fn(n_samples, |i| y[i] - fitted_values[i]);

        let mut result = self.compute_statistics(
            y,
            &coefficients,
            intercept,
            &residuals,
            &fitted_values,
            n_params,
        );

        let covariance = ols_covariance(x, result.mse, with_intercept)
            .map_err(|e| RegressionError::NumericalError(e.to_string()))?;
        if self.options.compute_inference {
            self.compute_inference(&covariance, &mut result);
        }

        debug!(
            n_observations = n_samples,
            n_parameters = n_params,
            r_squared = result.r_squared,
            "fitted OLS model"
        );

        Ok(FittedOls {
            options: self.options.clone(),
            result,
            covariance,
        })
    }
}

impl OlsRegressor {
    /// Solve the least squares problem by Householder QR and back-substitution.
    ///
    /// A column whose diagonal entry in R is negligible next to the largest
    /// one lies in the span of the columns before it.
    fn solve_with_qr(&self, x: &Mat<f64>, y: &Col<f64>) -> Result<Col<f64>, RegressionError> {
        let n_features = x.ncols();
        if n_features == 0 {
            return Ok(Col::zeros(0));
        }

        let qr = x.qr();
        let q = qr.compute_Q();
        let r = qr.R();

        let scale = (0..n_features)
            .map(|i| r[(i, i)].abs())
            .fold(0.0_f64, f64::max);
        let aliased: Vec<usize> = (0..n_features)
            .filter(|&i| r[(i, i)].abs() <= self.options.rank_tolerance * scale)
            .collect();
        if !aliased.is_empty() {
            return Err(RegressionError::SingularMatrix { aliased });
        }

        // Solve R * beta = Q' * y by back-substitution
        let qty = q.transpose() * y;

        let mut beta = Col::zeros(n_features);
        for i in (0..n_features).rev() {
            let mut sum = qty[i];
            for j in (i + 1)..n_features {
                sum -= r[(i, j)] * beta[j];
            }
            beta[i] = sum / r[(i, i)];
        }

        Ok(beta)
    }

    /// Compute fit statistics.
    #[allow(clippy::too_many_arguments)]
    fn compute_statistics(
        &self,
        y: &Col<f64>,
        coefficients: &Col<f64>,
        intercept: Option<f64>,
        residuals: &Col<f64>,
        fitted_values: &Col<f64>,
        n_params: usize,
    ) -> RegressionResult {
        let n = y.nrows();

        // Uncentred TSS for no-intercept models, as lm() does
        let y_mean: f64 = y.iter().sum::<f64>() / n as f64;
        let tss: f64 = if intercept.is_some() {
            y.iter().map(|&yi| (yi - y_mean).powi(2)).sum()
        } else {
            y.iter().map(|&yi| yi.powi(2)).sum()
        };
        let rss: f64 = residuals.iter().map(|&r| r.powi(2)).sum();

        let r_squared = if tss > 0.0 {
            (1.0 - rss / tss).clamp(0.0, 1.0)
        } else if rss < 1e-10 {
            1.0
        } else {
            0.0
        };

        let df_model = (n_params - usize::from(intercept.is_some())) as f64;
        let df_total = (if intercept.is_some() { n - 1 } else { n }) as f64;
        let df_resid = (n - n_params) as f64;
        let adj_r_squared = if df_resid > 0.0 && df_total > 0.0 {
            1.0 - (1.0 - r_squared) * df_total / df_resid
        } else {
            f64::NAN
        };

        let mse = if df_resid > 0.0 {
            rss / df_resid
        } else {
            f64::NAN
        };

        let ess = tss - rss;
        let f_statistic = if df_model > 0.0 && df_resid > 0.0 && mse > 0.0 {
            (ess / df_model) / mse
        } else {
            f64::NAN
        };

        let f_pvalue = if f_statistic.is_finite() {
            FisherSnedecor::new(df_model, df_resid)
                .map_or(f64::NAN, |d| 1.0 - d.cdf(f_statistic))
        } else {
            f64::NAN
        };

        // Gaussian log-likelihood at σ²_ML = RSS / n; σ² counts as a parameter
        let log_likelihood = if rss > 0.0 {
            -0.5 * n as f64 * (1.0 + (2.0 * std::f64::consts::PI).ln() + (rss / n as f64).ln())
        } else {
            f64::NAN
        };
        let k = (n_params + 1) as f64;
        let aic = 2.0 * k - 2.0 * log_likelihood;
        let bic = k * (n as f64).ln() - 2.0 * log_likelihood;

        let mut result = RegressionResult::empty(coefficients.nrows(), n);
        result.coefficients = coefficients.clone();
        result.intercept = intercept;
        result.residuals = residuals.clone();
        result.fitted_values = fitted_values.clone();
        result.rank = coefficients.nrows();
        result.n_parameters = n_params;
        result.r_squared = r_squared;
        result.adj_r_squared = adj_r_squared;
        result.mse = mse;
        result.f_statistic = f_statistic;
        result.f_pvalue = f_pvalue;
        result.aic = aic;
        result.bic = bic;
        result.log_likelihood = log_likelihood;
        result.confidence_level = self.options.confidence_level;
        result
    }

    /// Coefficient standard errors, t-statistics and p-values from the covariance.
    fn compute_inference(&self, covariance: &Mat<f64>, result: &mut RegressionResult) {
        let df = result.residual_df() as f64;
        if df <= 0.0 {
            return;
        }
        let distribution = ReferenceDistribution::StudentT { df };

        let se_all = CoefficientInference::standard_errors(covariance);
        let offset = usize::from(result.intercept.is_some());
        let se = Col::from_fn(result.coefficients.nrows(), |j| se_all[j + offset]);

        let t_stats = CoefficientInference::t_statistics(&result.coefficients, &se);
        let p_vals = CoefficientInference::p_values(&t_stats, distribution);

        if let Some(intercept) = result.intercept {
            let se_int = se_all[0];
            let t_int = if se_int > 0.0 {
                intercept / se_int
            } else {
                f64::NAN
            };
            result.intercept_std_error = Some(se_int);
            result.intercept_p_value = Some(distribution.two_sided_p_value(t_int));
        }

        result.std_errors = Some(se);
        result.t_statistics = Some(t_stats);
        result.p_values = Some(p_vals);
    }
}

fn predict_linear(x: &Mat<f64>, coefficients: &Col<f64>, intercept: Option<f64>) -> Col<f64> {
    let base = intercept.unwrap_or(0.0);
    Col::from_fn(x.nrows(), |i| {
        let mut pred = base;
        for j in 0..x.ncols() {
            pred += x[(i, j)] * coefficients[j];
        }
        pred
    })
}

/// A fitted OLS regression model.
#[derive(Debug, Clone)]
pub struct FittedOls {
    options: RegressionOptions,
    result: RegressionResult,
    /// σ²(X'X)⁻¹ with the intercept first
    covariance: Mat<f64>,
}

impl FittedOls {
    /// Get the options used to fit this model.
    pub fn options(&self) -> &RegressionOptions {
        &self.options
    }
}

impl FittedRegressor for FittedOls {
    fn predict(&self, x: &Mat<f64>) -> Col<f64> {
        predict_linear(x, &self.result.coefficients, self.result.intercept)
    }

    fn result(&self) -> &RegressionResult {
        &self.result
    }

    fn covariance(&self) -> &Mat<f64> {
        &self.covariance
    }
}

/// Builder for `OlsRegressor`.
#[derive(Debug, Clone, Default)]
pub struct OlsRegressorBuilder {
    builder: RegressionOptionsBuilder,
}

impl OlsRegressorBuilder {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to include an intercept term.
    pub fn with_intercept(mut self, include: bool) -> Self {
        self.builder = self.builder.with_intercept(include);
        self
    }

    /// Set whether to compute inference statistics.
    pub fn compute_inference(mut self, compute: bool) -> Self {
        self.builder = self.builder.compute_inference(compute);
        self
    }

    /// Set the confidence level for confidence intervals.
    pub fn confidence_level(mut self, level: f64) -> Self {
        self.builder = self.builder.confidence_level(level);
        self
    }

    /// Set the rank tolerance for QR decomposition.
    pub fn rank_tolerance(mut self, tol: f64) -> Self {
        self.builder = self.builder.rank_tolerance(tol);
        self
    }

    /// Build the OLS regressor; options are validated when fitting.
    pub fn build(self) -> OlsRegressor {
        OlsRegressor::new(self.builder.build_unchecked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_fit() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let y = Col::from_fn(5, |i| 2.0 + 3.0 * i as f64);

        let model = OlsRegressor::builder().with_intercept(true).build();
        let fitted = model.fit(&x, &y).expect("model should fit");

        assert!((fitted.coefficients()[0] - 3.0).abs() < 1e-10);
        assert!((fitted.intercept().expect("intercept exists") - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_predict() {
        let x = Mat::from_fn(5, 1, |i, _| i as f64);
        let y = Col::from_fn(5, |i| 2.0 + 3.0 * i as f64);

        let model = OlsRegressor::builder().with_intercept(true).build();
        let fitted = model.fit(&x, &y).expect("model should fit");

        let x_new = Mat::from_fn(2, 1, |i, _| (i + 10) as f64);
        let preds = fitted.predict(&x_new);

        assert!((preds[0] - (2.0 + 3.0 * 10.0)).abs() < 1e-10);
        assert!((preds[1] - (2.0 + 3.0 * 11.0)).abs() < 1e-10);
    }

    #[test]
    fn test_collinear_design_is_rejected() {
        let x = Mat::from_fn(10, 2, |i, j| (i as f64) * (j + 1) as f64);
        let y = Col::from_fn(10, |i| 1.0 + i as f64 + ((i * 7) % 3) as f64);

        let model = OlsRegressor::builder().build();
        let err = model.fit(&x, &y).unwrap_err();
        assert_eq!(err, RegressionError::SingularMatrix { aliased: vec![1] });
    }

    #[test]
    fn test_constant_column_with_intercept_is_rejected() {
        let x = Mat::from_fn(6, 2, |i, j| if j == 0 { i as f64 } else { 4.0 });
        let y = Col::from_fn(6, |i| (i * i) as f64);

        let err = OlsRegressor::builder().build().fit(&x, &y).unwrap_err();
        assert_eq!(err, RegressionError::SingularMatrix { aliased: vec![1] });
    }

    #[test]
    fn test_covariance_has_intercept_first() {
        let x = Mat::from_fn(8, 1, |i, _| i as f64);
        let y = Col::from_fn(8, |i| 1.0 + 0.5 * i as f64 + if i % 2 == 0 { 0.1 } else { -0.1 });

        let fitted = OlsRegressor::builder().build().fit(&x, &y).unwrap();
        let v = fitted.covariance();
        assert_eq!(v.nrows(), 2);

        let se = fitted.result().std_errors.as_ref().unwrap();
        assert!((v[(1, 1)].sqrt() - se[0]).abs() < 1e-12);
        assert!((v[(0, 0)].sqrt() - fitted.result().intercept_std_error.unwrap()).abs() < 1e-12);
    }
}
