//! Delta method: first-order uncertainty for smooth functions of the
//! coefficients.
//!
//! Every quantity reported by the effects engine is a function `g(β)` of the
//! fitted coefficients. Its covariance is approximated by `J V J'` where `J`
//! is the Jacobian of `g` at `β̂`, evaluated here by central finite differences.

use super::covariance::sandwich_diagonal;
use faer::Mat;
use tracing::trace;

/// Relative step used for the finite-difference Jacobian.
const JACOBIAN_STEP: f64 = 1e-6;

/// Value of `g(β̂)` together with its Jacobian.
#[derive(Debug, Clone)]
pub struct DeltaMethod {
    /// Point estimates g(β̂).
    pub estimates: Vec<f64>,
    /// ∂g/∂β (n_estimates × n_coefficients).
    pub jacobian: Mat<f64>,
}

impl DeltaMethod {
    /// Evaluate `g` at `coefficients` and differentiate it numerically.
    pub fn evaluate<F, E>(coefficients: &[f64], g: F) -> Result<Self, E>
    where
        F: Fn(&[f64]) -> Result<Vec<f64>, E>,
    {
        let estimates = g(coefficients)?;
        let p = coefficients.len();
        let mut jacobian = Mat::zeros(estimates.len(), p);
        let mut shifted = coefficients.to_vec();

        for k in 0..p {
            let h = JACOBIAN_STEP * coefficients[k].abs().max(1.0);

            shifted[k] = coefficients[k] + h;
            let up = g(&shifted)?;
            shifted[k] = coefficients[k] - h;
            let down = g(&shifted)?;
            shifted[k] = coefficients[k];

            for (r, (u, d)) in up.iter().zip(&down).enumerate() {
                jacobian[(r, k)] = (u - d) / (2.0 * h);
            }
        }

        trace!(
            n_estimates = estimates.len(),
            n_coefficients = p,
            "evaluated delta-method jacobian"
        );
        Ok(Self {
            estimates,
            jacobian,
        })
    }

    /// Build from a known linear map: estimates = A β, Jacobian = A.
    pub fn linear(design: &Mat<f64>, coefficients: &[f64]) -> Self {
        let estimates = linear_predictor(design, coefficients);
        Self {
            estimates,
            jacobian: design.clone(),
        }
    }

    /// Standard errors sqrt(diag(J V J')).
    pub fn standard_errors(&self, covariance: &Mat<f64>) -> Vec<f64> {
        standard_errors(&self.jacobian, covariance)
    }

    /// Apply a linear map `W` (m × n) to the estimates: W g, W J.
    pub fn map_linear(&self, weights: &Mat<f64>) -> Self {
        let m = weights.nrows();
        let estimates = (0..m)
            .map(|r| {
                self.estimates
                    .iter()
                    .enumerate()
                    .map(|(i, e)| weights[(r, i)] * e)
                    .sum::<f64>()
            })
            .collect();
        let jacobian = weights * &self.jacobian;
        Self {
            estimates,
            jacobian,
        }
    }
}

/// sqrt(diag(J V J')), NaN where the variance is negative.
pub fn standard_errors(jacobian: &Mat<f64>, covariance: &Mat<f64>) -> Vec<f64> {
    sandwich_diagonal(jacobian, covariance)
        .into_iter()
        .map(|v| if v >= 0.0 { v.sqrt() } else { f64::NAN })
        .collect()
}

/// X β for a design matrix whose columns line up with `coefficients`.
pub fn linear_predictor(design: &Mat<f64>, coefficients: &[f64]) -> Vec<f64> {
    (0..design.nrows())
        .map(|i| {
            coefficients
                .iter()
                .enumerate()
                .map(|(j, b)| design[(i, j)] * b)
                .sum::<f64>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_linear_function_jacobian() {
        let beta = [1.0, 2.0];
        let dm = DeltaMethod::evaluate(&beta, |b| {
            Ok::<_, Infallible>(vec![3.0 * b[0] - b[1], b[1]])
        })
        .unwrap();

        assert!((dm.estimates[0] - 1.0).abs() < 1e-12);
        assert!((dm.jacobian[(0, 0)] - 3.0).abs() < 1e-8);
        assert!((dm.jacobian[(0, 1)] + 1.0).abs() < 1e-8);
        assert!(dm.jacobian[(1, 0)].abs() < 1e-8);
    }

    #[test]
    fn test_nonlinear_function_jacobian() {
        let beta = [2.0, 3.0];
        let dm =
            DeltaMethod::evaluate(&beta, |b| Ok::<_, Infallible>(vec![b[0] / b[1]])).unwrap();

        // d(a/b)/da = 1/b, d(a/b)/db = -a/b²
        assert!((dm.jacobian[(0, 0)] - 1.0 / 3.0).abs() < 1e-7);
        assert!((dm.jacobian[(0, 1)] + 2.0 / 9.0).abs() < 1e-7);
    }

    #[test]
    fn test_standard_errors_with_identity_covariance() {
        let design = Mat::from_fn(2, 2, |i, j| if i == j { 3.0 } else { 4.0 });
        let dm = DeltaMethod::linear(&design, &[1.0, 1.0]);
        let se = dm.standard_errors(&Mat::identity(2, 2));
        assert!((se[0] - 5.0).abs() < 1e-12);
        assert_eq!(dm.estimates, vec![7.0, 7.0]);
    }

    #[test]
    fn test_map_linear_average() {
        let design = Mat::from_fn(2, 1, |i, _| (i + 1) as f64);
        let dm = DeltaMethod::linear(&design, &[2.0]);
        let avg = dm.map_linear(&Mat::from_fn(1, 2, |_, _| 0.5));
        assert!((avg.estimates[0] - 3.0).abs() < 1e-12);
        assert!((avg.jacobian[(0, 0)] - 1.5).abs() < 1e-12);
    }
}
