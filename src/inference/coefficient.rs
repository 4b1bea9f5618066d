//! Coefficient inference calculations.

use super::ReferenceDistribution;
use faer::{Col, Mat};

/// Computes inference statistics for regression coefficients.
pub struct CoefficientInference;

impl CoefficientInference {
    /// Standard errors from the diagonal of a covariance matrix.
    ///
    /// SE(β_j) = sqrt(V_jj); negative or non-finite variances yield NaN.
    pub fn standard_errors(covariance: &Mat<f64>) -> Col<f64> {
        Col::from_fn(covariance.nrows(), |j| {
            let var = covariance[(j, j)];
            if var >= 0.0 {
                var.sqrt()
            } else {
                f64::NAN
            }
        })
    }

    /// Compute test statistics for coefficients.
    ///
    /// t_j = β_j / SE(β_j)
    pub fn t_statistics(coefficients: &Col<f64>, std_errors: &Col<f64>) -> Col<f64> {
        Col::from_fn(coefficients.nrows(), |j| {
            if std_errors[j].is_nan() || std_errors[j] == 0.0 {
                f64::NAN
            } else {
                coefficients[j] / std_errors[j]
            }
        })
    }

    /// Compute two-sided p-values from test statistics.
    ///
    /// p_j = 2 * P(|T| > |t_j|) where T follows `distribution`
    pub fn p_values(statistics: &Col<f64>, distribution: ReferenceDistribution) -> Col<f64> {
        Col::from_fn(statistics.nrows(), |j| {
            distribution.two_sided_p_value(statistics[j])
        })
    }

    /// Compute confidence intervals for coefficients.
    ///
    /// CI_j = β_j ± q_{1-α/2} * SE(β_j)
    pub fn confidence_intervals(
        coefficients: &Col<f64>,
        std_errors: &Col<f64>,
        distribution: ReferenceDistribution,
        confidence_level: f64,
    ) -> (Col<f64>, Col<f64>) {
        let crit = distribution.critical_value(confidence_level);
        let lower = Col::from_fn(coefficients.nrows(), |j| {
            coefficients[j] - crit * std_errors[j]
        });
        let upper = Col::from_fn(coefficients.nrows(), |j| {
            coefficients[j] + crit * std_errors[j]
        });
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_t_statistics() {
        let coefficients = Col::from_fn(3, |i| (i + 1) as f64);
        let std_errors = Col::from_fn(3, |_| 0.5);

        let t_stats = CoefficientInference::t_statistics(&coefficients, &std_errors);

        assert!((t_stats[0] - 2.0).abs() < 1e-10);
        assert!((t_stats[1] - 4.0).abs() < 1e-10);
        assert!((t_stats[2] - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_standard_error_gives_nan() {
        let coefficients = Col::from_fn(1, |_| 1.0);
        let std_errors = Col::from_fn(1, |_| 0.0);
        let t_stats = CoefficientInference::t_statistics(&coefficients, &std_errors);
        assert!(t_stats[0].is_nan());
    }

    #[test]
    fn test_p_values_bounds() {
        let t_stats = Col::from_fn(3, |i| (i + 1) as f64);
        let p_vals =
            CoefficientInference::p_values(&t_stats, ReferenceDistribution::StudentT { df: 10.0 });

        for p in p_vals.iter() {
            assert!(*p >= 0.0 && *p <= 1.0);
        }
    }

    #[test]
    fn test_standard_errors_from_covariance() {
        let mut v = Mat::zeros(2, 2);
        v[(0, 0)] = 4.0;
        v[(1, 1)] = 0.25;
        v[(0, 1)] = 0.1;
        v[(1, 0)] = 0.1;

        let se = CoefficientInference::standard_errors(&v);
        assert!((se[0] - 2.0).abs() < 1e-12);
        assert!((se[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_interval_symmetry() {
        let coefficients = Col::from_fn(1, |_| 3.0);
        let std_errors = Col::from_fn(1, |_| 1.0);
        let (lo, hi) = CoefficientInference::confidence_intervals(
            &coefficients,
            &std_errors,
            ReferenceDistribution::Normal,
            0.95,
        );
        assert!(((hi[0] - 3.0) - (3.0 - lo[0])).abs() < 1e-12);
        assert!((hi[0] - 4.959964).abs() < 1e-5);
    }
}
