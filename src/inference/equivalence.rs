//! Two one-sided tests (TOST) for equivalence, non-inferiority and
//! non-superiority.

use super::ReferenceDistribution;
use serde::Serialize;

/// Outcome of an equivalence test against the interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquivalenceResult {
    pub low: f64,
    pub high: f64,
    /// (estimate - low) / se; H0: θ ≤ low.
    pub statistic_noninf: f64,
    /// (estimate - high) / se; H0: θ ≥ high.
    pub statistic_nonsup: f64,
    pub p_value_noninf: f64,
    pub p_value_nonsup: f64,
    /// max(p_noninf, p_nonsup)
    pub p_value_equiv: f64,
}

impl EquivalenceResult {
    /// Run both one-sided tests.
    pub fn test(
        estimate: f64,
        std_error: f64,
        low: f64,
        high: f64,
        distribution: ReferenceDistribution,
    ) -> Self {
        let statistic_noninf = (estimate - low) / std_error;
        let statistic_nonsup = (estimate - high) / std_error;
        let p_value_noninf = 1.0 - distribution.cdf(statistic_noninf);
        let p_value_nonsup = distribution.cdf(statistic_nonsup);
        Self {
            low,
            high,
            statistic_noninf,
            statistic_nonsup,
            p_value_noninf,
            p_value_nonsup,
            p_value_equiv: p_value_noninf.max(p_value_nonsup),
        }
    }

    /// Equivalence is established at level `alpha` when both tests reject.
    pub fn is_equivalent(&self, alpha: f64) -> bool {
        self.p_value_equiv < alpha
    }
}
