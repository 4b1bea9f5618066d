//! Reference distributions for test statistics.

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Distribution used to turn a test statistic into p-values and critical
/// values.
///
/// Effects default to the standard normal (`z` statistics); supplying residual
/// degrees of freedom switches to Student's t.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ReferenceDistribution {
    #[default]
    Normal,
    StudentT {
        df: f64,
    },
}

impl ReferenceDistribution {
    /// Pick t(df) for finite positive `df`, otherwise the normal.
    pub fn from_df(df: Option<f64>) -> Self {
        match df {
            Some(df) if df.is_finite() && df > 0.0 => Self::StudentT { df },
            _ => Self::Normal,
        }
    }

    /// Column header for the statistic (`z` or `t`).
    pub fn statistic_name(&self) -> &'static str {
        match self {
            Self::Normal => "z",
            Self::StudentT { .. } => "t",
        }
    }

    /// Cumulative distribution function.
    pub fn cdf(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match *self {
            Self::Normal => Normal::new(0.0, 1.0).map_or(f64::NAN, |d| d.cdf(x)),
            Self::StudentT { df } => StudentsT::new(0.0, 1.0, df).map_or(f64::NAN, |d| d.cdf(x)),
        }
    }

    /// Two-sided p-value: `2 * P(|T| > |statistic|)`.
    pub fn two_sided_p_value(&self, statistic: f64) -> f64 {
        if !statistic.is_finite() {
            return f64::NAN;
        }
        (2.0 * (1.0 - self.cdf(statistic.abs()))).clamp(0.0, 1.0)
    }

    /// Critical value for a two-sided interval at `confidence_level`.
    pub fn critical_value(&self, confidence_level: f64) -> f64 {
        let q = 1.0 - (1.0 - confidence_level) / 2.0;
        match *self {
            Self::Normal => Normal::new(0.0, 1.0).map_or(f64::NAN, |d| d.inverse_cdf(q)),
            Self::StudentT { df } => {
                StudentsT::new(0.0, 1.0, df).map_or(f64::NAN, |d| d.inverse_cdf(q))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_critical_value() {
        let z = ReferenceDistribution::Normal.critical_value(0.95);
        assert!((z - 1.959964).abs() < 1e-5);
    }

    #[test]
    fn test_t_is_wider_than_normal() {
        let t = ReferenceDistribution::from_df(Some(29.0)).critical_value(0.95);
        let z = ReferenceDistribution::Normal.critical_value(0.95);
        assert!(t > z);
        assert!((t - 2.045230).abs() < 1e-4);
    }

    #[test]
    fn test_p_value_bounds() {
        let d = ReferenceDistribution::Normal;
        assert!((d.two_sided_p_value(0.0) - 1.0).abs() < 1e-12);
        assert!((d.two_sided_p_value(1.959964) - 0.05).abs() < 1e-5);
        assert!(d.two_sided_p_value(f64::NAN).is_nan());
        assert_eq!(ReferenceDistribution::from_df(None), ReferenceDistribution::Normal);
        assert_eq!(
            ReferenceDistribution::from_df(Some(f64::INFINITY)),
            ReferenceDistribution::Normal
        );
    }
}
