//! Linear hypotheses, equivalence tests and transforms on result tables.

use super::table::{Estimand, RowKey};
use super::{EffectsError, EffectsTable, Transform};
use crate::inference::{EquivalenceResult, Hypothesis};
use faer::Mat;
use tracing::{debug, warn};

/// Test a linear hypothesis on the estimates of `table`.
///
/// Estimates are referenced by 1-based position (`b1`, `b2`, ...) or by term
/// label when that label occurs exactly once in the table. Returns one row
/// per contrast, labelled with the hypothesis; for an expression such as
/// `"b3 = 2 * b2"` that is a single row testing `b3 - 2 b2 = 0`.
pub fn hypotheses(
    table: &EffectsTable,
    hypothesis: impl Into<Hypothesis>,
) -> Result<EffectsTable, EffectsError> {
    if table.is_transformed() {
        return Err(EffectsError::TransformedTable);
    }
    let hypothesis = hypothesis.into();

    let labels: Vec<Option<String>> = table
        .rows()
        .iter()
        .map(|r| r.key.term.clone().or_else(|| r.key.hypothesis.clone()))
        .collect();
    let contrasts = hypothesis.contrasts(&labels)?;

    let weights = Mat::from_fn(contrasts.weights.len(), table.len(), |r, i| {
        contrasts.weights[r][i]
    });
    let mut delta = table.delta().map_linear(&weights);
    for (estimate, constant) in delta.estimates.iter_mut().zip(&contrasts.constants) {
        *estimate -= constant;
    }

    debug!(hypothesis = %hypothesis, n_contrasts = contrasts.labels.len(), "tested hypothesis");

    let keys = contrasts
        .labels
        .into_iter()
        .map(|label| RowKey {
            hypothesis: Some(label),
            ..RowKey::default()
        })
        .collect();
    Ok(EffectsTable::assemble(
        Estimand::Hypothesis,
        keys,
        delta,
        table.vcov(),
        table.distribution(),
        table.conf_level(),
    ))
}

/// Add two one-sided equivalence tests against `[low, high]` to every row.
///
/// Estimates, standard errors and the two-sided test are left untouched.
pub fn equivalence(table: &EffectsTable, low: f64, high: f64) -> Result<EffectsTable, EffectsError> {
    if table.is_transformed() {
        return Err(EffectsError::TransformedTable);
    }
    if !(low < high) {
        return Err(EffectsError::InvalidBounds { low, high });
    }

    let distribution = table.distribution();
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.equivalence = Some(EquivalenceResult::test(
                row.estimate,
                row.std_error,
                low,
                high,
                distribution,
            ));
            row
        })
        .collect();

    let mut out = table.clone();
    out.set_rows(rows);
    Ok(out)
}

/// Apply `transform` to estimates and interval bounds.
///
/// Standard errors, statistics and p-values refer to the untransformed scale
/// and are set to NaN. Equivalence results, if any, are kept.
pub fn transform(table: &EffectsTable, transform: Transform) -> EffectsTable {
    warn!(
        ?transform,
        "standard errors and tests are not reported on the transformed scale"
    );
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.estimate = transform.apply(row.estimate);
            row.conf_low = transform.apply(row.conf_low);
            row.conf_high = transform.apply(row.conf_high);
            row.std_error = f64::NAN;
            row.statistic = f64::NAN;
            row.p_value = f64::NAN;
            row
        })
        .collect();

    let mut out = table.clone();
    out.set_rows(rows);
    out.mark_transformed();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;
    use crate::effects::{avg_slopes, predictions, PredictionOptions, SlopeOptions};
    use crate::inference::HypothesisError;
    use crate::solvers::LinearModel;
    use approx::assert_relative_eq;

    fn additive() -> LinearModel {
        LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap()
    }

    #[test]
    fn test_positional_and_named_agree() {
        let model = additive();
        let positional = model.hypotheses("b3 = 2 * b2").unwrap();
        let named = model.hypotheses("wt = 2 * hp").unwrap();

        assert_eq!(positional.len(), 1);
        let (a, b) = (&positional.rows()[0], &named.rows()[0]);
        assert_relative_eq!(a.estimate, -3.81429, epsilon = 1e-4);
        assert!(a.statistic.is_finite() && a.p_value.is_finite());
        assert_relative_eq!(a.statistic, b.statistic, epsilon = 1e-12);
        assert_relative_eq!(a.p_value, b.p_value, epsilon = 1e-12);
        assert_eq!(a.key.hypothesis.as_deref(), Some("b3 = 2 * b2"));
    }

    #[test]
    fn test_out_of_range_position() {
        let err = additive().hypotheses("b9 = 0").unwrap_err();
        assert_eq!(
            err,
            EffectsError::Hypothesis(HypothesisError::PositionOutOfRange { index: 9, n: 3 })
        );
    }

    #[test]
    fn test_ambiguous_name_on_unit_level_table() {
        let model = additive();
        let s = crate::effects::slopes(&model, &SlopeOptions::default()).unwrap();
        let err = hypotheses(&s, "hp = 0").unwrap_err();
        assert!(matches!(
            err,
            EffectsError::Hypothesis(HypothesisError::AmbiguousName { count: 32, .. })
        ));
    }

    #[test]
    fn test_pairwise_on_predictions() {
        let model = additive();
        let grid = model.data().select_rows(&[0, 1, 2]).unwrap();
        let opts = PredictionOptions::builder().newdata(grid).build().unwrap();
        let p = predictions(&model, &opts).unwrap();
        let pw = hypotheses(&p, Hypothesis::Pairwise).unwrap();
        assert_eq!(pw.len(), 3);
        assert_relative_eq!(
            pw.rows()[0].estimate,
            p.rows()[0].estimate - p.rows()[1].estimate,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_equivalence_keeps_estimates() {
        let model = additive();
        let s = avg_slopes(&model, &SlopeOptions::default()).unwrap();
        let eq = equivalence(&s, -2.0, 2.0).unwrap();

        assert!(eq.has_equivalence());
        for (before, after) in s.rows().iter().zip(eq.rows()) {
            assert_eq!(before.estimate, after.estimate);
            assert_eq!(before.std_error, after.std_error);
        }
        // hp slope is tiny with a tiny se: clearly equivalent
        let hp = eq.rows()[0].equivalence.unwrap();
        assert!(hp.p_value_equiv < 1e-10);
    }

    #[test]
    fn test_transform_blocks_further_tests() {
        let model = additive();
        let p = predictions(&model, &PredictionOptions::default()).unwrap();
        let t = transform(&p, Transform::Ln);

        assert_relative_eq!(t.rows()[0].estimate, p.rows()[0].estimate.ln());
        assert!(t.rows()[0].std_error.is_nan());
        assert!(t.rows()[0].conf_low < t.rows()[0].conf_high);
        assert_eq!(hypotheses(&t, "b1 = b2").unwrap_err(), EffectsError::TransformedTable);
    }
}
