//! Comparisons: changes in the prediction when one predictor moves between
//! two values, holding the others fixed.

use super::aggregate::group_rows;
use super::table::{Estimand, RowKey};
use super::{
    evaluation_grid, finish, sorted_variables, By, ComparisonOptions, EffectsError, EffectsTable,
    InferenceOptions,
};
use crate::data::Dataset;
use crate::inference::{linear_predictor, DeltaMethod, ReferenceDistribution};
use crate::solvers::LinearModel;
use faer::Mat;
use tracing::debug;

/// The two values a predictor is moved between.
///
/// Spreads (`Sd`, `TwoSd`, `Iqr`, `MinMax`) are computed on the training
/// data and centred on its mean where applicable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Contrast {
    /// 0 → 1 for binary 0/1 predictors, otherwise `Delta(1.0)`.
    #[default]
    Default,
    /// x → x + delta at each row.
    Delta(f64),
    /// Fixed values for every row.
    Pair { lo: f64, hi: f64 },
    /// mean − sd/2 → mean + sd/2.
    Sd,
    /// mean − sd → mean + sd.
    TwoSd,
    /// First quartile → third quartile.
    Iqr,
    /// Minimum → maximum.
    MinMax,
}

/// How the predictions at the two values are combined.
///
/// The `*Avg` forms average the predictions first and combine the averages,
/// so they always return one row per term (and `by` group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparisonFn {
    #[default]
    Difference,
    Ratio,
    LnRatio,
    DifferenceAvg,
    RatioAvg,
    LnRatioAvg,
}

impl ComparisonFn {
    pub fn is_average(self) -> bool {
        matches!(self, Self::DifferenceAvg | Self::RatioAvg | Self::LnRatioAvg)
    }

    fn apply(self, hi: f64, lo: f64) -> f64 {
        match self {
            Self::Difference | Self::DifferenceAvg => hi - lo,
            Self::Ratio | Self::RatioAvg => hi / lo,
            Self::LnRatio | Self::LnRatioAvg => (hi / lo).ln(),
        }
    }

    fn label(self, contrast: &Resolved) -> String {
        let (hi, lo) = (&contrast.hi_label, &contrast.lo_label);
        match self {
            Self::Difference => contrast
                .shift_label
                .clone()
                .unwrap_or_else(|| format!("{hi} - {lo}")),
            Self::Ratio => format!("{hi} / {lo}"),
            Self::LnRatio => format!("ln({hi} / {lo})"),
            Self::DifferenceAvg => format!("mean({hi}) - mean({lo})"),
            Self::RatioAvg => format!("mean({hi}) / mean({lo})"),
            Self::LnRatioAvg => format!("ln(mean({hi}) / mean({lo}))"),
        }
    }
}

/// A contrast evaluated against the data.
#[derive(Debug, Clone)]
struct Resolved {
    lo: Vec<f64>,
    hi: Vec<f64>,
    lo_label: String,
    hi_label: String,
    /// Short label for pure shifts, e.g. `+1`.
    shift_label: Option<String>,
}

impl Contrast {
    fn resolve(
        self,
        name: &str,
        training: &Dataset,
        grid: &Dataset,
    ) -> Result<Resolved, EffectsError> {
        let n = grid.n_rows();
        let fixed = |lo: f64, hi: f64, lo_label: String, hi_label: String| Resolved {
            lo: vec![lo; n],
            hi: vec![hi; n],
            lo_label,
            hi_label,
            shift_label: None,
        };

        Ok(match self {
            Self::Default if training.is_binary(name)? => {
                fixed(0.0, 1.0, "0".to_string(), "1".to_string())
            }
            Self::Default => Self::Delta(1.0).resolve(name, training, grid)?,
            Self::Delta(delta) => {
                let x = grid.column(name)?;
                Resolved {
                    lo: x.to_vec(),
                    hi: x.iter().map(|v| v + delta).collect(),
                    lo_label: "x".to_string(),
                    hi_label: format!("(x+{delta})"),
                    shift_label: Some(format!("+{delta}")),
                }
            }
            Self::Pair { lo, hi } => fixed(lo, hi, lo.to_string(), hi.to_string()),
            Self::Sd | Self::TwoSd => {
                let mean = training.mean(name)?;
                let sd = training.std_dev(name)?;
                let (half, tag) = if self == Self::Sd {
                    (sd / 2.0, "sd/2")
                } else {
                    (sd, "sd")
                };
                fixed(
                    mean - half,
                    mean + half,
                    format!("(x-{tag})"),
                    format!("(x+{tag})"),
                )
            }
            Self::Iqr => fixed(
                training.quantile(name, 0.25)?,
                training.quantile(name, 0.75)?,
                "Q1".to_string(),
                "Q3".to_string(),
            ),
            Self::MinMax => fixed(
                training.min(name)?,
                training.max(name)?,
                "Min".to_string(),
                "Max".to_string(),
            ),
        })
    }
}

/// Design matrices at the two values of one variable.
struct Counterfactual {
    term: String,
    label: String,
    x_lo: Mat<f64>,
    x_hi: Mat<f64>,
}

/// Compare predictions between two values of each requested variable.
///
/// Returns one row per (variable × grid row), sorted by variable name, or
/// one row per variable and group for the `*Avg` comparison functions.
pub fn comparisons(
    model: &LinearModel,
    options: &ComparisonOptions,
) -> Result<EffectsTable, EffectsError> {
    options.inference.validate()?;
    let (grid, context) = evaluation_grid(model, options.newdata.as_ref())?;
    let variables = sorted_variables(model, &options.variables, Contrast::Default)?;

    let mut counterfactuals = Vec::with_capacity(variables.len());
    for (name, contrast) in &variables {
        let resolved = contrast.resolve(name, model.data(), &grid)?;
        counterfactuals.push(Counterfactual {
            term: name.clone(),
            label: options.comparison.label(&resolved),
            x_lo: model.design_matrix(&grid.with_column(name, resolved.lo)?)?,
            x_hi: model.design_matrix(&grid.with_column(name, resolved.hi)?)?,
        });
    }

    let distribution = ReferenceDistribution::from_df(options.inference.df);
    let f = options.comparison;

    if f.is_average() {
        let columns = match &options.inference.by {
            By::Columns(columns) => columns.clone(),
            By::None | By::All => Vec::new(),
        };
        let all_rows: Vec<usize> = (0..grid.n_rows()).collect();
        let groups = group_rows(&grid, &all_rows, &columns)?;

        let mut keys = Vec::new();
        for cf in &counterfactuals {
            for (group, _) in &groups {
                keys.push(RowKey {
                    term: Some(cf.term.clone()),
                    contrast: Some(cf.label.clone()),
                    group: group.clone(),
                    ..RowKey::default()
                });
            }
        }

        let delta = DeltaMethod::evaluate(model.coefficients(), |beta| {
            let mut out = Vec::with_capacity(keys.len());
            for cf in &counterfactuals {
                let lo = linear_predictor(&cf.x_lo, beta);
                let hi = linear_predictor(&cf.x_hi, beta);
                for (_, members) in &groups {
                    let m = members.len() as f64;
                    let mean_lo = members.iter().map(|&i| lo[i]).sum::<f64>() / m;
                    let mean_hi = members.iter().map(|&i| hi[i]).sum::<f64>() / m;
                    out.push(f.apply(mean_hi, mean_lo));
                }
            }
            Ok::<_, EffectsError>(out)
        })?;

        debug!(
            n_terms = counterfactuals.len(),
            n_groups = groups.len(),
            "computed averaged comparisons"
        );

        let table = EffectsTable::assemble(
            Estimand::Comparison,
            keys,
            delta,
            model.vcov(),
            distribution,
            options.inference.conf_level,
        );
        let rest = InferenceOptions {
            by: By::None,
            ..options.inference.clone()
        };
        return finish(table, &rest);
    }

    let n = grid.n_rows();
    let keys = counterfactuals
        .iter()
        .flat_map(|cf| {
            (0..n).map(move |i| RowKey {
                row_id: Some(i),
                term: Some(cf.term.clone()),
                contrast: Some(cf.label.clone()),
                ..RowKey::default()
            })
        })
        .collect();

    let delta = DeltaMethod::evaluate(model.coefficients(), |beta| {
        let mut out = Vec::with_capacity(counterfactuals.len() * n);
        for cf in &counterfactuals {
            let lo = linear_predictor(&cf.x_lo, beta);
            let hi = linear_predictor(&cf.x_hi, beta);
            out.extend(hi.iter().zip(&lo).map(|(&h, &l)| f.apply(h, l)));
        }
        Ok::<_, EffectsError>(out)
    })?;

    debug!(
        n_terms = counterfactuals.len(),
        n_rows = n,
        "computed comparisons"
    );

    let table = EffectsTable::assemble(
        Estimand::Comparison,
        keys,
        delta,
        model.vcov(),
        distribution,
        options.inference.conf_level,
    )
    .with_grid(grid, context);
    finish(table, &options.inference)
}

/// Average comparisons: like [`comparisons`] with `by` defaulting to
/// [`By::All`].
pub fn avg_comparisons(
    model: &LinearModel,
    options: &ComparisonOptions,
) -> Result<EffectsTable, EffectsError> {
    let mut options = options.clone();
    if options.inference.by == By::None {
        options.inference.by = By::All;
    }
    comparisons(model, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;
    use approx::assert_relative_eq;

    fn interaction_model() -> LinearModel {
        LinearModel::fit("mpg ~ hp * wt * am", &mtcars()).unwrap()
    }

    #[test]
    fn test_default_comparisons_row_count_and_order() {
        let model = interaction_model();
        let cmp = comparisons(&model, &ComparisonOptions::default()).unwrap();
        assert_eq!(cmp.len(), 96);

        let terms: Vec<&str> = cmp
            .rows()
            .iter()
            .step_by(32)
            .map(|r| r.key.term.as_deref().unwrap())
            .collect();
        assert_eq!(terms, ["am", "hp", "wt"]);
        assert_eq!(cmp.rows()[0].key.contrast.as_deref(), Some("1 - 0"));
        assert_eq!(cmp.rows()[32].key.contrast.as_deref(), Some("+1"));
    }

    #[test]
    fn test_additive_difference_equals_coefficient() {
        let model = LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap();
        let opts = ComparisonOptions::builder()
            .variable("wt", Contrast::Default)
            .build()
            .unwrap();
        let cmp = comparisons(&model, &opts).unwrap();
        for row in cmp.rows() {
            assert_relative_eq!(row.estimate, model.coefficients()[2], epsilon = 1e-9);
            assert_relative_eq!(row.std_error, model.vcov()[(2, 2)].sqrt(), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_pair_and_sd_differ() {
        let model = interaction_model();
        let pair = ComparisonOptions::builder()
            .variable("hp", Contrast::Pair { lo: 100.0, hi: 120.0 })
            .build()
            .unwrap();
        let sd = ComparisonOptions::builder()
            .variable("hp", Contrast::Sd)
            .build()
            .unwrap();
        let a = comparisons(&model, &pair).unwrap();
        let b = comparisons(&model, &sd).unwrap();

        assert_eq!(a.len(), b.len());
        assert_eq!(a.column_names(), b.column_names());
        assert_eq!(a.rows()[0].key.contrast.as_deref(), Some("120 - 100"));
        assert_eq!(b.rows()[0].key.contrast.as_deref(), Some("(x+sd/2) - (x-sd/2)"));
        assert!((a.rows()[0].estimate - b.rows()[0].estimate).abs() > 1e-6);
    }

    #[test]
    fn test_sd_spans_one_standard_deviation() {
        // additive: effect of moving hp across one sd is sd × β_hp
        let model = LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap();
        let opts = ComparisonOptions::builder()
            .variable("hp", Contrast::Sd)
            .build()
            .unwrap();
        let cmp = comparisons(&model, &opts).unwrap();
        let sd = model.data().std_dev("hp").unwrap();
        assert_relative_eq!(cmp.rows()[0].estimate, sd * model.coefficients()[1], epsilon = 1e-9);
    }

    #[test]
    fn test_ratio_avg_is_one_row_per_term() {
        let model = interaction_model();
        let opts = ComparisonOptions::builder()
            .variable("hp", Contrast::Delta(10.0))
            .comparison(ComparisonFn::RatioAvg)
            .build()
            .unwrap();
        let cmp = comparisons(&model, &opts).unwrap();
        assert_eq!(cmp.len(), 1);
        assert_eq!(
            cmp.rows()[0].key.contrast.as_deref(),
            Some("mean((x+10)) / mean(x)")
        );

        // ratio of average predictions computed directly
        let data = model.data();
        let lo = model.predict(data).unwrap();
        let shifted: Vec<f64> = data.column("hp").unwrap().iter().map(|v| v + 10.0).collect();
        let hi = model.predict(&data.with_column("hp", shifted).unwrap()).unwrap();
        let expected = hi.iter().sum::<f64>() / lo.iter().sum::<f64>();
        assert_relative_eq!(cmp.rows()[0].estimate, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_ratio_avg_by_group() {
        let model = interaction_model();
        let opts = ComparisonOptions::builder()
            .variable("hp", Contrast::Default)
            .comparison(ComparisonFn::DifferenceAvg)
            .by(By::columns(["am"]))
            .build()
            .unwrap();
        let cmp = comparisons(&model, &opts).unwrap();
        assert_eq!(cmp.len(), 2);
        assert_eq!(cmp.rows()[1].key.group, vec![("am".to_string(), 1.0)]);
    }

    #[test]
    fn test_unknown_variable() {
        let model = interaction_model();
        let opts = ComparisonOptions::builder()
            .variable("qsec", Contrast::Default)
            .build()
            .unwrap();
        assert_eq!(
            comparisons(&model, &opts).unwrap_err(),
            EffectsError::UnknownVariable("qsec".into())
        );
    }
}
