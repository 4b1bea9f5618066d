//! Result tables returned by the effects engine.

use super::EffectsError;
use crate::data::Dataset;
use crate::inference::{DeltaMethod, EquivalenceResult, ReferenceDistribution};
use crate::solvers::LinearModel;
use faer::Mat;
use serde::Serialize;

/// What the rows of a table estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimand {
    Prediction,
    Comparison,
    Slope,
    Coefficient,
    Hypothesis,
}

/// Identifying columns of a row, before inference is attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowKey {
    /// Row of the evaluation grid, for unit-level estimates.
    pub row_id: Option<usize>,
    /// Variable (or coefficient) the estimate refers to.
    pub term: Option<String>,
    /// Contrast label, e.g. `"+1"` or `"dY/dX"`.
    pub contrast: Option<String>,
    /// Grouping column values after aggregation.
    pub group: Vec<(String, f64)>,
    /// Normalized hypothesis label.
    pub hypothesis: Option<String>,
}

/// One estimate with its delta-method inference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectsRow {
    #[serde(flatten)]
    pub key: RowKey,
    pub estimate: f64,
    pub std_error: f64,
    pub statistic: f64,
    pub p_value: f64,
    pub conf_low: f64,
    pub conf_high: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equivalence: Option<EquivalenceResult>,
}

/// Estimates, standard errors, tests and intervals for a set of quantities
/// derived from one fitted model.
///
/// The table keeps the Jacobian of its estimates with respect to the model
/// coefficients together with their covariance, so it can be averaged
/// ([`aggregate`](super::aggregate)) or tested
/// ([`hypotheses`](super::hypotheses)) without refitting. Every operation
/// returns a new table.
#[derive(Debug, Clone)]
pub struct EffectsTable {
    estimand: Estimand,
    rows: Vec<EffectsRow>,
    jacobian: Mat<f64>,
    vcov: Mat<f64>,
    distribution: ReferenceDistribution,
    conf_level: f64,
    transformed: bool,
    grid: Option<Dataset>,
    context: Vec<String>,
}

impl EffectsTable {
    /// Attach standard errors, statistics, p-values and intervals to `keys`.
    pub(crate) fn assemble(
        estimand: Estimand,
        keys: Vec<RowKey>,
        delta: DeltaMethod,
        vcov: &Mat<f64>,
        distribution: ReferenceDistribution,
        conf_level: f64,
    ) -> Self {
        let std_errors = delta.standard_errors(vcov);
        let crit = distribution.critical_value(conf_level);

        let rows = keys
            .into_iter()
            .zip(delta.estimates.iter().zip(&std_errors))
            .map(|(key, (&estimate, &std_error))| {
                let statistic = estimate / std_error;
                EffectsRow {
                    key,
                    estimate,
                    std_error,
                    statistic,
                    p_value: distribution.two_sided_p_value(statistic),
                    conf_low: estimate - crit * std_error,
                    conf_high: estimate + crit * std_error,
                    equivalence: None,
                }
            })
            .collect();

        Self {
            estimand,
            rows,
            jacobian: delta.jacobian,
            vcov: vcov.clone(),
            distribution,
            conf_level,
            transformed: false,
            grid: None,
            context: Vec::new(),
        }
    }

    /// Remember the evaluation grid so rows can be grouped by its columns.
    pub(crate) fn with_grid(mut self, grid: Dataset, context: Vec<String>) -> Self {
        self.grid = Some(grid);
        self.context = context;
        self
    }

    pub(crate) fn set_rows(&mut self, rows: Vec<EffectsRow>) {
        self.rows = rows;
    }

    pub(crate) fn mark_transformed(&mut self) {
        self.transformed = true;
    }

    /// Delta-method view of the estimates: values and Jacobian.
    pub(crate) fn delta(&self) -> DeltaMethod {
        DeltaMethod {
            estimates: self.estimates(),
            jacobian: self.jacobian.clone(),
        }
    }

    pub fn estimand(&self) -> Estimand {
        self.estimand
    }

    pub fn rows(&self) -> &[EffectsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn estimates(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.estimate).collect()
    }

    pub fn std_errors(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.std_error).collect()
    }

    /// ∂estimates/∂β (n_rows × n_coefficients).
    pub fn jacobian(&self) -> &Mat<f64> {
        &self.jacobian
    }

    /// Covariance of the coefficients the Jacobian refers to.
    pub fn vcov(&self) -> &Mat<f64> {
        &self.vcov
    }

    pub fn distribution(&self) -> ReferenceDistribution {
        self.distribution
    }

    pub fn conf_level(&self) -> f64 {
        self.conf_level
    }

    /// True once a transform has been applied; such tables cannot be
    /// aggregated or tested again.
    pub fn is_transformed(&self) -> bool {
        self.transformed
    }

    /// The grid unit-level rows were evaluated on.
    pub fn grid(&self) -> Option<&Dataset> {
        self.grid.as_ref()
    }

    /// Grid columns printed next to unit-level estimates.
    pub fn context_columns(&self) -> &[String] {
        &self.context
    }

    pub fn has_equivalence(&self) -> bool {
        self.rows.iter().any(|r| r.equivalence.is_some())
    }

    /// Names of the columns this table carries, in print order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.rows.iter().any(|r| r.key.row_id.is_some()) {
            names.push("rowid".to_string());
        }
        if self.rows.iter().any(|r| r.key.term.is_some()) {
            names.push("term".to_string());
        }
        if self.rows.iter().any(|r| r.key.contrast.is_some()) {
            names.push("contrast".to_string());
        }
        if let Some(first) = self.rows.first() {
            names.extend(first.key.group.iter().map(|(name, _)| name.clone()));
        }
        if self.rows.iter().any(|r| r.key.hypothesis.is_some()) {
            names.push("hypothesis".to_string());
        }
        names.extend(
            [
                "estimate",
                "std_error",
                "statistic",
                "p_value",
                "conf_low",
                "conf_high",
            ]
            .map(String::from),
        );
        if self.has_equivalence() {
            names.extend(
                [
                    "statistic_noninf",
                    "statistic_nonsup",
                    "p_value_noninf",
                    "p_value_nonsup",
                    "p_value_equiv",
                ]
                .map(String::from),
            );
        }
        names
    }

    /// Context value of grid column `name` for `row`, if the row maps to a
    /// grid row.
    pub fn grid_value(&self, row: &EffectsRow, name: &str) -> Option<f64> {
        let grid = self.grid.as_ref()?;
        grid.value(name, row.key.row_id?).ok()
    }

    /// Serialize the rows as a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.rows)
    }
}

impl LinearModel {
    /// The coefficients as an effects table (identity Jacobian), so that
    /// hypotheses can be tested on them like on any other estimates.
    pub fn coefficient_table(&self) -> EffectsTable {
        let p = self.coefficients().len();
        let keys = self
            .coefficient_names()
            .iter()
            .map(|name| RowKey {
                term: Some(name.clone()),
                ..RowKey::default()
            })
            .collect();
        let delta = DeltaMethod {
            estimates: self.coefficients().to_vec(),
            jacobian: Mat::identity(p, p),
        };
        EffectsTable::assemble(
            Estimand::Coefficient,
            keys,
            delta,
            self.vcov(),
            ReferenceDistribution::Normal,
            0.95,
        )
    }

    /// Test a hypothesis on the coefficients.
    pub fn hypotheses(
        &self,
        hypothesis: impl Into<crate::inference::Hypothesis>,
    ) -> Result<EffectsTable, EffectsError> {
        super::hypotheses(&self.coefficient_table(), hypothesis)
    }
}
