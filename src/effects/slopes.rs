//! Slopes: partial derivatives of the prediction with respect to one
//! predictor, and the elasticities built from them.

use super::table::{Estimand, RowKey};
use super::{
    evaluation_grid, finish, sorted_variables, By, EffectsError, EffectsTable, SlopeOptions,
};
use crate::inference::{linear_predictor, DeltaMethod, ReferenceDistribution};
use crate::solvers::LinearModel;
use faer::Mat;
use tracing::debug;

/// Finite-difference step as a fraction of the predictor's range.
const SLOPE_STEP: f64 = 1e-4;

/// Which derivative to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlopeKind {
    /// ∂y/∂x
    #[default]
    DyDx,
    /// (∂y/∂x) · x / y
    EyEx,
    /// (∂y/∂x) / y
    EyDx,
    /// (∂y/∂x) · x
    DyEx,
}

impl SlopeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::DyDx => "dY/dX",
            Self::EyEx => "eY/eX",
            Self::EyDx => "eY/dX",
            Self::DyEx => "dY/eX",
        }
    }

    fn apply(self, dydx: f64, x: f64, y: f64) -> f64 {
        match self {
            Self::DyDx => dydx,
            Self::EyEx => dydx * x / y,
            Self::EyDx => dydx / y,
            Self::DyEx => dydx * x,
        }
    }
}

/// Derivative design for one variable: rows of (X(x+h) − X(x−h)) / 2h.
struct Derivative {
    term: String,
    x: Vec<f64>,
    design: Mat<f64>,
}

/// Slopes of the prediction with respect to each requested variable, one row
/// per (variable × grid row), sorted by variable name.
///
/// Derivatives use central differences with a step of `1e-4` times the
/// variable's range in the training data.
pub fn slopes(model: &LinearModel, options: &SlopeOptions) -> Result<EffectsTable, EffectsError> {
    options.inference.validate()?;
    let (grid, context) = evaluation_grid(model, options.newdata.as_ref())?;

    let requested: Vec<(String, ())> = options.variables.iter().map(|v| (v.clone(), ())).collect();
    let variables = sorted_variables(model, &requested, ())?;

    let x0 = model.design_matrix(&grid)?;
    let mut derivatives = Vec::with_capacity(variables.len());
    for (name, ()) in &variables {
        let range = model.data().max(name)? - model.data().min(name)?;
        let h = if range > 0.0 {
            SLOPE_STEP * range
        } else {
            SLOPE_STEP
        };

        let x = grid.column(name)?.to_vec();
        let up = grid.with_column(name, x.iter().map(|v| v + h).collect())?;
        let down = grid.with_column(name, x.iter().map(|v| v - h).collect())?;
        let x_up = model.design_matrix(&up)?;
        let x_down = model.design_matrix(&down)?;
        let design = Mat::from_fn(x0.nrows(), x0.ncols(), |i, j| {
            (x_up[(i, j)] - x_down[(i, j)]) / (2.0 * h)
        });

        derivatives.push(Derivative {
            term: name.clone(),
            x,
            design,
        });
    }

    let kind = options.slope;
    let n = grid.n_rows();
    let keys = derivatives
        .iter()
        .flat_map(|d| {
            (0..n).map(move |i| RowKey {
                row_id: Some(i),
                term: Some(d.term.clone()),
                contrast: Some(kind.label().to_string()),
                ..RowKey::default()
            })
        })
        .collect();

    let delta = DeltaMethod::evaluate(model.coefficients(), |beta| {
        let y = linear_predictor(&x0, beta);
        let mut out = Vec::with_capacity(derivatives.len() * n);
        for d in &derivatives {
            let dydx = linear_predictor(&d.design, beta);
            out.extend((0..n).map(|i| kind.apply(dydx[i], d.x[i], y[i])));
        }
        Ok::<_, EffectsError>(out)
    })?;

    debug!(
        n_terms = derivatives.len(),
        n_rows = n,
        slope = kind.label(),
        "computed slopes"
    );

    let table = EffectsTable::assemble(
        Estimand::Slope,
        keys,
        delta,
        model.vcov(),
        ReferenceDistribution::from_df(options.inference.df),
        options.inference.conf_level,
    )
    .with_grid(grid, context);
    finish(table, &options.inference)
}

/// Average slopes: like [`slopes`] with `by` defaulting to [`By::All`].
pub fn avg_slopes(model: &LinearModel, options: &SlopeOptions) -> Result<EffectsTable, EffectsError> {
    let mut options = options.clone();
    if options.inference.by == By::None {
        options.inference.by = By::All;
    }
    slopes(model, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_slopes_row_count() {
        let model = LinearModel::fit("mpg ~ hp * wt * am", &mtcars()).unwrap();
        let s = slopes(&model, &SlopeOptions::default()).unwrap();
        assert_eq!(s.len(), 96);
        assert_eq!(s.rows()[0].key.contrast.as_deref(), Some("dY/dX"));
    }

    #[test]
    fn test_additive_slopes_equal_coefficients() {
        let model = LinearModel::fit("mpg ~ hp + wt", &mtcars()).unwrap();
        let s = avg_slopes(&model, &SlopeOptions::default()).unwrap();
        assert_eq!(s.len(), 2);
        assert_relative_eq!(s.rows()[0].estimate, model.coefficients()[1], epsilon = 1e-8);
        assert_relative_eq!(s.rows()[1].estimate, model.coefficients()[2], epsilon = 1e-8);
        assert_relative_eq!(s.rows()[1].std_error, 0.63273, epsilon = 1e-4);
    }

    #[test]
    fn test_interaction_slope_at_a_row() {
        // d mpg / d hp = b_hp + b_hp:wt * wt
        let data = mtcars();
        let model = LinearModel::fit("mpg ~ hp * wt", &data).unwrap();
        let opts = SlopeOptions::builder().variable("hp").build().unwrap();
        let s = slopes(&model, &opts).unwrap();
        let b = model.coefficients();
        let wt = data.column("wt").unwrap();
        for (i, row) in s.rows().iter().enumerate() {
            assert_relative_eq!(row.estimate, b[1] + b[3] * wt[i], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_elasticity() {
        let data = mtcars();
        let model = LinearModel::fit("mpg ~ hp + wt", &data).unwrap();
        let opts = SlopeOptions::builder()
            .variable("wt")
            .slope(SlopeKind::EyEx)
            .build()
            .unwrap();
        let s = slopes(&model, &opts).unwrap();
        let fitted = model.predict(&data).unwrap();
        let wt = data.column("wt").unwrap();
        assert_relative_eq!(
            s.rows()[3].estimate,
            model.coefficients()[2] * wt[3] / fitted[3],
            epsilon = 1e-8
        );
        assert_eq!(s.rows()[3].key.contrast.as_deref(), Some("eY/eX"));
    }
}
