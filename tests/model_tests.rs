//! Formula-driven OLS fits, validated against R's `lm()`.

mod common;

use approx::assert_relative_eq;
use common::{additive_model, exact_data, interaction_model, ADDITIVE_COEFFICIENTS, ADDITIVE_STD_ERRORS};
use margins_rs::formula::FormulaError;
use margins_rs::solvers::{FittedRegressor, OlsRegressor, RegressionError, Regressor};
use margins_rs::{mtcars, Dataset, LinearModel, ModelError};

// ============================================================================
// Reference values
// ============================================================================

#[test]
fn test_additive_coefficients_match_r() {
    let model = additive_model();
    assert_eq!(model.coefficient_names(), ["(Intercept)", "hp", "wt"]);
    for (got, want) in model.coefficients().iter().zip(ADDITIVE_COEFFICIENTS) {
        assert_relative_eq!(*got, want, epsilon = 1e-6);
    }
}

#[test]
fn test_additive_standard_errors_match_r() {
    let model = additive_model();
    let vcov = model.vcov();
    for (j, want) in ADDITIVE_STD_ERRORS.iter().enumerate() {
        assert_relative_eq!(vcov[(j, j)].sqrt(), *want, epsilon = 1e-6);
    }
    // symmetric
    assert_relative_eq!(vcov[(0, 2)], vcov[(2, 0)], epsilon = 1e-14);
}

#[test]
fn test_additive_fit_statistics_match_r() {
    let model = additive_model();
    let result = model.result();
    assert_relative_eq!(result.r_squared, 0.8267855, epsilon = 1e-6);
    assert_relative_eq!(result.adj_r_squared, 0.8148396, epsilon = 1e-6);
    assert_relative_eq!(result.mse.sqrt(), 2.593412, epsilon = 1e-5);
    assert_eq!(model.residual_df(), 29);
}

#[test]
fn test_interaction_model_layout() {
    let model = interaction_model();
    assert_eq!(
        model.coefficient_names(),
        ["(Intercept)", "hp", "wt", "am", "hp:wt", "hp:am", "wt:am", "hp:wt:am"]
    );
    assert_eq!(model.variables(), ["hp", "wt", "am"]);
    assert_eq!(model.response(), "mpg");
    assert_eq!(model.residual_df(), 24);
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn test_exact_fit_recovers_coefficients() {
    let model = LinearModel::fit("y ~ x1 + x2", &exact_data()).unwrap();
    assert_relative_eq!(model.coefficients()[0], 1.0, epsilon = 1e-10);
    assert_relative_eq!(model.coefficients()[1], 2.0, epsilon = 1e-10);
    assert_relative_eq!(model.coefficients()[2], -1.0, epsilon = 1e-10);
}

#[test]
fn test_predict_on_new_rows() {
    let model = additive_model();
    let new = Dataset::new(vec![("hp", vec![100.0, 200.0]), ("wt", vec![3.0, 3.0])]).unwrap();
    let pred = model.predict(&new).unwrap();
    let b = ADDITIVE_COEFFICIENTS;
    assert_relative_eq!(pred[0], b[0] + 100.0 * b[1] + 3.0 * b[2], epsilon = 1e-5);
    assert_relative_eq!(pred[1] - pred[0], 100.0 * b[1], epsilon = 1e-8);
}

#[test]
fn test_predict_matches_fitted_values() {
    let model = interaction_model();
    let pred = model.predict(model.data()).unwrap();
    let fitted = &model.result().fitted_values;
    for (i, p) in pred.iter().enumerate() {
        assert_relative_eq!(*p, fitted[i], epsilon = 1e-9);
    }
}

#[test]
fn test_no_intercept_formula() {
    let model = LinearModel::fit("mpg ~ wt - 1", &mtcars()).unwrap();
    assert_eq!(model.coefficient_names(), ["wt"]);
    assert_eq!(model.coefficients().len(), 1);

    let leading = LinearModel::fit("mpg ~ -1 + wt", &mtcars()).unwrap();
    assert_relative_eq!(leading.coefficients()[0], model.coefficients()[0], epsilon = 1e-12);
    assert!(matches!(
        LinearModel::fit("mpg ~ -1", &mtcars()),
        Err(ModelError::Formula(FormulaError::EmptyModel))
    ));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_predictor() {
    assert_eq!(
        LinearModel::fit("mpg ~ hp + torque", &mtcars()).unwrap_err(),
        ModelError::Formula(FormulaError::UnknownColumn("torque".into()))
    );
}

#[test]
fn test_singular_design() {
    let data = mtcars();
    let hp: Vec<f64> = data.column("hp").unwrap().iter().map(|v| 2.0 * v).collect();
    let data = data.with_column("hp2", hp).unwrap();
    let err = LinearModel::fit("mpg ~ hp + hp2", &data).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Regression(RegressionError::SingularMatrix { .. })
    ));
}

#[test]
fn test_too_few_observations() {
    let data = Dataset::new(vec![("y", vec![1.0, 2.0]), ("x", vec![0.0, 1.0])]).unwrap();
    assert!(matches!(
        LinearModel::fit("y ~ x", &data),
        Err(ModelError::Regression(RegressionError::InsufficientObservations { .. }))
    ));
}

// ============================================================================
// Matrix-level regressor
// ============================================================================

#[test]
fn test_regressor_on_matrices() {
    let model = additive_model();
    let x = faer::Mat::from_fn(32, 2, |i, j| model.data().value(["hp", "wt"][j], i).unwrap());
    let y = faer::Col::from_fn(32, |i| model.data().value("mpg", i).unwrap());

    let fitted = OlsRegressor::builder().build().fit(&x, &y).unwrap();
    assert_relative_eq!(fitted.intercept().unwrap(), ADDITIVE_COEFFICIENTS[0], epsilon = 1e-6);
    assert_relative_eq!(fitted.coefficients()[1], ADDITIVE_COEFFICIENTS[2], epsilon = 1e-6);
    assert_eq!(fitted.covariance().nrows(), 3);
}
