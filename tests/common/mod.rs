//! Common test fixtures.
#![allow(dead_code)]

use margins_rs::{mtcars, Dataset, EffectsTable, LinearModel};

/// `mpg ~ hp * wt * am` on mtcars: eight coefficients.
pub fn interaction_model() -> LinearModel {
    LinearModel::fit("mpg ~ hp * wt * am", &mtcars()).expect("interaction model should fit")
}

/// `mpg ~ hp + wt` on mtcars: three coefficients.
pub fn additive_model() -> LinearModel {
    LinearModel::fit("mpg ~ hp + wt", &mtcars()).expect("additive model should fit")
}

/// Coefficients of R's `lm(mpg ~ hp + wt, data = mtcars)`.
pub const ADDITIVE_COEFFICIENTS: [f64; 3] = [37.22727012, -0.03177295, -3.87783074];

/// Standard errors of the same fit.
pub const ADDITIVE_STD_ERRORS: [f64; 3] = [1.59878754, 0.00902971, 0.63273349];

/// Small dataset with a known exact fit: y = 1 + 2 x1 - x2.
pub fn exact_data() -> Dataset {
    let x1: Vec<f64> = (0..8).map(|i| i as f64).collect();
    let x2: Vec<f64> = (0..8).map(|i| ((i * i) % 5) as f64).collect();
    let y = x1.iter().zip(&x2).map(|(a, b)| 1.0 + 2.0 * a - b).collect();
    Dataset::new(vec![("y", y), ("x1", x1), ("x2", x2)]).expect("valid dataset")
}

/// Terms of a table in row order.
pub fn terms(table: &EffectsTable) -> Vec<String> {
    table
        .rows()
        .iter()
        .map(|r| r.key.term.clone().unwrap_or_default())
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
