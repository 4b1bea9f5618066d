//! Typical and counterfactual evaluation grids.

use crate::data::{DataError, Dataset};
use crate::solvers::LinearModel;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when building a grid.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("column '{0}' is not in the model data")]
    UnknownColumn(String),

    #[error("override for '{0}' produces no values")]
    EmptyValues(String),

    #[error("range for '{name}' needs at least one point, got n = 0")]
    EmptyRange { name: String },

    #[error("column '{0}' is set more than once")]
    DuplicateOverride(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Named summaries of a training column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Summary {
    Mean,
    Median,
    Min,
    Max,
    /// Minimum and maximum.
    MinMax,
    /// mean − sd, mean, mean + sd.
    ThreeNum,
    /// Tukey's five-number summary.
    FiveNum,
    /// First quartile, median, third quartile.
    Quartiles,
    /// Every distinct value, ascending.
    Unique,
}

/// Values a grid column takes.
#[derive(Debug, Clone, PartialEq)]
pub enum GridValue {
    Values(Vec<f64>),
    /// `n` evenly spaced points from `from` to `to` inclusive.
    Range { from: f64, to: f64, n: usize },
    Summary(Summary),
}

impl GridValue {
    /// Resolve against a training column.
    pub fn resolve(&self, name: &str, data: &Dataset) -> Result<Vec<f64>, GridError> {
        let values = match self {
            Self::Values(values) => values.clone(),
            Self::Range { from, to, n } => match *n {
                0 => {
                    return Err(GridError::EmptyRange {
                        name: name.to_string(),
                    })
                }
                1 => vec![*from],
                n => {
                    let step = (to - from) / (n - 1) as f64;
                    (0..n).map(|i| from + step * i as f64).collect()
                }
            },
            Self::Summary(summary) => match summary {
                Summary::Mean => vec![data.mean(name)?],
                Summary::Median => vec![data.median(name)?],
                Summary::Min => vec![data.min(name)?],
                Summary::Max => vec![data.max(name)?],
                Summary::MinMax => vec![data.min(name)?, data.max(name)?],
                Summary::ThreeNum => {
                    let (m, s) = (data.mean(name)?, data.std_dev(name)?);
                    vec![m - s, m, m + s]
                }
                Summary::FiveNum => data.fivenum(name)?.to_vec(),
                Summary::Quartiles => vec![
                    data.quantile(name, 0.25)?,
                    data.median(name)?,
                    data.quantile(name, 0.75)?,
                ],
                Summary::Unique => data.unique_sorted(name)?,
            },
        };
        if values.is_empty() {
            return Err(GridError::EmptyValues(name.to_string()));
        }
        Ok(values)
    }
}

/// Builder for an evaluation grid around a fitted model.
#[derive(Debug, Clone)]
pub struct DataGrid<'a> {
    model: &'a LinearModel,
    overrides: Vec<(String, GridValue)>,
    counterfactual: bool,
}

/// Start a grid over the response and predictors of `model`.
pub fn datagrid(model: &LinearModel) -> DataGrid<'_> {
    DataGrid {
        model,
        overrides: Vec::new(),
        counterfactual: false,
    }
}

impl<'a> DataGrid<'a> {
    /// Vary `name` over `value`. Earlier overrides vary slowest.
    pub fn set(mut self, name: impl Into<String>, value: GridValue) -> Self {
        self.overrides.push((name.into(), value));
        self
    }

    /// Replicate the full training data for every combination of overrides
    /// instead of filling the other columns with typical values.
    pub fn counterfactual(mut self) -> Self {
        self.counterfactual = true;
        self
    }

    /// Build the grid.
    ///
    /// Typical grids have one row per combination of override values, with
    /// every other model column at its training mean, or its mode when the
    /// column is a 0/1 indicator. Counterfactual grids
    /// have `n_combinations × n_training_rows` rows.
    pub fn build(self) -> Result<Dataset, GridError> {
        let data = self.model.data();

        let mut resolved: Vec<(String, Vec<f64>)> = Vec::with_capacity(self.overrides.len());
        for (name, value) in &self.overrides {
            if !data.has_column(name) {
                return Err(GridError::UnknownColumn(name.clone()));
            }
            if resolved.iter().any(|(n, _)| n == name) {
                return Err(GridError::DuplicateOverride(name.clone()));
            }
            resolved.push((name.clone(), value.resolve(name, data)?));
        }
        let combinations = cartesian(&resolved);

        let grid = if self.counterfactual {
            counterfactual_grid(data, &resolved, &combinations)?
        } else {
            typical_grid(self.model, &resolved, &combinations)?
        };

        debug!(
            n_rows = grid.n_rows(),
            n_overrides = resolved.len(),
            counterfactual = self.counterfactual,
            "built grid"
        );
        Ok(grid)
    }
}

/// All combinations of override values, first column varying slowest.
fn cartesian(resolved: &[(String, Vec<f64>)]) -> Vec<Vec<f64>> {
    resolved.iter().fold(vec![Vec::new()], |acc, (_, values)| {
        acc.iter()
            .flat_map(|prefix| {
                values.iter().map(move |&v| {
                    let mut row = prefix.clone();
                    row.push(v);
                    row
                })
            })
            .collect()
    })
}

fn typical_grid(
    model: &LinearModel,
    resolved: &[(String, Vec<f64>)],
    combinations: &[Vec<f64>],
) -> Result<Dataset, GridError> {
    let data = model.data();
    let mut names = vec![model.response().to_string()];
    names.extend(model.variables());
    for (name, _) in resolved {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let values = match resolved.iter().position(|(n, _)| *n == name) {
            Some(k) => combinations.iter().map(|row| row[k]).collect(),
            None => vec![fill_value(data, &name)?; combinations.len()],
        };
        columns.push((name, values));
    }
    Ok(Dataset::new(columns)?)
}

/// Mode for 0/1 indicators, mean otherwise.
fn fill_value(data: &Dataset, name: &str) -> Result<f64, DataError> {
    if data.is_binary(name)? {
        data.mode(name)
    } else {
        data.mean(name)
    }
}

fn counterfactual_grid(
    data: &Dataset,
    resolved: &[(String, Vec<f64>)],
    combinations: &[Vec<f64>],
) -> Result<Dataset, GridError> {
    let mut parts = Vec::with_capacity(combinations.len());
    for combination in combinations {
        let mut part = data.clone();
        for ((name, _), &value) in resolved.iter().zip(combination) {
            part = part.with_constant(name, value)?;
        }
        parts.push(part);
    }
    Ok(Dataset::concat(&parts)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::mtcars;
    use approx::assert_relative_eq;

    fn model() -> LinearModel {
        LinearModel::fit("mpg ~ hp * wt * am", &mtcars()).unwrap()
    }

    #[test]
    fn test_typical_grid_fills_typical_values() {
        let m = model();
        let grid = datagrid(&m)
            .set("hp", GridValue::Values(vec![100.0, 200.0]))
            .build()
            .unwrap();

        assert_eq!(grid.n_rows(), 2);
        assert_eq!(grid.column_names(), ["mpg", "hp", "wt", "am"]);
        assert_eq!(grid.column("hp").unwrap(), [100.0, 200.0]);
        assert_relative_eq!(grid.value("wt", 1).unwrap(), 3.21725, epsilon = 1e-10);
        assert_relative_eq!(grid.value("mpg", 0).unwrap(), 20.090625, epsilon = 1e-10);
        assert_eq!(grid.column("am").unwrap(), [0.0, 0.0]);
    }

    #[test]
    fn test_unset_indicator_takes_mode() {
        let data = mtcars()
            .with_column("am", {
                let mut am = vec![1.0; 32];
                am[0] = 0.0;
                am
            })
            .unwrap();
        let m = LinearModel::fit("mpg ~ hp + am", &data).unwrap();
        let grid = datagrid(&m)
            .set("hp", GridValue::Values(vec![100.0]))
            .build()
            .unwrap();
        assert_eq!(grid.value("am", 0).unwrap(), 1.0);

        let set = datagrid(&m)
            .set("am", GridValue::Values(vec![0.5]))
            .build()
            .unwrap();
        assert_eq!(set.value("am", 0).unwrap(), 0.5);
    }

    #[test]
    fn test_first_override_varies_slowest() {
        let m = model();
        let grid = datagrid(&m)
            .set("am", GridValue::Summary(Summary::Unique))
            .set("hp", GridValue::Range { from: 100.0, to: 300.0, n: 3 })
            .build()
            .unwrap();

        assert_eq!(grid.n_rows(), 6);
        assert_eq!(grid.column("am").unwrap(), [0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        assert_eq!(grid.column("hp").unwrap(), [100.0, 200.0, 300.0, 100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_threenum() {
        let m = model();
        let values = GridValue::Summary(Summary::ThreeNum)
            .resolve("wt", m.data())
            .unwrap();
        assert_relative_eq!(values[0], 3.21725 - 0.9784574, epsilon = 1e-6);
        assert_relative_eq!(values[2], 3.21725 + 0.9784574, epsilon = 1e-6);
    }

    #[test]
    fn test_counterfactual_replicates_data() {
        let m = model();
        let grid = datagrid(&m)
            .set("am", GridValue::Values(vec![0.0, 1.0]))
            .counterfactual()
            .build()
            .unwrap();

        assert_eq!(grid.n_rows(), 64);
        assert_eq!(grid.value("am", 31).unwrap(), 0.0);
        assert_eq!(grid.value("am", 32).unwrap(), 1.0);
        assert_eq!(grid.value("hp", 32).unwrap(), grid.value("hp", 0).unwrap());
    }

    #[test]
    fn test_errors() {
        let m = model();
        assert_eq!(
            datagrid(&m)
                .set("torque", GridValue::Values(vec![1.0]))
                .build()
                .unwrap_err(),
            GridError::UnknownColumn("torque".into())
        );
        assert_eq!(
            datagrid(&m)
                .set("hp", GridValue::Values(Vec::new()))
                .build()
                .unwrap_err(),
            GridError::EmptyValues("hp".into())
        );
        assert!(matches!(
            datagrid(&m)
                .set("hp", GridValue::Range { from: 0.0, to: 1.0, n: 0 })
                .build(),
            Err(GridError::EmptyRange { .. })
        ));
    }
}
