//! Immutable table of named numeric columns.

use thiserror::Error;

/// Errors that can occur when building or querying a dataset.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("column '{name}' has {got} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("row index {index} out of range for {n_rows} rows")]
    RowOutOfRange { index: usize, n_rows: usize },

    #[error("{got} row names supplied for {n_rows} rows")]
    RowNamesMismatch { n_rows: usize, got: usize },
}

/// A table of numeric observations, one row per unit.
///
/// Columns keep their insertion order. All operations that "modify" a dataset
/// return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    row_names: Option<Vec<String>>,
    n_rows: usize,
}

impl Dataset {
    /// Build a dataset from `(name, values)` pairs.
    pub fn new<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self, DataError> {
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        let mut n_rows = None;

        for (name, column) in columns {
            let name = name.into();
            if names.contains(&name) {
                return Err(DataError::DuplicateColumn(name));
            }
            match n_rows {
                None => n_rows = Some(column.len()),
                Some(expected) if expected != column.len() => {
                    return Err(DataError::RaggedColumn {
                        name,
                        expected,
                        got: column.len(),
                    });
                }
                Some(_) => {}
            }
            names.push(name);
            values.push(column);
        }

        Ok(Self {
            names,
            columns: values,
            row_names: None,
            n_rows: n_rows.unwrap_or(0),
        })
    }

    /// Attach row labels (e.g. car models).
    pub fn with_row_names<S: Into<String>>(mut self, row_names: Vec<S>) -> Result<Self, DataError> {
        if row_names.len() != self.n_rows {
            return Err(DataError::RowNamesMismatch {
                n_rows: self.n_rows,
                got: row_names.len(),
            });
        }
        self.row_names = Some(row_names.into_iter().map(Into::into).collect());
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn row_names(&self) -> Option<&[String]> {
        self.row_names.as_deref()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Values of a column by name.
    pub fn column(&self, name: &str) -> Result<&[f64], DataError> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    /// Single cell lookup.
    pub fn value(&self, name: &str, row: usize) -> Result<f64, DataError> {
        let column = self.column(name)?;
        column.get(row).copied().ok_or(DataError::RowOutOfRange {
            index: row,
            n_rows: self.n_rows,
        })
    }

    /// Return a dataset with `name` replaced (or appended if absent).
    pub fn with_column(&self, name: &str, values: Vec<f64>) -> Result<Self, DataError> {
        if values.len() != self.n_rows && self.n_cols() > 0 {
            return Err(DataError::RaggedColumn {
                name: name.to_string(),
                expected: self.n_rows,
                got: values.len(),
            });
        }
        let mut out = self.clone();
        match out.names.iter().position(|n| n == name) {
            Some(idx) => out.columns[idx] = values,
            None => {
                out.n_rows = values.len();
                out.names.push(name.to_string());
                out.columns.push(values);
            }
        }
        Ok(out)
    }

    /// Return a dataset with every row of `name` set to `value`.
    pub fn with_constant(&self, name: &str, value: f64) -> Result<Self, DataError> {
        self.with_column(name, vec![value; self.n_rows])
    }

    /// Keep only the rows at `indices`, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self, DataError> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(DataError::RowOutOfRange {
                index: bad,
                n_rows: self.n_rows,
            });
        }
        let columns = self
            .columns
            .iter()
            .map(|col| indices.iter().map(|&i| col[i]).collect())
            .collect();
        let row_names = self
            .row_names
            .as_ref()
            .map(|names| indices.iter().map(|&i| names[i].clone()).collect());
        Ok(Self {
            names: self.names.clone(),
            columns,
            row_names,
            n_rows: indices.len(),
        })
    }

    /// Stack datasets with identical column names.
    pub fn concat(parts: &[Dataset]) -> Result<Self, DataError> {
        let Some(first) = parts.first() else {
            return Self::new(Vec::<(String, Vec<f64>)>::new());
        };
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); first.n_cols()];
        for part in parts {
            for (j, name) in first.names.iter().enumerate() {
                columns[j].extend_from_slice(part.column(name)?);
            }
        }
        Self::new(first.names.iter().cloned().zip(columns).collect())
    }

    // ========== Column summaries ==========

    pub fn mean(&self, name: &str) -> Result<f64, DataError> {
        Ok(mean(self.column(name)?))
    }

    pub fn median(&self, name: &str) -> Result<f64, DataError> {
        Ok(quantile(self.column(name)?, 0.5))
    }

    /// Sample standard deviation (n - 1 denominator).
    pub fn std_dev(&self, name: &str) -> Result<f64, DataError> {
        Ok(std_dev(self.column(name)?))
    }

    pub fn quantile(&self, name: &str, p: f64) -> Result<f64, DataError> {
        Ok(quantile(self.column(name)?, p))
    }

    pub fn min(&self, name: &str) -> Result<f64, DataError> {
        Ok(self.column(name)?.iter().copied().fold(f64::INFINITY, f64::min))
    }

    pub fn max(&self, name: &str) -> Result<f64, DataError> {
        Ok(self
            .column(name)?
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max))
    }

    /// Tukey's five-number summary: min, lower hinge, median, upper hinge, max.
    pub fn fivenum(&self, name: &str) -> Result<[f64; 5], DataError> {
        let mut sorted = self.column(name)?.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        if n == 0 {
            return Ok([f64::NAN; 5]);
        }
        let n4 = ((n as f64 + 3.0) / 2.0).floor() / 2.0;
        let depths = [1.0, n4, (n as f64 + 1.0) / 2.0, n as f64 + 1.0 - n4, n as f64];
        let mut out = [0.0; 5];
        for (slot, d) in out.iter_mut().zip(depths) {
            let lo = sorted[(d.floor() as usize).saturating_sub(1)];
            let hi = sorted[(d.ceil() as usize).saturating_sub(1)];
            *slot = 0.5 * (lo + hi);
        }
        Ok(out)
    }

    /// Distinct values, ascending.
    pub fn unique_sorted(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let mut values = self.column(name)?.to_vec();
        values.sort_by(f64::total_cmp);
        values.dedup();
        Ok(values)
    }

    /// Most frequent value; ties go to the smallest.
    pub fn mode(&self, name: &str) -> Result<f64, DataError> {
        let mut sorted = self.column(name)?.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mut best = (f64::NAN, 0usize);
        for run in sorted.chunk_by(|a, b| a == b) {
            if run.len() > best.1 {
                best = (run[0], run.len());
            }
        }
        Ok(best.0)
    }

    /// True when the column only takes the values 0 and 1 (and both occur).
    pub fn is_binary(&self, name: &str) -> Result<bool, DataError> {
        let unique = self.unique_sorted(name)?;
        Ok(unique == [0.0, 1.0])
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|&v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Sample quantile with linear interpolation (R's type 7).
pub(crate) fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}
