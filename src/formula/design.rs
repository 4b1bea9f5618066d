//! Design matrix construction.

use super::{Formula, FormulaError};
use crate::data::Dataset;
use faer::Mat;

/// Build the design matrix for `formula` over `data`, without the intercept
/// column (solvers add it themselves).
///
/// Column `j` is the product of the variables of term `j` for each row.
pub fn design_matrix(formula: &Formula, data: &Dataset) -> Result<Mat<f64>, FormulaError> {
    let terms = formula.terms();
    let mut columns: Vec<Vec<&[f64]>> = Vec::with_capacity(terms.len());

    for term in terms {
        let mut factors = Vec::with_capacity(term.order());
        for variable in term.variables() {
            let values = data
                .column(variable)
                .map_err(|_| FormulaError::UnknownColumn(variable.clone()))?;
            factors.push(values);
        }
        columns.push(factors);
    }

    Ok(Mat::from_fn(data.n_rows(), terms.len(), |i, j| {
        columns[j].iter().map(|values| values[i]).product::<f64>()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_columns() {
        let data = Dataset::new(vec![
            ("y", vec![1.0, 2.0, 3.0]),
            ("a", vec![1.0, 2.0, 3.0]),
            ("b", vec![4.0, 5.0, 6.0]),
        ])
        .unwrap();
        let f = Formula::parse("y ~ a * b").unwrap();
        let x = design_matrix(&f, &data).unwrap();

        assert_eq!(x.ncols(), 3);
        assert_eq!(x[(1, 0)], 2.0);
        assert_eq!(x[(1, 1)], 5.0);
        assert_eq!(x[(2, 2)], 18.0);
    }

    #[test]
    fn test_unknown_column() {
        let data = Dataset::new(vec![("y", vec![1.0]), ("a", vec![1.0])]).unwrap();
        let f = Formula::parse("y ~ a + z").unwrap();
        assert_eq!(
            design_matrix(&f, &data).unwrap_err(),
            FormulaError::UnknownColumn("z".into())
        );
    }
}
