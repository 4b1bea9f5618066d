//! Small dense-matrix helpers shared by the solvers and the effects engine.

use faer::{Col, Mat};

/// Indices of columns whose values never move by more than `tolerance`.
///
/// An empty matrix has no variation, so every column is reported.
pub fn constant_columns(x: &Mat<f64>, tolerance: f64) -> Vec<usize> {
    (0..x.ncols())
        .filter(|&j| {
            let (lo, hi) = (0..x.nrows()).fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), i| {
                (lo.min(x[(i, j)]), hi.max(x[(i, j)]))
            });
            x.nrows() == 0 || hi - lo < tolerance
        })
        .collect()
}

/// Subtract column means; returns the centred matrix and the means.
pub fn center_columns(x: &Mat<f64>) -> (Mat<f64>, Col<f64>) {
    let n = x.nrows().max(1) as f64;
    let means = Col::from_fn(x.ncols(), |j| (0..x.nrows()).map(|i| x[(i, j)]).sum::<f64>() / n);
    let centered = Mat::from_fn(x.nrows(), x.ncols(), |i, j| x[(i, j)] - means[j]);
    (centered, means)
}

/// Subtract the mean of a vector.
pub fn center_vector(y: &Col<f64>) -> (Col<f64>, f64) {
    let mean = y.iter().sum::<f64>() / y.nrows().max(1) as f64;
    (Col::from_fn(y.nrows(), |i| y[i] - mean), mean)
}

/// Build a matrix from row-major slices.
pub fn from_rows(rows: &[Vec<f64>]) -> Mat<f64> {
    let ncols = rows.first().map_or(0, Vec::len);
    Mat::from_fn(rows.len(), ncols, |i, j| rows[i][j])
}

/// Copy a matrix row into a `Vec`.
pub fn row_to_vec(x: &Mat<f64>, i: usize) -> Vec<f64> {
    (0..x.ncols()).map(|j| x[(i, j)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_columns() {
        let x = Mat::from_fn(5, 3, |i, j| match j {
            0 => 1.0,
            1 => i as f64,
            _ => 2.0,
        });
        assert_eq!(constant_columns(&x, 1e-10), vec![0, 2]);
    }

    #[test]
    fn test_constant_columns_tolerance() {
        let x = Mat::from_fn(3, 1, |i, _| if i == 1 { 1.000001 } else { 1.0 });
        assert!(constant_columns(&x, 1e-10).is_empty());
        assert_eq!(constant_columns(&x, 1e-5), vec![0]);
    }

    #[test]
    fn test_empty_matrix_columns_are_constant() {
        let x = Mat::<f64>::zeros(0, 3);
        assert_eq!(constant_columns(&x, 1e-10), vec![0, 1, 2]);
    }

    #[test]
    fn test_center_columns() {
        let x = Mat::from_fn(4, 2, |i, j| (i + 1) as f64 * 10f64.powi(j as i32));
        let (centered, means) = center_columns(&x);

        assert!((means[0] - 2.5).abs() < 1e-12);
        assert!((means[1] - 25.0).abs() < 1e-12);
        for j in 0..2 {
            let sum: f64 = (0..4).map(|i| centered[(i, j)]).sum();
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn test_center_vector() {
        let y = Col::from_fn(4, |i| (i + 1) as f64);
        let (centered, mean) = center_vector(&y);
        assert!((mean - 2.5).abs() < 1e-12);
        assert!(centered.iter().sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn test_from_rows_and_back() {
        let m = from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(m.nrows(), 2);
        assert_eq!(row_to_vec(&m, 1), vec![3.0, 4.0]);
    }
}
