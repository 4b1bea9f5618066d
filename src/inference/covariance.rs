//! Coefficient covariance matrices.

use faer::Mat;

/// Build the augmented design matrix [1 | X].
pub fn augment_with_intercept(x: &Mat<f64>) -> Mat<f64> {
    Mat::from_fn(x.nrows(), x.ncols() + 1, |i, j| {
        if j == 0 {
            1.0
        } else {
            x[(i, j - 1)]
        }
    })
}

/// Compute (X'X)⁻¹, augmenting X with an intercept column first if requested.
///
/// Works from the QR factor of X rather than forming X'X, so that
/// (X'X)⁻¹ = R⁻¹ R⁻ᵀ keeps the conditioning of X.
pub fn compute_xtx_inverse(x: &Mat<f64>, with_intercept: bool) -> Result<Mat<f64>, &'static str> {
    let x_aug = if with_intercept {
        augment_with_intercept(x)
    } else {
        x.clone()
    };
    let p = x_aug.ncols();
    if x_aug.nrows() < p {
        return Err("more columns than rows");
    }

    let qr = x_aug.qr();
    let r = Mat::from_fn(p, p, |i, j| qr.R()[(i, j)]);
    let r_inv = invert_upper_triangular(&r)?;

    Ok(Mat::from_fn(p, p, |i, j| {
        (i.max(j)..p).map(|k| r_inv[(i, k)] * r_inv[(j, k)]).sum::<f64>()
    }))
}

/// Classical OLS covariance V = σ² (X'X)⁻¹, intercept first when present.
pub fn ols_covariance(
    x: &Mat<f64>,
    mse: f64,
    with_intercept: bool,
) -> Result<Mat<f64>, &'static str> {
    if !mse.is_finite() {
        return Err("residual variance is not finite");
    }
    let inv = compute_xtx_inverse(x, with_intercept)?;
    Ok(Mat::from_fn(inv.nrows(), inv.ncols(), |i, j| mse * inv[(i, j)]))
}

/// Quadratic form diag(J V J') for a Jacobian J (m × p) and covariance V (p × p).
pub fn sandwich_diagonal(jacobian: &Mat<f64>, covariance: &Mat<f64>) -> Vec<f64> {
    let p = covariance.nrows();
    (0..jacobian.nrows())
        .map(|r| {
            let mut var = 0.0;
            for a in 0..p {
                let ja = jacobian[(r, a)];
                if ja == 0.0 {
                    continue;
                }
                for b in 0..p {
                    var += ja * covariance[(a, b)] * jacobian[(r, b)];
                }
            }
            var
        })
        .collect()
}

/// Inverse of an upper-triangular matrix by back-substitution on each
/// column of the identity.
pub(crate) fn invert_upper_triangular(r: &Mat<f64>) -> Result<Mat<f64>, &'static str> {
    let n = r.nrows();
    let scale = (0..n).map(|i| r[(i, i)].abs()).fold(0.0_f64, f64::max);
    if (0..n).any(|i| r[(i, i)].abs() <= 1e-12 * scale) || (n > 0 && scale == 0.0) {
        return Err("matrix is singular");
    }

    let mut inv = Mat::zeros(n, n);
    for col in 0..n {
        for i in (0..=col).rev() {
            let mut sum = if i == col { 1.0 } else { 0.0 };
            for j in (i + 1)..=col {
                sum -= r[(i, j)] * inv[(j, col)];
            }
            inv[(i, col)] = sum / r[(i, i)];
        }
    }

    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_upper_triangular() {
        // [[2, 1], [0, 4]]⁻¹ = [[0.5, -0.125], [0, 0.25]]
        let r = Mat::from_fn(2, 2, |i, j| match (i, j) {
            (0, 0) => 2.0,
            (0, 1) => 1.0,
            (1, 1) => 4.0,
            _ => 0.0,
        });
        let inv = invert_upper_triangular(&r).unwrap();
        assert!((inv[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((inv[(0, 1)] + 0.125).abs() < 1e-12);
        assert!((inv[(1, 1)] - 0.25).abs() < 1e-12);
        assert_eq!(inv[(1, 0)], 0.0);
    }

    #[test]
    fn test_singular_triangular_rejected() {
        let r = Mat::from_fn(2, 2, |i, j| if i == 1 && j == 1 { 0.0 } else { 1.0 });
        assert!(invert_upper_triangular(&r).is_err());
    }

    #[test]
    fn test_xtx_inverse_simple_regression() {
        // X = [1 | x] with x = 0..4: X'X = [[4, 6], [6, 14]], det = 20
        let x = Mat::from_fn(4, 1, |i, _| i as f64);
        let inv = compute_xtx_inverse(&x, true).unwrap();
        assert!((inv[(0, 0)] - 0.7).abs() < 1e-12);
        assert!((inv[(0, 1)] + 0.3).abs() < 1e-12);
        assert!((inv[(1, 0)] + 0.3).abs() < 1e-12);
        assert!((inv[(1, 1)] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_sandwich_diagonal_identity() {
        let j = Mat::from_fn(1, 2, |_, c| (c + 1) as f64);
        let v = Mat::<f64>::identity(2, 2);
        // [1, 2] I [1, 2]' = 5
        assert_eq!(sandwich_diagonal(&j, &v), vec![5.0]);
    }

    #[test]
    fn test_augment() {
        let x = Mat::from_fn(3, 1, |i, _| i as f64);
        let aug = augment_with_intercept(&x);
        assert_eq!(aug.ncols(), 2);
        assert_eq!(aug[(2, 0)], 1.0);
        assert_eq!(aug[(2, 1)], 2.0);
    }
}
