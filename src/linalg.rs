//! Small dense linear algebra over row-major `Vec<f64>` matrices.
//!
//! Everything here works on square `d x d` matrices stored row-major
//! (`a[i * d + j]`), which is all the estimator needs: the per-arm design
//! matrices are symmetric positive-definite by construction, so a Cholesky
//! factorization is both the cheapest and the most stable way to solve
//! against them.
//!
//! The quadratic form `x^T A^{-1} x` is computed as `||L^{-1} x||^2` from the
//! factor, which is non-negative by construction (no cancellation can push it
//! below zero the way `dot(x, A^{-1} x)` can).

/// Relative pivot tolerance: a pivot below `PIVOT_TOL * max|diag|` counts as
/// a loss of definiteness.
const PIVOT_TOL: f64 = 1e-12;

/// Diagonal jitter (relative to the mean diagonal) used for the single retry
/// in [`Cholesky::factor_jittered`].
const JITTER_REL: f64 = 1e-9;

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    let mut s = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        s += x * y;
    }
    s
}

/// `d x d` identity, row-major.
pub(crate) fn identity(dim: usize) -> Vec<f64> {
    let mut a = vec![0.0; dim * dim];
    for i in 0..dim {
        a[i * dim + i] = 1.0;
    }
    a
}

/// `a <- a + x x^T`.
pub(crate) fn add_outer(a: &mut [f64], dim: usize, x: &[f64]) {
    for i in 0..dim {
        for j in 0..dim {
            a[i * dim + j] += x[i] * x[j];
        }
    }
}

/// Max absolute asymmetry `|a_ij - a_ji|`.
pub(crate) fn asymmetry(a: &[f64], dim: usize) -> f64 {
    let mut worst = 0.0f64;
    for i in 0..dim {
        for j in (i + 1)..dim {
            worst = worst.max((a[i * dim + j] - a[j * dim + i]).abs());
        }
    }
    worst
}

/// Lower-triangular Cholesky factor `L` with `A = L L^T`.
#[derive(Debug, Clone)]
pub(crate) struct Cholesky {
    l: Vec<f64>,
    dim: usize,
}

impl Cholesky {
    /// Factor a symmetric positive-definite matrix.
    ///
    /// Returns `None` if a pivot is non-positive (relative to the diagonal
    /// scale) or anything non-finite shows up.
    pub(crate) fn factor(a: &[f64], dim: usize) -> Option<Self> {
        if a.len() != dim * dim || !a.iter().all(|v| v.is_finite()) {
            return None;
        }
        let scale = (0..dim)
            .map(|i| a[i * dim + i].abs())
            .fold(0.0f64, f64::max)
            .max(f64::MIN_POSITIVE);

        let mut l = vec![0.0; dim * dim];
        for j in 0..dim {
            let mut diag = a[j * dim + j];
            for k in 0..j {
                diag -= l[j * dim + k] * l[j * dim + k];
            }
            if !diag.is_finite() || diag <= PIVOT_TOL * scale {
                return None;
            }
            let ljj = diag.sqrt();
            l[j * dim + j] = ljj;
            for i in (j + 1)..dim {
                let mut s = a[i * dim + j];
                for k in 0..j {
                    s -= l[i * dim + k] * l[j * dim + k];
                }
                l[i * dim + j] = s / ljj;
            }
        }
        Some(Self { l, dim })
    }

    /// Factor, retrying once with a small diagonal jitter.
    ///
    /// The boolean is `true` when the jittered retry was needed.
    pub(crate) fn factor_jittered(a: &[f64], dim: usize) -> Option<(Self, bool)> {
        if let Some(f) = Self::factor(a, dim) {
            return Some((f, false));
        }
        let mean_diag = (0..dim).map(|i| a[i * dim + i].abs()).sum::<f64>() / (dim.max(1) as f64);
        let eps = JITTER_REL * mean_diag.max(1.0);
        let mut jittered = a.to_vec();
        for i in 0..dim {
            jittered[i * dim + i] += eps;
        }
        Self::factor(&jittered, dim).map(|f| (f, true))
    }

    /// Solve `L y = b`.
    fn forward(&self, b: &[f64]) -> Vec<f64> {
        let d = self.dim;
        let mut y = vec![0.0; d];
        for i in 0..d {
            let mut s = b[i];
            for k in 0..i {
                s -= self.l[i * d + k] * y[k];
            }
            y[i] = s / self.l[i * d + i];
        }
        y
    }

    /// Solve `L^T x = y`.
    fn backward(&self, y: &[f64]) -> Vec<f64> {
        let d = self.dim;
        let mut x = vec![0.0; d];
        for i in (0..d).rev() {
            let mut s = y[i];
            for k in (i + 1)..d {
                s -= self.l[k * d + i] * x[k];
            }
            x[i] = s / self.l[i * d + i];
        }
        x
    }

    /// Solve `A x = b`.
    pub(crate) fn solve(&self, b: &[f64]) -> Vec<f64> {
        self.backward(&self.forward(b))
    }

    /// `x^T A^{-1} x`, computed as `||L^{-1} x||^2` (never negative).
    pub(crate) fn inv_quad_form(&self, x: &[f64]) -> f64 {
        let y = self.forward(x);
        dot(&y, &y)
    }

    /// Explicit `A^{-1}` (row-major). Only used for diagnostics.
    pub(crate) fn inverse(&self) -> Vec<f64> {
        let d = self.dim;
        let mut inv = vec![0.0; d * d];
        let mut e = vec![0.0; d];
        for j in 0..d {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[j] = 1.0;
            let col = self.solve(&e);
            for i in 0..d {
                inv[i * d + j] = col[i];
            }
        }
        inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mat_vec(a: &[f64], dim: usize, x: &[f64]) -> Vec<f64> {
        (0..dim).map(|i| dot(&a[i * dim..(i + 1) * dim], x)).collect()
    }

    #[test]
    fn identity_factors_to_identity() {
        let a = identity(3);
        let f = Cholesky::factor(&a, 3).unwrap();
        assert_eq!(f.l, identity(3));
        assert_eq!(f.solve(&[1.0, -2.0, 3.0]), vec![1.0, -2.0, 3.0]);
        assert!((f.inv_quad_form(&[3.0, 4.0, 0.0]) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn solves_small_spd_system() {
        // A = [[4, 2], [2, 3]], b = [2, 1] => x = [0.5, 0.0]
        let a = vec![4.0, 2.0, 2.0, 3.0];
        let f = Cholesky::factor(&a, 2).unwrap();
        let x = f.solve(&[2.0, 1.0]);
        assert!((x[0] - 0.5).abs() < 1e-12, "{x:?}");
        assert!(x[1].abs() < 1e-12, "{x:?}");

        let inv = f.inverse();
        // A^{-1} = 1/8 * [[3, -2], [-2, 4]]
        let want = [0.375, -0.25, -0.25, 0.5];
        for (g, w) in inv.iter().zip(want.iter()) {
            assert!((g - w).abs() < 1e-12, "{inv:?}");
        }
    }

    #[test]
    fn rejects_indefinite_and_singular() {
        // Eigenvalues 3 and -1.
        assert!(Cholesky::factor(&[1.0, 2.0, 2.0, 1.0], 2).is_none());
        // Rank 1.
        assert!(Cholesky::factor(&[1.0, 1.0, 1.0, 1.0], 2).is_none());
        assert!(Cholesky::factor(&[f64::NAN, 0.0, 0.0, 1.0], 2).is_none());
        assert!(Cholesky::factor(&[1.0, 0.0, 0.0], 2).is_none());
    }

    #[test]
    fn jitter_rescues_semidefinite_matrix() {
        let (f, jittered) = Cholesky::factor_jittered(&[1.0, 1.0, 1.0, 1.0], 2).unwrap();
        assert!(jittered);
        assert!(f.inv_quad_form(&[1.0, -1.0]).is_finite());

        let (_, jittered) = Cholesky::factor_jittered(&identity(2), 2).unwrap();
        assert!(!jittered);
    }

    #[test]
    fn add_outer_keeps_symmetry() {
        let mut a = identity(3);
        add_outer(&mut a, 3, &[0.3, -1.2, 2.0]);
        assert_eq!(asymmetry(&a, 3), 0.0);
        assert!((a[0] - 1.09).abs() < 1e-12);
        assert!((a[1] + 0.36).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn solve_inverts_ridge_design(
            dim in 1usize..6,
            xs in proptest::collection::vec(
                proptest::collection::vec(-3.0f64..3.0f64, 6),
                0..40
            ),
            b in proptest::collection::vec(-5.0f64..5.0f64, 6),
        ) {
            let mut a = identity(dim);
            for x in &xs {
                add_outer(&mut a, dim, &x[..dim]);
            }
            let f = Cholesky::factor(&a, dim).unwrap();
            let x = f.solve(&b[..dim]);
            let back = mat_vec(&a, dim, &x);
            for (got, want) in back.iter().zip(b[..dim].iter()) {
                prop_assert!((got - want).abs() < 1e-6, "{} vs {}", got, want);
            }

            let q = f.inv_quad_form(&b[..dim]);
            let inv = f.inverse();
            let q2 = dot(&b[..dim], &mat_vec(&inv, dim, &b[..dim]));
            prop_assert!(q >= 0.0);
            prop_assert!((q - q2).abs() < 1e-6 * (1.0 + q.abs()));
        }
    }
}
