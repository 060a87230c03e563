//! Dense complex matrix primitives
//!
//! Small (q × q) operations used per frequency bin by the factorization:
//! inversion with a conditioning guard, Cholesky decomposition of Hermitian
//! positive-definite matrices, products and conjugate transposes.
//!
//! Matrices are `nalgebra::DMatrix<Complex64>`; q is expected to be small
//! (a handful of channels), so nothing here is blocked or cached.

use nalgebra::{DMatrix, SVD};
use num_complex::Complex64;

use crate::error::{Result, WilsonError};

/// Complex matrix type used throughout the crate.
pub type CMatrix = DMatrix<Complex64>;

const SVD_MAX_ITERATIONS: usize = 1000;

/// q × q identity
pub fn identity(q: usize) -> CMatrix {
    CMatrix::identity(q, q)
}

/// Conjugate transpose Aᴴ
#[inline]
pub fn conj_transpose(a: &CMatrix) -> CMatrix {
    a.adjoint()
}

/// Matrix product A · B
pub fn multiply(a: &CMatrix, b: &CMatrix) -> Result<CMatrix> {
    if a.ncols() != b.nrows() {
        return Err(WilsonError::DimensionMismatch {
            lhs: a.shape(),
            rhs: b.shape(),
        });
    }
    Ok(a * b)
}

/// Ratio of largest to smallest singular value.
///
/// Returns infinity for matrices with a zero singular value, non-finite
/// entries, or when the SVD fails to converge.
pub fn condition_number(m: &CMatrix) -> f64 {
    if m.iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return f64::INFINITY;
    }

    let svd = match SVD::try_new(m.clone(), false, false, f64::EPSILON, SVD_MAX_ITERATIONS) {
        Some(svd) => svd,
        None => return f64::INFINITY,
    };

    let max = svd.singular_values.max();
    let min = svd.singular_values.min();
    if min > 0.0 {
        max / min
    } else {
        f64::INFINITY
    }
}

/// Invert a square matrix.
///
/// # Arguments
/// * `m` - Square matrix
/// * `condition_limit` - Largest accepted condition number
///
/// # Errors
/// `SingularMatrix` if the condition number exceeds `condition_limit` or the
/// LU step reports exact singularity. The error carries no bin; callers tag it
/// with [`WilsonError::at_bin`].
pub fn invert(m: &CMatrix, condition_limit: f64) -> Result<CMatrix> {
    if !m.is_square() {
        return Err(WilsonError::DimensionMismatch {
            lhs: m.shape(),
            rhs: (m.ncols(), m.nrows()),
        });
    }

    let condition = condition_number(m);
    if !(condition <= condition_limit) {
        return Err(WilsonError::SingularMatrix {
            bin: None,
            condition,
        });
    }

    m.clone()
        .try_inverse()
        .ok_or(WilsonError::SingularMatrix {
            bin: None,
            condition: f64::INFINITY,
        })
}

/// Largest entry-wise deviation from Hermitian symmetry, |M - Mᴴ|_max.
pub fn hermitian_deviation(m: &CMatrix) -> f64 {
    let q = m.nrows();
    let mut worst = 0.0f64;
    for i in 0..q {
        for j in i..q {
            worst = worst.max((m[(i, j)] - m[(j, i)].conj()).norm());
        }
    }
    worst
}

/// Check Hermitian symmetry relative to the largest entry magnitude.
pub fn is_hermitian(m: &CMatrix, tolerance: f64) -> bool {
    if !m.is_square() {
        return false;
    }
    let scale = m.iter().map(|z| z.norm()).fold(0.0f64, f64::max);
    hermitian_deviation(m) <= tolerance * scale
}

/// Cholesky decomposition of a Hermitian positive-definite matrix.
///
/// Returns lower-triangular `L` with real positive diagonal such that
/// `L · Lᴴ == M`. Only the lower triangle of `M` is read after the symmetry
/// check.
///
/// # Errors
/// `NotPositiveDefinite` if `M` is not Hermitian within `hermitian_tolerance`
/// or a pivot is not strictly positive (relative to machine precision and the
/// largest diagonal entry).
pub fn cholesky(m: &CMatrix, hermitian_tolerance: f64) -> Result<CMatrix> {
    if !m.is_square() {
        return Err(WilsonError::DimensionMismatch {
            lhs: m.shape(),
            rhs: (m.ncols(), m.nrows()),
        });
    }
    if !is_hermitian(m, hermitian_tolerance) {
        return Err(WilsonError::not_positive_definite(format!(
            "matrix is not Hermitian (deviation {:.3e})",
            hermitian_deviation(m)
        )));
    }

    let q = m.nrows();
    let diag_scale = (0..q).map(|i| m[(i, i)].re.abs()).fold(0.0f64, f64::max);
    let pivot_floor = f64::EPSILON * diag_scale * q as f64;

    let mut l = CMatrix::zeros(q, q);
    for j in 0..q {
        let mut pivot = m[(j, j)].re;
        for k in 0..j {
            pivot -= l[(j, k)].norm_sqr();
        }
        // Also rejects NaN
        if !(pivot > pivot_floor) {
            return Err(WilsonError::not_positive_definite(format!(
                "non-positive pivot {:.3e} at row {}",
                pivot, j
            )));
        }

        let d = pivot.sqrt();
        l[(j, j)] = Complex64::new(d, 0.0);
        for i in (j + 1)..q {
            let mut s = m[(i, j)];
            for k in 0..j {
                s -= l[(i, k)] * l[(j, k)].conj();
            }
            l[(i, j)] = s / d;
        }
    }

    Ok(l)
}

/// Entry-wise mean of a non-empty slice of equally sized matrices
pub fn mean(matrices: &[CMatrix]) -> Result<CMatrix> {
    let first = matrices
        .first()
        .ok_or_else(|| WilsonError::invalid_input("cannot average an empty sequence"))?;

    let mut sum = CMatrix::zeros(first.nrows(), first.ncols());
    for m in matrices {
        if m.shape() != sum.shape() {
            return Err(WilsonError::DimensionMismatch {
                lhs: sum.shape(),
                rhs: m.shape(),
            });
        }
        sum += m;
    }
    Ok(sum / Complex64::new(matrices.len() as f64, 0.0))
}

/// Largest entry-wise magnitude of A - B
pub fn max_abs_diff(a: &CMatrix, b: &CMatrix) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0f64, f64::max)
}
