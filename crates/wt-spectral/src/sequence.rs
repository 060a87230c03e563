//! Frequency-indexed matrix sequences
//!
//! [`SpectralSequence`] is the validated, read-only input of a factorization:
//! `n` Hermitian PSD `q × q` matrices stored densely as a `q × q × n` array
//! (entry `(i, j)` of bin `k` at `[i, j, k]`).
//!
//! [`FactorSequence`] is the output: one `q × q` factor per bin with
//! `Factor[k] · Factor[k]ᴴ ≈ S[k]`.

use ndarray::{s, Array3, ArrayView1, Axis};
use num_complex::Complex64;

use crate::error::{Result, WilsonError};
use crate::linalg::{conj_transpose, max_abs_diff, CMatrix};

/// Sequence of spectral density matrices indexed by frequency bin.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSequence {
    data: Array3<Complex64>,
}

impl SpectralSequence {
    /// Wrap a `q × q × n` array.
    ///
    /// # Errors
    /// `InvalidInput` if there are no bins, `q` is zero, or the first two
    /// axes differ (non-square matrices).
    pub fn from_array(data: Array3<Complex64>) -> Result<Self> {
        let (rows, cols, n) = data.dim();
        if n == 0 {
            return Err(WilsonError::invalid_input("spectral sequence is empty"));
        }
        if rows == 0 || rows != cols {
            return Err(WilsonError::invalid_input(format!(
                "spectral matrices must be square and non-empty, got {}x{}",
                rows, cols
            )));
        }
        Ok(Self { data })
    }

    /// Build from one matrix per bin.
    ///
    /// # Errors
    /// `InvalidInput` if the slice is empty, a matrix is not square, or the
    /// bins do not all share the same dimension.
    pub fn from_matrices(matrices: &[CMatrix]) -> Result<Self> {
        let first = matrices
            .first()
            .ok_or_else(|| WilsonError::invalid_input("spectral sequence is empty"))?;

        let q = first.nrows();
        if q == 0 {
            return Err(WilsonError::invalid_input(
                "spectral matrices must be non-empty",
            ));
        }
        for (k, m) in matrices.iter().enumerate() {
            if m.shape() != (q, q) {
                return Err(WilsonError::invalid_input(format!(
                    "bin {} has shape {}x{}, expected {}x{}",
                    k,
                    m.nrows(),
                    m.ncols(),
                    q,
                    q
                )));
            }
        }

        let data = Array3::from_shape_fn((q, q, matrices.len()), |(i, j, k)| matrices[k][(i, j)]);
        Ok(Self { data })
    }

    /// Matrix dimension q
    #[inline]
    pub fn dim(&self) -> usize {
        self.data.dim().0
    }

    /// Number of frequency bins n
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.data.dim().2
    }

    /// Spectral matrix of bin `k`.
    ///
    /// # Panics
    /// Panics if `k >= n_bins()`.
    pub fn bin(&self, k: usize) -> CMatrix {
        let q = self.dim();
        CMatrix::from_fn(q, q, |i, j| self.data[[i, j, k]])
    }

    /// All bins as owned matrices
    pub fn to_matrices(&self) -> Vec<CMatrix> {
        (0..self.n_bins()).map(|k| self.bin(k)).collect()
    }

    /// Values of entry `(i, j)` across all bins
    pub fn series(&self, i: usize, j: usize) -> ArrayView1<'_, Complex64> {
        self.data.slice(s![i, j, ..])
    }

    /// Mean spectral matrix over all bins
    pub fn mean(&self) -> CMatrix {
        let q = self.dim();
        let n = self.n_bins() as f64;
        let sum = self.data.sum_axis(Axis(2));
        CMatrix::from_fn(q, q, |i, j| sum[[i, j]] / n)
    }

    /// Underlying `q × q × n` array
    pub fn as_array(&self) -> &Array3<Complex64> {
        &self.data
    }

    pub fn into_array(self) -> Array3<Complex64> {
        self.data
    }
}

/// Per-bin causal factors produced by a factorization run.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSequence {
    factors: Vec<CMatrix>,
}

impl FactorSequence {
    pub(crate) fn new(factors: Vec<CMatrix>) -> Self {
        Self { factors }
    }

    /// Number of frequency bins n
    pub fn n_bins(&self) -> usize {
        self.factors.len()
    }

    /// Matrix dimension q
    pub fn dim(&self) -> usize {
        self.factors.first().map_or(0, |f| f.nrows())
    }

    /// Factor of bin `k`
    pub fn get(&self, k: usize) -> Option<&CMatrix> {
        self.factors.get(k)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CMatrix> {
        self.factors.iter()
    }

    pub fn as_slice(&self) -> &[CMatrix] {
        &self.factors
    }

    pub fn into_inner(self) -> Vec<CMatrix> {
        self.factors
    }

    /// Reconstructed spectra `Factor[k] · Factor[k]ᴴ`
    pub fn reconstruct(&self) -> Vec<CMatrix> {
        self.factors
            .iter()
            .map(|f| f * conj_transpose(f))
            .collect()
    }

    /// Largest entry-wise deviation `|Factor[k] · Factor[k]ᴴ - S[k]|` over all bins.
    ///
    /// Returns infinity if the sequences disagree in length or dimension.
    pub fn reconstruction_error(&self, spectra: &SpectralSequence) -> f64 {
        reconstruction_error(&self.factors, spectra)
    }

    /// Factors as a `q × q × n` array, the layout of [`SpectralSequence`]
    pub fn to_array(&self) -> Array3<Complex64> {
        let q = self.dim();
        Array3::from_shape_fn((q, q, self.n_bins()), |(i, j, k)| self.factors[k][(i, j)])
    }
}

impl std::ops::Index<usize> for FactorSequence {
    type Output = CMatrix;

    fn index(&self, k: usize) -> &CMatrix {
        &self.factors[k]
    }
}

impl<'a> IntoIterator for &'a FactorSequence {
    type Item = &'a CMatrix;
    type IntoIter = std::slice::Iter<'a, CMatrix>;

    fn into_iter(self) -> Self::IntoIter {
        self.factors.iter()
    }
}

pub(crate) fn reconstruction_error(factors: &[CMatrix], spectra: &SpectralSequence) -> f64 {
    let q = spectra.dim();
    if factors.len() != spectra.n_bins() || factors.iter().any(|f| f.shape() != (q, q)) {
        return f64::INFINITY;
    }

    factors
        .iter()
        .enumerate()
        .map(|(k, f)| max_abs_diff(&(f * conj_transpose(f)), &spectra.bin(k)))
        .fold(0.0f64, f64::max)
}
