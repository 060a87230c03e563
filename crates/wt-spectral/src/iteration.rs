//! One refinement pass of the Wilson recursion
//!
//! # Mathematical Foundation
//!
//! With the current factor estimate ψ_k at every bin, one pass computes
//!
//! ```text
//! g_k  = ψ_k⁻¹ · S_k · ψ_k⁻ᴴ + I          (residual, per bin)
//! g_k ← [g_k]₊                            (causal part, per entry series)
//! C    = -mean_k(g_k), Hermitian-fixed, zero diagonal, / n
//! ψ_k ← ψ_k · (g_k + C)
//! ```
//!
//! At the fixed point ψ_k ψ_kᴴ = S_k the residual equals 2·I and its causal
//! part I, so the factor no longer moves.
//!
//! # References
//! - Wilson, G. T. (1972): The Factorization of Matricial Spectral Densities.
//!   SIAM J. Appl. Math. 23(4), 420-426.

use ndarray::{Array2, Axis};
use num_complex::Complex64;

use crate::causal::CausalProjector;
use crate::error::{Result, WilsonError};
use crate::linalg::{conj_transpose, invert, multiply, CMatrix};
use crate::sequence::SpectralSequence;
use crate::state::FactorizationState;

/// Drives refinement passes against one spectral sequence.
///
/// Holds the FFT plans for the sequence length so repeated passes reuse them.
#[derive(Debug)]
pub struct WilsonIterator<'a> {
    spectra: &'a SpectralSequence,
    projector: CausalProjector,
    condition_limit: f64,
}

impl<'a> WilsonIterator<'a> {
    /// # Arguments
    /// * `spectra` - Input sequence, read-only for the lifetime of the iterator
    /// * `condition_limit` - Largest accepted condition number of a per-bin factor
    pub fn new(spectra: &'a SpectralSequence, condition_limit: f64) -> Self {
        Self {
            spectra,
            projector: CausalProjector::new(spectra.n_bins()),
            condition_limit,
        }
    }

    /// Run one pass, updating `state` in place.
    ///
    /// The full update is computed before anything is written, so on error
    /// the state still holds the previous estimate.
    ///
    /// # Errors
    /// `SingularMatrix` tagged with the bin whose factor cannot be inverted.
    /// `DimensionMismatch` if `state` was not seeded for this sequence.
    pub fn step(&self, state: &mut FactorizationState) -> Result<()> {
        let q = self.spectra.dim();
        let n = self.spectra.n_bins();
        if state.n_bins() != n || state.dim() != q {
            return Err(WilsonError::DimensionMismatch {
                lhs: (n, q),
                rhs: (state.n_bins(), state.dim()),
            });
        }

        // 1. Residual per bin, packed as one row per matrix entry
        let residuals = self.residuals(state.factors())?;
        let mut series = pack_entry_series(&residuals, q);

        // 2. Causal part of every entry series
        self.projector.project_rows(&mut series)?;

        // 3. Correction (barrier: needs every bin)
        let correction = correction_matrix(&series, q);

        // 4. Corrected per-bin updates
        let updates = unpack_with_correction(&series, &correction, q);

        // 5. Commit
        state.apply_update(&updates)
    }

    /// `ψ_k⁻¹ · S_k · ψ_k⁻ᴴ + I` for a single bin
    fn bin_residual(&self, k: usize, factor: &CMatrix) -> Result<CMatrix> {
        let inv = invert(factor, self.condition_limit).map_err(|e| e.at_bin(k))?;
        let spectrum = self.spectra.bin(k);

        let mut residual = multiply(&multiply(&inv, &spectrum)?, &conj_transpose(&inv))?;
        for i in 0..residual.nrows() {
            residual[(i, i)] += Complex64::new(1.0, 0.0);
        }
        Ok(residual)
    }

    #[cfg(feature = "parallel")]
    fn residuals(&self, factors: &[CMatrix]) -> Result<Vec<CMatrix>> {
        use rayon::prelude::*;

        factors
            .par_iter()
            .enumerate()
            .map(|(k, factor)| self.bin_residual(k, factor))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn residuals(&self, factors: &[CMatrix]) -> Result<Vec<CMatrix>> {
        factors
            .iter()
            .enumerate()
            .map(|(k, factor)| self.bin_residual(k, factor))
            .collect()
    }
}

/// Rearrange n matrices of size q × q into q² rows of length n.
///
/// Row `i * q + j` holds entry `(i, j)` across all bins.
fn pack_entry_series(matrices: &[CMatrix], q: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((q * q, matrices.len()), |(e, k)| matrices[k][(e / q, e % q)])
}

/// Correction term from the projected residual series.
///
/// `C = -mean_k(g_k)`; the strict upper triangle is then overwritten with
/// `-conj` of its mirror (for q = 2: `C[0,1] = -conj(C[1,0])`), the diagonal
/// is zeroed and the result divided by the number of bins.
fn correction_matrix(series: &Array2<Complex64>, q: usize) -> CMatrix {
    let n = series.ncols() as f64;
    let sums = series.sum_axis(Axis(1));
    let mut c = CMatrix::from_fn(q, q, |i, j| -sums[i * q + j] / n);

    for i in 0..q {
        for j in (i + 1)..q {
            c[(i, j)] = -c[(j, i)].conj();
        }
        c[(i, i)] = Complex64::new(0.0, 0.0);
    }

    c.unscale(n)
}

fn unpack_with_correction(series: &Array2<Complex64>, correction: &CMatrix, q: usize) -> Vec<CMatrix> {
    (0..series.ncols())
        .map(|k| CMatrix::from_fn(q, q, |i, j| series[[i * q + j, k]] + correction[(i, j)]))
        .collect()
}
