//! Current factor estimate of a running factorization.

use num_complex::Complex64;

use crate::error::{Result, WilsonError};
use crate::linalg::{cholesky, multiply, CMatrix};
use crate::sequence::{reconstruction_error, FactorSequence, SpectralSequence};

/// Per-bin factor estimate, owned by exactly one factorization run.
#[derive(Debug, Clone)]
pub struct FactorizationState {
    factors: Vec<CMatrix>,
}

impl FactorizationState {
    /// Frequency-independent initial guess.
    ///
    /// Every bin starts from `2 · real(L)ᵀ`, with `L` the Cholesky factor of
    /// the mean spectral matrix.
    ///
    /// # Errors
    /// `NotPositiveDefinite` if the mean matrix is not Hermitian positive
    /// definite. `InvalidInput` if `n_bins` is zero.
    pub fn seed(mean: &CMatrix, n_bins: usize, hermitian_tolerance: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(WilsonError::invalid_input("cannot seed zero bins"));
        }

        let l = cholesky(mean, hermitian_tolerance)?;
        let seed = l.map(|z| Complex64::new(2.0 * z.re, 0.0)).transpose();

        Ok(Self {
            factors: vec![seed; n_bins],
        })
    }

    /// Right-multiply every factor by its bin's update: `Factor[k] := Factor[k] · update[k]`.
    ///
    /// The update is applied only after all bins are checked, so a mismatch
    /// leaves the state untouched.
    pub fn apply_update(&mut self, updates: &[CMatrix]) -> Result<()> {
        if updates.len() != self.factors.len() {
            return Err(WilsonError::DimensionMismatch {
                lhs: (self.factors.len(), self.dim()),
                rhs: (updates.len(), updates.first().map_or(0, |u| u.nrows())),
            });
        }
        if let Some((f, u)) = self
            .factors
            .iter()
            .zip(updates)
            .find(|(f, u)| f.ncols() != u.nrows())
        {
            return Err(WilsonError::DimensionMismatch {
                lhs: f.shape(),
                rhs: u.shape(),
            });
        }

        self.apply_update_impl(updates)
    }

    #[cfg(feature = "parallel")]
    fn apply_update_impl(&mut self, updates: &[CMatrix]) -> Result<()> {
        use rayon::prelude::*;

        self.factors
            .par_iter_mut()
            .zip(updates.par_iter())
            .try_for_each(|(f, u)| -> Result<()> {
                *f = multiply(f, u)?;
                Ok(())
            })
    }

    #[cfg(not(feature = "parallel"))]
    fn apply_update_impl(&mut self, updates: &[CMatrix]) -> Result<()> {
        for (f, u) in self.factors.iter_mut().zip(updates) {
            *f = multiply(f, u)?;
        }
        Ok(())
    }

    pub fn factors(&self) -> &[CMatrix] {
        &self.factors
    }

    pub fn n_bins(&self) -> usize {
        self.factors.len()
    }

    pub fn dim(&self) -> usize {
        self.factors.first().map_or(0, |f| f.nrows())
    }

    /// Max-abs reconstruction error of the current estimate
    pub fn reconstruction_error(&self, spectra: &SpectralSequence) -> f64 {
        reconstruction_error(&self.factors, spectra)
    }

    pub fn into_factors(self) -> FactorSequence {
        FactorSequence::new(self.factors)
    }
}
