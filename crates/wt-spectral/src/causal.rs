//! Causal projection of frequency-indexed series
//!
//! The Wilson recursion only ever corrects the factor with the "plus part" of
//! a residual spectrum. For a series `f[0..n]` sampled on the frequency grid
//! this is computed through its own DFT:
//!
//! ```text
//! F    = DFT(f)
//! F[i] = 0          for i > n/2
//! F[0] = F[0] / 2
//! g    = IDFT(F)
//! ```
//!
//! Halving the zero coefficient splits the constant term evenly between the
//! causal and anti-causal halves, so a constant series `c` projects to `c/2`.
//! Consequently the projection is idempotent only on series with zero mean;
//! every further application halves the mean again.

use ndarray::{Array2, ArrayViewMut1, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::error::{Result, WilsonError};

/// FFT-based causal projector for series of a fixed length.
///
/// Plans are built once and shared, so one projector serves every entry
/// series of every pass of a factorization run. The projector is immutable
/// once built and can be used from several threads at once.
pub struct CausalProjector {
    len: usize,
    fft: Arc<dyn Fft<f64>>,
    ifft: Arc<dyn Fft<f64>>,
    /// Normalization factor for IFFT (1/len)
    norm_factor: f64,
}

impl std::fmt::Debug for CausalProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CausalProjector")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl CausalProjector {
    /// Create a projector for series of length `len`.
    ///
    /// # Panics
    /// Panics if len is 0.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "Series length must be positive");

        let mut planner = FftPlanner::new();
        Self {
            len,
            fft: planner.plan_fft_forward(len),
            ifft: planner.plan_fft_inverse(len),
            norm_factor: 1.0 / (len as f64),
        }
    }

    /// Series length this projector was planned for
    pub fn len(&self) -> usize {
        self.len
    }

    /// Index of the last retained DFT coefficient (n/2, rounded down)
    #[inline]
    pub fn cutoff(&self) -> usize {
        self.len / 2
    }

    /// Project a series in place.
    ///
    /// # Errors
    /// `DimensionMismatch` if the series length differs from the planned length.
    pub fn project_in_place(&self, series: &mut [Complex64]) -> Result<()> {
        if series.len() != self.len {
            return Err(WilsonError::DimensionMismatch {
                lhs: (1, self.len),
                rhs: (1, series.len()),
            });
        }

        // 1. Transform to the lag domain
        self.fft.process(series);

        // 2. Drop the anti-causal half, split the zero lag
        let zero = Complex64::new(0.0, 0.0);
        for coeff in series.iter_mut().skip(self.cutoff() + 1) {
            *coeff = zero;
        }
        series[0] *= 0.5;

        // 3. Back to the frequency grid (rustfft doesn't normalize)
        self.ifft.process(series);
        for c in series.iter_mut() {
            *c *= self.norm_factor;
        }

        Ok(())
    }

    /// Project a series, returning a new vector.
    pub fn project(&self, series: &[Complex64]) -> Result<Vec<Complex64>> {
        let mut out = series.to_vec();
        self.project_in_place(&mut out)?;
        Ok(out)
    }

    fn project_lane(&self, mut lane: ArrayViewMut1<'_, Complex64>) -> Result<()> {
        if let Some(slice) = lane.as_slice_mut() {
            return self.project_in_place(slice);
        }

        let mut buf = lane.to_vec();
        self.project_in_place(&mut buf)?;
        for (dst, src) in lane.iter_mut().zip(buf) {
            *dst = src;
        }
        Ok(())
    }

    /// Project every row of a `(series, len)` array independently.
    pub fn project_rows(&self, rows: &mut Array2<Complex64>) -> Result<()> {
        if rows.ncols() != self.len {
            return Err(WilsonError::DimensionMismatch {
                lhs: (rows.nrows(), self.len),
                rhs: rows.dim(),
            });
        }
        self.project_rows_impl(rows)
    }

    #[cfg(feature = "parallel")]
    fn project_rows_impl(&self, rows: &mut Array2<Complex64>) -> Result<()> {
        use ndarray::parallel::prelude::*;

        rows.axis_iter_mut(Axis(0))
            .into_par_iter()
            .try_for_each(|lane| self.project_lane(lane))
    }

    #[cfg(not(feature = "parallel"))]
    fn project_rows_impl(&self, rows: &mut Array2<Complex64>) -> Result<()> {
        rows.axis_iter_mut(Axis(0))
            .try_for_each(|lane| self.project_lane(lane))
    }
}
