//! Spectral factorization entry point
//!
//! Validates the input, seeds the factor from the Cholesky factor of the mean
//! spectral matrix and runs a fixed number of Wilson passes.
//!
//! By default the iteration count is the only termination criterion. Setting
//! [`WilsonConfig::convergence_tolerance`] adds an early stop once the
//! reconstruction error `max_k |ψ_k ψ_kᴴ - S_k|` reaches the tolerance.

use crate::config::WilsonConfig;
use crate::error::{Result, WilsonError};
use crate::iteration::WilsonIterator;
use crate::linalg::{cholesky, CMatrix};
use crate::sequence::{FactorSequence, SpectralSequence};
use crate::state::FactorizationState;

/// Outcome of a factorization run beyond the factors themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorizationReport {
    /// Passes actually executed (less than configured on early stop)
    pub iterations_run: usize,
    /// True if the convergence tolerance was reached. Always false when no
    /// tolerance is configured.
    pub converged: bool,
    /// Reconstruction error after each pass
    pub error_history: Vec<f64>,
}

impl FactorizationReport {
    /// Reconstruction error of the returned factors
    pub fn final_error(&self) -> Option<f64> {
        self.error_history.last().copied()
    }
}

/// Wilson factorizer
#[derive(Debug, Clone)]
pub struct SpectralFactorizer {
    config: WilsonConfig,
}

impl Default for SpectralFactorizer {
    fn default() -> Self {
        Self {
            config: WilsonConfig::default(),
        }
    }
}

impl SpectralFactorizer {
    /// Create a factorizer from a validated configuration
    pub fn new(config: WilsonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Default configuration with `iterations` passes.
    ///
    /// # Errors
    /// `InvalidInput` if `iterations` is zero.
    pub fn with_iterations(iterations: usize) -> Result<Self> {
        if iterations == 0 {
            return Err(WilsonError::invalid_input("iteration count must be positive"));
        }
        Self::new(WilsonConfig::with_iterations(iterations))
    }

    pub fn config(&self) -> &WilsonConfig {
        &self.config
    }

    /// Factorize one spectral matrix per frequency bin.
    pub fn factorize(&self, matrices: &[CMatrix]) -> Result<FactorSequence> {
        let spectra = SpectralSequence::from_matrices(matrices)?;
        self.factorize_sequence(&spectra)
    }

    /// Factorize a validated spectral sequence.
    pub fn factorize_sequence(&self, spectra: &SpectralSequence) -> Result<FactorSequence> {
        self.run(spectra, false).map(|(factors, _)| factors)
    }

    /// Factorize and record the reconstruction error after every pass.
    pub fn factorize_with_report(
        &self,
        spectra: &SpectralSequence,
    ) -> Result<(FactorSequence, FactorizationReport)> {
        self.run(spectra, true)
    }

    /// Per-bin Hermitian positive-definiteness check (strict mode only)
    fn validate_bins(&self, spectra: &SpectralSequence) -> Result<()> {
        for k in 0..spectra.n_bins() {
            cholesky(&spectra.bin(k), self.config.hermitian_tolerance).map_err(|e| e.at_bin(k))?;
        }
        Ok(())
    }

    fn run(
        &self,
        spectra: &SpectralSequence,
        record_errors: bool,
    ) -> Result<(FactorSequence, FactorizationReport)> {
        let n = spectra.n_bins();
        let q = spectra.dim();
        let iterations = self.config.iterations;
        let tolerance = self.config.convergence_tolerance;
        let track = record_errors || tolerance.is_some();

        log::info!(
            "Wilson factorization: {} bins, {}x{} matrices, {} iterations",
            n,
            q,
            q,
            iterations
        );

        if self.config.strict_validation {
            self.validate_bins(spectra)?;
        }

        let mut state =
            FactorizationState::seed(&spectra.mean(), n, self.config.hermitian_tolerance)?;
        let iterator = WilsonIterator::new(spectra, self.config.condition_limit);

        let mut report = FactorizationReport {
            iterations_run: 0,
            converged: false,
            error_history: Vec::with_capacity(if track { iterations } else { 0 }),
        };

        for pass in 0..iterations {
            if let Err(e) = iterator.step(&mut state) {
                log::warn!("Wilson pass {}/{} failed: {}", pass + 1, iterations, e);
                return Err(e);
            }
            report.iterations_run += 1;

            if !track {
                log::debug!("Wilson pass {}/{} done", pass + 1, iterations);
                continue;
            }

            let error = state.reconstruction_error(spectra);
            report.error_history.push(error);
            log::debug!(
                "Wilson pass {}/{} done, reconstruction error {:.3e}",
                pass + 1,
                iterations,
                error
            );

            if let Some(tol) = tolerance {
                if error <= tol {
                    report.converged = true;
                    if pass + 1 < iterations {
                        log::info!(
                            "Wilson factorization converged after {} of {} passes (error {:.3e})",
                            pass + 1,
                            iterations,
                            error
                        );
                    }
                    break;
                }
            }
        }

        match report.final_error() {
            Some(error) => log::info!(
                "Wilson factorization finished after {} passes, reconstruction error {:.3e}",
                report.iterations_run,
                error
            ),
            None => log::info!(
                "Wilson factorization finished after {} passes",
                report.iterations_run
            ),
        }

        Ok((state.into_factors(), report))
    }
}

/// Factorize with the default configuration and `iterations` passes.
///
/// # Example
///
/// ```
/// use num_complex::Complex64;
/// use wt_spectral::{factorize, CMatrix};
///
/// let s = CMatrix::from_diagonal_element(2, 2, Complex64::new(4.0, 0.0));
/// let factors = factorize(&vec![s; 16], 8)?;
/// assert!((factors[0][(0, 0)].re - 2.0).abs() < 1e-9);
/// # Ok::<(), wt_spectral::WilsonError>(())
/// ```
pub fn factorize(matrices: &[CMatrix], iterations: usize) -> Result<FactorSequence> {
    SpectralFactorizer::with_iterations(iterations)?.factorize(matrices)
}
