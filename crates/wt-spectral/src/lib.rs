//! # wt-spectral
//!
//! Minimum-phase factorization of spectral density matrices.
//!
//! Given spectral matrices `S_k` (Hermitian, positive semidefinite, one per
//! frequency bin), the Wilson algorithm finds causal factors `ψ_k` with
//! `ψ_k · ψ_kᴴ ≈ S_k`. How the spectra were estimated (wavelet coefficients,
//! periodograms, ...) does not matter here.
//!
//! This crate provides:
//! - **Factorization**: `SpectralFactorizer`, `factorize`
//! - **Building blocks**: `CausalProjector`, `WilsonIterator`, `FactorizationState`
//! - **Complex matrix primitives**: `linalg`
//!
//! ## Example
//!
//! ```
//! use num_complex::Complex64;
//! use wt_spectral::{CMatrix, SpectralFactorizer, SpectralSequence, WilsonConfig};
//!
//! let s = CMatrix::from_row_slice(2, 2, &[
//!     Complex64::new(4.0, 0.0), Complex64::new(0.0, 0.0),
//!     Complex64::new(0.0, 0.0), Complex64::new(9.0, 0.0),
//! ]);
//! let spectra = SpectralSequence::from_matrices(&vec![s; 32])?;
//!
//! let factorizer = SpectralFactorizer::new(WilsonConfig::with_iterations(8))?;
//! let (factors, report) = factorizer.factorize_with_report(&spectra)?;
//!
//! assert!(report.final_error().unwrap() < 1e-9);
//! assert!((factors[0][(1, 1)].re - 3.0).abs() < 1e-9);
//! # Ok::<(), wt_spectral::WilsonError>(())
//! ```
//!
//! ## Features
//! - `parallel` (default): per-bin residuals, per-entry projections and the
//!   factor update run on the rayon pool. Results match the sequential path.

pub mod causal;
pub mod config;
pub mod error;
pub mod factorizer;
pub mod iteration;
pub mod linalg;
pub mod sequence;
pub mod state;

#[cfg(test)]
mod tests_proptest;

pub use causal::CausalProjector;
pub use config::{ConfigError, WilsonConfig};
pub use error::WilsonError;
pub use factorizer::{factorize, FactorizationReport, SpectralFactorizer};
pub use iteration::WilsonIterator;
pub use linalg::CMatrix;
pub use sequence::{FactorSequence, SpectralSequence};
pub use state::FactorizationState;
