use ndarray::Array3;
use num_complex::Complex64;
use rustfft::FftPlanner;
use std::f64::consts::PI;
use wt_spectral::linalg::{cholesky, conj_transpose, max_abs_diff};
use wt_spectral::{
    factorize, CMatrix, FactorSequence, SpectralFactorizer, SpectralSequence, WilsonConfig,
};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn diag(values: &[f64]) -> CMatrix {
    let q = values.len();
    CMatrix::from_fn(q, q, |i, j| if i == j { c(values[i], 0.0) } else { c(0.0, 0.0) })
}

/// Spectrum of the bivariate MA(1) process x_t = e_t + A1·e_{t-1}, Cov(e) = Σ
fn vma1_spectra(n: usize) -> Vec<CMatrix> {
    let a0 = CMatrix::identity(2, 2);
    let a1 = CMatrix::from_row_slice(2, 2, &[c(0.4, 0.0), c(0.3, 0.0), c(0.2, 0.0), c(-0.3, 0.0)]);
    let sigma = CMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(0.2, 0.0), c(0.2, 0.0), c(0.5, 0.0)]);
    let l = cholesky(&sigma, 1e-12).unwrap();

    (0..n)
        .map(|k| {
            let z = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
            let h = (&a0 + &a1 * z) * &l;
            &h * conj_transpose(&h)
        })
        .collect()
}

/// DFT of entry (i, j) across bins, normalized by n
fn lag_coefficients(factors: &FactorSequence, i: usize, j: usize) -> Vec<Complex64> {
    let n = factors.n_bins();
    let mut buf: Vec<Complex64> = factors.iter().map(|f| f[(i, j)]).collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buf);
    buf.into_iter().map(|x| x / n as f64).collect()
}

// =========================================================================
// Reconstruction
// =========================================================================

#[test]
fn test_constant_diagonal_spectrum() {
    let spectra = vec![diag(&[4.0, 9.0]); 32];
    let factors = factorize(&spectra, 6).unwrap();

    assert_eq!(factors.n_bins(), 32);
    assert_eq!(factors.dim(), 2);
    for f in &factors {
        assert!(max_abs_diff(f, &diag(&[2.0, 3.0])) < 1e-9, "factor: {}", f);
    }
}

#[test]
fn test_scalar_constant_spectrum() {
    let spectra = vec![CMatrix::from_element(1, 1, c(16.0, 0.0)); 20];
    let factors = factorize(&spectra, 6).unwrap();

    for f in &factors {
        assert!((f[(0, 0)].norm() - 4.0).abs() < 1e-9);
    }
}

#[test]
fn test_reconstruction_error_shrinks_with_iterations() {
    let spectra = vec![diag(&[4.0, 9.0]); 16];
    let sequence = SpectralSequence::from_matrices(&spectra).unwrap();

    let errors: Vec<f64> = (1..=6)
        .map(|m| factorize(&spectra, m).unwrap().reconstruction_error(&sequence))
        .collect();

    for w in errors.windows(2) {
        assert!(w[1] <= w[0] + 1e-12, "errors: {:?}", errors);
    }
    assert!((errors[0] - 5.0625).abs() < 1e-9);
    assert!(errors[5] < 1e-9);
}

#[test]
fn test_vma1_spectrum_is_reconstructed() {
    let spectra = vma1_spectra(64);
    let sequence = SpectralSequence::from_matrices(&spectra).unwrap();

    let factorizer = SpectralFactorizer::new(WilsonConfig::with_iterations(10)).unwrap();
    let (factors, report) = factorizer.factorize_with_report(&sequence).unwrap();

    assert!(report.final_error().unwrap() < 1e-9, "{:?}", report);
    for (k, r) in factors.reconstruct().iter().enumerate() {
        assert!(max_abs_diff(r, &spectra[k]) < 1e-9);
    }
}

#[test]
fn test_vma1_factor_is_causal() {
    let spectra = vma1_spectra(64);
    let factors = factorize(&spectra, 10).unwrap();

    // A moving average of order one has a factor with lags 0 and 1 only
    for i in 0..2 {
        for j in 0..2 {
            let lags = lag_coefficients(&factors, i, j);
            let tail = lags[2..].iter().map(|x| x.norm()).fold(0.0, f64::max);
            assert!(tail < 1e-6, "entry ({}, {}) has anti-causal content {}", i, j, tail);
        }
    }
}

#[test]
fn test_scalar_ma1_factor_is_minimum_phase() {
    // S(ω) = |1 + 0.5·e^{-iω}|²; the minimum-phase factor is 1 + 0.5·z, not 0.5 + z
    let n = 64;
    let spectra: Vec<CMatrix> = (0..n)
        .map(|k| {
            let z = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
            CMatrix::from_element(1, 1, c((c(1.0, 0.0) + z * 0.5).norm_sqr(), 0.0))
        })
        .collect();
    let factors = factorize(&spectra, 10).unwrap();

    let lags = lag_coefficients(&factors, 0, 0);
    assert!((lags[0].norm() - 1.0).abs() < 1e-6);
    assert!((lags[1].norm() - 0.5).abs() < 1e-6);
}

#[test]
fn test_array_input_matches_matrix_input() {
    let spectra = vma1_spectra(16);
    let array = Array3::from_shape_fn((2, 2, 16), |(i, j, k)| spectra[k][(i, j)]);

    let factorizer = SpectralFactorizer::with_iterations(5).unwrap();
    let from_array = factorizer
        .factorize_sequence(&SpectralSequence::from_array(array).unwrap())
        .unwrap();
    let from_matrices = factorizer.factorize(&spectra).unwrap();

    assert_eq!(from_array, from_matrices);
    assert_eq!(from_array.to_array().dim(), (2, 2, 16));
}

#[test]
fn test_repeated_runs_are_identical() {
    let spectra = vma1_spectra(32);
    let factorizer = SpectralFactorizer::with_iterations(7).unwrap();

    let first = factorizer.factorize(&spectra).unwrap();
    let second = factorizer.factorize(&spectra).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_concurrent_runs_are_independent() {
    let spectra = vma1_spectra(32);
    let factorizer = SpectralFactorizer::with_iterations(7).unwrap();
    let expected = factorizer.factorize(&spectra).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| factorizer.factorize(&spectra).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

// =========================================================================
// Failure modes
// =========================================================================

#[test]
fn test_empty_sequence_is_invalid_input() {
    let err = factorize(&[], 5).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn test_mismatched_dimensions_are_invalid_input() {
    let spectra = vec![diag(&[1.0, 1.0]), diag(&[1.0, 1.0, 1.0])];
    let err = factorize(&spectra, 5).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn test_non_square_is_invalid_input() {
    let err = factorize(&[CMatrix::zeros(2, 3)], 5).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn test_zero_mean_matrix_is_not_positive_definite() {
    let err = factorize(&vec![CMatrix::zeros(2, 2); 8], 5).unwrap_err();
    assert_eq!(err.code(), "NOT_POSITIVE_DEFINITE");
    assert_eq!(err.bin(), None);
}

#[test]
fn test_rank_deficient_mean_is_not_positive_definite() {
    let rank_one = CMatrix::from_row_slice(2, 2, &[c(1.0, 0.0), c(2.0, 0.0), c(2.0, 0.0), c(4.0, 0.0)]);
    let err = factorize(&vec![rank_one; 8], 5).unwrap_err();
    assert_eq!(err.code(), "NOT_POSITIVE_DEFINITE");
}

#[test]
fn test_input_is_not_modified() {
    let spectra = vma1_spectra(16);
    let copy = spectra.clone();
    let _ = factorize(&spectra, 4).unwrap();
    assert_eq!(spectra, copy);
}
