/// Property-based tests for projector and factorization invariants

#[cfg(test)]
mod tests {
    use crate::causal::CausalProjector;
    use crate::linalg::CMatrix;
    use crate::sequence::SpectralSequence;
    use crate::{SpectralFactorizer, WilsonConfig};
    use num_complex::Complex64;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn series_strategy() -> impl Strategy<Value = Vec<Complex64>> {
        prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 1..64)
            .prop_map(|v| v.into_iter().map(|(re, im)| Complex64::new(re, im)).collect())
    }

    fn max_diff(a: &[Complex64], b: &[Complex64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    /// Scalar MA(1) spectrum b·|1 + a·e^{-iω}|² on n bins
    fn ma1_spectrum(a: f64, b: f64, n: usize) -> SpectralSequence {
        let matrices: Vec<CMatrix> = (0..n)
            .map(|k| {
                let z = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
                let h = Complex64::new(1.0, 0.0) + z * a;
                CMatrix::from_element(1, 1, Complex64::new(b * h.norm_sqr(), 0.0))
            })
            .collect();
        SpectralSequence::from_matrices(&matrices).unwrap()
    }

    // =========================================================================
    // Test 1: Causal Projection
    // =========================================================================
    proptest! {
        #[test]
        fn test_projection_idempotent_on_zero_mean(mut series in series_strategy()) {
            let n = series.len();
            let mean: Complex64 = series.iter().sum::<Complex64>() / n as f64;
            for c in &mut series {
                *c -= mean;
            }

            let projector = CausalProjector::new(n);
            let once = projector.project(&series).unwrap();
            let twice = projector.project(&once).unwrap();
            prop_assert!(max_diff(&once, &twice) < 1e-9);
        }

        #[test]
        fn test_projection_is_linear(
            pair in (1usize..48).prop_flat_map(|n| (
                prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0), n),
                prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0), n),
            )),
            scale in -3.0f64..3.0,
        ) {
            let x: Vec<Complex64> = pair.0.iter().map(|&(re, im)| Complex64::new(re, im)).collect();
            let y: Vec<Complex64> = pair.1.iter().map(|&(re, im)| Complex64::new(re, im)).collect();
            let combined: Vec<Complex64> = x.iter().zip(&y).map(|(a, b)| *a * scale + *b).collect();

            let projector = CausalProjector::new(x.len());
            let px = projector.project(&x).unwrap();
            let py = projector.project(&y).unwrap();
            let expected: Vec<Complex64> = px.iter().zip(&py).map(|(a, b)| *a * scale + *b).collect();

            prop_assert!(max_diff(&projector.project(&combined).unwrap(), &expected) < 1e-9);
        }
    }

    // =========================================================================
    // Test 2: Factorization Convergence
    // =========================================================================
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_constant_diagonal_converges_to_sqrt(
            d0 in 0.5f64..50.0,
            d1 in 0.5f64..50.0,
            n in 1usize..40,
        ) {
            let s = CMatrix::from_fn(2, 2, |i, j| match (i, j) {
                (0, 0) => Complex64::new(d0, 0.0),
                (1, 1) => Complex64::new(d1, 0.0),
                _ => Complex64::new(0.0, 0.0),
            });
            let factors = crate::factorize(&vec![s; n], 8).unwrap();

            for f in &factors {
                prop_assert!((f[(0, 0)] - Complex64::new(d0.sqrt(), 0.0)).norm() < 1e-9 * d0);
                prop_assert!((f[(1, 1)] - Complex64::new(d1.sqrt(), 0.0)).norm() < 1e-9 * d1);
                prop_assert!(f[(0, 1)].norm() < 1e-12);
                prop_assert!(f[(1, 0)].norm() < 1e-12);
            }
        }

        #[test]
        fn test_ma1_error_decreases(a in -0.7f64..0.7, b in 0.5f64..3.0) {
            let spectra = ma1_spectrum(a, b, 64);
            let factorizer = SpectralFactorizer::new(WilsonConfig::with_iterations(12)).unwrap();
            let (_, report) = factorizer.factorize_with_report(&spectra).unwrap();

            let history = &report.error_history;
            for w in history.windows(2) {
                prop_assert!(w[1] <= w[0] + 1e-9 * b, "error grew: {:?}", history);
            }
            prop_assert!(report.final_error().unwrap() < 1e-5 * b);
        }

        #[test]
        fn test_factorization_is_deterministic(a in -0.6f64..0.6, n in 4usize..48) {
            let spectra = ma1_spectrum(a, 1.0, n);
            let factorizer = SpectralFactorizer::with_iterations(6).unwrap();

            let first = factorizer.factorize_sequence(&spectra).unwrap();
            let second = factorizer.factorize_sequence(&spectra).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
