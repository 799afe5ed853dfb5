//! Integration tests for the noise-model fit.
//!
//! Purpose
//! -------
//! - Validate the end-to-end noise pipeline: simulate a pulse, apply known
//!   amplitude and delay drift, add noise from a known [`NoiseModel`], and
//!   recover the model with `noisefit`.
//!
//! Coverage
//! --------
//! - `signal::waveform`: `wave` and `scaleshift` along the sample axis.
//! - `noise::model`: seeded noise along an axis.
//! - `noise::noisefit`: a free fit of every block from the default guesses
//!   over several seeds, and a fit with the drift blocks held fixed.
//!
//! Exclusions
//! ----------
//! - Validation of malformed inputs and the default guesses; these are
//!   covered by unit tests.
use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, Axis};
use thzfit::{
    noise::{NoiseFitOptions, NoiseModel, ParamBlock, noisefit},
    signal::waveform::{WaveOptions, scaleshift, wave},
};

const N: usize = 256;
const M: usize = 50;
const DT: f64 = 0.05;
const SIGMA: [f64; 3] = [1e-5, 1e-2, 1e-3];

/// Route `tracing` output to the test harness; `RUST_LOG` selects levels.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Known drift with the reference waveform at `a = 1`, `eta = 0`.
fn drift() -> (Array1<f64>, Array1<f64>) {
    let a = Array1::from_shape_fn(M, |i| if i == 0 { 1.0 } else { 1.0 + 0.01 * (1.3 * i as f64).sin() });
    let eta = Array1::from_shape_fn(M, |i| if i == 0 { 0.0 } else { 0.002 * (0.7 * i as f64).cos() });
    (a, eta)
}

/// `M × N` noisy waveforms plus the noiseless pulse.
fn simulate(seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mu = wave(N, &WaveOptions { dt: Some(DT), ..WaveOptions::default() });
    let (a, eta) = drift();
    let rows = mu.broadcast((M, N)).expect("row broadcast").to_owned();
    let clean = scaleshift(rows.view(), Some(a.view()), Some(eta.view()), Some(DT), Axis(1))
        .expect("one correction per waveform");
    let model = NoiseModel::new(SIGMA[0], SIGMA[1], SIGMA[2], Some(DT));
    let x = &clean + &model.noise_along(clean.view(), Axis(1), seed);
    (x, mu)
}

#[test]
// Purpose
// -------
// A free fit from the default guesses recovers the generating noise
// amplitudes, signal and drift for several noise realizations.
//
// Given
// -----
// - 50 waveforms of 256 samples, σ = (1e-5, 1e-2, 1e-3), known drift,
//   seeds 0, 7 and 11; no guesses supplied.
//
// Expect
// ------
// - A converged fit with each σ within 10% of the truth and a positive
//   standard error.
// - `mu` within 1e-2 of the pulse, `a` within 5e-3 and `eta` within 5e-4
//   of the drift, reference entries exact.
fn noisefit_recovers_generating_model() {
    // Arrange
    init_tracing();
    let (a_true, eta_true) = drift();
    let opts = NoiseFitOptions::default().with_dt(DT);

    for seed in [0, 7, 11] {
        let (x, mu_true) = simulate(seed);

        // Act
        let res = noisefit(x.view(), &opts).expect("noise fit should run");

        // Assert
        assert!(res.diagnostic.converged, "seed {seed}: {:?}", res.diagnostic.status);
        let fitted =
            [res.noise_model.sigma_alpha, res.noise_model.sigma_beta, res.noise_model.sigma_tau];
        let errors = [res.err_sigma_alpha, res.err_sigma_beta, res.err_sigma_tau];
        for k in 0..3 {
            let rel = (fitted[k] - SIGMA[k]).abs() / SIGMA[k];
            assert!(rel < 0.1, "seed {seed}: sigma[{k}] = {} vs {}", fitted[k], SIGMA[k]);
            assert!(errors[k].is_finite() && errors[k] > 0.0, "seed {seed}: err_sigma[{k}] = {}", errors[k]);
        }
        assert_eq!(res.mu.len(), N);
        for j in 0..N {
            assert_abs_diff_eq!(res.mu[j], mu_true[j], epsilon = 1e-2);
        }
        assert_eq!(res.a[0], 1.0);
        assert_eq!(res.eta[0], 0.0);
        for i in 0..M {
            assert_abs_diff_eq!(res.a[i], a_true[i], epsilon = 5e-3);
            assert_abs_diff_eq!(res.eta[i], eta_true[i], epsilon = 5e-4);
        }
        assert!(res.fval.is_finite());
    }
}

#[test]
// Purpose
// -------
// Holding the drift at its true value still recovers the noise and keeps
// the covariance restricted to the free blocks.
//
// Given
// -----
// - The same simulation with seed 7; `a` and `eta` supplied and fixed.
//
// Expect
// ------
// - σ within 10%, fixed drift returned unchanged with zero error, and a
//   square `hess_inv` of size `3 + N`.
fn noisefit_with_fixed_drift() {
    // Arrange
    init_tracing();
    let (x, _) = simulate(7);
    let (a_true, eta_true) = drift();
    let opts = NoiseFitOptions::default()
        .with_dt(DT)
        .with_sigma_alpha(1.5 * SIGMA[0])
        .with_sigma_beta(1.5 * SIGMA[1])
        .with_sigma_tau(1.5 * SIGMA[2])
        .with_a(a_true.clone())
        .with_eta(eta_true.clone())
        .with_fixed(ParamBlock::Alpha)
        .with_fixed(ParamBlock::Eta);

    // Act
    let res = noisefit(x.view(), &opts).expect("noise fit should run");

    // Assert
    let fitted = [res.noise_model.sigma_alpha, res.noise_model.sigma_beta, res.noise_model.sigma_tau];
    for k in 0..3 {
        let rel = (fitted[k] - SIGMA[k]).abs() / SIGMA[k];
        assert!(rel < 0.1, "sigma[{k}] = {} vs {}", fitted[k], SIGMA[k]);
    }
    assert_eq!(res.a, a_true);
    assert_eq!(res.eta, eta_true);
    assert!(res.err_a.iter().chain(res.err_eta.iter()).all(|&e| e == 0.0));
    assert_eq!(res.hess_inv.dim(), (3 + N, 3 + N));
}
