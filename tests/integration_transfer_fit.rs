//! Integration tests for the transfer-function fit.
//!
//! Purpose
//! -------
//! - Validate the end-to-end transfer pipeline: simulate an input pulse,
//!   pass it through a known scale-and-delay response, and recover the
//!   response parameters with `fit`.
//!
//! Coverage
//! --------
//! - `signal::waveform`: `wave`, `scaleshift` and `transfer`.
//! - `transfer::fit`: noiseless recovery with the analytic Jacobian, a
//!   user closure through `signal::waveform::transfer`, and the scaling of
//!   reported variances with the noise amplitude.
//!
//! Exclusions
//! ----------
//! - Input validation and the bounded path; these are covered by unit
//!   tests in `transfer::fit`.
use approx::assert_relative_eq;
use ndarray::{Array1, ArrayView1, Axis, array};
use num_complex::Complex64;
use thzfit::{
    signal::waveform::{WaveOptions, scaleshift, transfer, wave},
    transfer::{FitOptions, FrequencyBand, ScaleDelay, TransferFunction, fit},
};

const N: usize = 128;
const DT: f64 = 0.05;

/// Route `tracing` output to the test harness; `RUST_LOG` selects levels.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Input pulse with a small offset so that every FFT bin carries signal.
fn input() -> Array1<f64> {
    wave(N, &WaveOptions { dt: Some(DT), ..WaveOptions::default() }) + 0.01
}

#[test]
// Purpose
// -------
// Noiseless output generated by `scaleshift` is matched to high precision.
//
// Given
// -----
// - y = scaleshift(x, 0.5, 0.1), σ = (1e-5, 0, 0), start (1, 0).
//
// Expect
// ------
// - `success`, p within 1e-8 of (0.5, 0.1), `epsilon` and `delta` near 0.
fn fit_recovers_scale_and_delay() {
    // Arrange
    init_tracing();
    let x = input();
    let y = scaleshift(x.view(), Some(array![0.5].view()), Some(array![0.1].view()), Some(DT), Axis(0))
        .expect("single lane");
    let opts = FitOptions::default().with_dt(DT).with_sigma_parms(1e-5, 0.0, 0.0);

    // Act
    let res = fit(&ScaleDelay, array![1.0, 0.0].view(), x.view(), y.view(), &opts).expect("fit runs");

    // Assert
    assert!(res.success, "termination: {}", res.report.termination);
    assert!((res.p_opt[0] - 0.5).abs() < 1e-8, "a = {}", res.p_opt[0]);
    assert!((res.p_opt[1] - 0.1).abs() < 1e-8, "tau = {}", res.p_opt[1]);
    assert!(res.epsilon.iter().all(|e| e.abs() < 1e-8));
    assert!(res.delta.iter().all(|d| d.abs() < 1e-8));
}

#[test]
// Purpose
// -------
// Output produced by `transfer` with the model's own response is matched,
// also when the model is restricted to a band.
//
// Given
// -----
// - y = transfer(ScaleDelay(0.8, 0.05), x); band [0.1, 5] in cycles per
//   unit time.
//
// Expect
// ------
// - p within 1e-8 of (0.8, 0.05).
fn fit_matches_transfer_output_in_band() {
    // Arrange
    init_tracing();
    let x = input();
    let p_true = array![0.8, 0.05];
    let tfun = |w: ArrayView1<f64>| -> Array1<Complex64> { ScaleDelay.response(p_true.view(), w) };
    let y = transfer(tfun, x.view(), Some(DT), true).expect("response length matches");
    let band = FrequencyBand::new(0.1, 5.0).expect("valid band");
    let opts = FitOptions::default().with_dt(DT).with_sigma_parms(1e-5, 0.0, 0.0).with_band(band);

    // Act
    let res = fit(&ScaleDelay, array![1.0, 0.0].view(), x.view(), y.view(), &opts).expect("fit runs");

    // Assert
    assert!((res.p_opt[0] - 0.8).abs() < 1e-8, "a = {}", res.p_opt[0]);
    assert!((res.p_opt[1] - 0.05).abs() < 1e-8, "tau = {}", res.p_opt[1]);
}

#[test]
// Purpose
// -------
// Reported variances scale with the square of the noise amplitude.
//
// Given
// -----
// - The same noiseless pair fitted with σ_α = 1e-3 and σ_α = 1e-2.
//
// Expect
// ------
// - Same estimates; `p_var` and `mu_var` larger by a factor of 100.
fn variances_scale_with_noise_amplitude() {
    // Arrange
    init_tracing();
    let x = input();
    let y = scaleshift(x.view(), Some(array![0.9].view()), Some(array![0.02].view()), Some(DT), Axis(0))
        .expect("single lane");
    let quiet = FitOptions::default().with_dt(DT).with_sigma_parms(1e-3, 0.0, 0.0);
    let loud = FitOptions::default().with_dt(DT).with_sigma_parms(1e-2, 0.0, 0.0);

    // Act
    let a = fit(&ScaleDelay, array![1.0, 0.0].view(), x.view(), y.view(), &quiet).expect("fit runs");
    let b = fit(&ScaleDelay, array![1.0, 0.0].view(), x.view(), y.view(), &loud).expect("fit runs");

    // Assert
    for k in 0..2 {
        assert!((a.p_opt[k] - b.p_opt[k]).abs() < 1e-8);
        assert!(a.p_var[k] > 0.0);
        assert_relative_eq!(b.p_var[k], 100.0 * a.p_var[k], max_relative = 1e-4);
    }
    for j in 0..N {
        assert_relative_eq!(b.mu_var[j], 100.0 * a.mu_var[j], max_relative = 1e-4);
    }
}
