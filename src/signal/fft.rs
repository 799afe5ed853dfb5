//! signal::fft — real-input discrete Fourier transforms on `ndarray` views.
//!
//! Purpose
//! -------
//! Provide the forward/inverse transform pair every spectral operation in
//! the crate is built on: the non-negative-frequency spectrum of a real
//! signal, its Hermitian inverse, the matching angular-frequency grids, and
//! the spectral time derivative.
//!
//! Key behaviors
//! -------------
//! - [`RealFft`] plans forward and inverse complex FFTs of one length with
//!   `rustfft` and reuses them across calls; it is immutable after
//!   construction and can be shared by reference.
//! - [`RealFft::forward`] keeps bins `k = 0..=n/2` only.
//! - [`RealFft::inverse`] completes the spectrum by Hermitian symmetry and
//!   returns the real part scaled by `1/n`. The imaginary part of the DC
//!   bin, and of the Nyquist bin when `n` is even, is discarded.
//!
//! Invariants & assumptions
//! ------------------------
//! - Spectra passed to [`RealFft::inverse`] have exactly `n/2 + 1` bins.
//! - The sign convention is `X_k = Σ_j x_j e^{-2πi jk/n}`, so multiplying a
//!   spectrum by `iω` differentiates and by `e^{-iωτ}` delays by `τ`.
//!
//! Conventions
//! -----------
//! - "Normalized" angular frequencies are `2πk/n` (unit sampling time);
//!   physical ones divide by `dt`.
//!
//! Testing notes
//! -------------
//! - Unit tests cover inverse-of-forward reconstruction, derivatives of
//!   band-limited sinusoids, Nyquist handling and frequency grids.
use ndarray::{Array1, ArrayView1, Zip};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::{f64::consts::PI, fmt, sync::Arc};

/// Forward/inverse real FFT plan for signals of a fixed length `n`.
#[derive(Clone)]
pub struct RealFft {
    n: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for RealFft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealFft").field("n", &self.n).finish()
    }
}

impl RealFft {
    /// Plan transforms for signals of length `n`.
    pub fn new(n: usize) -> Self {
        // Empty signals never reach the plans; keep them at a valid length.
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n.max(1));
        let inverse = planner.plan_fft_inverse(n.max(1));
        Self { n, forward, inverse }
    }

    /// Signal length this plan was built for.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Number of non-negative frequency bins, `n/2 + 1`, or 0 for an empty
    /// plan.
    pub fn n_freq(&self) -> usize {
        bin_count(self.n)
    }

    /// Non-negative-frequency spectrum of a real signal.
    ///
    /// Panics
    /// ------
    /// - Panics if `x.len() != self.len()`.
    pub fn forward(&self, x: ArrayView1<f64>) -> Array1<Complex64> {
        assert_eq!(x.len(), self.n, "signal length does not match the FFT plan");
        if self.n == 0 {
            return Array1::zeros(0);
        }
        let mut buffer: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.forward.process(&mut buffer);
        buffer.truncate(self.n_freq());
        Array1::from_vec(buffer)
    }

    /// Real signal whose non-negative-frequency spectrum is `spectrum`.
    ///
    /// Panics
    /// ------
    /// - Panics if `spectrum.len() != self.n_freq()`.
    ///
    /// Notes
    /// -----
    /// - Bins that have no independent mirror (DC, and Nyquist for even `n`)
    ///   contribute their real part only.
    pub fn inverse(&self, spectrum: ArrayView1<Complex64>) -> Array1<f64> {
        let nf = self.n_freq();
        assert_eq!(spectrum.len(), nf, "spectrum length does not match the FFT plan");
        let n = self.n;
        if n == 0 {
            return Array1::zeros(0);
        }
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        buffer[0] = Complex64::new(spectrum[0].re, 0.0);
        for k in 1..nf {
            let c = spectrum[k];
            if 2 * k == n {
                buffer[k] = Complex64::new(c.re, 0.0);
            } else {
                buffer[k] = c;
                buffer[n - k] = c.conj();
            }
        }
        self.inverse.process(&mut buffer);
        let scale = 1.0 / n as f64;
        buffer.iter().map(|c| c.re * scale).collect()
    }

    /// Spectral time derivative `irfft(iω · rfft(x))` with `ω = 2πk/(n·dt)`.
    pub fn derivative(&self, x: ArrayView1<f64>, dt: f64) -> Array1<f64> {
        let w = angular_frequencies(self.n, dt);
        let mut spectrum = self.forward(x);
        Zip::from(&mut spectrum).and(&w).for_each(|s, &wk| *s *= Complex64::new(0.0, wk));
        self.inverse(spectrum.view())
    }

    /// Filter `x` through a frequency response sampled on the rfft grid.
    pub fn apply_response(
        &self, x: ArrayView1<f64>, response: ArrayView1<Complex64>,
    ) -> Array1<f64> {
        let spectrum = self.forward(x) * &response;
        self.inverse(spectrum.view())
    }
}

fn bin_count(n: usize) -> usize {
    if n == 0 { 0 } else { n / 2 + 1 }
}

/// Angular frequencies `2πk/n`, `k = 0..=n/2`, for unit sampling time.
/// Empty for `n = 0`.
pub fn normalized_angular_frequencies(n: usize) -> Array1<f64> {
    Array1::from_shape_fn(bin_count(n), |k| 2.0 * PI * k as f64 / n as f64)
}

/// Angular frequencies `2πk/(n·dt)`, `k = 0..=n/2`.
pub fn angular_frequencies(n: usize, dt: f64) -> Array1<f64> {
    normalized_angular_frequencies(n) / dt
}

pub mod prelude {
    pub use super::{RealFft, angular_frequencies, normalized_angular_frequencies};
}
