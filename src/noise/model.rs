//! noise::model — three-source time-domain noise model.
//!
//! Purpose
//! -------
//! Evaluate the pointwise noise variance of a waveform under additive,
//! multiplicative and timing noise, and draw reproducible synthetic noise
//! from it.
//!
//! Key behaviors
//! -------------
//! - `σ²(t) = σ_α² + σ_β²·x(t)² + σ_τ²·ẋ(t)²`, with `ẋ` the spectral time
//!   derivative of `x` at the resolved sampling time.
//! - [`NoiseModel::amplitude`] is the elementwise square root of the
//!   variance; [`NoiseModel::noise`] multiplies it by standard-normal draws
//!   from a `StdRng` seeded with the caller's seed.
//! - The `*_along` variants treat every lane of an n-dimensional array
//!   along `axis` as one signal and return an array of the input shape.
//!
//! Invariants & assumptions
//! ------------------------
//! - Noise amplitudes are expected to be non-negative but are not checked;
//!   only their squares enter the variance.
//! - When `dt` is `None`, the process-wide default is used, and with no
//!   default `σ_τ` is in units of the sampling time.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the variance floor, derivative term, seeded
//!   reproducibility, large-sample noise statistics and axis handling.
use crate::signal::{fft::RealFft, sampling::resolve_sampling_time};
use ndarray::{Array, Array1, ArrayView, ArrayView1, Axis, Dimension, Zip};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;

/// Noise amplitudes for the additive (`alpha`), multiplicative (`beta`) and
/// timing (`tau`) sources, plus an optional sampling time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
    pub sigma_alpha: f64,
    pub sigma_beta: f64,
    pub sigma_tau: f64,
    pub dt: Option<f64>,
}

impl NoiseModel {
    pub fn new(sigma_alpha: f64, sigma_beta: f64, sigma_tau: f64, dt: Option<f64>) -> Self {
        Self { sigma_alpha, sigma_beta, sigma_tau, dt }
    }

    /// Sampling time after resolution against the process-wide default.
    pub fn sampling_time(&self) -> f64 {
        resolve_sampling_time(self.dt)
    }

    /// Pointwise noise variance of a single signal.
    ///
    /// Parameters
    /// ----------
    /// - `x`: `ArrayView1<f64>`
    ///   Signal samples, uniformly spaced by the model's sampling time.
    ///
    /// Returns
    /// -------
    /// `Array1<f64>`
    ///   `σ_α² + σ_β²·x² + σ_τ²·ẋ²`, same length as `x`.
    ///
    /// Examples
    /// --------
    /// ```rust
    /// # use ndarray::Array1;
    /// # use thzfit::noise::model::NoiseModel;
    /// let model = NoiseModel::new(1e-3, 0.0, 0.0, Some(0.05));
    /// let var = model.variance(Array1::<f64>::zeros(16).view());
    /// assert!(var.iter().all(|&v| (v - 1e-6).abs() < 1e-18));
    /// ```
    pub fn variance(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let fft = RealFft::new(x.len());
        self.variance_with(&fft, x, self.sampling_time())
    }

    /// Pointwise noise amplitude, `sqrt(variance(x))`.
    pub fn amplitude(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.variance(x).mapv_into(f64::sqrt)
    }

    /// Synthetic noise realization for the signal `x`.
    ///
    /// Notes
    /// -----
    /// - Identical `x` and `seed` give bit-identical output; no global
    ///   generator state is touched.
    pub fn noise(&self, x: ArrayView1<f64>, seed: u64) -> Array1<f64> {
        let amplitude = self.amplitude(x);
        scale_by_normal_draws(amplitude, seed)
    }

    /// Variance of every lane of `x` along `axis`.
    ///
    /// Panics
    /// ------
    /// - Panics if `axis` is out of bounds for `x`.
    pub fn variance_along<D: Dimension>(&self, x: ArrayView<f64, D>, axis: Axis) -> Array<f64, D> {
        let dt = self.sampling_time();
        let fft = RealFft::new(x.len_of(axis));
        let mut out = Array::<f64, D>::zeros(x.raw_dim());
        Zip::from(out.lanes_mut(axis)).and(x.lanes(axis)).for_each(|mut lane_out, lane| {
            lane_out.assign(&self.variance_with(&fft, lane, dt));
        });
        out
    }

    /// Amplitude of every lane of `x` along `axis`.
    pub fn amplitude_along<D: Dimension>(
        &self, x: ArrayView<f64, D>, axis: Axis,
    ) -> Array<f64, D> {
        self.variance_along(x, axis).mapv_into(f64::sqrt)
    }

    /// Noise realization for every lane of `x` along `axis`.
    ///
    /// Draws are taken in the logical (row-major) order of `x`.
    pub fn noise_along<D: Dimension>(
        &self, x: ArrayView<f64, D>, axis: Axis, seed: u64,
    ) -> Array<f64, D> {
        let amplitude = self.amplitude_along(x, axis);
        scale_by_normal_draws(amplitude, seed)
    }

    pub(crate) fn variance_with(&self, fft: &RealFft, x: ArrayView1<f64>, dt: f64) -> Array1<f64> {
        let xdot = fft.derivative(x, dt);
        let va = self.sigma_alpha * self.sigma_alpha;
        let vb = self.sigma_beta * self.sigma_beta;
        let vt = self.sigma_tau * self.sigma_tau;
        Zip::from(&x).and(&xdot).map_collect(|&xi, &di| va + vb * xi * xi + vt * di * di)
    }
}

fn scale_by_normal_draws<D: Dimension>(amplitude: Array<f64, D>, seed: u64) -> Array<f64, D> {
    let mut rng = StdRng::seed_from_u64(seed);
    let draws =
        Array::<f64, D>::from_shape_simple_fn(amplitude.raw_dim(), || rng.sample(StandardNormal));
    amplitude * draws
}

pub mod prelude {
    pub use super::NoiseModel;
}
