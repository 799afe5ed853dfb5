//! transfer::fit — total-least-squares fit of a parametric transfer function.
//!
//! Purpose
//! -------
//! Fit the parameters of a transfer function `H(p; ω)` that maps a measured
//! input waveform `x` onto a measured output `y`, treating both as noisy.
//! The noise-free input `μ` is estimated jointly with `p`.
//!
//! Key behaviors
//! -------------
//! - Residual weights come from a [`NoiseModel`] evaluated at the raw `x`
//!   and `y`.
//! - Outside the requested [`FrequencyBand`] the empirical estimate `Y/X`
//!   replaces the model.
//! - Levenberg–Marquardt minimizes the normalized residuals of
//!   [`TlsProblem`]; bounded parameters go through the transform of
//!   [`ParamBounds`].
//! - Variances come from the truncated-SVD pseudo-inverse of the final
//!   residual Jacobian in external coordinates.
//!
//! Invariants & assumptions
//! ------------------------
//! - `x` and `y` have the same length `n ≥ 1` and every noise amplitude is
//!   positive.
//! - A run that stops without converging still returns `Ok`, with
//!   `success == false`.
use crate::{
    inference::covariance::{fill_dmatrix, svd_parameter_variances},
    noise::model::NoiseModel,
    optimization::{
        errors::OptError,
        least_squares::{LeastSquaresOptions, LeastSquaresReport, ParamBounds, run_levenberg_marquardt},
    },
    signal::{
        fft::{RealFft, angular_frequencies},
        sampling::resolve_sampling_time,
    },
    transfer::{
        band::{FrequencyBand, HybridResponse},
        errors::{FitError, TransferResult},
        model::TransferFunction,
        tls::TlsProblem,
    },
};
use ndarray::{Array1, Array2, ArrayView1, s};
use tracing::debug;

/// Options for [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub dt: Option<f64>,
    /// Noise amplitudes `(σ_α, σ_β, σ_τ)` used to weight the residuals.
    pub sigma_parms: [f64; 3],
    /// Band in which the model is trusted.
    pub band: FrequencyBand,
    /// Optional box constraints on `p`.
    pub bounds: Option<ParamBounds>,
    /// `false` conjugates the model response before it is applied.
    pub fft_sign: bool,
    pub lsq: LeastSquaresOptions,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            dt: None,
            sigma_parms: [1.0, 0.0, 0.0],
            band: FrequencyBand::default(),
            bounds: None,
            fft_sign: true,
            lsq: LeastSquaresOptions::default(),
        }
    }
}

impl FitOptions {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn with_sigma_parms(mut self, sigma_alpha: f64, sigma_beta: f64, sigma_tau: f64) -> Self {
        self.sigma_parms = [sigma_alpha, sigma_beta, sigma_tau];
        self
    }

    pub fn with_band(mut self, band: FrequencyBand) -> Self {
        self.band = band;
        self
    }

    pub fn with_bounds(mut self, bounds: ParamBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// `false` conjugates the model response before it is applied.
    pub fn with_fft_sign(mut self, fft_sign: bool) -> Self {
        self.fft_sign = fft_sign;
        self
    }

    pub fn with_lsq(mut self, lsq: LeastSquaresOptions) -> Self {
        self.lsq = lsq;
        self
    }
}

/// Output of [`fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    /// Fitted transfer-function parameters.
    pub p_opt: Array1<f64>,
    /// Variances of `p_opt`.
    pub p_var: Array1<f64>,
    /// Estimated noise-free input waveform.
    pub mu_opt: Array1<f64>,
    /// Variances of `mu_opt`.
    pub mu_var: Array1<f64>,
    /// Sum of squared normalized residuals.
    pub resnorm: f64,
    /// Input residual `x − μ`.
    pub delta: Array1<f64>,
    /// Output residual `y − irfft(rfft(μ)·H)`.
    pub epsilon: Array1<f64>,
    pub success: bool,
    /// Solver report.
    pub report: LeastSquaresReport,
    /// Final residual Jacobian in `(p, ψ)`, `2n × (n_p + n)`.
    pub jacobian: Array2<f64>,
}

/// fit — total-least-squares transfer-function fit.
///
/// Parameters
/// ----------
/// - `tf`: `&T`
///   Transfer-function model.
/// - `p0`: `ArrayView1<f64>`
///   Initial parameters; must lie within `opts.bounds` when given.
/// - `x`, `y`: `ArrayView1<f64>`
///   Measured input and output waveforms of equal length.
/// - `opts`: `&FitOptions`
///   Sampling time, noise amplitudes, band, bounds, sign convention and
///   solver tolerances.
///
/// Returns
/// -------
/// `TransferResult<FitResult>`
///
/// Errors
/// ------
/// - `FitError::EmptySignal` / `FitError::LengthMismatch` for malformed
///   waveforms, `FitError::InvalidSamplingTime` for a bad `dt`.
/// - `FitError::ParameterCountMismatch`, `FitError::NonFiniteGuess`,
///   `FitError::BoundsLengthMismatch` and `FitError::GuessOutsideBounds`
///   for a bad starting point.
/// - `FitError::NonPositiveNoise` when a noise amplitude is zero.
/// - `FitError::NonFiniteResidual` and response-shape errors when the model
///   cannot be evaluated at `p0`.
///
/// Examples
/// --------
/// ```rust,no_run
/// # use ndarray::array;
/// # use thzfit::transfer::{FitOptions, ScaleDelay, fit};
/// # let (x, y) = (ndarray::Array1::<f64>::zeros(64), ndarray::Array1::<f64>::zeros(64));
/// let res = fit(&ScaleDelay, array![1.0, 0.0].view(), x.view(), y.view(), &FitOptions::default())?;
/// println!("a = {}, tau = {}", res.p_opt[0], res.p_opt[1]);
/// # Ok::<(), thzfit::transfer::FitError>(())
/// ```
pub fn fit<T: TransferFunction + ?Sized>(
    tf: &T, p0: ArrayView1<f64>, x: ArrayView1<f64>, y: ArrayView1<f64>, opts: &FitOptions,
) -> TransferResult<FitResult> {
    let n = x.len();
    if y.len() != n {
        return Err(FitError::LengthMismatch { x: n, y: y.len() });
    }
    if n == 0 {
        return Err(FitError::EmptySignal);
    }
    let dt = resolve_sampling_time(opts.dt);
    if !dt.is_finite() || dt <= 0.0 {
        return Err(FitError::InvalidSamplingTime { dt });
    }
    if let Some(expected) = tf.n_params() {
        if p0.len() != expected {
            return Err(FitError::ParameterCountMismatch { expected, found: p0.len() });
        }
    }
    if let Some(index) = p0.iter().position(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteGuess { index, value: p0[index] });
    }
    let n_p = p0.len();
    let bounds = match &opts.bounds {
        Some(b) if b.len() != n_p => {
            return Err(FitError::BoundsLengthMismatch { expected: n_p, found: b.len() });
        }
        Some(b) => b.clone(),
        None => ParamBounds::unbounded(n_p),
    };
    bounds.check_contains(p0).map_err(|err| match err {
        OptError::OutsideBounds { index, value, lower, upper } => {
            FitError::GuessOutsideBounds { index, value, lower, upper }
        }
        other => FitError::Optimization(other),
    })?;

    let [sa, sb, st] = opts.sigma_parms;
    let noise = NoiseModel::new(sa, sb, st, Some(dt));
    let sigma_x = positive_noise("x", noise.amplitude(x))?;
    let sigma_y = positive_noise("y", noise.amplitude(y))?;

    let fft = RealFft::new(n);
    let w = angular_frequencies(n, dt);
    let (x_spec, y_spec) = (fft.forward(x), fft.forward(y));
    let hybrid = HybridResponse::new(&opts.band, w.view(), x_spec.view(), y_spec.view(), opts.fft_sign);
    debug!(n, n_p, in_band = hybrid.in_band_frequencies().len(), "starting transfer-function fit");

    let problem = TlsProblem::new(
        tf,
        hybrid,
        x.to_owned(),
        y.to_owned(),
        sigma_x,
        sigma_y,
        bounds,
        p0,
    );
    problem.residuals_at(p0, Array1::zeros(n).view())?;

    let (solved, report) = run_levenberg_marquardt(problem, &opts.lsq)?;
    let (p_opt, psi) = solved.external_params();
    let mu_opt = &x - &psi;
    let epsilon = &y - &solved.predict(p_opt.view(), mu_opt.view())?;
    let residuals = solved.residuals_at(p_opt.view(), psi.view())?;
    let jacobian = solved.jacobian_at(p_opt.view(), psi.view())?;
    let variances = svd_parameter_variances(&fill_dmatrix(&jacobian))?;

    debug!(success = report.success, termination = %report.termination, "transfer-function fit finished");
    Ok(FitResult {
        p_var: variances.slice(s![..n_p]).to_owned(),
        mu_var: variances.slice(s![n_p..]).to_owned(),
        p_opt,
        mu_opt,
        resnorm: residuals.mapv(|r| r * r).sum(),
        delta: psi,
        epsilon,
        success: report.success,
        report,
        jacobian,
    })
}

fn positive_noise(signal: &'static str, sigma: Array1<f64>) -> TransferResult<Array1<f64>> {
    match sigma.iter().position(|&s| !(s.is_finite() && s > 0.0)) {
        Some(index) => Err(FitError::NonPositiveNoise { signal, index, value: sigma[index] }),
        None => Ok(sigma),
    }
}

pub mod prelude {
    pub use super::{FitOptions, FitResult, fit};
}
