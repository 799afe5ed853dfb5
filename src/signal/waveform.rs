//! signal::waveform — synthetic pulses and frequency-domain waveform edits.
//!
//! Purpose
//! -------
//! Small helpers around [`RealFft`] that the fits and their tests lean on:
//! time grids, a simulated terahertz pulse, per-waveform rescale and shift,
//! and filtering through a transfer function.
//!
//! Key behaviors
//! -------------
//! - [`timebase`] returns `t_init + k·dt`.
//! - [`wave`] synthesizes a pulse from a Gaussian laser envelope and a
//!   photoconductive response, normalized to a peak of `a`.
//! - [`scaleshift`] applies `x ↦ a·irfft(rfft(x)·e^{−iωη})` lane by lane.
//! - [`transfer`] applies `x ↦ irfft(rfft(x)·H(ω))`; `H` follows the
//!   `e^{+iωt}` convention and is conjugated when `fft_sign` is false.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every helper resolves its sampling time through
//!   [`resolve_sampling_time`], so they agree with the fits on `dt`.
//! - Shifts are circular.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the identity case of [`scaleshift`], whole-sample
//!   shifts, axis handling, the peak normalization of [`wave`] and the
//!   conjugation flag of [`transfer`].
use crate::signal::{
    errors::{SignalError, SignalResult},
    fft::{RealFft, angular_frequencies},
    sampling::resolve_sampling_time,
};
use ndarray::{Array, Array1, ArrayView, ArrayView1, Axis, Dimension, Zip};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Sample times `t_init + k·dt` for `k = 0..n`.
pub fn timebase(n: usize, dt: Option<f64>, t_init: f64) -> Array1<f64> {
    let dt = resolve_sampling_time(dt);
    Array1::from_shape_fn(n, |k| t_init + dt * k as f64)
}

/// Pulse parameters for [`wave`]. `None` fields take sampling-time based
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveOptions {
    pub dt: Option<f64>,
    /// Pulse center; default `0.3·n·dt`.
    pub t0: Option<f64>,
    /// Peak amplitude.
    pub a: f64,
    /// Carrier lifetime; default `6·dt`.
    pub taur: Option<f64>,
    /// Current rise time; default `2·dt`.
    pub tauc: Option<f64>,
    /// Laser pulse FWHM; default `dt`.
    pub fwhm: Option<f64>,
}

impl Default for WaveOptions {
    fn default() -> Self {
        Self { dt: None, t0: None, a: 1.0, taur: None, tauc: None, fwhm: None }
    }
}

/// Simulated terahertz pulse of `n` samples.
///
/// The spectrum is `s(ω) = −iω·(ℓ(ω)·r(ω))²·e^{iωt₀}` with the Gaussian
/// envelope `ℓ(ω) = exp(−(ωτ_l)²/2)/sqrt(2πτ_l²)`,
/// `τ_l = fwhm/sqrt(2 ln 2)`, and the response
/// `r(ω) = 1/(1/τ_r − iω) − 1/(1/τ_r + 1/τ_c − iω)`. The waveform is
/// `irfft(conj(s))`, rescaled so that its maximum equals `opts.a`.
///
/// Examples
/// --------
/// ```rust
/// # use thzfit::signal::waveform::{WaveOptions, wave};
/// let x = wave(256, &WaveOptions { dt: Some(0.05), ..WaveOptions::default() });
/// let peak = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
/// assert!((peak - 1.0).abs() < 1e-12);
/// ```
pub fn wave(n: usize, opts: &WaveOptions) -> Array1<f64> {
    let dt = resolve_sampling_time(opts.dt);
    let t0 = opts.t0.unwrap_or(0.3 * n as f64 * dt);
    let taur = opts.taur.unwrap_or(6.0 * dt);
    let tauc = opts.tauc.unwrap_or(2.0 * dt);
    let fwhm = opts.fwhm.unwrap_or(dt);
    let taul = fwhm / (2.0 * 2f64.ln()).sqrt();

    let w = angular_frequencies(n, dt);
    let spectrum = w.mapv(|wk| {
        let iw = Complex64::new(0.0, wk);
        let ell = (-(wk * taul).powi(2) / 2.0).exp() / (2.0 * PI * taul * taul).sqrt();
        let r = 1.0 / (1.0 / taur - iw) - 1.0 / (1.0 / taur + 1.0 / tauc - iw);
        let s = -iw * (r * ell).powi(2) * Complex64::from_polar(1.0, wk * t0);
        s.conj()
    });
    let x = RealFft::new(n).inverse(spectrum.view());
    let peak = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    x * (opts.a / peak)
}

/// Rescale and delay every lane of `x` along `axis`.
///
/// Parameters
/// ----------
/// - `x`: `ArrayView<f64, D>`
///   Waveforms; each lane along `axis` is one waveform.
/// - `a`, `eta`: `Option<ArrayView1<f64>>`
///   One amplitude factor and one delay per lane, in the order of
///   `x.lanes(axis)`. Missing corrections default to ones and zeros.
/// - `dt`: `Option<f64>`
///   Sampling time, resolved against the process-wide default.
/// - `axis`: `Axis`
///   Time axis.
///
/// Returns
/// -------
/// `SignalResult<Array<f64, D>>`
///   Array of the input shape. With `a = 1` and `eta = 0` the input is
///   reproduced to rounding.
///
/// Errors
/// ------
/// - `SignalError::CorrectionLengthMismatch` if `a` or `eta` does not have
///   one entry per lane.
/// - `SignalError::InvalidSamplingTime` for a non-positive sampling time.
pub fn scaleshift<D: Dimension>(
    x: ArrayView<f64, D>, a: Option<ArrayView1<f64>>, eta: Option<ArrayView1<f64>>,
    dt: Option<f64>, axis: Axis,
) -> SignalResult<Array<f64, D>> {
    let mut out = x.to_owned();
    if x.is_empty() {
        return Ok(out);
    }
    let dt = resolve_sampling_time(dt);
    if !dt.is_finite() || dt <= 0.0 {
        return Err(SignalError::InvalidSamplingTime { dt });
    }
    let n = x.len_of(axis);
    let lanes = x.len() / n;
    let a = per_lane("a", a, lanes, 1.0)?;
    let eta = per_lane("eta", eta, lanes, 0.0)?;

    let fft = RealFft::new(n);
    let w = angular_frequencies(n, dt);
    for (i, mut lane) in out.lanes_mut(axis).into_iter().enumerate() {
        let shifted = Zip::from(&fft.forward(lane.view()))
            .and(&w)
            .map_collect(|&c, &wk| c * Complex64::from_polar(a[i], -wk * eta[i]));
        lane.assign(&fft.inverse(shifted.view()));
    }
    Ok(out)
}

fn per_lane(
    name: &'static str, values: Option<ArrayView1<f64>>, lanes: usize, default: f64,
) -> SignalResult<Array1<f64>> {
    match values {
        None => Ok(Array1::from_elem(lanes, default)),
        Some(v) if v.len() == lanes => Ok(v.to_owned()),
        Some(v) => {
            Err(SignalError::CorrectionLengthMismatch { name, expected: lanes, found: v.len() })
        }
    }
}

/// Filter a waveform through a transfer function.
///
/// `tfun` receives the physical angular frequencies `2πk/(n·dt)`,
/// `k = 0..=n/2`, and must return one response value per frequency.
///
/// Errors
/// ------
/// - `SignalError::ResponseLengthMismatch` if `tfun` returns the wrong
///   number of values.
pub fn transfer<F>(
    tfun: F, x: ArrayView1<f64>, dt: Option<f64>, fft_sign: bool,
) -> SignalResult<Array1<f64>>
where
    F: Fn(ArrayView1<f64>) -> Array1<Complex64>,
{
    let dt = resolve_sampling_time(dt);
    let n = x.len();
    let fft = RealFft::new(n);
    let w = angular_frequencies(n, dt);
    let mut h = tfun(w.view());
    if h.len() != w.len() {
        return Err(SignalError::ResponseLengthMismatch { expected: w.len(), found: h.len() });
    }
    if !fft_sign {
        h.mapv_inplace(|c| c.conj());
    }
    Ok(fft.apply_response(x, h.view()))
}

pub mod prelude {
    pub use super::{WaveOptions, scaleshift, timebase, transfer, wave};
}
