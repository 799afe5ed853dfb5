//! thzfit — noise-model estimation and transfer-function fitting for
//! terahertz time-domain waveforms.
//!
//! Purpose
//! -------
//! Serve as the crate root. A time-domain measurement is a sampled
//! waveform `x(t_k)` whose noise has three parts: a constant floor
//! (`σ_α`), a part proportional to the signal (`σ_β`), and a part
//! proportional to its slope from timing jitter (`σ_τ`). This crate
//! estimates those amplitudes from repeated measurements and fits
//! parametric transfer functions between input and output waveforms with
//! that noise taken into account.
//!
//! Key behaviors
//! -------------
//! - [`signal`]: real-FFT helpers, the process-wide sampling-time default,
//!   simulated pulses, rescale/shift and transfer-function filtering.
//! - [`noise`]: the [`NoiseModel`], the negative log-likelihood of repeated
//!   waveforms, and [`noisefit`], its maximum-likelihood estimator.
//! - [`transfer`]: the [`TransferFunction`] seam and [`fit`], a
//!   total-least-squares estimator that treats input and output as noisy.
//! - [`optimization`] and [`inference`]: the BFGS and Levenberg–Marquardt
//!   drivers and the covariance algebra behind reported uncertainties.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every fallible public routine returns a module-specific `Result`
//!   (`NoiseResult`, `FitError`, `SignalResult`, `OptResult`); nothing
//!   panics on malformed user input.
//! - Non-convergence is reported in the returned result, not as an error.
//!
//! Conventions
//! -----------
//! - Times and delays are in the units of the sampling time `dt`; when a
//!   routine takes `dt: Option<f64>` and none is given, the global default
//!   from [`signal::sampling`] applies, falling back to `1.0`.
//! - Repeated measurements are laid out waveform-major: `m` rows of `n`
//!   samples.
//! - Logging goes through `tracing`; install a subscriber to see solver
//!   progress and sampling-time warnings.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; `tests/` holds end-to-end runs on
//!   simulated data with fixed seeds.

pub mod inference;
pub mod noise;
pub mod optimization;
pub mod signal;
pub mod transfer;

pub use crate::noise::{NoiseFitOptions, NoiseFitResult, NoiseModel, noisefit};
pub use crate::signal::{
    WaveOptions, reset_sampling_time, sampling_time, scaleshift, set_sampling_time, timebase,
    wave,
};
pub use crate::transfer::{FitOptions, FitResult, TransferFunction, fit};

pub mod prelude {
    pub use crate::noise::prelude::*;
    pub use crate::signal::prelude::*;
    pub use crate::transfer::prelude::*;
}
