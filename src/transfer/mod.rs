//! transfer — parametric transfer-function estimation from waveform pairs.
//!
//! Purpose
//! -------
//! Estimate the parameters of a model `H(p; ω)` relating an input waveform
//! to an output waveform when both carry noise described by a
//! [`NoiseModel`](crate::noise::NoiseModel).
//!
//! Key behaviors
//! -------------
//! - [`TransferFunction`] is the model seam: a response over angular
//!   frequencies and an optional analytic Jacobian.
//! - [`FrequencyBand`] restricts the model to a band; the empirical ratio
//!   `Y/X` fills the rest ([`HybridResponse`]).
//! - [`TlsProblem`] holds the total-least-squares residuals over the
//!   parameters and the input correction `ψ = x − μ`.
//! - [`fit`] validates inputs, runs Levenberg–Marquardt and reports
//!   estimates, variances and residuals in a [`FitResult`].
//!
//! Conventions
//! -----------
//! - Frequencies are angular, `ω = 2π·f`, on the real-FFT grid of the
//!   sampling time.
//! - With the default sign convention a pure delay `τ` is `e^{−iωτ}`.

pub mod band;
pub mod errors;
pub mod fit;
pub mod model;
pub mod tls;

pub use self::band::{BinSource, FrequencyBand, HybridResponse};
pub use self::errors::{FitError, TransferResult};
pub use self::fit::{FitOptions, FitResult, fit};
pub use self::model::{ScaleDelay, TransferFn, TransferFnWithJacobian, TransferFunction};
pub use self::tls::TlsProblem;

pub mod prelude {
    pub use super::band::prelude::*;
    pub use super::errors::{FitError, TransferResult};
    pub use super::fit::prelude::*;
    pub use super::model::prelude::*;
}
