//! noise — three-source noise model and its joint maximum-likelihood fit.
//!
//! Purpose
//! -------
//! Describe how additive, multiplicative and timing noise corrupt a
//! time-domain waveform, and estimate those noise amplitudes together with
//! the underlying signal and per-waveform drift from repeated measurements.
//!
//! Key behaviors
//! -------------
//! - [`model::NoiseModel`] evaluates `σ²(t) = σ_α² + σ_β²x² + σ_τ²ẋ²` and
//!   draws seeded synthetic noise.
//! - [`nll::scaled_nll`] is the scaled negative log-likelihood with its
//!   closed-form gradient over the free parameter blocks.
//! - [`blocks`] names the six parameter blocks and packs the free ones into
//!   the flat optimizer vector.
//! - [`noisefit::noisefit`] drives BFGS on that objective and reports
//!   estimates with standard errors in physical units.
//!
//! Invariants & assumptions
//! ------------------------
//! - Data are waveform-major: `m` rows of `n` samples.
//! - Delays and timing noise are in physical time; internally they are
//!   carried in units of the sampling time.
//!
//! Downstream usage
//! ----------------
//! - `transfer::fit` uses [`NoiseModel`] to weight its residuals.

pub mod blocks;
pub mod errors;
pub mod model;
pub mod nll;
pub mod noisefit;

pub use self::blocks::{BlockLayout, BlockValues, FixedBlocks, ParamBlock};
pub use self::errors::{NoiseError, NoiseResult};
pub use self::model::NoiseModel;
pub use self::noisefit::{CovarianceMethod, NoiseFitOptions, NoiseFitResult, noisefit};

pub mod prelude {
    pub use super::blocks::prelude::*;
    pub use super::errors::{NoiseError, NoiseResult};
    pub use super::model::prelude::*;
    pub use super::nll::prelude::*;
    pub use super::noisefit::prelude::*;
}
