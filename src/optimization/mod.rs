//! optimization — solver layer shared by the noise and transfer fits.
//!
//! Purpose
//! -------
//! Keep solver details behind two small entry points: an `argmin` BFGS
//! maximizer for log-likelihoods and a Levenberg–Marquardt driver for
//! residual vectors. Both report failures through one error type.
//!
//! Key behaviors
//! -------------
//! - [`loglik_optimizer`]: maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`,
//!   with finite-difference fallbacks for gradients, Hessians and
//!   Jacobians.
//! - [`least_squares`]: validated Levenberg–Marquardt options, box bounds
//!   through a smooth reparameterization, and a run report.
//! - [`numerical_stability`]: log-variance maps and truncation tolerances.
//! - [`errors`]: `OptError` / `OptResult<T>` for every failure above.
//!
//! Invariants & assumptions
//! ------------------------
//! - Non-convergence is reported in the outcome or report, never as an
//!   error. Errors mean the problem could not be run or evaluated.
//!
//! Downstream usage
//! ----------------
//! - `noise::noisefit` drives [`loglik_optimizer::maximize`].
//! - `transfer::fit` drives [`least_squares::run_levenberg_marquardt`].
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests on toy problems with known optima.

pub mod errors;
pub mod least_squares;
pub mod loglik_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::least_squares::prelude::*;
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
}
