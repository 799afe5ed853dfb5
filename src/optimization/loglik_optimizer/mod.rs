//! loglik_optimizer — argmin-powered BFGS maximizer for log-likelihoods.
//!
//! Purpose
//! -------
//! Provide the maximum-likelihood layer used by the noise fit. Callers
//! implement [`LogLikelihood`] and call [`maximize`]; BFGS runs on the
//! negated objective and the outcome carries the estimate, diagnostics and
//! the BFGS inverse-Hessian approximation needed for standard errors.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the cost `c(θ) = -ℓ(θ)`
//!   and falls back to finite differences when no analytic gradient exists.
//! - [`builders`] construct BFGS with the configured line search and
//!   tolerances; [`run::run_bfgs`] executes it from an identity inverse
//!   Hessian with an iteration cap of `200 × dim` unless one is given.
//! - [`run::IterateRecorder`] keeps the best iterate so that an aborted run
//!   still returns a (non-converged) [`OptimOutcome`].
//! - [`finite_diff`] holds validated numerical gradients, Hessians and
//!   Jacobians built on `finitediff`.
//!
//! Invariants & assumptions
//! ------------------------
//! - User code implements `ℓ` and `∇ℓ`, never the cost.
//! - [`OptimOutcome::value`] is `ℓ(θ̂)`; [`OptimOutcome::grad`] and
//!   [`OptimOutcome::inv_hessian`] refer to the cost `c`.
//! - `converged` is true only when a tolerance stopped the solver.
//!
//! Downstream usage
//! ----------------
//! - `noise::noisefit` implements [`LogLikelihood`] for the scaled
//!   likelihood and reads `inv_hessian` for its covariance.
//! - `transfer::fit` reuses [`finite_diff::forward_jacobian`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover sign conventions in [`adapter`], tolerance wiring in
//!   [`builders`], status mapping in [`traits`], derivative helpers in
//!   [`finite_diff`], and an end-to-end quadratic in [`api`].

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_MAX_ITER_PER_PARAM, FnEvalMap, Grad, Hessian, Theta};

pub mod prelude {
    pub use super::api::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Hessian, Theta};
}
