//! least_squares — Levenberg–Marquardt layer for residual-vector fits.
//!
//! Purpose
//! -------
//! Run `levenberg_marquardt` on any `LeastSquaresProblem` with validated
//! options, optional box constraints, and a plain report of how the run
//! ended.
//!
//! Key behaviors
//! -------------
//! - [`LeastSquaresOptions`] mirrors the solver's `ftol`, `xtol`, `gtol`
//!   and `patience`, with the solver's defaults.
//! - [`ParamBounds`] maps bounded parameters to an unconstrained internal
//!   coordinate and back, with the derivative needed for Jacobians.
//! - [`run_levenberg_marquardt`] returns the solved problem together with a
//!   [`LeastSquaresReport`].
//!
//! Downstream usage
//! ----------------
//! - `transfer::fit` implements `LeastSquaresProblem` for its residuals and
//!   drives it through this module.

pub mod bounds;
pub mod options;
pub mod run;

pub use self::bounds::ParamBounds;
pub use self::options::LeastSquaresOptions;
pub use self::run::{LeastSquaresReport, run_levenberg_marquardt};

pub mod prelude {
    pub use super::{LeastSquaresOptions, LeastSquaresReport, ParamBounds, run_levenberg_marquardt};
}
