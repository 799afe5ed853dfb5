//! inference — uncertainty of fitted parameters.
//!
//! Purpose
//! -------
//! Convert optimizer curvature into covariance and standard errors in
//! physical units. Both fits in this crate finish here: the noise fit with
//! the BFGS inverse Hessian of its scaled likelihood, the transfer-function
//! fit with the Jacobian of its normalized residuals.
//!
//! Key behaviors
//! -------------
//! - Rescale scaled-coordinate covariances and extract standard errors.
//! - Pseudo-invert symmetric curvature with eigenvalue truncation.
//! - Compute least-squares parameter variances from a truncated SVD.
//!
//! Invariants & assumptions
//! ------------------------
//! - Near-singular directions are truncated, never reported as errors;
//!   malformed (non-square or non-finite) inputs are `OptError`s.
//!
//! Downstream usage
//! ----------------
//! - Import through [`prelude`] or the [`covariance`] module directly.

pub mod covariance;

pub use self::covariance::{
    observed_information_covariance, pseudo_inverse_symmetric, scale_covariance, standard_errors,
    svd_parameter_variances,
};

pub mod prelude {
    pub use super::covariance::prelude::*;
}
