//! numerical_stability — guarded transforms and shared tolerances.
//!
//! Purpose
//! -------
//! Collect the small numeric helpers that the noise fit and the covariance
//! routines share: a logarithm that tolerates zero amplitudes, the maps
//! between noise amplitudes and scaled log-variances, and truncation
//! tolerances for pseudo-inverses.
//!
//! Key behaviors
//! -------------
//! - `safe_ln` returns `-∞` for non-positive input so that a zero noise
//!   amplitude survives the trip into log-variance space.
//! - `log_variance_from_amplitude` / `amplitude_from_log_variance` apply the
//!   per-term amplitude scale and the global variance scale.
//! - `amplitude_error_from_log_variance` propagates a log-variance standard
//!   error to amplitude units by the delta method.
//!
//! Invariants & assumptions
//! ------------------------
//! - Pure scalar functions; no allocation, no state.
//! - Callers validate finiteness of user input before reaching these
//!   helpers; `-∞` is the only non-finite value produced on purpose.
//!
//! Downstream usage
//! ----------------
//! - `noise::noisefit` derives initial log-variances and reports σ and its
//!   standard error through these maps.
//! - `inference::covariance` reuses `EIGEN_EPS` when inverting curvature
//!   matrices.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] cover the `-∞` edge case, map
//!   inversion and the delta-method slope against a finite difference.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, amplitude_error_from_log_variance, amplitude_from_log_variance,
    log_variance_from_amplitude, safe_ln,
};

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, amplitude_error_from_log_variance, amplitude_from_log_variance,
        log_variance_from_amplitude, safe_ln,
    };
}
