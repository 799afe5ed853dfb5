//! Numerical stability utilities.
//!
//! Guarded scalar transforms used when mapping noise amplitudes to and from
//! the scaled log-variance coordinates the optimizer works in, plus shared
//! tolerances for eigenvalue and singular-value truncation.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: relative floor below which an eigenvalue of a
//!   curvature matrix is treated as zero.
//! - [`safe_ln(x)`]: `ln(x)` for `x > 0`, `-∞` otherwise.
//! - [`log_variance_from_amplitude`] / [`amplitude_from_log_variance`]:
//!   the pair of maps between a noise amplitude `σ` and its scaled
//!   log-variance `L = ln(σ² / (s² v))`.
//! - [`amplitude_error_from_log_variance`]: first-order (delta-method)
//!   propagation of a standard error on `L` to a standard error on `σ`.

/// Relative eigenvalue cutoff for pseudo-inverses of curvature matrices.
///
/// Eigenvalues below `EIGEN_EPS * max(|λ|)` are discarded.
pub const EIGEN_EPS: f64 = 1e-10;

/// Logarithm that maps the non-positive half-line to `-∞` instead of NaN.
///
/// A zero noise amplitude corresponds to a log-variance of `-∞`, which the
/// likelihood evaluates to a zero contribution through `exp(-∞) = 0`.
///
/// # Parameters
/// - `x`: real input
///
/// # Returns
/// - `ln(x)` when `x > 0`, `f64::NEG_INFINITY` otherwise (including `NaN`).
pub fn safe_ln(x: f64) -> f64 {
    if x > 0.0 { x.ln() } else { f64::NEG_INFINITY }
}

/// Scaled log-variance `L = ln(σ² / (scale² · v))` of an amplitude `σ`.
///
/// `scale` is the per-term amplitude scale and `v` the global variance
/// scale. Returns `-∞` for `σ = 0`.
pub fn log_variance_from_amplitude(sigma: f64, scale: f64, v: f64) -> f64 {
    safe_ln(sigma * sigma / (scale * scale) / v)
}

/// Inverse of [`log_variance_from_amplitude`]: `σ = sqrt(exp(L) · scale² · v)`.
pub fn amplitude_from_log_variance(log_v: f64, scale: f64, v: f64) -> f64 {
    (log_v.exp() * scale * scale * v).sqrt()
}

/// Delta-method standard error of `σ` given the standard error of `L`.
///
/// Since `σ ∝ exp(L / 2)`, `dσ/dL = σ / 2` and `se(σ) = σ · se(L) / 2`.
pub fn amplitude_error_from_log_variance(sigma: f64, log_v_err: f64) -> f64 {
    0.5 * sigma * log_v_err
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover the guarded logarithm and the amplitude/log-variance
    // maps, including the zero-amplitude edge case.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // `safe_ln` agrees with `ln` on positives and returns -∞ elsewhere.
    //
    // Given
    // -----
    // - Positive, zero, negative and NaN inputs.
    //
    // Expect
    // ------
    // - `ln(x)` for positives; `-∞` for the rest.
    fn safe_ln_maps_nonpositive_to_negative_infinity() {
        assert_relative_eq!(safe_ln(2.5), 2.5_f64.ln());
        assert_eq!(safe_ln(0.0), f64::NEG_INFINITY);
        assert_eq!(safe_ln(-1.0), f64::NEG_INFINITY);
        assert_eq!(safe_ln(f64::NAN), f64::NEG_INFINITY);
    }

    #[test]
    // Purpose
    // -------
    // The amplitude and log-variance maps invert each other.
    //
    // Given
    // -----
    // - σ = 3e-3 with scale 0.05 and v = 1e-5.
    //
    // Expect
    // ------
    // - Round trip reproduces σ to relative precision.
    fn amplitude_log_variance_maps_are_inverse() {
        let (sigma, scale, v) = (3e-3, 0.05, 1e-5);
        let log_v = log_variance_from_amplitude(sigma, scale, v);
        assert_relative_eq!(amplitude_from_log_variance(log_v, scale, v), sigma, max_relative = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // A zero amplitude maps to -∞ and back to exactly zero.
    //
    // Given
    // -----
    // - σ = 0.
    //
    // Expect
    // ------
    // - `L = -∞` and `σ = 0` after the inverse map.
    fn zero_amplitude_round_trips_through_negative_infinity() {
        let log_v = log_variance_from_amplitude(0.0, 1.0, 1e-5);
        assert_eq!(log_v, f64::NEG_INFINITY);
        assert_eq!(amplitude_from_log_variance(log_v, 1.0, 1e-5), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // The delta-method error matches a finite-difference slope of σ(L).
    //
    // Given
    // -----
    // - L = 0.7 with unit scales and se(L) = 1.
    //
    // Expect
    // ------
    // - `amplitude_error_from_log_variance` equals dσ/dL within 1e-6.
    fn amplitude_error_matches_numeric_slope() {
        let log_v = 0.7;
        let h = 1e-6;
        let slope = (amplitude_from_log_variance(log_v + h, 1.0, 1.0)
            - amplitude_from_log_variance(log_v - h, 1.0, 1.0))
            / (2.0 * h);
        let sigma = amplitude_from_log_variance(log_v, 1.0, 1.0);
        assert_relative_eq!(amplitude_error_from_log_variance(sigma, 1.0), slope, max_relative = 1e-6);
    }
}
