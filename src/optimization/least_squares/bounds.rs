//! Box constraints for least-squares parameters.
//!
//! Levenberg–Marquardt is unconstrained, so bounded parameters are optimized
//! in an internal coordinate `u` mapped onto the box:
//!
//! - both bounds finite: `p = lo + (hi − lo)·(sin u + 1)/2`;
//! - lower bound only: `p = lo − 1 + sqrt(u² + 1)`;
//! - upper bound only: `p = hi + 1 − sqrt(u² + 1)`;
//! - unbounded: `p = u`.
//!
//! [`ParamBounds::external`] and [`ParamBounds::internal`] are inverse on the
//! interior of the box; [`ParamBounds::external_derivative`] is `dp/du` for
//! the Jacobian chain rule.
//!
//! `dp/du` vanishes on a finite bound, so a run started there never leaves
//! it. Starting points go through [`ParamBounds::nudge_inside`] first.
use crate::optimization::errors::{OptError, OptResult};
use ndarray::{Array1, ArrayView1, Zip};

/// Distance a starting value keeps from a finite bound: this fraction of
/// the box width, or of `max(1, |bound|)` for a one-sided box.
pub const BOUND_NUDGE: f64 = 1e-3;

/// Elementwise lower and upper bounds. Use `±∞` for an open side.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl ParamBounds {
    /// Errors
    /// ------
    /// - `OptError::BoundsLengthMismatch` if the vectors differ in length.
    /// - `OptError::InvalidBounds` if `lower > upper` or either is NaN.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> OptResult<Self> {
        if lower.len() != upper.len() {
            return Err(OptError::BoundsLengthMismatch {
                expected: lower.len(),
                lower: lower.len(),
                upper: upper.len(),
            });
        }
        for (index, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(OptError::InvalidBounds { index, lower: lo, upper: hi });
            }
        }
        Ok(Self { lower, upper })
    }

    /// No constraint on any of `n` parameters.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: Array1::from_elem(n, f64::NEG_INFINITY),
            upper: Array1::from_elem(n, f64::INFINITY),
        }
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn lower(&self) -> ArrayView1<'_, f64> {
        self.lower.view()
    }

    pub fn upper(&self) -> ArrayView1<'_, f64> {
        self.upper.view()
    }

    /// Check that the bounds cover `p` and contain it.
    ///
    /// Errors
    /// ------
    /// - `OptError::BoundsLengthMismatch` if `p` has a different length.
    /// - `OptError::OutsideBounds` for the first entry outside its box.
    pub fn check_contains(&self, p: ArrayView1<f64>) -> OptResult<()> {
        if p.len() != self.len() {
            return Err(OptError::BoundsLengthMismatch {
                expected: p.len(),
                lower: self.lower.len(),
                upper: self.upper.len(),
            });
        }
        for (index, ((&value, &lower), &upper)) in
            p.iter().zip(self.lower.iter()).zip(self.upper.iter()).enumerate()
        {
            if !(lower..=upper).contains(&value) {
                return Err(OptError::OutsideBounds { index, value, lower, upper });
            }
        }
        Ok(())
    }

    /// `p` with every entry closer than [`BOUND_NUDGE`] to a finite bound
    /// moved to that distance inside. Entries of a degenerate box
    /// (`lower == upper`) and interior entries are returned unchanged.
    pub fn nudge_inside(&self, p: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(p).and(&self.lower).and(&self.upper).map_collect(|&p, &lo, &hi| {
            match (lo.is_finite(), hi.is_finite()) {
                (true, true) if hi > lo => {
                    let step = BOUND_NUDGE * (hi - lo);
                    p.clamp(lo + step, hi - step)
                }
                (true, false) => p.max(lo + BOUND_NUDGE * lo.abs().max(1.0)),
                (false, true) => p.min(hi - BOUND_NUDGE * hi.abs().max(1.0)),
                _ => p,
            }
        })
    }

    /// Internal coordinate `u` of an in-bounds parameter vector `p`.
    pub fn internal(&self, p: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(p).and(&self.lower).and(&self.upper).map_collect(|&p, &lo, &hi| {
            match (lo.is_finite(), hi.is_finite()) {
                (true, true) if hi > lo => {
                    (2.0 * (p - lo) / (hi - lo) - 1.0).clamp(-1.0, 1.0).asin()
                }
                (true, true) => 0.0,
                (true, false) => ((p - lo + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
                (false, true) => ((hi - p + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
                (false, false) => p,
            }
        })
    }

    /// Parameter vector `p` for the internal coordinate `u`.
    pub fn external(&self, u: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(u).and(&self.lower).and(&self.upper).map_collect(|&u, &lo, &hi| {
            match (lo.is_finite(), hi.is_finite()) {
                (true, true) => lo + (hi - lo) * (u.sin() + 1.0) / 2.0,
                (true, false) => lo - 1.0 + (u * u + 1.0).sqrt(),
                (false, true) => hi + 1.0 - (u * u + 1.0).sqrt(),
                (false, false) => u,
            }
        })
    }

    /// Elementwise `dp/du` at `u`.
    pub fn external_derivative(&self, u: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(u).and(&self.lower).and(&self.upper).map_collect(|&u, &lo, &hi| {
            match (lo.is_finite(), hi.is_finite()) {
                (true, true) => (hi - lo) * u.cos() / 2.0,
                (true, false) => u / (u * u + 1.0).sqrt(),
                (false, true) => -u / (u * u + 1.0).sqrt(),
                (false, false) => 1.0,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover bound validation, the internal/external round trip
    // for each kind of box, the derivative against a difference quotient,
    // and moving starting values off a bound.
    // -------------------------------------------------------------------------

    fn mixed() -> ParamBounds {
        ParamBounds::new(
            array![0.0, 1.0, f64::NEG_INFINITY, f64::NEG_INFINITY],
            array![2.0, f64::INFINITY, 5.0, f64::INFINITY],
        )
        .expect("valid bounds")
    }

    #[test]
    // Purpose
    // -------
    // Malformed bounds and out-of-box parameters are rejected.
    //
    // Given
    // -----
    // - Length-mismatched vectors, lower > upper, and a point above its box.
    //
    // Expect
    // ------
    // - `BoundsLengthMismatch`, `InvalidBounds` and `OutsideBounds`.
    fn bounds_reject_malformed_input() {
        assert!(matches!(
            ParamBounds::new(array![0.0], array![1.0, 2.0]),
            Err(OptError::BoundsLengthMismatch { lower: 1, upper: 2, .. })
        ));
        assert_eq!(
            ParamBounds::new(array![0.0, 3.0], array![1.0, 2.0]),
            Err(OptError::InvalidBounds { index: 1, lower: 3.0, upper: 2.0 })
        );
        assert_eq!(
            mixed().check_contains(array![1.0, 1.0, 6.0, 0.0].view()),
            Err(OptError::OutsideBounds {
                index: 2,
                value: 6.0,
                lower: f64::NEG_INFINITY,
                upper: 5.0,
            })
        );
    }

    #[test]
    // Purpose
    // -------
    // `external(internal(p)) = p` for interior points of every box kind.
    //
    // Given
    // -----
    // - p = (0.5, 3.0, -2.0, 7.0) with the mixed bounds above.
    //
    // Expect
    // ------
    // - Round trip to 1e-12.
    fn internal_external_round_trip() {
        let bounds = mixed();
        let p = array![0.5, 3.0, -2.0, 7.0];
        let back = bounds.external(bounds.internal(p.view()).view());
        for (got, want) in back.iter().zip(p.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // `external_derivative` matches a central difference quotient.
    //
    // Given
    // -----
    // - u = (0.3, 1.2, -0.7, 4.0), step 1e-6.
    //
    // Expect
    // ------
    // - Agreement to 1e-8.
    fn external_derivative_matches_difference_quotient() {
        let bounds = mixed();
        let u = array![0.3, 1.2, -0.7, 4.0];
        let h = 1e-6;
        let d = bounds.external_derivative(u.view());
        let up = bounds.external((&u + h).view());
        let down = bounds.external((&u - h).view());
        for i in 0..4 {
            assert_abs_diff_eq!(d[i], (up[i] - down[i]) / (2.0 * h), epsilon = 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // Starting values on a finite bound are moved inside so that `dp/du` is
    // non-zero there; interior values and degenerate boxes are untouched.
    //
    // Given
    // -----
    // - The mixed bounds above with p = (0, 1, 5, 7): every bounded entry on
    //   its bound.
    // - p = (0.5, 3, -2, 7): every entry interior.
    // - A degenerate box [1, 1] with p = 1.
    //
    // Expect
    // ------
    // - (0.002, 1.001, 4.995, 7), each bounded entry with |dp/du| > 1e-2.
    // - The interior vector unchanged.
    // - The degenerate entry unchanged.
    fn nudge_inside_moves_values_off_bounds() {
        // Arrange
        let bounds = mixed();
        let on_bounds = array![0.0, 1.0, 5.0, 7.0];
        let interior = array![0.5, 3.0, -2.0, 7.0];
        let pinned = ParamBounds::new(array![1.0], array![1.0]).expect("valid bounds");

        // Act
        let nudged = bounds.nudge_inside(on_bounds.view());
        let slope = bounds.external_derivative(bounds.internal(nudged.view()).view());

        // Assert
        let want = [0.002, 1.001, 4.995, 7.0];
        for i in 0..4 {
            assert_abs_diff_eq!(nudged[i], want[i], epsilon = 1e-12);
        }
        for i in 0..3 {
            assert!(slope[i].abs() > 1e-2, "slope[{i}] = {}", slope[i]);
        }
        assert_eq!(bounds.nudge_inside(interior.view()), interior);
        assert_eq!(pinned.nudge_inside(array![1.0].view()), array![1.0]);
    }
}
