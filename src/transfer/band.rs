//! transfer::band — per-bin choice between the model and the data.
//!
//! Purpose
//! -------
//! Restrict a parametric transfer function to the frequency band it was
//! written for. Outside the band the fit uses the empirical transfer
//! function estimate `Y(ω)/X(ω)` of the measured waveforms instead.
//!
//! Key behaviors
//! -------------
//! - A bin at angular frequency `ω` is in band when
//!   `2π·low < ω <= 2π·high`; the DC bin is therefore empirical for the
//!   default band `[0, ∞)`.
//! - [`HybridResponse::evaluate`] calls the model on the in-band
//!   frequencies only and splices the result into the empirical estimate.
//! - [`HybridResponse::jacobian`] is zero outside the band; inside it uses
//!   the model's analytic Jacobian or forward differences on the real and
//!   imaginary parts.
//! - With `fft_sign = false` the model response and its Jacobian are
//!   conjugated.
//!
//! Invariants & assumptions
//! ------------------------
//! - A bin whose input spectrum is exactly zero gets an empirical estimate
//!   of zero and a warning.
use crate::{
    optimization::loglik_optimizer::{Theta, finite_diff::forward_jacobian},
    transfer::{
        errors::{FitError, TransferResult},
        model::TransferFunction,
    },
};
use ndarray::{Array1, Array2, ArrayView1, Zip, s};
use num_complex::Complex64;
use std::f64::consts::PI;
use tracing::warn;

/// Frequency band `[low, high]` in cycles per unit time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    low: f64,
    high: f64,
}

impl Default for FrequencyBand {
    fn default() -> Self {
        Self { low: 0.0, high: f64::INFINITY }
    }
}

impl FrequencyBand {
    /// Errors
    /// ------
    /// - `FitError::InvalidFrequencyBand` unless `0 <= low < high` and
    ///   `low` is finite.
    pub fn new(low: f64, high: f64) -> TransferResult<Self> {
        if !low.is_finite() || low < 0.0 || high.is_nan() || low >= high {
            return Err(FitError::InvalidFrequencyBand { low, high });
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    /// Whether angular frequency `w` lies inside the band.
    pub fn contains_angular(&self, w: f64) -> bool {
        w > 2.0 * PI * self.low && w <= 2.0 * PI * self.high
    }
}

/// Where one frequency bin takes its response from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSource {
    Empirical,
    Model,
}

/// Hybrid response over the rfft grid: model in band, data out of band.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridResponse {
    sources: Vec<BinSource>,
    w_in: Array1<f64>,
    empirical: Array1<Complex64>,
    conjugate: bool,
}

impl HybridResponse {
    /// Build the selector for angular frequencies `w` and the spectra of the
    /// measured input and output.
    pub fn new(
        band: &FrequencyBand, w: ArrayView1<f64>, x_spectrum: ArrayView1<Complex64>,
        y_spectrum: ArrayView1<Complex64>, fft_sign: bool,
    ) -> Self {
        let sources: Vec<BinSource> = w
            .iter()
            .map(|&wk| {
                if band.contains_angular(wk) { BinSource::Model } else { BinSource::Empirical }
            })
            .collect();
        let w_in: Array1<f64> = w
            .iter()
            .zip(&sources)
            .filter(|(_, src)| **src == BinSource::Model)
            .map(|(&wk, _)| wk)
            .collect();
        let empirical = Zip::indexed(&x_spectrum).and(&y_spectrum).map_collect(|k, &xs, &ys| {
            if xs == Complex64::new(0.0, 0.0) {
                if sources[k] == BinSource::Empirical {
                    warn!(bin = k, "input spectrum is zero; empirical transfer estimate set to zero");
                }
                Complex64::new(0.0, 0.0)
            } else {
                ys / xs
            }
        });
        Self { sources, w_in, empirical, conjugate: !fft_sign }
    }

    pub fn sources(&self) -> &[BinSource] {
        &self.sources
    }

    /// Angular frequencies handed to the model.
    pub fn in_band_frequencies(&self) -> ArrayView1<'_, f64> {
        self.w_in.view()
    }

    /// Empirical transfer function estimate `Y/X` on every bin.
    pub fn empirical(&self) -> ArrayView1<'_, Complex64> {
        self.empirical.view()
    }

    /// Hybrid response for parameters `p` on every bin.
    ///
    /// Errors
    /// ------
    /// - `FitError::ResponseLengthMismatch` if the model does not return one
    ///   value per in-band frequency.
    pub fn evaluate<T: TransferFunction + ?Sized>(
        &self, tf: &T, p: ArrayView1<f64>,
    ) -> TransferResult<Array1<Complex64>> {
        let model = self.model_response(tf, p)?;
        let mut out = self.empirical.clone();
        let mut next = model.iter();
        for (slot, src) in out.iter_mut().zip(&self.sources) {
            if *src == BinSource::Model {
                if let Some(&h) = next.next() {
                    *slot = h;
                }
            }
        }
        Ok(out)
    }

    /// `∂H/∂p` on every bin, shape `(n_freq, p.len())`.
    ///
    /// Errors
    /// ------
    /// - `FitError::JacobianShapeMismatch` for an analytic Jacobian of the
    ///   wrong shape.
    /// - `FitError::ResponseLengthMismatch` or a wrapped `OptError` from the
    ///   finite-difference path.
    pub fn jacobian<T: TransferFunction + ?Sized>(
        &self, tf: &T, p: ArrayView1<f64>,
    ) -> TransferResult<Array2<Complex64>> {
        let n_in = self.w_in.len();
        let n_p = p.len();
        let mut jac_in = match tf.jacobian(p, self.w_in.view()) {
            Some(jac) => {
                if jac.dim() != (n_in, n_p) {
                    return Err(FitError::JacobianShapeMismatch {
                        expected: (n_in, n_p),
                        found: jac.dim(),
                    });
                }
                jac
            }
            None => self.finite_difference_jacobian(tf, p)?,
        };
        if self.conjugate {
            jac_in.mapv_inplace(|c| c.conj());
        }

        let mut out = Array2::<Complex64>::zeros((self.sources.len(), n_p));
        let model_bins =
            self.sources.iter().enumerate().filter(|(_, src)| **src == BinSource::Model);
        for (row, (k, _)) in model_bins.enumerate() {
            out.row_mut(k).assign(&jac_in.row(row));
        }
        Ok(out)
    }

    fn model_response<T: TransferFunction + ?Sized>(
        &self, tf: &T, p: ArrayView1<f64>,
    ) -> TransferResult<Array1<Complex64>> {
        let h = tf.response(p, self.w_in.view());
        if h.len() != self.w_in.len() {
            let expected = self.w_in.len();
            return Err(FitError::ResponseLengthMismatch { expected, found: h.len() });
        }
        Ok(if self.conjugate { h.mapv(|c| c.conj()) } else { h })
    }

    /// Forward differences of the raw model response, real parts stacked
    /// over imaginary parts.
    fn finite_difference_jacobian<T: TransferFunction + ?Sized>(
        &self, tf: &T, p: ArrayView1<f64>,
    ) -> TransferResult<Array2<Complex64>> {
        let n_in = self.w_in.len();
        let theta: Theta = p.to_owned();
        let check = tf.response(p, self.w_in.view());
        if check.len() != n_in {
            return Err(FitError::ResponseLengthMismatch { expected: n_in, found: check.len() });
        }
        let flat = |q: &Theta| -> Array1<f64> {
            let h = tf.response(q.view(), self.w_in.view());
            h.iter().map(|c| c.re).chain(h.iter().map(|c| c.im)).collect()
        };
        let jac = forward_jacobian(&flat, &theta)?;
        let re = jac.slice(s![..n_in, ..]);
        let im = jac.slice(s![n_in.., ..]);
        Ok(Zip::from(&re).and(&im).map_collect(|&r, &i| Complex64::new(r, i)))
    }
}

pub mod prelude {
    pub use super::{BinSource, FrequencyBand, HybridResponse};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::model::{ScaleDelay, TransferFn};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover band validation, the per-bin selector, the zero
    // denominator rule, conjugation and the finite-difference Jacobian.
    // -------------------------------------------------------------------------

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    // Purpose
    // -------
    // Bands need `0 <= low < high`.
    //
    // Given
    // -----
    // - (-1, 2), (2, 1), (NaN, 1) and the default band.
    //
    // Expect
    // ------
    // - Errors for the first three; the default band is [0, ∞).
    fn frequency_band_validates_limits() {
        assert!(FrequencyBand::new(-1.0, 2.0).is_err());
        assert!(FrequencyBand::new(2.0, 1.0).is_err());
        assert!(FrequencyBand::new(f64::NAN, 1.0).is_err());
        let band = FrequencyBand::default();
        assert_eq!(band.low(), 0.0);
        assert!(band.high().is_infinite());
    }

    #[test]
    // Purpose
    // -------
    // In-band bins take the model, the rest take `Y/X`, and a zero input
    // bin yields zero.
    //
    // Given
    // -----
    // - ω = (0, 2π, 4π, 6π) and the band (0.5, 2.5] cycles per unit time,
    //   so bins 1 and 2 are in band; X₃ = 0.
    // - Model H = 5 everywhere.
    //
    // Expect
    // ------
    // - H = (Y₀/X₀, 5, 5, 0).
    fn hybrid_response_splices_model_into_empirical() {
        // Arrange
        let w = array![0.0, 2.0 * PI, 4.0 * PI, 6.0 * PI];
        let xs = array![c(2.0, 0.0), c(1.0, 1.0), c(1.0, 0.0), c(0.0, 0.0)];
        let ys = array![c(1.0, 0.0), c(0.0, 2.0), c(3.0, 0.0), c(4.0, 0.0)];
        let band = FrequencyBand::new(0.5, 2.5).expect("valid band");
        let model =
            TransferFn::new(|_: ArrayView1<f64>, w: ArrayView1<f64>| w.mapv(|_| c(5.0, 0.0)));

        // Act
        let hybrid = HybridResponse::new(&band, w.view(), xs.view(), ys.view(), true);
        let h = hybrid.evaluate(&model, array![0.0].view()).expect("lengths agree");

        // Assert
        assert_eq!(
            hybrid.sources(),
            &[BinSource::Empirical, BinSource::Model, BinSource::Model, BinSource::Empirical]
        );
        assert_eq!(hybrid.in_band_frequencies().len(), 2);
        assert_eq!(h, array![c(0.5, 0.0), c(5.0, 0.0), c(5.0, 0.0), c(0.0, 0.0)]);
    }

    #[test]
    // Purpose
    // -------
    // The finite-difference Jacobian matches the analytic one, is zero
    // out of band, and both are conjugated when `fft_sign` is false.
    //
    // Given
    // -----
    // - `ScaleDelay` at p = (1.3, 0.1) on four bins with the DC bin
    //   empirical; the same model wrapped without a Jacobian.
    //
    // Expect
    // ------
    // - Agreement to 1e-6, a zero first row, conjugate symmetry between the
    //   two sign conventions.
    fn jacobian_paths_agree_and_respect_band() {
        // Arrange
        let w = array![0.0, 1.0, 2.0, 3.0];
        let ones = Array1::from_elem(4, c(1.0, 0.0));
        let band = FrequencyBand::default();
        let p = array![1.3, 0.1];
        let numeric_model =
            TransferFn::new(|p: ArrayView1<f64>, w: ArrayView1<f64>| ScaleDelay.response(p, w));

        // Act
        let plus = HybridResponse::new(&band, w.view(), ones.view(), ones.view(), true);
        let minus = HybridResponse::new(&band, w.view(), ones.view(), ones.view(), false);
        let analytic = plus.jacobian(&ScaleDelay, p.view()).expect("analytic");
        let numeric = plus.jacobian(&numeric_model, p.view()).expect("finite differences");
        let conj = minus.jacobian(&ScaleDelay, p.view()).expect("analytic");

        // Assert
        assert_eq!(analytic.dim(), (4, 2));
        assert_eq!(analytic.row(0), Array1::<Complex64>::zeros(2));
        for (a, n) in analytic.iter().zip(numeric.iter()) {
            assert_abs_diff_eq!(a.re, n.re, epsilon = 1e-6);
            assert_abs_diff_eq!(a.im, n.im, epsilon = 1e-6);
        }
        for (a, b) in analytic.iter().zip(conj.iter()) {
            assert_eq!(*a, b.conj());
        }
    }
}
