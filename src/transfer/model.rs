//! transfer::model — parametric frequency responses.
//!
//! A [`TransferFunction`] maps a parameter vector and a grid of physical
//! angular frequencies to a complex response, in the same sign convention
//! as [`RealFft`](crate::signal::fft::RealFft): multiplying a spectrum by
//! `e^{−iωτ}` delays the waveform by `τ`. Responses written for the opposite
//! convention are fitted with `FitOptions::fft_sign = false`.
use ndarray::{Array1, Array2, ArrayView1};
use num_complex::Complex64;

/// Parametric transfer function `H(p; ω)`.
pub trait TransferFunction {
    /// Response at each frequency of `w`; must have `w.len()` entries.
    fn response(&self, p: ArrayView1<f64>, w: ArrayView1<f64>) -> Array1<Complex64>;

    /// Analytic `∂H/∂p` with shape `(w.len(), p.len())`.
    ///
    /// The default returns `None`, and the fit falls back to forward
    /// differences.
    fn jacobian(&self, _p: ArrayView1<f64>, _w: ArrayView1<f64>) -> Option<Array2<Complex64>> {
        None
    }

    /// Number of parameters the model expects, when it is fixed.
    ///
    /// `fit` rejects a starting point of any other length. The default
    /// `None` accepts every length.
    fn n_params(&self) -> Option<usize> {
        None
    }
}

/// Closure-backed transfer function without an analytic Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct TransferFn<F> {
    response: F,
}

impl<F> TransferFn<F>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array1<Complex64>,
{
    pub fn new(response: F) -> Self {
        Self { response }
    }

    /// Attach an analytic Jacobian.
    pub fn with_jacobian<J>(self, jacobian: J) -> TransferFnWithJacobian<F, J>
    where
        J: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array2<Complex64>,
    {
        TransferFnWithJacobian { response: self.response, jacobian }
    }
}

impl<F> TransferFunction for TransferFn<F>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array1<Complex64>,
{
    fn response(&self, p: ArrayView1<f64>, w: ArrayView1<f64>) -> Array1<Complex64> {
        (self.response)(p, w)
    }
}

/// Closure-backed transfer function with an analytic Jacobian.
#[derive(Debug, Clone, Copy)]
pub struct TransferFnWithJacobian<F, J> {
    response: F,
    jacobian: J,
}

impl<F, J> TransferFunction for TransferFnWithJacobian<F, J>
where
    F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array1<Complex64>,
    J: Fn(ArrayView1<f64>, ArrayView1<f64>) -> Array2<Complex64>,
{
    fn response(&self, p: ArrayView1<f64>, w: ArrayView1<f64>) -> Array1<Complex64> {
        (self.response)(p, w)
    }

    fn jacobian(&self, p: ArrayView1<f64>, w: ArrayView1<f64>) -> Option<Array2<Complex64>> {
        Some((self.jacobian)(p, w))
    }
}

/// Amplitude scale and delay, `H(ω) = a·e^{−iωτ}` with `p = (a, τ)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleDelay;

impl TransferFunction for ScaleDelay {
    fn response(&self, p: ArrayView1<f64>, w: ArrayView1<f64>) -> Array1<Complex64> {
        w.mapv(|wk| Complex64::from_polar(p[0], -wk * p[1]))
    }

    fn jacobian(&self, p: ArrayView1<f64>, w: ArrayView1<f64>) -> Option<Array2<Complex64>> {
        Some(Array2::from_shape_fn((w.len(), 2), |(k, j)| {
            let phase = Complex64::from_polar(1.0, -w[k] * p[1]);
            match j {
                0 => phase,
                _ => Complex64::new(0.0, -w[k] * p[0]) * phase,
            }
        }))
    }

    fn n_params(&self) -> Option<usize> {
        Some(2)
    }
}

pub mod prelude {
    pub use super::{ScaleDelay, TransferFn, TransferFnWithJacobian, TransferFunction};
}
