//! transfer::tls — total-least-squares residuals and their Jacobian.
//!
//! Purpose
//! -------
//! Express the transfer-function fit as a `levenberg_marquardt`
//! least-squares problem over the transfer-function parameters `p` and the
//! input deviation `ψ = x − μ`, where `μ` is the noise-free input.
//!
//! Key behaviors
//! -------------
//! - Residuals: `r = [ψ/σ_x, (y − irfft(rfft(μ)·H(p)))/σ_y]`, length `2n`.
//! - Jacobian in `(p, ψ)`, shape `2n × (n_p + n)`, assembled by blocks:
//!   - top-left: zero, the input residuals do not depend on `p`;
//!   - top-right: `diag(1/σ_x)`;
//!   - bottom-left: column `j` is `−irfft(rfft(μ)·∂H/∂p_j)/σ_y`;
//!   - bottom-right: the circulant matrix of the impulse response
//!     `h = irfft(H)`, row `i` scaled by `1/σ_y[i]`.
//! - With bounds, the solver works on an internal coordinate `u` for `p`
//!   (see [`ParamBounds`]); the Jacobian handed to the solver carries the
//!   chain-rule factor `dp/du`, while [`TlsProblem::jacobian_at`] stays in
//!   external coordinates for the covariance.
//!
//! Invariants & assumptions
//! ------------------------
//! - `H` is the hybrid response of [`HybridResponse`], so out-of-band bins
//!   use the empirical estimate and have zero parameter derivative.
//! - Failed evaluations surface to the solver as `None`, which stops it.
use crate::{
    inference::covariance::fill_dmatrix,
    optimization::least_squares::ParamBounds,
    signal::fft::RealFft,
    transfer::{
        band::HybridResponse,
        errors::{FitError, TransferResult},
        model::TransferFunction,
    },
};
use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::{DMatrix, DVector, Dyn, storage::Owned};
use ndarray::{Array1, Array2, ArrayView1, Axis, Zip, concatenate, s};
use num_complex::Complex64;

/// Total-least-squares problem for one input/output waveform pair.
#[derive(Debug)]
pub struct TlsProblem<'a, T: TransferFunction + ?Sized> {
    tf: &'a T,
    hybrid: HybridResponse,
    fft: RealFft,
    x: Array1<f64>,
    y: Array1<f64>,
    sigma_x: Array1<f64>,
    sigma_y: Array1<f64>,
    bounds: ParamBounds,
    /// Solver coordinates `[u, ψ]`.
    params: DVector<f64>,
}

impl<'a, T: TransferFunction + ?Sized> TlsProblem<'a, T> {
    /// Problem starting at `p0` with `ψ = 0`. Entries of `p0` on a finite
    /// bound start just inside it ([`ParamBounds::nudge_inside`]).
    ///
    /// `x`, `y`, `sigma_x` and `sigma_y` share one length `n`; `bounds`
    /// has one entry per parameter and contains `p0`. The caller checks
    /// both.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tf: &'a T, hybrid: HybridResponse, x: Array1<f64>, y: Array1<f64>, sigma_x: Array1<f64>,
        sigma_y: Array1<f64>, bounds: ParamBounds, p0: ArrayView1<f64>,
    ) -> Self {
        let n = x.len();
        let u0 = bounds.internal(bounds.nudge_inside(p0).view());
        let params = DVector::from_iterator(
            u0.len() + n,
            u0.iter().copied().chain(std::iter::repeat(0.0).take(n)),
        );
        Self { tf, hybrid, fft: RealFft::new(n), x, y, sigma_x, sigma_y, bounds, params }
    }

    pub fn n_params(&self) -> usize {
        self.bounds.len()
    }

    pub fn n_samples(&self) -> usize {
        self.x.len()
    }

    /// Current `(p, ψ)` in external coordinates.
    pub fn external_params(&self) -> (Array1<f64>, Array1<f64>) {
        let n_p = self.n_params();
        let u: Array1<f64> = self.params.rows(0, n_p).iter().copied().collect();
        let psi: Array1<f64> = self.params.rows(n_p, self.n_samples()).iter().copied().collect();
        (self.bounds.external(u.view()), psi)
    }

    /// Hybrid transfer function at `p`.
    pub fn response(&self, p: ArrayView1<f64>) -> TransferResult<Array1<Complex64>> {
        self.hybrid.evaluate(self.tf, p)
    }

    /// Output-waveform prediction `irfft(rfft(μ)·H(p))`.
    pub fn predict(&self, p: ArrayView1<f64>, mu: ArrayView1<f64>) -> TransferResult<Array1<f64>> {
        let h = self.response(p)?;
        Ok(self.fft.apply_response(mu, h.view()))
    }

    /// Normalized residuals at `(p, ψ)`.
    ///
    /// Errors
    /// ------
    /// - `FitError::NonFiniteResidual` for the first non-finite entry.
    /// - Response errors from [`HybridResponse::evaluate`].
    pub fn residuals_at(
        &self, p: ArrayView1<f64>, psi: ArrayView1<f64>,
    ) -> TransferResult<Array1<f64>> {
        let mu = &self.x - &psi;
        let predicted = self.predict(p, mu.view())?;
        let delta = &psi / &self.sigma_x;
        let eps = (&self.y - &predicted) / &self.sigma_y;
        let res = concatenate(Axis(0), &[delta.view(), eps.view()])
            .map_err(|_| FitError::LengthMismatch { x: delta.len(), y: eps.len() })?;
        match res.iter().position(|v| !v.is_finite()) {
            Some(index) => Err(FitError::NonFiniteResidual { index, value: res[index] }),
            None => Ok(res),
        }
    }

    /// Residual Jacobian with respect to `(p, ψ)` in external coordinates.
    pub fn jacobian_at(
        &self, p: ArrayView1<f64>, psi: ArrayView1<f64>,
    ) -> TransferResult<Array2<f64>> {
        let n = self.n_samples();
        let n_p = p.len();
        let mu = &self.x - &psi;
        let h = self.hybrid.evaluate(self.tf, p)?;
        let dh = self.hybrid.jacobian(self.tf, p)?;
        let mu_f = self.fft.forward(mu.view());
        let impulse = self.fft.inverse(h.view());

        let mut jac = Array2::<f64>::zeros((2 * n, n_p + n));
        for i in 0..n {
            jac[[i, n_p + i]] = 1.0 / self.sigma_x[i];
        }
        for j in 0..n_p {
            let column = self.fft.inverse((&mu_f * &dh.column(j)).view());
            Zip::from(jac.slice_mut(s![n.., j]))
                .and(&column)
                .and(&self.sigma_y)
                .for_each(|out, &c, &sy| *out = -c / sy);
        }
        let mut circulant = jac.slice_mut(s![n.., n_p..]);
        for ((i, k), out) in circulant.indexed_iter_mut() {
            *out = impulse[(i + n - k) % n] / self.sigma_y[i];
        }
        Ok(jac)
    }

    fn split(&self, v: &DVector<f64>) -> (Array1<f64>, Array1<f64>) {
        let n_p = self.n_params();
        let head: Array1<f64> = v.rows(0, n_p).iter().copied().collect();
        let tail: Array1<f64> = v.rows(n_p, self.n_samples()).iter().copied().collect();
        (head, tail)
    }
}

impl<T: TransferFunction + ?Sized> LeastSquaresProblem<f64, Dyn, Dyn> for TlsProblem<'_, T> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, params: &DVector<f64>) {
        self.params.copy_from(params);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let (p, psi) = self.external_params();
        let res = self.residuals_at(p.view(), psi.view()).ok()?;
        Some(DVector::from_iterator(res.len(), res.iter().copied()))
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let (u, psi) = self.split(&self.params);
        let p = self.bounds.external(u.view());
        let mut jac = self.jacobian_at(p.view(), psi.view()).ok()?;
        let dp_du = self.bounds.external_derivative(u.view());
        for (j, &d) in dp_du.iter().enumerate() {
            jac.column_mut(j).mapv_inplace(|v| v * d);
        }
        Some(fill_dmatrix(&jac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        optimization::loglik_optimizer::finite_diff::forward_jacobian,
        signal::fft::angular_frequencies,
        transfer::{
            band::FrequencyBand,
            model::{ScaleDelay, TransferFn},
        },
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests check the block Jacobian against forward differences of the
    // residuals, with an analytic and a numerical transfer-function
    // derivative, and the chain rule through bounds.
    // -------------------------------------------------------------------------

    const N: usize = 16;
    const DT: f64 = 0.1;

    fn signals() -> (Array1<f64>, Array1<f64>) {
        let x = Array1::from_shape_fn(N, |j| (-((j as f64 - 5.0).powi(2)) / 3.0).exp() + 0.1);
        let y =
            Array1::from_shape_fn(N, |j| 0.8 * (-((j as f64 - 6.0).powi(2)) / 3.0).exp() + 0.05);
        (x, y)
    }

    fn problem<'a, T: TransferFunction + ?Sized>(
        tf: &'a T, band: FrequencyBand, bounds: ParamBounds, p0: ArrayView1<f64>,
    ) -> TlsProblem<'a, T> {
        let (x, y) = signals();
        let fft = RealFft::new(N);
        let w = angular_frequencies(N, DT);
        let (xs, ys) = (fft.forward(x.view()), fft.forward(y.view()));
        let hybrid = HybridResponse::new(&band, w.view(), xs.view(), ys.view(), true);
        let sigma_x = Array1::from_shape_fn(N, |j| 0.5 + 0.01 * j as f64);
        let sigma_y = Array1::from_shape_fn(N, |j| 0.7 - 0.01 * j as f64);
        TlsProblem::new(tf, hybrid, x, y, sigma_x, sigma_y, bounds, p0)
    }

    fn assert_matches_forward_differences<T: TransferFunction + ?Sized>(prob: &TlsProblem<'_, T>) {
        let n_p = prob.n_params();
        let p = array![0.9, 0.05];
        let psi = Array1::from_shape_fn(N, |j| 0.01 * (j as f64).sin());
        let theta = concatenate(Axis(0), &[p.view(), psi.view()]).expect("1-D");
        let analytic = prob.jacobian_at(p.view(), psi.view()).expect("jacobian");
        let numeric = forward_jacobian(
            &|t: &Array1<f64>| {
                prob.residuals_at(t.slice(s![..n_p]), t.slice(s![n_p..])).expect("finite residuals")
            },
            &theta,
        )
        .expect("finite differences");
        assert_eq!(analytic.dim(), (2 * N, n_p + N));
        for ((idx, a), n) in analytic.indexed_iter().zip(numeric.iter()) {
            assert!((a - n).abs() <= 1e-4 * a.abs().max(1.0), "entry {idx:?}: {a} vs {n}");
        }
    }

    #[test]
    // Purpose
    // -------
    // The assembled Jacobian matches forward differences of the residuals
    // for the analytic `ScaleDelay` derivative.
    //
    // Given
    // -----
    // - n = 16, dt = 0.1, band (0.5, 3] cycles per unit time, p = (0.9, 0.05).
    //
    // Expect
    // ------
    // - Entrywise agreement to 1e-4 relative.
    fn block_jacobian_matches_finite_differences() {
        let band = FrequencyBand::new(0.5, 3.0).expect("valid band");
        let prob = problem(&ScaleDelay, band, ParamBounds::unbounded(2), array![1.0, 0.0].view());
        assert_matches_forward_differences(&prob);
    }

    #[test]
    // Purpose
    // -------
    // Same check when the transfer-function derivative comes from finite
    // differences.
    //
    // Given
    // -----
    // - `ScaleDelay` wrapped without its Jacobian, default band.
    //
    // Expect
    // ------
    // - Entrywise agreement to 1e-4 relative.
    fn block_jacobian_with_numerical_response_derivative() {
        let tf =
            TransferFn::new(|p: ArrayView1<f64>, w: ArrayView1<f64>| ScaleDelay.response(p, w));
        let p0 = array![1.0, 0.0];
        let prob = problem(&tf, FrequencyBand::default(), ParamBounds::unbounded(2), p0.view());
        assert_matches_forward_differences(&prob);
    }

    #[test]
    // Purpose
    // -------
    // The solver-facing Jacobian carries `dp/du` on the parameter columns
    // and leaves the `ψ` columns alone.
    //
    // Given
    // -----
    // - Bounds [0, 2] on `a`, unbounded `τ`, start p = (0.9, 0.05).
    //
    // Expect
    // ------
    // - Column 0 equals the external column times `cos(u)`; column 1 and
    //   the `ψ` columns are unchanged; residual length 2n.
    fn solver_jacobian_applies_bound_chain_rule() {
        // Arrange
        let bounds = ParamBounds::new(array![0.0, f64::NEG_INFINITY], array![2.0, f64::INFINITY])
            .expect("valid bounds");
        let p0 = array![0.9, 0.05];
        let prob = problem(&ScaleDelay, FrequencyBand::default(), bounds, p0.view());

        // Act
        let internal = prob.jacobian().expect("jacobian");
        let (p, psi) = prob.external_params();
        let external = prob.jacobian_at(p.view(), psi.view()).expect("jacobian");
        let u0 = prob.params()[0];

        // Assert
        assert!((p[0] - 0.9).abs() < 1e-12);
        assert_eq!(prob.residuals().expect("finite").len(), 2 * N);
        for i in 0..2 * N {
            assert!((internal[(i, 0)] - external[[i, 0]] * u0.cos()).abs() < 1e-12);
            assert_eq!(internal[(i, 1)], external[[i, 1]]);
            assert_eq!(internal[(i, 2 + i % N)], external[[i, 2 + i % N]]);
        }
    }
}
