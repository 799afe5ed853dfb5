//! noise::noisefit — joint maximum-likelihood fit of the noise model.
//!
//! Purpose
//! -------
//! Estimate the three noise amplitudes, the underlying signal and the
//! per-waveform amplitude and delay drifts from `m` repeated measurements of
//! one waveform, with standard errors in physical units.
//!
//! Key behaviors
//! -------------
//! - Missing guesses are filled in from the data: each σ from the mean
//!   across-waveform variance, `mu` from the first waveform, `a` from ones
//!   and `eta` from zeros.
//! - Every block is rescaled so the optimizer sees quantities near unit
//!   magnitude (`s_logv = 1`, `s_δ = σ(x₀)`, `s_α = 1e-2`, `s_η = 1e-3/dt`,
//!   `s_v = 1e-5`).
//! - Unless `single_stage` is set, the signal and drift blocks are first
//!   fitted with the noise amplitudes held at their guesses; the joint fit
//!   then starts from those drifts.
//! - Free blocks are packed through [`BlockLayout`], the scaled likelihood
//!   is maximized with BFGS, and the result is unpacked with fixed blocks
//!   restored to their initial values.
//! - The covariance is `s_v · D H⁻¹ D` with `D` the per-entry scales of the
//!   free blocks; `H⁻¹` is the BFGS inverse Hessian by default or the
//!   pseudo-inverse of a finite-difference Hessian on request.
//!
//! Invariants & assumptions
//! ------------------------
//! - Data are `m × n`, one waveform per row; row 0 is the gauge reference
//!   with `a₀ = 1` and `η₀ = 0`.
//! - Fixed blocks report zero standard errors and are absent from
//!   [`NoiseFitResult::hess_inv`].
//! - Non-convergence is not an error; inspect
//!   [`NoiseFitResult::diagnostic`].
//!
//! Conventions
//! -----------
//! - `hess_inv` rows are ordered like the free blocks and expressed in
//!   log-variance, signal, amplitude and time units respectively.
//!
//! Testing notes
//! -------------
//! - Unit tests cover input validation, the default guesses, fixed-block
//!   passthrough and a small recovery run. The full recovery scenario lives
//!   in `tests/integration_noisefit_pipeline.rs`.
use crate::{
    inference::covariance::{observed_information_covariance, scale_covariance, standard_errors},
    noise::{
        blocks::{BlockLayout, BlockValues, FixedBlocks, ParamBlock},
        errors::{NoiseError, NoiseResult},
        model::NoiseModel,
        nll::{NllEvaluation, NllScales, scaled_nll},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{
            Grad, Hessian, LogLikelihood, MLEOptions, OptimOutcome, Theta, maximize,
        },
        numerical_stability::transformations::{
            amplitude_error_from_log_variance, amplitude_from_log_variance,
            log_variance_from_amplitude,
        },
    },
    signal::{fft::RealFft, sampling::resolve_sampling_time},
};
use ndarray::{Array1, Array2, ArrayView, ArrayView2, Axis, Dimension, Ix2, s};
use std::cell::RefCell;
use tracing::debug;

/// Scale of the amplitude-drift block.
pub const SCALE_ALPHA: f64 = 1e-2;
/// Scale of the delay-drift block, in units of the sampling time.
pub const SCALE_ETA: f64 = 1e-3;
/// Global variance scale.
pub const SCALE_V: f64 = 1e-5;

/// Source of the inverse Hessian used for standard errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CovarianceMethod {
    /// BFGS inverse-Hessian approximation at the final iterate.
    #[default]
    InverseBfgs,
    /// Pseudo-inverse of a finite-difference Hessian of the analytic
    /// gradient at the final iterate.
    FiniteDifference,
}

/// Options for [`noisefit`]. Every guess is optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoiseFitOptions {
    pub dt: Option<f64>,
    pub sigma_alpha: Option<f64>,
    pub sigma_beta: Option<f64>,
    pub sigma_tau: Option<f64>,
    /// Signal guess, length `n`.
    pub mu: Option<Array1<f64>>,
    /// Amplitude guess, length `m`.
    pub a: Option<Array1<f64>>,
    /// Delay guess, length `m`, in units of `dt`'s time unit.
    pub eta: Option<Array1<f64>>,
    pub fixed: FixedBlocks,
    pub covariance: CovarianceMethod,
    pub mle: MLEOptions,
    /// Skip the drift stage and start the joint fit directly from the
    /// initial guesses.
    pub single_stage: bool,
}

impl NoiseFitOptions {
    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    pub fn with_sigma_alpha(mut self, sigma: f64) -> Self {
        self.sigma_alpha = Some(sigma);
        self
    }

    pub fn with_sigma_beta(mut self, sigma: f64) -> Self {
        self.sigma_beta = Some(sigma);
        self
    }

    pub fn with_sigma_tau(mut self, sigma: f64) -> Self {
        self.sigma_tau = Some(sigma);
        self
    }

    pub fn with_mu(mut self, mu: Array1<f64>) -> Self {
        self.mu = Some(mu);
        self
    }

    pub fn with_a(mut self, a: Array1<f64>) -> Self {
        self.a = Some(a);
        self
    }

    pub fn with_eta(mut self, eta: Array1<f64>) -> Self {
        self.eta = Some(eta);
        self
    }

    /// Hold `block` at its initial value.
    pub fn with_fixed(mut self, block: ParamBlock) -> Self {
        self.fixed = self.fixed.with(block, true);
        self
    }

    pub fn with_covariance(mut self, method: CovarianceMethod) -> Self {
        self.covariance = method;
        self
    }

    pub fn with_mle(mut self, mle: MLEOptions) -> Self {
        self.mle = mle;
        self
    }

    pub fn with_single_stage(mut self, single_stage: bool) -> Self {
        self.single_stage = single_stage;
        self
    }
}

/// Output of [`noisefit`].
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseFitResult {
    /// Fitted noise amplitudes with the resolved sampling time.
    pub noise_model: NoiseModel,
    /// Signal estimate, length `n`.
    pub mu: Array1<f64>,
    /// Amplitude drift, length `m`, `a[0] = 1` unless supplied otherwise.
    pub a: Array1<f64>,
    /// Delay drift, length `m`, `eta[0] = 0` unless supplied otherwise.
    pub eta: Array1<f64>,
    /// Negative log-likelihood at the estimate.
    pub fval: f64,
    /// Covariance of the free parameters in physical units.
    pub hess_inv: Hessian,
    pub err_sigma_alpha: f64,
    pub err_sigma_beta: f64,
    pub err_sigma_tau: f64,
    /// Standard error of `mu`, length `n`.
    pub err_mu: Array1<f64>,
    /// Standard error of `a`, length `m`, zero for the reference waveform.
    pub err_a: Array1<f64>,
    /// Standard error of `eta`, length `m`, zero for the reference waveform.
    pub err_eta: Array1<f64>,
    /// Raw optimizer outcome in scaled coordinates.
    pub diagnostic: OptimOutcome,
}

/// Scaled likelihood of the noise fit as seen by the optimizer.
///
/// Value and gradient come from one [`scaled_nll`] call; the last
/// evaluation is cached because BFGS asks for both at the same point.
struct NoiseLikelihood {
    layout: BlockLayout,
    base: BlockValues,
    scales: NllScales,
    fft: RealFft,
    cache: RefCell<Option<(Theta, NllEvaluation)>>,
}

impl NoiseLikelihood {
    fn evaluate(&self, theta: &Theta, x: ArrayView2<f64>) -> OptResult<NllEvaluation> {
        if let Some((cached_theta, eval)) = self.cache.borrow().as_ref() {
            if cached_theta == theta {
                return Ok(eval.clone());
            }
        }
        let params = self.layout.unpack(theta.view(), &self.base).map_err(|_| {
            OptError::ThetaLengthMismatch { expected: self.layout.dim(), actual: theta.len() }
        })?;
        let eval = scaled_nll(x, &params, &self.layout, &self.scales, &self.fft);
        self.cache.replace(Some((theta.clone(), eval.clone())));
        Ok(eval)
    }
}

impl LogLikelihood for NoiseLikelihood {
    type Data = Array2<f64>;

    fn value(&self, theta: &Theta, data: &Array2<f64>) -> OptResult<f64> {
        Ok(-self.evaluate(theta, data.view())?.value)
    }

    fn check(&self, theta: &Theta, _data: &Array2<f64>) -> OptResult<()> {
        let expected = self.layout.dim();
        if theta.len() != expected {
            return Err(OptError::ThetaLengthMismatch { expected, actual: theta.len() });
        }
        match theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            Some((index, &value)) => Err(OptError::InvalidThetaInput { index, value }),
            None => Ok(()),
        }
    }

    fn grad(&self, theta: &Theta, data: &Array2<f64>) -> OptResult<Grad> {
        Ok(-self.evaluate(theta, data.view())?.grad)
    }
}

/// noisefit — maximum-likelihood noise model from repeated waveforms.
///
/// Parameters
/// ----------
/// - `x`: `ArrayView<f64, D>`
///   Data, which must be two-dimensional: `m` waveforms by `n` samples.
/// - `opts`: `&NoiseFitOptions`
///   Sampling time, initial guesses, fixed blocks and optimizer settings.
///
/// Returns
/// -------
/// `NoiseResult<NoiseFitResult>`
///   Estimates, standard errors and optimizer diagnostics. A run that stops
///   without converging still returns `Ok`, with
///   `diagnostic.converged == false`.
///
/// Errors
/// ------
/// - `NoiseError::DataNotTwoDimensional` / `NoiseError::EmptyData` for
///   malformed data.
/// - `NoiseError::AllParametersFixed` when no block is free.
/// - `NoiseError::GuessLengthMismatch` / `NoiseError::NonFiniteGuess` for
///   bad initial guesses.
/// - `NoiseError::InvalidSamplingTime` for a non-positive sampling time.
/// - `NoiseError::Optimization` when the optimizer cannot start (for
///   example a free log-variance whose initial amplitude is zero) or the
///   covariance cannot be formed.
///
/// Examples
/// --------
/// ```rust,no_run
/// # use ndarray::Array2;
/// # use thzfit::noise::noisefit::{NoiseFitOptions, noisefit};
/// let x = Array2::<f64>::zeros((10, 64));
/// let res = noisefit(x.view(), &NoiseFitOptions::default().with_dt(0.05))?;
/// println!("sigma_alpha = {}", res.noise_model.sigma_alpha);
/// # Ok::<(), thzfit::noise::errors::NoiseError>(())
/// ```
pub fn noisefit<D: Dimension>(
    x: ArrayView<f64, D>, opts: &NoiseFitOptions,
) -> NoiseResult<NoiseFitResult> {
    let ndim = x.ndim();
    let x =
        x.into_dimensionality::<Ix2>().map_err(|_| NoiseError::DataNotTwoDimensional { ndim })?;
    let (m, n) = x.dim();
    if m == 0 || n == 0 {
        return Err(NoiseError::EmptyData { m, n });
    }
    if opts.fixed.all_fixed() {
        return Err(NoiseError::AllParametersFixed);
    }
    let dt = resolve_sampling_time(opts.dt);
    if !dt.is_finite() || dt <= 0.0 {
        return Err(NoiseError::InvalidSamplingTime { dt });
    }

    let guess = InitialGuess::resolve(x, opts)?;
    let layout = BlockLayout::new(n, m, opts.fixed);
    let scale_sigma = [1.0, 1.0, dt];
    let sigma0 = [guess.sigma_alpha, guess.sigma_beta, guess.sigma_tau];

    let model0 = NoiseModel::new(sigma0[0], sigma0[1], sigma0[2], Some(dt));
    // A zero amplitude (noiseless reference sample) would make δ undefined.
    let scale_delta =
        model0.amplitude(x.row(0)).mapv_into(|s| if s.is_finite() && s > 0.0 { s } else { 1.0 });
    let k = m - 1;
    let scales = NllScales {
        blocks: BlockValues {
            logv: Array1::ones(3),
            delta: scale_delta,
            alpha: Array1::from_elem(k, SCALE_ALPHA),
            eta: Array1::from_elem(k, SCALE_ETA / dt),
        },
        v: SCALE_V,
    };

    let logv0 =
        Array1::from_shape_fn(3, |i| log_variance_from_amplitude(sigma0[i], scale_sigma[i], SCALE_V));
    let base = BlockValues {
        logv: logv0.clone(),
        delta: (&x.row(0) - &guess.mu) / &scales.blocks.delta,
        alpha: guess.a.slice(s![1..]).mapv(|a| (a - 1.0) / (guess.a[0] * SCALE_ALPHA)),
        eta: &guess.eta.slice(s![1..]) / dt / &scales.blocks.eta,
    };
    let data = x.to_owned();
    let base = if opts.single_stage { base } else { fit_drift_stage(&data, base, &scales, opts)? };

    let theta0 = layout.pack(&base);
    debug!(m, n, dt, dim = theta0.len(), "starting noise fit");

    let problem = NoiseLikelihood {
        layout,
        base: base.clone(),
        scales: scales.clone(),
        fft: RealFft::new(n),
        cache: RefCell::new(None),
    };
    let outcome = maximize(&problem, theta0, &data, &opts.mle)?;
    let fitted = layout.unpack(outcome.theta_hat.view(), &base)?;

    // Per-entry scales of the free blocks, mapping scaled coordinates to
    // log-variance, signal, amplitude and physical time.
    let mut physical = scales.blocks.clone();
    physical.eta.mapv_inplace(|s| s * dt);
    let free_scales = layout.pack(&physical);

    let scaled_cov = match (opts.covariance, outcome.inv_hessian.as_ref()) {
        (CovarianceMethod::InverseBfgs, Some(inv)) => inv.clone(),
        _ => {
            // NaN entries make the Hessian validation fail with a typed error.
            let grad_fn = |theta: &Theta| -> Grad {
                match problem.grad(theta, &data) {
                    Ok(g) => -g,
                    Err(_) => Array1::from_elem(theta.len(), f64::NAN),
                }
            };
            observed_information_covariance(&grad_fn, &outcome.theta_hat)?
        }
    };
    let hess_inv = scale_covariance(&scaled_cov, &free_scales, SCALE_V)?;
    let errors = standard_errors(&hess_inv);
    let per_block = layout.unpack(errors.view(), &BlockValues::zeros(n, m))?;

    let sigma = Array1::from_shape_fn(3, |i| {
        amplitude_from_log_variance(fitted.logv[i], scale_sigma[i], SCALE_V)
    });
    let err_sigma = Array1::from_shape_fn(3, |i| {
        amplitude_error_from_log_variance(sigma[i], per_block.logv[i])
    });

    let mu = if opts.fixed.is_fixed(ParamBlock::Delta) {
        guess.mu.clone()
    } else {
        &x.row(0) - &(&fitted.delta * &scales.blocks.delta)
    };
    let a = if opts.fixed.is_fixed(ParamBlock::Alpha) {
        guess.a.clone()
    } else {
        with_reference(1.0, &fitted.alpha.mapv(|v| 1.0 + v * SCALE_ALPHA))
    };
    let eta = if opts.fixed.is_fixed(ParamBlock::Eta) {
        guess.eta.clone()
    } else {
        with_reference(0.0, &(&fitted.eta * &scales.blocks.eta * dt))
    };

    let result = NoiseFitResult {
        noise_model: NoiseModel::new(sigma[0], sigma[1], sigma[2], Some(dt)),
        mu,
        a,
        eta,
        fval: -outcome.value / SCALE_V,
        hess_inv,
        err_sigma_alpha: err_sigma[0],
        err_sigma_beta: err_sigma[1],
        err_sigma_tau: err_sigma[2],
        err_mu: per_block.delta,
        err_a: with_reference(0.0, &per_block.alpha),
        err_eta: with_reference(0.0, &per_block.eta),
        diagnostic: outcome,
    };
    debug!(
        converged = result.diagnostic.converged,
        iterations = result.diagnostic.iterations,
        fval = result.fval,
        "noise fit finished"
    );
    Ok(result)
}

/// Fit the signal and drift blocks with the noise amplitudes held at their
/// initial values, and return `base` with those blocks replaced.
///
/// From undrifted guesses the joint fit can settle where `σ_τ` absorbs delay
/// drift that `eta` has not picked up. `base` is returned unchanged when no
/// signal or drift block is free, or when the noise blocks are already fixed.
fn fit_drift_stage(
    data: &Array2<f64>, base: BlockValues, scales: &NllScales, opts: &NoiseFitOptions,
) -> NoiseResult<BlockValues> {
    let fixed = [ParamBlock::LogVAlpha, ParamBlock::LogVBeta, ParamBlock::LogVTau]
        .into_iter()
        .fold(opts.fixed, |fixed, block| fixed.with(block, true));
    if fixed.all_fixed() || fixed == opts.fixed {
        return Ok(base);
    }

    let (m, n) = data.dim();
    let layout = BlockLayout::new(n, m, fixed);
    let theta0 = layout.pack(&base);
    let problem = NoiseLikelihood {
        layout,
        base,
        scales: scales.clone(),
        fft: RealFft::new(n),
        cache: RefCell::new(None),
    };
    let outcome = maximize(&problem, theta0, data, &opts.mle)?;
    debug!(
        converged = outcome.converged,
        iterations = outcome.iterations,
        dim = layout.dim(),
        "drift stage finished"
    );
    layout.unpack(outcome.theta_hat.view(), &problem.base)
}

/// Initial guesses after defaults and validation.
#[derive(Debug, Clone, PartialEq)]
struct InitialGuess {
    sigma_alpha: f64,
    sigma_beta: f64,
    sigma_tau: f64,
    mu: Array1<f64>,
    a: Array1<f64>,
    eta: Array1<f64>,
}

impl InitialGuess {
    fn resolve(x: ArrayView2<f64>, opts: &NoiseFitOptions) -> NoiseResult<Self> {
        let (m, n) = x.dim();
        let default_sigma = x.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0).sqrt();

        let sigma_alpha = checked_scalar("sigma_alpha", opts.sigma_alpha.unwrap_or(default_sigma))?;
        let sigma_beta = checked_scalar("sigma_beta", opts.sigma_beta.unwrap_or(default_sigma))?;
        let sigma_tau = checked_scalar("sigma_tau", opts.sigma_tau.unwrap_or(default_sigma))?;

        let mu = checked_vector("mu", opts.mu.clone().unwrap_or_else(|| x.row(0).to_owned()), n)?;
        let a = checked_vector("a", opts.a.clone().unwrap_or_else(|| Array1::ones(m)), m)?;
        let eta = checked_vector("eta", opts.eta.clone().unwrap_or_else(|| Array1::zeros(m)), m)?;
        if a[0] == 0.0 {
            return Err(NoiseError::NonFiniteGuess { name: "a", index: 0 });
        }

        Ok(Self { sigma_alpha, sigma_beta, sigma_tau, mu, a, eta })
    }
}

fn checked_scalar(name: &'static str, value: f64) -> NoiseResult<f64> {
    if value.is_finite() { Ok(value) } else { Err(NoiseError::NonFiniteGuess { name, index: 0 }) }
}

fn checked_vector(
    name: &'static str, values: Array1<f64>, expected: usize,
) -> NoiseResult<Array1<f64>> {
    if values.len() != expected {
        return Err(NoiseError::GuessLengthMismatch { name, expected, found: values.len() });
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(NoiseError::NonFiniteGuess { name, index }),
        None => Ok(values),
    }
}

/// Prepend the reference-waveform entry to a drift block.
fn with_reference(first: f64, rest: &Array1<f64>) -> Array1<f64> {
    let mut out = Array1::from_elem(rest.len() + 1, first);
    out.slice_mut(s![1..]).assign(rest);
    out
}

pub mod prelude {
    pub use super::{CovarianceMethod, NoiseFitOptions, NoiseFitResult, noisefit};
}
