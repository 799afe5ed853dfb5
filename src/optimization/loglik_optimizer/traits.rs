//! Public surface of the log-likelihood optimizer.
//!
//! - [`LogLikelihood`]: the trait a model implements.
//! - [`MLEOptions`], [`Tolerances`], [`LineSearcher`]: run configuration.
//! - [`OptimOutcome`]: what [`maximize`](super::maximize) returns.
//!
//! We maximize `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`. An analytic gradient, if
//! provided, is `∇ℓ(θ)`; the adapter flips its sign.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        types::{Cost, DEFAULT_MAX_ITER_PER_PARAM, FnEvalMap, Grad, Hessian, Theta},
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use std::str::FromStr;

/// Log-likelihood `ℓ(θ)` of a model over some data payload.
///
/// Required:
/// - `value(θ, data)`: evaluate `ℓ(θ)`; errors are recoverable `OptError`s.
/// - `check(θ, data)`: reject an unusable starting point before any solver
///   work is done.
///
/// Optional:
/// - `grad(θ, data)`: analytic `∇ℓ(θ)`. The default reports
///   `GradientNotImplemented`, which switches the adapter to finite
///   differences.
pub trait LogLikelihood {
    type Data: 'static;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Line search used inside BFGS.
///
/// Parses case-insensitively from `"MoreThuente"` or `"HagerZhang"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Optimizer configuration.
///
/// Default: `tol_grad = 1e-5`, no cost tolerance, no explicit iteration cap
/// (resolved to `200 × dim` at run time), More–Thuente line search, quiet.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    /// Attach the terminal iteration logger (requires the `obs_slog` feature).
    pub verbose: bool,
}

impl MLEOptions {
    pub fn new(tols: Tolerances, line_searcher: LineSearcher, verbose: bool) -> Self {
        Self { tols, line_searcher, verbose }
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances { tol_grad: Some(1e-5), tol_cost: None, max_iter: None },
            line_searcher: LineSearcher::MoreThuente,
            verbose: false,
        }
    }
}

/// Stopping rules.
///
/// - `tol_grad`: stop when the gradient norm falls below this value.
/// - `tol_cost`: stop when the change in cost falls below this value.
/// - `max_iter`: iteration cap; `None` means `200 × dim`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// Errors
    /// ------
    /// - `OptError::NoTolerancesProvided` if all three are `None`.
    /// - `OptError::InvalidTolGrad` / `OptError::InvalidTolCost` for
    ///   non-finite or non-positive tolerances.
    /// - `OptError::InvalidMaxIter` if `max_iter == Some(0)`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if max_iter == Some(0) {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }

    /// Iteration cap for a problem with `dim` free parameters.
    pub fn resolve_max_iter(&self, dim: usize) -> u64 {
        self.max_iter.unwrap_or(DEFAULT_MAX_ITER_PER_PARAM * dim.max(1)) as u64
    }
}

/// Result of [`maximize`](super::maximize).
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: `ℓ(θ̂)`, the log-likelihood (not the cost).
/// - `converged`: the solver met a tolerance. Hitting the iteration cap or
///   aborting leaves this `false`.
/// - `status`: human-readable termination status.
/// - `iterations`, `fn_evals`: Argmin counters.
/// - `grad`, `grad_norm`: last cost gradient `∇c(θ)` and its norm.
/// - `inv_hessian`: BFGS inverse-Hessian approximation of the cost at the
///   final iterate.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad: Option<Grad>,
    pub grad_norm: Option<f64>,
    pub inv_hessian: Option<Hessian>,
}

impl OptimOutcome {
    /// Build a validated outcome from a finished solver state.
    ///
    /// Errors
    /// ------
    /// - `OptError::MissingThetaHat` / `OptError::InvalidThetaHat` from
    ///   `validate_theta_hat`.
    /// - `OptError::NonFiniteCost` if `value` is not finite.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus,
        iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>, inv_hessian: Option<Hessian>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
        );
        let status = match &termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let grad_norm = grad.as_ref().map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad,
            grad_norm,
            inv_hessian,
        })
    }

    /// Outcome for a run the executor aborted, built from the last iterate an
    /// observer recorded. Always `converged = false`.
    pub fn aborted(
        theta_hat: Theta, value: f64, iterations: u64, fn_evals: FnEvalMap, grad: Option<Grad>,
        inv_hessian: Option<Hessian>, reason: &str,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(Some(theta_hat))?;
        validate_value(value)?;
        let grad_norm = grad.as_ref().map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged: false,
            status: format!("Aborted: {reason}"),
            iterations: iterations as usize,
            fn_evals,
            grad,
            grad_norm,
            inv_hessian,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover tolerance validation, line-search parsing, the
    // iteration-cap fallback and the mapping of termination statuses onto
    // the `converged` flag.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // All-`None` tolerances and a zero iteration cap are rejected.
    //
    // Given
    // -----
    // - `Tolerances::new(None, None, None)` and `Tolerances::new(None, None, Some(0))`.
    //
    // Expect
    // ------
    // - `NoTolerancesProvided` and `InvalidMaxIter` respectively.
    fn tolerances_reject_empty_and_zero_iterations() {
        assert_eq!(Tolerances::new(None, None, None), Err(OptError::NoTolerancesProvided));
        assert!(matches!(
            Tolerances::new(None, None, Some(0)),
            Err(OptError::InvalidMaxIter { max_iter: 0, .. })
        ));
        assert!(matches!(
            Tolerances::new(Some(-1.0), None, None),
            Err(OptError::InvalidTolGrad { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // With no explicit cap, the iteration budget scales with dimension.
    //
    // Given
    // -----
    // - Default options and a 7-dimensional problem.
    //
    // Expect
    // ------
    // - 1400 iterations; an explicit cap overrides it.
    fn max_iter_defaults_to_per_parameter_budget() {
        let opts = MLEOptions::default();
        assert_eq!(opts.tols.resolve_max_iter(7), 1400);
        let capped = Tolerances::new(Some(1e-6), None, Some(25)).expect("valid tolerances");
        assert_eq!(capped.resolve_max_iter(7), 25);
    }

    #[test]
    // Purpose
    // -------
    // Line-search names parse case-insensitively.
    //
    // Given
    // -----
    // - "hagerzhang", "MORETHUENTE" and "newton".
    //
    // Expect
    // ------
    // - The two known names parse; the third is `InvalidLineSearch`.
    fn line_searcher_parses_case_insensitively() {
        assert_eq!("hagerzhang".parse::<LineSearcher>(), Ok(LineSearcher::HagerZhang));
        assert_eq!("MORETHUENTE".parse::<LineSearcher>(), Ok(LineSearcher::MoreThuente));
        assert!(matches!(
            "newton".parse::<LineSearcher>(),
            Err(OptError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Only tolerance-based termination counts as convergence.
    //
    // Given
    // -----
    // - Outcomes built with `SolverConverged` and with `MaxItersReached`.
    //
    // Expect
    // ------
    // - `converged` is true for the first and false for the second.
    fn outcome_converged_only_for_tolerance_termination() {
        let ok = OptimOutcome::new(
            Some(array![1.0]),
            -0.5,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            3,
            FnEvalMap::new(),
            Some(array![0.0]),
            None,
        )
        .expect("valid outcome");
        let capped = OptimOutcome::new(
            Some(array![1.0]),
            -0.5,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached),
            3,
            FnEvalMap::new(),
            None,
            None,
        )
        .expect("valid outcome");

        assert!(ok.converged);
        assert_eq!(ok.grad_norm, Some(0.0));
        assert!(!capped.converged);
        assert_eq!(capped.status, "MaxItersReached");
    }

    #[test]
    // Purpose
    // -------
    // An aborted outcome keeps the recorded iterate and is never converged.
    //
    // Given
    // -----
    // - `OptimOutcome::aborted` with reason "line search failed".
    //
    // Expect
    // ------
    // - `converged = false` and the reason appears in `status`.
    fn aborted_outcome_is_not_converged() {
        let out = OptimOutcome::aborted(
            array![0.25, -1.0],
            -3.0,
            4,
            FnEvalMap::new(),
            None,
            None,
            "line search failed",
        )
        .expect("finite iterate");
        assert!(!out.converged);
        assert_eq!(out.status, "Aborted: line search failed");
        assert_eq!(out.theta_hat, array![0.25, -1.0]);
    }
}
