//! High-level entry point for maximizing a user-provided `LogLikelihood`.
//!
//! Selects BFGS with either Hager–Zhang or More–Thuente line search, wraps
//! the model in an `ArgMinAdapter` (which minimizes `-ℓ(θ)`), and delegates
//! the run to `run_bfgs`.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_bfgs,
        traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome},
        types::Theta,
    },
};

/// Maximize a log-likelihood `ℓ(θ)` with BFGS.
///
/// # Behavior
/// - Validates the starting point via `f.check(theta0, data)`.
/// - Builds the solver for `opts.line_searcher` and runs it from `theta0`
///   with an identity initial inverse Hessian.
///
/// # Errors
/// - Any error from `f.check`.
/// - Tolerances rejected by the solver.
/// - Executor failures that happen before a first iterate is recorded.
///
/// # Returns
/// An [`OptimOutcome`]. Non-convergence is reported through
/// `converged = false`, not as an error.
///
/// # Example
/// ```
/// use ndarray::array;
/// use thzfit::optimization::errors::OptResult;
/// use thzfit::optimization::loglik_optimizer::{LogLikelihood, MLEOptions, Theta, maximize};
///
/// struct Bowl;
/// impl LogLikelihood for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(-(theta[0] - 1.0).powi(2) - (theta[1] + 2.0).powi(2))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = maximize(&Bowl, array![0.0, 0.0], &(), &MLEOptions::default())?;
/// assert!((out.theta_hat[0] - 1.0).abs() < 1e-4);
/// assert!((out.theta_hat[1] + 2.0).abs() < 1e-4);
/// # Ok::<(), thzfit::optimization::errors::OptError>(())
/// ```
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_bfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_bfgs(theta0, opts, problem, solver)
        }
    }
}
