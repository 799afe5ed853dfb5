//! Execution helper that runs a BFGS solver on a log-likelihood problem and
//! returns a crate-friendly [`OptimOutcome`].
//!
//! An [`IterateRecorder`] observer keeps a copy of the best iterate after
//! every iteration. If the executor aborts (typically a line search that
//! cannot make progress), the recorded iterate is returned as a
//! non-converged outcome instead of an error.
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        adapter::ArgMinAdapter,
        traits::{LogLikelihood, MLEOptions, OptimOutcome},
        types::{BfgsState, FnEvalMap, Grad, Hessian, Theta},
    },
};
use argmin::core::{
    Error, Executor, KV, Solver, State,
    observers::{Observe, ObserverMode},
};
use ndarray::Array2;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Snapshot of the best iterate seen so far.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedIterate {
    pub theta: Theta,
    pub cost: f64,
    pub iterations: u64,
    pub fn_evals: FnEvalMap,
    pub grad: Option<Grad>,
    pub inv_hessian: Option<Hessian>,
}

/// Observer that stores the best iterate in a shared slot.
///
/// The executor takes ownership of the observer, so the caller keeps a clone
/// of [`IterateRecorder::slot`] to read the snapshot after the run.
#[derive(Debug, Clone, Default)]
pub struct IterateRecorder {
    slot: Arc<Mutex<Option<RecordedIterate>>>,
}

impl IterateRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> Arc<Mutex<Option<RecordedIterate>>> {
        Arc::clone(&self.slot)
    }

    fn record(&self, state: &BfgsState) {
        let Some(theta) = state.get_best_param().cloned() else {
            return;
        };
        let snapshot = RecordedIterate {
            theta,
            cost: state.get_best_cost(),
            iterations: state.get_iter(),
            fn_evals: state.get_func_counts().clone(),
            grad: state.get_gradient().cloned(),
            inv_hessian: state.get_inv_hessian().cloned(),
        };
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(snapshot);
        }
    }
}

impl Observe<BfgsState> for IterateRecorder {
    fn observe_init(&mut self, _name: &str, state: &BfgsState, _kv: &KV) -> Result<(), Error> {
        self.record(state);
        Ok(())
    }

    fn observe_iter(&mut self, state: &BfgsState, _kv: &KV) -> Result<(), Error> {
        self.record(state);
        Ok(())
    }
}

/// Run BFGS on a log-likelihood problem.
///
/// Wires the adapted problem, the solver, `theta0`, an identity initial
/// inverse Hessian and the resolved iteration cap into an Argmin executor.
/// With the `obs_slog` feature and `opts.verbose`, a terminal slog observer
/// is attached as well.
///
/// Returns
/// -------
/// - On normal termination: the final state as an [`OptimOutcome`]
///   (`value` is `ℓ(θ̂)`, not the cost).
/// - On an executor error after at least one recorded iterate: the recorded
///   iterate with `converged = false` and the error text in `status`.
///
/// Errors
/// ------
/// - The executor error itself when it fails before any iterate was
///   recorded (for example the cost is not finite at `theta0`).
/// - Validation errors from [`OptimOutcome::new`].
pub fn run_bfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, BfgsState> + Send + 'static,
{
    let dim = theta0.len();
    let max_iter = opts.tols.resolve_max_iter(dim);
    debug!(dim, max_iter, line_search = ?opts.line_searcher, "starting BFGS");

    let recorder = IterateRecorder::new();
    let slot = recorder.slot();
    let optimizer = Executor::new(problem, solver)
        .configure(|state| state.param(theta0).inv_hessian(Array2::eye(dim)).max_iters(max_iter))
        .add_observer(recorder, ObserverMode::Always);
    #[cfg(feature = "obs_slog")]
    let optimizer = if opts.verbose {
        optimizer.add_observer(argmin_observer_slog::SlogLogger::term_noblock(), ObserverMode::Always)
    } else {
        optimizer
    };

    match optimizer.run() {
        Ok(result) => {
            let mut state = result.state().clone();
            let iterations = state.get_iter();
            let fn_evals = state.get_func_counts().clone();
            let termination = state.get_termination_status().clone();
            // Estimate, gradient and inverse Hessian all come from the final
            // state so they describe one point.
            let grad = state.take_gradient();
            let inv_hessian = state.take_inv_hessian();
            let outcome = OptimOutcome::new(
                state.take_param(),
                -state.get_cost(),
                termination,
                iterations,
                fn_evals,
                grad,
                inv_hessian,
            )?;
            debug!(
                iterations = outcome.iterations,
                status = %outcome.status,
                loglik = outcome.value,
                "BFGS finished"
            );
            Ok(outcome)
        }
        Err(err) => {
            let recorded = slot.lock().ok().and_then(|mut guard| guard.take());
            match recorded {
                Some(rec) => {
                    let reason = err.to_string();
                    debug!(iterations = rec.iterations, %reason, "BFGS aborted; returning best iterate");
                    OptimOutcome::aborted(
                        rec.theta,
                        -rec.cost,
                        rec.iterations,
                        rec.fn_evals,
                        rec.grad,
                        rec.inv_hessian,
                        &reason,
                    )
                }
                None => Err(err.into()),
            }
        }
    }
}
