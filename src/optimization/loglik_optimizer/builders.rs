//! loglik_optimizer::builders — BFGS solver construction.
//!
//! Purpose
//! -------
//! Build BFGS solvers for either supported line search and apply the
//! tolerances of [`MLEOptions`], so the runner only sees a ready solver.
//!
//! Key behaviors
//! -------------
//! - [`build_optimizer_hager_zhang`] / [`build_optimizer_more_thuente`]
//!   construct the line search and the BFGS solver around it.
//! - [`configure_bfgs`] applies `tol_grad` / `tol_cost` when present and
//!   leaves Argmin's defaults otherwise.
//!
//! Conventions
//! -----------
//! - Initial parameters, the initial inverse Hessian and the iteration cap
//!   are executor-state concerns handled by `run::run_bfgs`.
//! - Argmin rejects negative tolerances; that error arrives as an
//!   [`OptError`](crate::optimization::errors::OptError) through `?`.
use argmin::solver::quasinewton::BFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        traits::MLEOptions,
        types::{BfgsHagerZhang, BfgsMoreThuente, Cost, HagerZhangLS, MoreThuenteLS},
    },
};

/// BFGS with Hager–Zhang line search and the tolerances of `opts`.
///
/// Errors
/// ------
/// - Tolerances rejected by Argmin, mapped to `OptError`.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<BfgsHagerZhang> {
    configure_bfgs(BFGS::new(HagerZhangLS::new()), opts)
}

/// BFGS with More–Thuente line search and the tolerances of `opts`.
///
/// Errors
/// ------
/// - Tolerances rejected by Argmin, mapped to `OptError`.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<BfgsMoreThuente> {
    configure_bfgs(BFGS::new(MoreThuenteLS::new()), opts)
}

/// Apply the optional gradient and cost-change tolerances to a BFGS solver.
///
/// Generic over the line search so both builders share it.
pub fn configure_bfgs<L>(mut solver: BFGS<L, Cost>, opts: &MLEOptions) -> OptResult<BFGS<L, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::loglik_optimizer::traits::{LineSearcher, Tolerances};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover solver construction for both line searches and the
    // tolerance wiring. End-to-end runs live with the runner.
    // -------------------------------------------------------------------------

    fn opts(tol_grad: Option<f64>, tol_cost: Option<f64>, ls: LineSearcher) -> MLEOptions {
        let tols = Tolerances::new(tol_grad, tol_cost, Some(50)).expect("valid tolerances");
        MLEOptions::new(tols, ls, false)
    }

    #[test]
    // Purpose
    // -------
    // Both builders succeed for valid tolerances.
    //
    // Given
    // -----
    // - `tol_grad = 1e-6`, `tol_cost = 1e-10`.
    //
    // Expect
    // ------
    // - `Ok(_)` from each builder.
    fn builders_accept_valid_tolerances() {
        assert!(build_optimizer_hager_zhang(&opts(Some(1e-6), Some(1e-10), LineSearcher::HagerZhang)).is_ok());
        assert!(
            build_optimizer_more_thuente(&opts(Some(1e-6), Some(1e-10), LineSearcher::MoreThuente))
                .is_ok()
        );
    }

    #[test]
    // Purpose
    // -------
    // Absent tolerances leave Argmin's defaults in place.
    //
    // Given
    // -----
    // - Only an iteration cap.
    //
    // Expect
    // ------
    // - `configure_bfgs` returns `Ok(_)`.
    fn configure_bfgs_skips_absent_tolerances() {
        let solver: BfgsMoreThuente = BFGS::new(MoreThuenteLS::new());
        assert!(configure_bfgs(solver, &opts(None, None, LineSearcher::MoreThuente)).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // A negative tolerance that bypassed `Tolerances::new` is still caught
    // by the solver.
    //
    // Given
    // -----
    // - Options with `tol_grad = -1.0` written directly into the struct.
    //
    // Expect
    // ------
    // - The builder returns `Err(_)`.
    fn configure_bfgs_surfaces_solver_rejection() {
        let mut bad = MLEOptions::default();
        bad.tols.tol_grad = Some(-1.0);
        assert!(build_optimizer_more_thuente(&bad).is_err());
    }
}
