//! Levenberg–Marquardt runner with a crate-level report.
use crate::optimization::{errors::OptResult, least_squares::options::LeastSquaresOptions};
use levenberg_marquardt::{LeastSquaresProblem, MinimizationReport};
use nalgebra::Dyn;
use tracing::debug;

/// Summary of a least-squares run.
///
/// - `evaluations`: residual evaluations used.
/// - `termination`: solver termination reason, formatted.
/// - `objective`: `½‖r‖²` at the returned parameters.
/// - `success`: the solver reports a successful termination.
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresReport {
    pub evaluations: usize,
    pub termination: String,
    pub objective: f64,
    pub success: bool,
}

impl From<MinimizationReport<f64>> for LeastSquaresReport {
    fn from(report: MinimizationReport<f64>) -> Self {
        Self {
            evaluations: report.number_of_evaluations,
            success: report.termination.was_successful(),
            termination: format!("{:?}", report.termination),
            objective: report.objective_function,
        }
    }
}

/// Minimize `½‖r(p)‖²` for `problem`, starting from `problem.params()`.
///
/// The solved problem is returned with its parameters set to the final
/// iterate. Failing to converge is reported through
/// [`LeastSquaresReport::success`], not as an error.
///
/// Errors
/// ------
/// - `OptError::InvalidLeastSquaresTol` / `OptError::InvalidPatience` for
///   invalid options.
pub fn run_levenberg_marquardt<P>(
    problem: P, opts: &LeastSquaresOptions,
) -> OptResult<(P, LeastSquaresReport)>
where
    P: LeastSquaresProblem<f64, Dyn, Dyn>,
{
    let solver = opts.solver()?;
    debug!(
        dim = problem.params().len(),
        ftol = opts.ftol,
        xtol = opts.xtol,
        "starting Levenberg-Marquardt"
    );
    let (problem, report) = solver.minimize(problem);
    let report = LeastSquaresReport::from(report);
    debug!(
        evaluations = report.evaluations,
        termination = %report.termination,
        objective = report.objective,
        "Levenberg-Marquardt finished"
    );
    Ok((problem, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::{DMatrix, DVector, storage::Owned};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // End-to-end run on a small exponential fit and the option check.
    // -------------------------------------------------------------------------

    /// Residuals `c·exp(k·t) − y` for `p = (c, k)`.
    struct Decay {
        t: DVector<f64>,
        y: DVector<f64>,
        p: DVector<f64>,
    }

    impl LeastSquaresProblem<f64, Dyn, Dyn> for Decay {
        type ResidualStorage = Owned<f64, Dyn>;
        type JacobianStorage = Owned<f64, Dyn, Dyn>;
        type ParameterStorage = Owned<f64, Dyn>;

        fn set_params(&mut self, p: &DVector<f64>) {
            self.p.copy_from(p);
        }

        fn params(&self) -> DVector<f64> {
            self.p.clone()
        }

        fn residuals(&self) -> Option<DVector<f64>> {
            Some(self.t.map(|t| self.p[0] * (self.p[1] * t).exp()) - &self.y)
        }

        fn jacobian(&self) -> Option<DMatrix<f64>> {
            Some(DMatrix::from_fn(self.t.len(), 2, |i, j| {
                let e = (self.p[1] * self.t[i]).exp();
                if j == 0 { e } else { self.p[0] * self.t[i] * e }
            }))
        }
    }

    #[test]
    // Purpose
    // -------
    // The runner recovers exact-data parameters and reports success.
    //
    // Given
    // -----
    // - y = 2·exp(−0.5 t) on t = 0, 0.25, …, 2.75, start (1, 0).
    //
    // Expect
    // ------
    // - p ≈ (2, −0.5), success, objective ≈ 0.
    fn levenberg_marquardt_fits_exponential() {
        // Arrange
        let t = DVector::from_fn(12, |i, _| 0.25 * i as f64);
        let y = t.map(|t| 2.0 * (-0.5 * t).exp());
        let problem = Decay { t, y, p: DVector::from_vec(vec![1.0, 0.0]) };

        // Act
        let (solved, report) =
            run_levenberg_marquardt(problem, &LeastSquaresOptions::default()).expect("valid options");

        // Assert
        assert!(report.success, "termination: {}", report.termination);
        assert_abs_diff_eq!(solved.p[0], 2.0, epsilon = 1e-8);
        assert_abs_diff_eq!(solved.p[1], -0.5, epsilon = 1e-8);
        assert!(report.objective < 1e-20);
        assert!(report.evaluations > 0);
    }
}
