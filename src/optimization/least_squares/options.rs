//! Configuration of the Levenberg–Marquardt runs.
use crate::optimization::errors::{OptError, OptResult};
use levenberg_marquardt::LevenbergMarquardt;

/// Default relative tolerance on the cost and on the step, `30·ε`.
pub const DEFAULT_LM_TOL: f64 = 30.0 * f64::EPSILON;
/// Default evaluation budget multiplier.
pub const DEFAULT_PATIENCE: usize = 100;

/// Stopping rules for [`run_levenberg_marquardt`](super::run::run_levenberg_marquardt).
///
/// - `ftol`: relative reduction of the sum of squares.
/// - `xtol`: relative change of the parameters.
/// - `gtol`: orthogonality between residuals and Jacobian columns.
/// - `patience`: the solver stops after `patience · (n + 1)` evaluations.
///
/// Defaults follow `levenberg_marquardt::LevenbergMarquardt::new`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeastSquaresOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub patience: usize,
}

impl Default for LeastSquaresOptions {
    fn default() -> Self {
        Self { ftol: DEFAULT_LM_TOL, xtol: DEFAULT_LM_TOL, gtol: 0.0, patience: DEFAULT_PATIENCE }
    }
}

impl LeastSquaresOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - `OptError::InvalidLeastSquaresTol` for a negative or non-finite
    ///   tolerance.
    /// - `OptError::InvalidPatience` for `patience == 0`.
    pub fn new(ftol: f64, xtol: f64, gtol: f64, patience: usize) -> OptResult<Self> {
        let opts = Self { ftol, xtol, gtol, patience };
        opts.validate()?;
        Ok(opts)
    }

    /// Re-check options whose fields were set directly.
    pub fn validate(&self) -> OptResult<()> {
        for (name, tol) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !tol.is_finite() || tol < 0.0 {
                return Err(OptError::InvalidLeastSquaresTol {
                    name,
                    tol,
                    reason: "Tolerance must be finite and non-negative.",
                });
            }
        }
        if self.patience == 0 {
            return Err(OptError::InvalidPatience { patience: 0 });
        }
        Ok(())
    }

    /// Solver configured with these options.
    pub(crate) fn solver(&self) -> OptResult<LevenbergMarquardt<f64>> {
        self.validate()?;
        Ok(LevenbergMarquardt::new()
            .with_ftol(self.ftol)
            .with_xtol(self.xtol)
            .with_gtol(self.gtol)
            .with_patience(self.patience))
    }
}
