//! inference::covariance — covariance and standard errors from curvature.
//!
//! Purpose
//! -------
//! Turn the curvature information an optimizer leaves behind into
//! physical-unit covariances and standard errors. Two sources are
//! supported: a (quasi-Newton or numerical) inverse Hessian of a scaled
//! objective, and the final residual Jacobian of a least-squares fit.
//!
//! Key behaviors
//! -------------
//! - [`scale_covariance`] maps a covariance in scaled coordinates `u` back
//!   to physical coordinates `p = s ⊙ u` as `factor · diag(s) C diag(s)`.
//! - [`standard_errors`] takes the square root of a covariance diagonal.
//! - [`pseudo_inverse_symmetric`] inverts a symmetric curvature matrix by
//!   symmetric eigendecomposition, dropping eigenvalues at or below
//!   `EIGEN_EPS · max|λ|`.
//! - [`observed_information_covariance`] builds the Hessian of a cost from
//!   its analytic gradient by finite differences and pseudo-inverts it.
//! - [`svd_parameter_variances`] returns the diagonal of `(JᵀJ)⁺` from a
//!   truncated SVD of `J`, dropping singular values below
//!   `ε · max(rows, cols) · s_max`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Curvature matrices are square, finite and symmetric up to rounding;
//!   shape and finiteness are validated, symmetry is assumed.
//! - No explicit inverse is formed; ill-conditioned directions are
//!   truncated rather than reported as errors.
//!
//! Conventions
//! -----------
//! - `ndarray` on the public surface; `nalgebra` only for the
//!   decompositions, bridged by [`fill_dmatrix`].
//! - Negative diagonal entries (possible after truncation round-off) give a
//!   standard error of zero instead of NaN.
//!
//! Downstream usage
//! ----------------
//! - `noise::noisefit` rescales the BFGS inverse Hessian with
//!   [`scale_covariance`] and reports [`standard_errors`], or uses
//!   [`observed_information_covariance`] when asked for a numerical
//!   Hessian.
//! - `transfer::fit` calls [`svd_parameter_variances`] on the final
//!   Jacobian.
//!
//! Testing notes
//! -------------
//! - Unit tests check the truncation behaviour on rank-deficient inputs
//!   and agreement with closed forms on diagonal and well-posed examples.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        finite_diff::compute_hessian,
        types::{Grad, Hessian, Theta},
        validation::validate_hessian,
    },
    numerical_stability::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Physical-unit covariance `factor · diag(scale) · cov · diag(scale)`.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` if `cov`
///   is not a finite square matrix.
/// - `OptError::ScaleDimMismatch` if `scale.len()` differs from its size.
pub fn scale_covariance(cov: &Array2<f64>, scale: &Array1<f64>, factor: f64) -> OptResult<Array2<f64>> {
    let dim = cov.nrows();
    validate_hessian(cov, dim)?;
    if scale.len() != dim {
        return Err(OptError::ScaleDimMismatch { expected: dim, found: scale.len() });
    }
    let mut out = cov.clone();
    for ((i, j), v) in out.indexed_iter_mut() {
        *v *= factor * scale[i] * scale[j];
    }
    Ok(out)
}

/// Square roots of the covariance diagonal; negative entries give zero.
pub fn standard_errors(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().mapv(|v| v.max(0.0).sqrt())
}

/// Moore–Penrose pseudo-inverse of a symmetric matrix.
///
/// Eigenvalues `λ` with `λ <= EIGEN_EPS · max|λ|` are treated as zero, so
/// indefinite or flat directions contribute nothing rather than blowing up.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` from
///   `validate_hessian`.
pub fn pseudo_inverse_symmetric(hess: &Hessian) -> OptResult<Hessian> {
    let n = hess.nrows();
    validate_hessian(hess, n)?;
    let eigen = fill_dmatrix(hess).symmetric_eigen();
    let lambda_max = eigen.eigenvalues.iter().fold(0.0_f64, |acc, l| acc.max(l.abs()));
    let cutoff = EIGEN_EPS * lambda_max;
    let q = &eigen.eigenvectors;
    let mut out = Array2::<f64>::zeros((n, n));
    for (k, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda <= cutoff {
            continue;
        }
        for i in 0..n {
            let qi = q[(i, k)] / lambda;
            for j in 0..n {
                out[[i, j]] += qi * q[(j, k)];
            }
        }
    }
    Ok(out)
}

/// Covariance from the numerical Hessian of a cost whose gradient is known.
///
/// `grad_fn` is `∇c(θ)` for the cost being minimized.
///
/// Errors
/// ------
/// - Hessian validation errors from `compute_hessian`.
pub fn observed_information_covariance<F: Fn(&Theta) -> Grad>(
    grad_fn: &F, theta_hat: &Theta,
) -> OptResult<Hessian> {
    let hess = compute_hessian(grad_fn, theta_hat)?;
    pseudo_inverse_symmetric(&hess)
}

/// Diagonal of `(JᵀJ)⁺` from a truncated SVD of the Jacobian `J`.
///
/// With `J = U S Vᵀ`, `var_i = Σ_k (V[i, k] / s_k)²` over the singular
/// values `s_k > ε · max(rows, cols) · s_max`.
///
/// Errors
/// ------
/// - `OptError::InvalidHessian` if `jac` has a non-finite entry.
/// - `OptError::PotentialBug` if the decomposition returns no right
///   singular vectors.
pub fn svd_parameter_variances(jac: &DMatrix<f64>) -> OptResult<Array1<f64>> {
    if let Some(pos) = jac.iter().position(|v| !v.is_finite()) {
        let (rows, _) = jac.shape();
        return Err(OptError::InvalidHessian { row: pos % rows, col: pos / rows, value: jac[pos] });
    }
    let (rows, cols) = jac.shape();
    let svd = jac.clone().svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| OptError::PotentialBug {
        text: "SVD returned no right singular vectors".to_string(),
    })?;
    let s = &svd.singular_values;
    let s_max = s.iter().fold(0.0_f64, |acc, v| acc.max(*v));
    let threshold = f64::EPSILON * rows.max(cols) as f64 * s_max;
    let mut var = Array1::<f64>::zeros(cols);
    for (k, &sk) in s.iter().enumerate() {
        if sk <= threshold {
            continue;
        }
        for i in 0..cols {
            let w = v_t[(k, i)] / sk;
            var[i] += w * w;
        }
    }
    Ok(var)
}

/// Copy an `ndarray` matrix into a `nalgebra::DMatrix`.
pub fn fill_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub mod prelude {
    pub use super::{
        observed_information_covariance, pseudo_inverse_symmetric, scale_covariance,
        standard_errors, svd_parameter_variances,
    };
}
