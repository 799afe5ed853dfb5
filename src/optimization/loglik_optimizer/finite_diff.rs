//! loglik_optimizer::finite_diff — numerical derivatives on top of `finitediff`.
//!
//! Purpose
//! -------
//! Provide validated finite-difference gradients, Hessians and Jacobians so
//! that callers never touch the `finitediff` API or its failure modes
//! directly.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient of a scalar objective
//!   whose evaluation errors are smuggled out through a `RefCell`.
//! - [`compute_hessian`]: Hessian from an analytic gradient, central
//!   differences first with a forward-difference fallback, symmetrized.
//! - [`forward_jacobian`]: Jacobian of a vector-valued map with rows
//!   indexed by output and columns by parameter.
//!
//! Invariants & assumptions
//! ------------------------
//! - Returned gradients and Hessians pass [`validate_grad`] and
//!   [`validate_hessian`].
//! - The Jacobian shape is checked against the output length; the
//!   orientation is normalized to `(n_out, n_in)`.
//!
//! Downstream usage
//! ----------------
//! - `adapter::ArgMinAdapter` falls back to [`run_fd_diff`] when a model
//!   has no analytic gradient.
//! - The noise fit calls [`compute_hessian`] for its finite-difference
//!   covariance option.
//! - The transfer-function fit calls [`forward_jacobian`] when the model
//!   supplies no parameter Jacobian.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::{
        types::{Grad, Hessian, Theta},
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use ndarray::{Array1, Array2};
use std::cell::RefCell;

/// Forward-difference gradient with error capture.
///
/// Parameters
/// ----------
/// - `theta`: point of evaluation; its length is the gradient length.
/// - `func`: objective. On failure it must store the error in `closure_err`
///   and return `NaN`.
/// - `closure_err`: side channel for the first evaluation error; cleared on
///   entry.
///
/// Errors
/// ------
/// - The captured error, converted to `OptError`.
/// - `OptError::GradientDimMismatch` / `OptError::InvalidGradient` from
///   [`validate_grad`].
///
/// Examples
/// --------
/// ```rust
/// # use std::cell::RefCell;
/// # use argmin::core::Error;
/// # use ndarray::array;
/// # use thzfit::optimization::loglik_optimizer::finite_diff::run_fd_diff;
/// let closure_err: RefCell<Option<Error>> = RefCell::new(None);
/// let grad = run_fd_diff(&array![0.0, 1.0], &|x: &ndarray::Array1<f64>| x.dot(x), &closure_err)?;
/// assert_eq!(grad.len(), 2);
/// # Ok::<(), thzfit::optimization::errors::OptError>(())
/// ```
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Hessian from a gradient function, symmetrized.
///
/// Central differences are tried first; if they produce a non-finite entry
/// the forward-difference Hessian is used instead, and only its validation
/// error is surfaced.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when the
///   fallback also fails [`validate_hessian`].
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut hess = theta.central_hessian(f);
    if validate_hessian(&hess, dim).is_err() {
        hess = theta.forward_hessian(f);
        validate_hessian(&hess, dim)?;
    }
    symmetrize_hess(&mut hess);
    Ok(hess)
}

/// Forward-difference Jacobian of a vector-valued map, shape `(n_out, n_in)`.
///
/// `n_out` is the length of `f(theta)`. Column `j` holds `∂f/∂θ_j`.
///
/// Errors
/// ------
/// - `OptError::GradientDimMismatch` if the Jacobian does not have
///   `n_out × n_in` entries in either orientation.
/// - `OptError::InvalidGradient` for the first non-finite entry, reported by
///   its flat row-major index.
pub fn forward_jacobian<F: Fn(&Theta) -> Array1<f64>>(
    f: &F, theta: &Theta,
) -> OptResult<Array2<f64>> {
    let n_in = theta.len();
    let n_out = f(theta).len();
    let jac = theta.forward_jacobian(f);
    let jac = match jac.dim() {
        (r, c) if r == n_out && c == n_in => jac,
        (r, c) if r == n_in && c == n_out => jac.reversed_axes(),
        (r, c) => {
            return Err(OptError::GradientDimMismatch { expected: n_out * n_in, found: r * c });
        }
    };
    if let Some((index, &value)) = jac.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidGradient {
            index,
            value,
            reason: "Jacobian elements must be finite.",
        });
    }
    Ok(jac)
}

/// Average each off-diagonal pair in place; the diagonal is untouched.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
