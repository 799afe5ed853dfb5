//! loglik_optimizer::types — numeric aliases and BFGS wiring.
//!
//! Purpose
//! -------
//! Fix the concrete `ndarray` and Argmin types the optimizer works with so
//! that the adapter, builders and runner agree on one set of generics.
//!
//! Key behaviors
//! -------------
//! - Aliases for parameters, gradients, dense curvature matrices and the
//!   scalar cost (`Theta`, `Grad`, `Hessian`, `Cost`).
//! - BFGS solver aliases for both supported line searches, and the
//!   iteration-state alias [`BfgsState`] that carries the inverse Hessian
//!   approximation alongside parameter and gradient.
//!
//! Conventions
//! -----------
//! - `Hessian` doubles as the inverse-Hessian type inside [`BfgsState`];
//!   both are `dim × dim`.
//! - When no iteration cap is configured, the runner allows
//!   [`DEFAULT_MAX_ITER_PER_PARAM`] iterations per free parameter.
//!
//! Testing notes
//! -------------
//! - Type aliases and constants only; exercised through the builder and
//!   runner tests.
use argmin::{
    core::IterState,
    solver::{
        linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
        quasinewton::BFGS,
    },
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient vector, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Dense `dim × dim` matrix: Hessian or inverse-Hessian approximation.
pub type Hessian = Array2<f64>;

/// Scalar cost `c(θ) = -ℓ(θ)` seen by the solver.
pub type Cost = f64;

/// Function-evaluation counters keyed by Argmin's counter names
/// (`"cost_count"`, `"gradient_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Iteration allowance per free parameter when `max_iter` is unset.
pub const DEFAULT_MAX_ITER_PER_PARAM: usize = 200;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// BFGS with Hager–Zhang line search.
pub type BfgsHagerZhang = BFGS<HagerZhangLS, Cost>;

/// BFGS with More–Thuente line search.
pub type BfgsMoreThuente = BFGS<MoreThuenteLS, Cost>;

/// Argmin iteration state used by both BFGS variants.
pub type BfgsState = IterState<Theta, Grad, (), Hessian, (), Cost>;
