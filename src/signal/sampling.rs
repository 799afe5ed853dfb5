//! signal::sampling — process-wide default sampling time.
//!
//! Purpose
//! -------
//! Hold the one piece of shared configuration in the crate: a default
//! sampling interval that every public entry point consults when the caller
//! does not pass an explicit `dt`.
//!
//! Key behaviors
//! -------------
//! - [`set_sampling_time`], [`sampling_time`] and [`reset_sampling_time`]
//!   read and write the default behind a `RwLock`.
//! - [`resolve_sampling_time`] applies the resolution rule:
//!   - neither value set: `1.0` (samples are in units of `dt`),
//!   - only the default set: the default,
//!   - an explicit value always wins; if it is not close to a set default
//!     a `tracing` warning is emitted and the explicit value is used.
//!
//! Invariants & assumptions
//! ------------------------
//! - The core numerical code never writes the default; only callers do.
//! - A poisoned lock is treated as holding its last value.
//!
//! Testing notes
//! -------------
//! - The resolution rule is tested through [`resolve_against`], which takes
//!   the default as an argument, so tests never race on the global value.
use std::sync::RwLock;

static SAMPLING_TIME: RwLock<Option<f64>> = RwLock::new(None);

/// Relative tolerance used to decide that two sampling times agree.
pub const SAMPLING_RTOL: f64 = 1e-5;
/// Absolute tolerance used to decide that two sampling times agree.
pub const SAMPLING_ATOL: f64 = 1e-8;

/// Set (or clear, with `None`) the process-wide default sampling time.
pub fn set_sampling_time(dt: Option<f64>) {
    match SAMPLING_TIME.write() {
        Ok(mut guard) => *guard = dt,
        Err(poisoned) => *poisoned.into_inner() = dt,
    }
}

/// Current process-wide default sampling time, if any.
pub fn sampling_time() -> Option<f64> {
    match SAMPLING_TIME.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Clear the process-wide default.
pub fn reset_sampling_time() {
    set_sampling_time(None);
}

/// Resolve the sampling time for one call against the process-wide default.
///
/// Parameters
/// ----------
/// - `dt`: `Option<f64>`
///   Explicit sampling time supplied by the caller.
///
/// Returns
/// -------
/// `f64`
///   The sampling time to use; see [`resolve_against`] for the rule.
pub fn resolve_sampling_time(dt: Option<f64>) -> f64 {
    resolve_against(dt, sampling_time())
}

/// Resolution rule with the default passed in explicitly.
///
/// Notes
/// -----
/// - Two values are "close" when `|dt - default| <= ATOL + RTOL·|default|`.
/// - A conflict is not an error: the explicit value is returned and a
///   warning is logged.
pub fn resolve_against(dt: Option<f64>, default: Option<f64>) -> f64 {
    match (dt, default) {
        (None, None) => 1.0,
        (None, Some(global)) => global,
        (Some(local), None) => local,
        (Some(local), Some(global)) => {
            if !is_close(local, global) {
                tracing::warn!(
                    explicit = local,
                    default = global,
                    "explicit sampling time differs from the global default; using the explicit value"
                );
            }
            local
        }
    }
}

fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= SAMPLING_ATOL + SAMPLING_RTOL * b.abs()
}

pub mod prelude {
    pub use super::{
        reset_sampling_time, resolve_sampling_time, sampling_time, set_sampling_time,
    };
}
