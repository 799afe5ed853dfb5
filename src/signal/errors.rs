//! signal::errors — shape failures of the waveform helpers.
use thiserror::Error;

pub type SignalResult<T> = Result<T, SignalError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    /// A per-lane correction does not have one entry per lane.
    #[error("Correction '{name}' has length {found}, but the data have {expected} lane(s)")]
    CorrectionLengthMismatch { name: &'static str, expected: usize, found: usize },

    /// A frequency response was not sampled on the `n/2 + 1` rfft grid.
    #[error("Transfer function returned {found} value(s), expected {expected}")]
    ResponseLengthMismatch { expected: usize, found: usize },

    #[error("Sampling time must be finite and positive, got {dt}")]
    InvalidSamplingTime { dt: f64 },
}
