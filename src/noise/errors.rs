//! noise::errors — input-validation failures of the noise model fit.
use crate::optimization::errors::OptError;
use thiserror::Error;

pub type NoiseResult<T> = Result<T, NoiseError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseError {
    /// Data must be a waveforms × samples matrix.
    #[error("Data must be two-dimensional, got {ndim} dimension(s)")]
    DataNotTwoDimensional { ndim: usize },

    #[error("Data must contain at least one waveform with at least one sample, got shape ({m}, {n})")]
    EmptyData { m: usize, n: usize },

    #[error("All variables are fixed; nothing to optimize")]
    AllParametersFixed,

    /// An initial guess has the wrong length for the data shape.
    #[error("Initial guess '{name}' has length {found}, expected {expected}")]
    GuessLengthMismatch { name: &'static str, expected: usize, found: usize },

    #[error("Initial guess '{name}' contains a non-finite value at index {index}")]
    NonFiniteGuess { name: &'static str, index: usize },

    #[error("Sampling time must be finite and positive, got {dt}")]
    InvalidSamplingTime { dt: f64 },

    /// Flat parameter vector does not match the free-block layout.
    #[error("Parameter vector length mismatch: expected {expected}, found {found}")]
    ThetaLengthMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Optimization(#[from] OptError),
}
