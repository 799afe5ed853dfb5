//! transfer::errors — failures of the transfer-function fit.
use crate::optimization::errors::OptError;
use thiserror::Error;

/// Result alias for the transfer-function fit. `FitResult` is the name of
/// the fit's output struct.
pub type TransferResult<T> = Result<T, FitError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Input and output waveforms must have the same number of samples.
    #[error("Input and output waveforms differ in length: x has {x}, y has {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("Waveforms must contain at least one sample")]
    EmptySignal,

    #[error("Sampling time must be finite and positive, got {dt}")]
    InvalidSamplingTime { dt: f64 },

    /// Noise amplitudes weight the residuals and must be positive.
    #[error("Noise amplitude of '{signal}' is not positive at sample {index}: {value}")]
    NonPositiveNoise { signal: &'static str, index: usize, value: f64 },

    /// The starting point must have as many entries as the model has
    /// parameters.
    #[error("Transfer function takes {expected} parameter(s), but the initial guess has {found}")]
    ParameterCountMismatch { expected: usize, found: usize },

    #[error("Initial parameter {index} is not finite: {value}")]
    NonFiniteGuess { index: usize, value: f64 },

    /// Bounds must provide one lower and one upper value per parameter.
    #[error("Bounds cover {found} parameter(s), but the initial guess has {expected}")]
    BoundsLengthMismatch { expected: usize, found: usize },

    #[error("Initial parameter {index} = {value} lies outside its bounds [{lower}, {upper}]")]
    GuessOutsideBounds { index: usize, value: f64, lower: f64, upper: f64 },

    #[error("Invalid frequency band [{low}, {high}]: need 0 <= low < high")]
    InvalidFrequencyBand { low: f64, high: f64 },

    /// The transfer function must return one value per requested frequency.
    #[error("Transfer function returned {found} value(s), expected {expected}")]
    ResponseLengthMismatch { expected: usize, found: usize },

    #[error("Transfer-function Jacobian has shape {found:?}, expected {expected:?}")]
    JacobianShapeMismatch { expected: (usize, usize), found: (usize, usize) },

    #[error("Residual {index} is not finite: {value}")]
    NonFiniteResidual { index: usize, value: f64 },

    #[error(transparent)]
    Optimization(#[from] OptError),
}
