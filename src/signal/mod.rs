//! signal — spectral plumbing shared by the noise and transfer fits.
//!
//! - [`fft`]: real FFT plan, frequency grids and spectral derivative.
//! - [`sampling`]: process-wide default sampling time and its resolution.
//! - [`waveform`]: time grids, simulated pulses, rescale/shift and
//!   transfer-function filtering.

pub mod errors;
pub mod fft;
pub mod sampling;
pub mod waveform;

pub use self::errors::{SignalError, SignalResult};
pub use self::fft::{RealFft, angular_frequencies, normalized_angular_frequencies};
pub use self::sampling::{
    reset_sampling_time, resolve_sampling_time, sampling_time, set_sampling_time,
};
pub use self::waveform::{WaveOptions, scaleshift, timebase, transfer, wave};

pub mod prelude {
    pub use super::errors::{SignalError, SignalResult};
    pub use super::fft::prelude::*;
    pub use super::sampling::prelude::*;
    pub use super::waveform::prelude::*;
}
