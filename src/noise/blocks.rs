//! noise::blocks — tagged parameter blocks of the joint noise fit.
//!
//! Purpose
//! -------
//! Describe the joint parameter vector of the noise fit as an ordered list
//! of named blocks, some of which may be held fixed, and provide the pack /
//! unpack operations between per-block values and the flat vector the
//! optimizer sees.
//!
//! Key behaviors
//! -------------
//! - [`ParamBlock::CANONICAL`] fixes the block order: `LogVAlpha`,
//!   `LogVBeta`, `LogVTau`, `Delta`, `Alpha`, `Eta`.
//! - [`BlockLayout`] knows the signal length `n`, the waveform count `m`
//!   and which blocks are fixed. [`BlockLayout::pack`] concatenates the
//!   free blocks of a [`BlockValues`]; [`BlockLayout::unpack`] writes a flat
//!   vector back over a copy of a full set of values, leaving fixed blocks
//!   untouched.
//!
//! Invariants & assumptions
//! ------------------------
//! - Block lengths: 1 for each log-variance, `n` for `Delta`, `m − 1` for
//!   `Alpha` and `Eta`.
//! - Fixed blocks are spliced out of the flat vector entirely; they are
//!   never zero-filled.
//!
//! Downstream usage
//! ----------------
//! - The likelihood engine builds its gradient block by block through
//!   [`BlockLayout::assemble`], so gradient layout and parameter layout
//!   cannot drift apart.
use crate::noise::errors::{NoiseError, NoiseResult};
use ndarray::{Array1, ArrayView1, ArrayViewMut1, s};

/// One block of the joint parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamBlock {
    LogVAlpha,
    LogVBeta,
    LogVTau,
    Delta,
    Alpha,
    Eta,
}

impl ParamBlock {
    pub const CANONICAL: [ParamBlock; 6] = [
        ParamBlock::LogVAlpha,
        ParamBlock::LogVBeta,
        ParamBlock::LogVTau,
        ParamBlock::Delta,
        ParamBlock::Alpha,
        ParamBlock::Eta,
    ];

    /// Length of this block for `n` samples and `m` waveforms.
    pub fn len(self, n: usize, m: usize) -> usize {
        match self {
            ParamBlock::LogVAlpha | ParamBlock::LogVBeta | ParamBlock::LogVTau => 1,
            ParamBlock::Delta => n,
            ParamBlock::Alpha | ParamBlock::Eta => m.saturating_sub(1),
        }
    }

    fn index(self) -> usize {
        match self {
            ParamBlock::LogVAlpha => 0,
            ParamBlock::LogVBeta => 1,
            ParamBlock::LogVTau => 2,
            ParamBlock::Delta => 3,
            ParamBlock::Alpha => 4,
            ParamBlock::Eta => 5,
        }
    }
}

/// Which blocks are held at their initial values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedBlocks {
    flags: [bool; 6],
}

impl FixedBlocks {
    /// Nothing fixed.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, block: ParamBlock, fixed: bool) -> Self {
        self.flags[block.index()] = fixed;
        self
    }

    pub fn is_fixed(&self, block: ParamBlock) -> bool {
        self.flags[block.index()]
    }

    pub fn all_fixed(&self) -> bool {
        self.flags.iter().all(|&f| f)
    }
}

/// Per-block values (parameters, scales or gradients) for the noise fit.
///
/// The three log-variances are stored together in `logv`.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockValues {
    pub logv: Array1<f64>,
    pub delta: Array1<f64>,
    pub alpha: Array1<f64>,
    pub eta: Array1<f64>,
}

impl BlockValues {
    /// All-zero values for `n` samples and `m` waveforms.
    pub fn zeros(n: usize, m: usize) -> Self {
        let k = m.saturating_sub(1);
        Self {
            logv: Array1::zeros(3),
            delta: Array1::zeros(n),
            alpha: Array1::zeros(k),
            eta: Array1::zeros(k),
        }
    }

    pub fn block(&self, block: ParamBlock) -> ArrayView1<'_, f64> {
        match block {
            ParamBlock::LogVAlpha => self.logv.slice(s![0..1]),
            ParamBlock::LogVBeta => self.logv.slice(s![1..2]),
            ParamBlock::LogVTau => self.logv.slice(s![2..3]),
            ParamBlock::Delta => self.delta.view(),
            ParamBlock::Alpha => self.alpha.view(),
            ParamBlock::Eta => self.eta.view(),
        }
    }

    pub fn block_mut(&mut self, block: ParamBlock) -> ArrayViewMut1<'_, f64> {
        match block {
            ParamBlock::LogVAlpha => self.logv.slice_mut(s![0..1]),
            ParamBlock::LogVBeta => self.logv.slice_mut(s![1..2]),
            ParamBlock::LogVTau => self.logv.slice_mut(s![2..3]),
            ParamBlock::Delta => self.delta.view_mut(),
            ParamBlock::Alpha => self.alpha.view_mut(),
            ParamBlock::Eta => self.eta.view_mut(),
        }
    }
}

/// Shape and free/fixed pattern of the joint parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    pub n: usize,
    pub m: usize,
    pub fixed: FixedBlocks,
}

impl BlockLayout {
    pub fn new(n: usize, m: usize, fixed: FixedBlocks) -> Self {
        Self { n, m, fixed }
    }

    /// Free blocks in canonical order.
    pub fn free_blocks(&self) -> impl Iterator<Item = ParamBlock> + '_ {
        ParamBlock::CANONICAL.into_iter().filter(|b| !self.fixed.is_fixed(*b))
    }

    /// Length of the flat vector of free parameters.
    pub fn dim(&self) -> usize {
        self.free_blocks().map(|b| b.len(self.n, self.m)).sum()
    }

    /// Concatenate the free blocks of `values` in canonical order.
    pub fn pack(&self, values: &BlockValues) -> Array1<f64> {
        self.assemble(|block| values.block(block).to_owned())
    }

    /// Build a flat vector from one freshly computed array per free block.
    ///
    /// `block_fn` is only called for free blocks, in canonical order.
    pub fn assemble<F>(&self, mut block_fn: F) -> Array1<f64>
    where
        F: FnMut(ParamBlock) -> Array1<f64>,
    {
        let mut flat = Vec::with_capacity(self.dim());
        for block in self.free_blocks() {
            flat.extend(block_fn(block).iter().copied());
        }
        Array1::from_vec(flat)
    }

    /// Overwrite the free blocks of a copy of `base` with `theta`.
    ///
    /// Errors
    /// ------
    /// - `NoiseError::ThetaLengthMismatch` if `theta.len() != self.dim()`.
    pub fn unpack(&self, theta: ArrayView1<f64>, base: &BlockValues) -> NoiseResult<BlockValues> {
        let expected = self.dim();
        if theta.len() != expected {
            return Err(NoiseError::ThetaLengthMismatch { expected, found: theta.len() });
        }
        let mut values = base.clone();
        let mut offset = 0;
        for block in self.free_blocks() {
            let len = block.len(self.n, self.m);
            values.block_mut(block).assign(&theta.slice(s![offset..offset + len]));
            offset += len;
        }
        Ok(values)
    }
}

pub mod prelude {
    pub use super::{BlockLayout, BlockValues, FixedBlocks, ParamBlock};
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover block sizing, pack/unpack with fixed blocks spliced
    // out, and the length check on unpack.
    // -------------------------------------------------------------------------

    fn sample_values() -> BlockValues {
        BlockValues {
            logv: array![1.0, 2.0, 3.0],
            delta: array![10.0, 11.0, 12.0, 13.0],
            alpha: array![20.0, 21.0],
            eta: array![30.0, 31.0],
        }
    }

    #[test]
    // Purpose
    // -------
    // Fixed blocks disappear from the flat vector, and the remaining
    // blocks keep canonical order.
    //
    // Given
    // -----
    // - n = 4, m = 3 with `LogVBeta` and `Alpha` fixed.
    //
    // Expect
    // ------
    // - dim = 1 + 1 + 4 + 2 = 8 and the packed vector skips 2.0, 20.0, 21.0.
    fn pack_skips_fixed_blocks_in_canonical_order() {
        // Arrange
        let fixed = FixedBlocks::none()
            .with(ParamBlock::LogVBeta, true)
            .with(ParamBlock::Alpha, true);
        let layout = BlockLayout::new(4, 3, fixed);

        // Act
        let flat = layout.pack(&sample_values());

        // Assert
        assert_eq!(layout.dim(), 8);
        assert_eq!(flat, array![1.0, 3.0, 10.0, 11.0, 12.0, 13.0, 30.0, 31.0]);
    }

    #[test]
    // Purpose
    // -------
    // Unpack restores free blocks from the flat vector and leaves fixed
    // blocks at their base values.
    //
    // Given
    // -----
    // - Layout with `Delta` fixed, a base and a flat vector of new values.
    //
    // Expect
    // ------
    // - `delta` equals the base; every free entry equals the flat value.
    fn unpack_keeps_fixed_blocks_from_base() {
        // Arrange
        let layout = BlockLayout::new(4, 3, FixedBlocks::none().with(ParamBlock::Delta, true));
        let base = sample_values();
        let theta = array![-1.0, -2.0, -3.0, -20.0, -21.0, -30.0, -31.0];

        // Act
        let out = layout.unpack(theta.view(), &base).expect("lengths agree");

        // Assert
        assert_eq!(out.logv, array![-1.0, -2.0, -3.0]);
        assert_eq!(out.delta, base.delta);
        assert_eq!(out.alpha, array![-20.0, -21.0]);
        assert_eq!(out.eta, array![-30.0, -31.0]);
        assert_eq!(layout.pack(&out), theta);
    }

    #[test]
    // Purpose
    // -------
    // Unpack rejects a flat vector of the wrong length.
    //
    // Given
    // -----
    // - A layout of dimension 11 and a vector of length 3.
    //
    // Expect
    // ------
    // - `NoiseError::ThetaLengthMismatch { expected: 11, found: 3 }`.
    fn unpack_rejects_wrong_length() {
        let layout = BlockLayout::new(4, 3, FixedBlocks::none());
        let err = layout.unpack(array![0.0, 0.0, 0.0].view(), &sample_values()).unwrap_err();
        assert_eq!(err, NoiseError::ThetaLengthMismatch { expected: 11, found: 3 });
    }

    #[test]
    // Purpose
    // -------
    // A single waveform has empty drift blocks.
    //
    // Given
    // -----
    // - m = 1.
    //
    // Expect
    // ------
    // - `Alpha` and `Eta` have length zero.
    fn drift_blocks_are_empty_for_single_waveform() {
        assert_eq!(ParamBlock::Alpha.len(8, 1), 0);
        assert_eq!(ParamBlock::Eta.len(8, 1), 0);
        assert_eq!(ParamBlock::Delta.len(8, 1), 8);
    }
}
