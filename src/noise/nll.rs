//! noise::nll — scaled negative log-likelihood of repeated waveforms.
//!
//! Purpose
//! -------
//! Evaluate the objective minimized by the joint noise fit, together with
//! its closed-form gradient with respect to every free parameter block.
//!
//! Key behaviors
//! -------------
//! - Rebuilds physical quantities from the scaled parameters:
//!   `v = exp(logv·s_logv)`, `μ = x₀ − δ·s_δ`, `a = [1, 1 + α·s_α]`,
//!   `η/dt = [0, η̃·s_η]`.
//! - Model waveform of row `i`: `ζ_i = irfft(a_i·e^{−iωη_i}·rfft(μ))`, with
//!   `ω = 2πk/n`; its derivative `ζ̇_i` is taken the same way.
//! - Total variance `V = v_α + v_β·ζ² + v_τ·ζ̇²`; objective
//!   `½·s_v·[mn·(ln 2π + ln s_v) + Σ ln V] + ½·Σ (x − ζ)²/V`.
//! - The gradient is assembled through [`BlockLayout::assemble`], so it
//!   contains exactly the free blocks in canonical order.
//!
//! Invariants & assumptions
//! ------------------------
//! - `x` is `m × n`, one waveform per row; row 0 is the reference.
//! - Parameter values for fixed blocks are still read (they are
//!   placeholders holding the fixed values); only the gradient omits them.
//! - Timing variance `v_τ` and delays are in units of the sampling time.
//!
//! Conventions
//! -----------
//! - The objective equals `s_v` times the physical negative
//!   log-likelihood whose variances are `s_v·V`.
//!
//! Testing notes
//! -------------
//! - Unit tests compare the objective with a direct evaluation through
//!   `NoiseModel` and the analytic gradient with central finite
//!   differences, with and without fixed blocks.
use crate::{
    noise::blocks::{BlockLayout, BlockValues, ParamBlock},
    signal::fft::{RealFft, normalized_angular_frequencies},
};
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip, array, s};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Scale constants applied to each block, plus the global variance scale.
#[derive(Debug, Clone, PartialEq)]
pub struct NllScales {
    pub blocks: BlockValues,
    pub v: f64,
}

/// Objective value and gradient over the free blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct NllEvaluation {
    pub value: f64,
    pub grad: Array1<f64>,
}

/// scaled_nll — objective and analytic gradient of the joint noise fit.
///
/// Parameters
/// ----------
/// - `x`: `ArrayView2<f64>`
///   Data matrix, `m` waveforms by `n` samples.
/// - `params`: `&BlockValues`
///   Scaled parameters for all six blocks, fixed ones included.
/// - `layout`: `&BlockLayout`
///   Selects which blocks appear in the gradient.
/// - `scales`: `&NllScales`
///   Per-block scale constants (same shapes as `params`) and `s_v`.
/// - `fft`: `&RealFft`
///   Transform plan for length `n`.
///
/// Returns
/// -------
/// `NllEvaluation`
///   The scaled objective and a gradient of length `layout.dim()`.
///
/// Panics
/// ------
/// - Panics if block shapes disagree with `x` or `fft`; callers build all
///   of them from the same `(m, n)`.
///
/// Notes
/// -----
/// - Non-finite values are returned as-is; the optimizer adapter rejects
///   them.
pub fn scaled_nll(
    x: ArrayView2<f64>, params: &BlockValues, layout: &BlockLayout, scales: &NllScales,
    fft: &RealFft,
) -> NllEvaluation {
    let (m, n) = x.dim();
    let w = normalized_angular_frequencies(n);
    let nf = w.len();
    let sb = &scales.blocks;
    let scale_v = scales.v;

    let v = Zip::from(&params.logv).and(&sb.logv).map_collect(|&l, &s| (l * s).exp());
    let (v0, v1, v2) = (v[0], v[1], v[2]);

    let mu = &x.row(0) - &(&params.delta * &sb.delta);
    let mut a = Array1::<f64>::ones(m);
    a.slice_mut(s![1..]).assign(&(&params.alpha * &sb.alpha).mapv(|d| 1.0 + d));
    let mut eta = Array1::<f64>::zeros(m);
    eta.slice_mut(s![1..]).assign(&(&params.eta * &sb.eta));

    let mu_f = fft.forward(mu.view());
    let phase = Array2::from_shape_fn((m, nf), |(i, k)| Complex64::from_polar(1.0, eta[i] * w[k]));
    let zeta_f = Array2::from_shape_fn((m, nf), |(i, k)| phase[[i, k]].conj() * mu_f[k] * a[i]);
    let iw = w.mapv(|wk| Complex64::new(0.0, wk));

    let mut zeta = Array2::<f64>::zeros((m, n));
    let mut dzeta = Array2::<f64>::zeros((m, n));
    for i in 0..m {
        let zf = zeta_f.row(i);
        zeta.row_mut(i).assign(&fft.inverse(zf));
        dzeta.row_mut(i).assign(&fft.inverse((&zf * &iw).view()));
    }

    let res = &x - &zeta;
    let vtot = Zip::from(&zeta).and(&dzeta).map_collect(|&z, &d| v0 + v1 * z * z + v2 * d * d);
    let ressq = res.mapv(|r| r * r);

    let mn = (m * n) as f64;
    let value = 0.5 * scale_v * mn * ((2.0 * PI).ln() + scale_v.ln())
        + 0.5 * scale_v * vtot.mapv(f64::ln).sum()
        + 0.5 * (&ressq / &vtot).sum();

    let reswt = &res / &vtot;
    let dvar = Zip::from(&vtot).and(&ressq).map_collect(|&vt, &r2| (scale_v * vt - r2) / (vt * vt));

    let grad = layout.assemble(|block| match block {
        ParamBlock::LogVAlpha => array![0.5 * dvar.sum() * v0 * sb.logv[0]],
        ParamBlock::LogVBeta => {
            let g = Zip::from(&zeta).and(&dvar).fold(0.0, |acc, &z, &d| acc + z * z * d);
            array![0.5 * g * v1 * sb.logv[1]]
        }
        ParamBlock::LogVTau => {
            let g = Zip::from(&dzeta).and(&dvar).fold(0.0, |acc, &dz, &d| acc + dz * dz * d);
            array![0.5 * g * v2 * sb.logv[2]]
        }
        ParamBlock::Delta => {
            let mut g = Array1::<f64>::zeros(n);
            for i in 0..m {
                let dnll_dzeta = Zip::from(dvar.row(i))
                    .and(zeta.row(i))
                    .and(reswt.row(i))
                    .map_collect(|&d, &z, &r| v1 * d * z - r);
                let dnll_ddot = &dvar.row(i) * &dzeta.row(i);
                let p = fft.forward(dnll_dzeta.view())
                    - &(fft.forward(dnll_ddot.view()) * &iw).mapv(|c| c * v2);
                let back = fft.inverse((&phase.row(i) * &p).view());
                g.scaled_add(a[i], &back);
            }
            -(g * &sb.delta)
        }
        ParamBlock::Alpha => {
            let term = Zip::from(&vtot)
                .and(&dvar)
                .and(&reswt)
                .and(&zeta)
                .map_collect(|&vt, &d, &r, &z| (vt - v0) * d - r * z);
            let dnll_da = term.sum_axis(Axis(1)) / &a;
            &dnll_da.slice(s![1..]) * &sb.alpha
        }
        ParamBlock::Eta => {
            let mut dnll_deta = Array1::<f64>::zeros(m);
            for i in 0..m {
                let zf = zeta_f.row(i);
                let ddzeta = fft.inverse((&zf * &w.mapv(|wk| Complex64::new(-wk * wk, 0.0))).view());
                let acc = Zip::from(dvar.row(i))
                    .and(zeta.row(i))
                    .and(dzeta.row(i))
                    .and(&ddzeta)
                    .and(reswt.row(i))
                    .fold(0.0, |acc, &d, &z, &dz, &ddz, &r| {
                        acc + d * (z * dz * v1 + dz * ddz * v2) - r * dz
                    });
                dnll_deta[i] = -acc;
            }
            &dnll_deta.slice(s![1..]) * &sb.eta
        }
    });

    NllEvaluation { value, grad }
}

pub mod prelude {
    pub use super::{NllEvaluation, NllScales, scaled_nll};
}
