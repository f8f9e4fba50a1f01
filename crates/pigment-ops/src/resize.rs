//! Separable resampling of interleaved float planes.
//!
//! Used to build the inpainting pyramid, where every level is the previous
//! one resampled to half size. Each axis gets a table of source taps and
//! normalised weights once; both passes then only do multiply-adds.
//!
//! # Filters
//!
//! - [`Filter::Nearest`] - Box of width 1
//! - [`Filter::Bilinear`] - Triangle
//! - [`Filter::Bicubic`] - Mitchell-Netravali, `B = C = 1/3`
//!
//! # Example
//!
//! ```rust
//! use pigment_ops::resize::{resize_f32, Filter};
//!
//! let src = vec![0.25f32; 8 * 6 * 2];
//! let dst = resize_f32(&src, 8, 6, 2, 4, 3, Filter::Bicubic).unwrap();
//! assert_eq!(dst.len(), 4 * 3 * 2);
//! assert!((dst[5] - 0.25).abs() < 1e-6);
//! ```

use crate::{OpsError, OpsResult};

/// Resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Nearest neighbour.
    Nearest,
    /// Linear interpolation.
    Bilinear,
    /// Mitchell-Netravali cubic.
    #[default]
    Bicubic,
}

impl Filter {
    /// Support radius at scale 1.
    #[inline]
    pub fn support(self) -> f32 {
        match self {
            Filter::Nearest => 0.5,
            Filter::Bilinear => 1.0,
            Filter::Bicubic => 2.0,
        }
    }

    /// Kernel value at distance `x`.
    #[inline]
    pub fn weight(self, x: f32) -> f32 {
        let ax = x.abs();
        match self {
            Filter::Nearest => {
                if ax < 0.5 { 1.0 } else { 0.0 }
            }
            Filter::Bilinear => (1.0 - ax).max(0.0),
            Filter::Bicubic => mitchell(ax),
        }
    }
}

fn mitchell(ax: f32) -> f32 {
    const B: f32 = 1.0 / 3.0;
    const C: f32 = 1.0 / 3.0;
    let (x2, x3) = (ax * ax, ax * ax * ax);
    if ax < 1.0 {
        ((12.0 - 9.0 * B - 6.0 * C) * x3 + (-18.0 + 12.0 * B + 6.0 * C) * x2 + (6.0 - 2.0 * B))
            / 6.0
    } else if ax < 2.0 {
        ((-B - 6.0 * C) * x3 + (6.0 * B + 30.0 * C) * x2 + (-12.0 * B - 48.0 * C) * ax
            + (8.0 * B + 24.0 * C))
            / 6.0
    } else {
        0.0
    }
}

/// Source taps of one destination sample.
#[derive(Debug, Clone)]
struct Taps {
    first: usize,
    weights: Vec<f32>,
}

/// Builds the tap table mapping `src_len` samples onto `dst_len`.
fn taps(src_len: usize, dst_len: usize, filter: Filter) -> Vec<Taps> {
    let scale = src_len as f32 / dst_len as f32;
    // Widen the kernel when shrinking so every source sample contributes.
    let stretch = scale.max(1.0);
    let support = filter.support() * stretch;

    (0..dst_len)
        .map(|i| {
            let center = (i as f32 + 0.5) * scale - 0.5;
            let lo = ((center - support).floor().max(0.0)) as usize;
            let hi = ((center + support).ceil().max(0.0) as usize).min(src_len - 1);
            let mut weights: Vec<f32> = (lo..=hi)
                .map(|s| filter.weight((s as f32 - center) / stretch))
                .collect();
            let sum: f32 = weights.iter().sum();
            if sum.abs() > f32::EPSILON {
                weights.iter_mut().for_each(|w| *w /= sum);
            } else {
                // Degenerate window: take the closest sample.
                weights.iter_mut().for_each(|w| *w = 0.0);
                let nearest = (center.round().max(0.0) as usize).clamp(lo, hi);
                weights[nearest - lo] = 1.0;
            }
            Taps { first: lo, weights }
        })
        .collect()
}

/// Resamples an interleaved `src_w × src_h × channels` plane.
pub fn resize_f32(
    src: &[f32],
    src_w: usize,
    src_h: usize,
    channels: usize,
    dst_w: usize,
    dst_h: usize,
    filter: Filter,
) -> OpsResult<Vec<f32>> {
    let expected = src_w * src_h * channels;
    if src.len() != expected {
        return Err(OpsError::SizeMismatch(format!(
            "expected {} samples, got {}",
            expected,
            src.len()
        )));
    }
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Err(OpsError::InvalidDimensions(format!(
            "cannot resize {}x{} to {}x{}",
            src_w, src_h, dst_w, dst_h
        )));
    }

    // Horizontal pass into src_h rows of dst_w samples.
    let columns = taps(src_w, dst_w, filter);
    let mut tmp = vec![0f32; dst_w * src_h * channels];
    for (src_row, tmp_row) in src
        .chunks_exact(src_w * channels)
        .zip(tmp.chunks_exact_mut(dst_w * channels))
    {
        for (out, t) in tmp_row.chunks_exact_mut(channels).zip(&columns) {
            for (k, w) in t.weights.iter().enumerate() {
                let s = (t.first + k) * channels;
                for (o, v) in out.iter_mut().zip(&src_row[s..s + channels]) {
                    *o += v * w;
                }
            }
        }
    }

    // Vertical pass.
    let rows = taps(src_h, dst_h, filter);
    let stride = dst_w * channels;
    let mut dst = vec![0f32; dst_h * stride];
    for (out_row, t) in dst.chunks_exact_mut(stride).zip(&rows) {
        for (k, w) in t.weights.iter().enumerate() {
            let s = (t.first + k) * stride;
            for (o, v) in out_row.iter_mut().zip(&tmp[s..s + stride]) {
                *o += v * w;
            }
        }
    }
    Ok(dst)
}
