//! Alpha-weighted pixel mixing.
//!
//! [`MixColorsOp`] blends N pixels of one color space into one, with integer
//! weights that usually sum to 255:
//!
//! ```text
//! alpha_out = Σ wᵢ·αᵢ / Σ wᵢ
//! color_out = Σ wᵢ·αᵢ·cᵢ / Σ wᵢ·αᵢ
//! ```
//!
//! Colors are weighted by their alpha so a transparent neighbour cannot
//! drag its (meaningless) color into the result. When every weighted alpha
//! is zero the destination is zeroed (transparent black). Layouts without
//! an alpha channel reduce to a plain weighted average.
//!
//! # Usage
//!
//! ```rust
//! use pigment_core::mix::{MixColorsOp, MixColorsOpImpl};
//! use pigment_core::traits::BgrU8;
//!
//! let op = MixColorsOpImpl::<BgrU8>::new();
//! let a = [0u8, 0, 200, 255];
//! let b = [0u8, 0, 100, 0];
//! let mut dst = [0u8; 4];
//! op.mix_colors(&[&a, &b], &[128, 127], &mut dst);
//! // The transparent pixel does not contribute color.
//! assert_eq!(dst, [0, 0, 200, 128]);
//! ```

use crate::channel::ChannelValue;
use crate::traits::{ColorSpaceTraits, MAX_CHANNELS};
use std::marker::PhantomData;

/// Weighted blending of pixels of one color space.
pub trait MixColorsOp: Send + Sync {
    /// Mixes `colors[i]` with `weights[i]` into `dst`.
    ///
    /// `colors` and `weights` must have the same length.
    fn mix_colors(&self, colors: &[&[u8]], weights: &[i16], dst: &mut [u8]);

    /// Same as [`mix_colors`](Self::mix_colors) for pixels stored back to
    /// back in one buffer; the pixel count is `weights.len()`.
    fn mix_colors_packed(&self, colors: &[u8], weights: &[i16], dst: &mut [u8]);
}

/// [`MixColorsOp`] for a compile-time layout.
pub struct MixColorsOpImpl<T> {
    _traits: PhantomData<fn() -> T>,
}

impl<T: ColorSpaceTraits> MixColorsOpImpl<T> {
    /// Creates the operator.
    pub const fn new() -> Self {
        Self {
            _traits: PhantomData,
        }
    }

    fn mix<'a>(pixels: impl Iterator<Item = &'a [u8]>, weights: &[i16], dst: &mut [u8]) {
        let mut totals = [0f64; MAX_CHANNELS];
        let mut total_alpha = 0f64;
        let mut weight_sum = 0f64;

        for (px, &w) in pixels.zip(weights) {
            let w = w as f64;
            weight_sum += w;
            match T::ALPHA_POS {
                Some(a) => {
                    let alpha_w = T::channel(px, a).to_f64() * w;
                    total_alpha += alpha_w;
                    for (i, t) in totals.iter_mut().enumerate().take(T::CHANNELS_NB) {
                        if i != a {
                            *t += T::channel(px, i).to_f64() * alpha_w;
                        }
                    }
                }
                None => {
                    for (i, t) in totals.iter_mut().enumerate().take(T::CHANNELS_NB) {
                        *t += T::channel(px, i).to_f64() * w;
                    }
                }
            }
        }

        let dst = &mut dst[..T::PIXEL_SIZE];
        match T::ALPHA_POS {
            Some(a) if total_alpha > 0.0 && weight_sum > 0.0 => {
                for (i, &t) in totals.iter().enumerate().take(T::CHANNELS_NB) {
                    if i != a {
                        T::set_channel(dst, i, T::Channel::from_f64(t / total_alpha));
                    }
                }
                let alpha = (total_alpha / weight_sum).min(T::Channel::UNIT);
                T::set_channel(dst, a, T::Channel::from_f64(alpha));
            }
            None if weight_sum > 0.0 => {
                for (i, &t) in totals.iter().enumerate().take(T::CHANNELS_NB) {
                    T::set_channel(dst, i, T::Channel::from_f64(t / weight_sum));
                }
            }
            _ => dst.fill(0),
        }
    }
}

impl<T: ColorSpaceTraits> Default for MixColorsOpImpl<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ColorSpaceTraits> MixColorsOp for MixColorsOpImpl<T> {
    fn mix_colors(&self, colors: &[&[u8]], weights: &[i16], dst: &mut [u8]) {
        debug_assert_eq!(colors.len(), weights.len());
        Self::mix(colors.iter().copied(), weights, dst);
    }

    fn mix_colors_packed(&self, colors: &[u8], weights: &[i16], dst: &mut [u8]) {
        debug_assert!(colors.len() >= weights.len() * T::PIXEL_SIZE);
        Self::mix(colors.chunks_exact(T::PIXEL_SIZE), weights, dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{AlphaU8, BgrU8, GrayU8, RgbF32};
    use approx::assert_abs_diff_eq;

    struct TwoU8;

    impl ColorSpaceTraits for TwoU8 {
        type Channel = u8;
        const CHANNELS_NB: usize = 2;
        const ALPHA_POS: Option<usize> = None;
        const COLOR_POSITIONS: &'static [usize] = &[0, 1];
    }

    #[test]
    fn test_full_weight_reproduces_input() {
        let op = MixColorsOpImpl::<BgrU8>::new();
        let p1 = [10u8, 20, 30, 40];
        let p2 = [200u8, 150, 100, 250];
        let mut dst = [0u8; 4];

        op.mix_colors(&[&p1, &p2], &[255, 0], &mut dst);
        assert_eq!(dst, p1);
        op.mix_colors(&[&p1, &p2], &[0, 255], &mut dst);
        assert_eq!(dst, p2);
    }

    #[test]
    fn test_no_alpha_plain_average() {
        let op = MixColorsOpImpl::<TwoU8>::new();
        let mut dst = [0u8; 2];
        op.mix_colors(&[&[255, 255], &[0, 0]], &[128, 127], &mut dst);
        assert_eq!(dst, [128, 128]);

        op.mix_colors(&[&[255, 0], &[0, 255]], &[128, 127], &mut dst);
        assert_eq!(dst, [128, 127]);
    }

    #[test]
    fn test_all_transparent_zeroes() {
        let op = MixColorsOpImpl::<BgrU8>::new();
        let mut dst = [9u8; 4];
        op.mix_colors(&[&[1, 2, 3, 0], &[4, 5, 6, 0]], &[100, 155], &mut dst);
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn test_alpha_weighted_color() {
        let op = MixColorsOpImpl::<BgrU8>::new();
        let mut dst = [0u8; 4];
        // Red 200 at alpha 255 and red 0 at alpha 51 with equal weights.
        op.mix_colors(&[&[0, 0, 200, 255], &[0, 0, 0, 51]], &[128, 127], &mut dst);
        let expected_red: f64 = 200.0 * 255.0 * 128.0 / (255.0 * 128.0 + 51.0 * 127.0);
        assert_eq!(dst[2], expected_red.round() as u8);
        assert_eq!(dst[3], ((255.0 * 128.0 + 51.0 * 127.0) / 255.0f64).round() as u8);
    }

    #[test]
    fn test_packed_matches_slices() {
        let op = MixColorsOpImpl::<GrayU8>::new();
        let packed = [10u8, 20, 30];
        let mut a = [0u8];
        let mut b = [0u8];
        op.mix_colors_packed(&packed, &[85, 85, 85], &mut a);
        op.mix_colors(&[&[10], &[20], &[30]], &[85, 85, 85], &mut b);
        assert_eq!(a, b);
        assert_eq!(a[0], 20);
    }

    #[test]
    fn test_alpha_only_space() {
        let op = MixColorsOpImpl::<AlphaU8>::new();
        let mut dst = [0u8];
        op.mix_colors(&[&[255], &[0]], &[128, 127], &mut dst);
        assert_eq!(dst[0], 128);
    }

    #[test]
    fn test_float_mix() {
        let op = MixColorsOpImpl::<RgbF32>::new();
        let a: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 0.0, 0.0, 1.0]).to_vec();
        let b: Vec<u8> = bytemuck::cast_slice(&[0.0f32, 1.0, 0.0, 1.0]).to_vec();
        let mut dst = [0u8; 16];
        op.mix_colors(&[&a, &b], &[100, 100], &mut dst);
        let out: [f32; 4] = bytemuck::pod_read_unaligned(&dst);
        assert_abs_diff_eq!(out[0], 0.5);
        assert_abs_diff_eq!(out[1], 0.5);
        assert_abs_diff_eq!(out[3], 1.0);
    }
}
