//! Transparency-aware kernel convolution of pixels.
//!
//! [`ConvolutionOp::convolve_colors`] combines the pixels under a kernel
//! into one destination pixel. Samples whose 8-bit opacity is zero are
//! *transparent*: their weight is tracked separately and their channels do
//! not enter the sums. Three policies follow from that split:
//!
//! | Case | Condition                                   | Color channels                     | Alpha                    |
//! |------|---------------------------------------------|------------------------------------|--------------------------|
//! | A    | no transparent samples                      | `Σ kᵢcᵢ / factor + offset`         | same as color            |
//! | B    | some transparent, `Σ k == factor`           | `Σ kᵢcᵢ / Σ k_opaque + offset`     | `Σ kᵢαᵢ / Σ k + offset`  |
//! | C    | some transparent, `Σ k != factor`           | `Σ kᵢcᵢ · Σ k / (factor · Σ k_opaque) + offset` | `Σ kᵢαᵢ / factor + offset` |
//!
//! If every weighted sample is transparent the destination is left
//! untouched. Samples with a zero kernel weight are skipped entirely.
//! Every write is rounded (integer types) and clamped to the channel's
//! representable range, and only channels selected by the
//! [`ChannelFlags`] are written.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::channel_info::ChannelFlags;
//! use pigment_core::convolution::{ConvolutionOp, ConvolutionOpImpl};
//! use pigment_core::traits::GrayAU8;
//!
//! let op = ConvolutionOpImpl::<GrayAU8>::new();
//! let px = [[100u8, 255], [50, 255], [100, 255]];
//! let colors: Vec<&[u8]> = px.iter().map(|p| &p[..]).collect();
//! let mut dst = [0u8; 2];
//! op.convolve_colors(&colors, &[1.0, 1.0, 1.0], &mut dst, 3.0, 0.0, ChannelFlags::ALL);
//! assert_eq!(dst, [83, 255]);
//! ```

use crate::channel::ChannelValue;
use crate::channel_info::ChannelFlags;
use crate::traits::{ColorSpaceTraits, MAX_CHANNELS};
use std::marker::PhantomData;

/// Kernel-weighted combination of pixels of one color space.
pub trait ConvolutionOp: Send + Sync {
    /// Convolves `colors[i]` with `kernel[i]` into `dst`.
    fn convolve_colors(
        &self,
        colors: &[&[u8]],
        kernel: &[f64],
        dst: &mut [u8],
        factor: f64,
        offset: f64,
        flags: ChannelFlags,
    );

    /// Same as [`convolve_colors`](Self::convolve_colors) for pixels stored
    /// back to back in one buffer; the pixel count is `kernel.len()`.
    fn convolve_colors_packed(
        &self,
        colors: &[u8],
        kernel: &[f64],
        dst: &mut [u8],
        factor: f64,
        offset: f64,
        flags: ChannelFlags,
    );
}

/// [`ConvolutionOp`] for a compile-time layout.
pub struct ConvolutionOpImpl<T> {
    _traits: PhantomData<fn() -> T>,
}

impl<T: ColorSpaceTraits> ConvolutionOpImpl<T> {
    /// Creates the operator.
    pub const fn new() -> Self {
        Self {
            _traits: PhantomData,
        }
    }

    fn convolve<'a>(
        pixels: impl Iterator<Item = &'a [u8]>,
        kernel: &[f64],
        dst: &mut [u8],
        factor: f64,
        offset: f64,
        flags: ChannelFlags,
    ) {
        let mut totals = [0f64; MAX_CHANNELS];
        let mut total_weight = 0f64;
        let mut total_weight_transparent = 0f64;

        for (px, &w) in pixels.zip(kernel) {
            if w == 0.0 {
                continue;
            }
            if T::opacity_u8(px) == 0 {
                total_weight_transparent += w;
            } else {
                for (i, t) in totals.iter_mut().enumerate().take(T::CHANNELS_NB) {
                    *t += T::channel(px, i).to_f64() * w;
                }
            }
            total_weight += w;
        }

        let mut write = |i: usize, v: f64| {
            if flags.test(i) {
                T::set_channel(dst, i, T::Channel::from_f64(v));
            }
        };

        if total_weight_transparent == 0.0 {
            // Case A
            for (i, &t) in totals.iter().enumerate().take(T::CHANNELS_NB) {
                write(i, t / factor + offset);
            }
        } else if total_weight_transparent != total_weight {
            let opaque_weight = total_weight - total_weight_transparent;
            if total_weight == factor {
                // Case B
                for (i, &t) in totals.iter().enumerate().take(T::CHANNELS_NB) {
                    if T::ALPHA_POS == Some(i) {
                        write(i, t / total_weight + offset);
                    } else {
                        write(i, t / opaque_weight + offset);
                    }
                }
            } else {
                // Case C
                let a = total_weight / (factor * opaque_weight);
                for (i, &t) in totals.iter().enumerate().take(T::CHANNELS_NB) {
                    if T::ALPHA_POS == Some(i) {
                        write(i, t / factor + offset);
                    } else {
                        write(i, t * a + offset);
                    }
                }
            }
        }
    }
}

impl<T: ColorSpaceTraits> Default for ConvolutionOpImpl<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ColorSpaceTraits> ConvolutionOp for ConvolutionOpImpl<T> {
    fn convolve_colors(
        &self,
        colors: &[&[u8]],
        kernel: &[f64],
        dst: &mut [u8],
        factor: f64,
        offset: f64,
        flags: ChannelFlags,
    ) {
        debug_assert_eq!(colors.len(), kernel.len());
        Self::convolve(colors.iter().copied(), kernel, dst, factor, offset, flags);
    }

    fn convolve_colors_packed(
        &self,
        colors: &[u8],
        kernel: &[f64],
        dst: &mut [u8],
        factor: f64,
        offset: f64,
        flags: ChannelFlags,
    ) {
        debug_assert!(colors.len() >= kernel.len() * T::PIXEL_SIZE);
        Self::convolve(
            colors.chunks_exact(T::PIXEL_SIZE),
            kernel,
            dst,
            factor,
            offset,
            flags,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{BgrU8, GrayU8, RgbF32};

    fn run<T: ColorSpaceTraits>(
        pixels: &[&[u8]],
        kernel: &[f64],
        dst: &mut [u8],
        factor: f64,
        offset: f64,
    ) {
        ConvolutionOpImpl::<T>::new().convolve_colors(
            pixels,
            kernel,
            dst,
            factor,
            offset,
            ChannelFlags::ALL,
        );
    }

    #[test]
    fn test_case_a_sum_and_average() {
        let p = [[100u8, 0, 0, 255], [50, 0, 0, 255], [100, 0, 0, 255]];
        let pixels: Vec<&[u8]> = p.iter().map(|x| &x[..]).collect();
        let mut dst = [0u8; 4];

        run::<BgrU8>(&pixels, &[1.0, 1.0, 1.0], &mut dst, 1.0, 0.0);
        assert_eq!(dst[0], 250);
        assert_eq!(dst[3], 255);

        run::<BgrU8>(&pixels, &[1.0, 1.0, 1.0], &mut dst, 3.0, 0.0);
        assert_eq!(dst[0], 83);
        assert_eq!(dst[3], 255);
    }

    #[test]
    fn test_case_b_renormalises_colors() {
        let p = [[100u8, 0, 0, 255], [250, 0, 0, 0], [50, 0, 0, 255]];
        let pixels: Vec<&[u8]> = p.iter().map(|x| &x[..]).collect();
        let mut dst = [0u8; 4];

        run::<BgrU8>(&pixels, &[1.0, 1.0, 1.0], &mut dst, 3.0, 0.0);
        // Colors: (100 + 50) / 2; alpha: (255 + 255) / 3.
        assert_eq!(dst[0], 75);
        assert_eq!(dst[3], 170);
    }

    #[test]
    fn test_case_c_rescaled_factor() {
        let p = [[100u8, 0, 0, 255], [250, 0, 0, 0], [50, 0, 0, 255]];
        let pixels: Vec<&[u8]> = p.iter().map(|x| &x[..]).collect();
        let mut dst = [0u8; 4];

        run::<BgrU8>(&pixels, &[1.0, 1.0, 1.0], &mut dst, 6.0, 0.0);
        // a = 3 / (6 * 2); colors: 150 * a; alpha: 510 / 6.
        assert_eq!(dst[0], 38);
        assert_eq!(dst[3], 85);

        run::<BgrU8>(&pixels, &[1.0, 1.0, 1.0], &mut dst, 1.0, 0.0);
        // factor 1: colors 150 * 3 / 2 clamp to 225, alpha 510 clamps to 255.
        assert_eq!(dst[0], 225);
        assert_eq!(dst[3], 255);
    }

    #[test]
    fn test_all_transparent_leaves_dst() {
        let p = [[100u8, 0, 0, 0], [50, 0, 0, 0]];
        let pixels: Vec<&[u8]> = p.iter().map(|x| &x[..]).collect();
        let mut dst = [7u8, 7, 7, 7];
        run::<BgrU8>(&pixels, &[1.0, 1.0], &mut dst, 2.0, 0.0);
        assert_eq!(dst, [7, 7, 7, 7]);
    }

    #[test]
    fn test_zero_weight_sample_ignored() {
        let p = [[100u8, 0, 0, 255], [0, 0, 0, 0]];
        let pixels: Vec<&[u8]> = p.iter().map(|x| &x[..]).collect();
        let mut dst = [0u8; 4];
        run::<BgrU8>(&pixels, &[1.0, 0.0], &mut dst, 1.0, 0.0);
        assert_eq!(dst, [100, 0, 0, 255]);
    }

    #[test]
    fn test_flags_restrict_writes() {
        let p = [[100u8, 100, 100, 255]];
        let pixels: Vec<&[u8]> = p.iter().map(|x| &x[..]).collect();
        let mut dst = [1u8, 2, 3, 4];
        ConvolutionOpImpl::<BgrU8>::new().convolve_colors(
            &pixels,
            &[1.0],
            &mut dst,
            1.0,
            10.0,
            ChannelFlags::from_indices(&[1]),
        );
        assert_eq!(dst, [1, 110, 3, 4]);
    }

    #[test]
    fn test_clamping_and_offset() {
        let mut dst = [0u8];
        run::<GrayU8>(&[&[200], &[100]], &[1.0, -1.0], &mut dst, 1.0, 128.0);
        assert_eq!(dst[0], 228);
        run::<GrayU8>(&[&[100], &[200]], &[1.0, -1.0], &mut dst, 1.0, 0.0);
        assert_eq!(dst[0], 0);
    }

    #[test]
    fn test_float_not_clamped_to_unit() {
        let px: Vec<u8> = bytemuck::cast_slice(&[0.75f32, 0.0, 0.0, 1.0]).to_vec();
        let mut dst = [0u8; 16];
        run::<RgbF32>(&[&px, &px], &[1.0, 1.0], &mut dst, 1.0, 0.0);
        let out: [f32; 4] = bytemuck::pod_read_unaligned(&dst);
        assert_eq!(out[0], 1.5);
        assert_eq!(out[3], 2.0);
    }

    #[test]
    fn test_packed_matches_slices() {
        let packed = [10u8, 20, 30, 40, 50, 60, 70, 80];
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        let op = ConvolutionOpImpl::<BgrU8>::new();
        op.convolve_colors_packed(&packed, &[1.0, 2.0], &mut a, 3.0, 0.0, ChannelFlags::ALL);
        op.convolve_colors(
            &[&packed[..4], &packed[4..]],
            &[1.0, 2.0],
            &mut b,
            3.0,
            0.0,
            ChannelFlags::ALL,
        );
        assert_eq!(a, b);
        assert_eq!(a, [37, 47, 57, 67]);
    }
}
