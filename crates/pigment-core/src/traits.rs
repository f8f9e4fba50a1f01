//! Compile-time pixel layout descriptors.
//!
//! A [`ColorSpaceTraits`] implementor is a zero-size tag that fixes, at
//! compile time, how one pixel is laid out in memory: the native channel
//! type, how many channels there are and where (if anywhere) the alpha
//! channel lives. Everything else in this module is derived from those
//! three facts, so the hot loops in [`crate::mix`] and
//! [`crate::convolution`] are monomorphized per layout and never branch on
//! the channel type per pixel.
//!
//! # Alpha-free layouts
//!
//! Layouts without alpha (`ALPHA_POS == None`, e.g. [`GrayU8`]) behave as
//! always opaque: opacity reads return the unit value and every alpha
//! setter is a no-op, so callers never need to special-case them.
//!
//! # Normalisation
//!
//! [`normalised_channels_value`](ColorSpaceTraits::normalised_channels_value)
//! maps native storage to `[0, 1]` floats in storage order. Integer and
//! float layouts scale linearly by the type's unit value. LAB layouts
//! override this per channel (see [`LabRange`]): `L` scales by its own unit
//! and `a`/`b` map piecewise around their zero point, which lands exactly
//! on `0.5`.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::traits::{BgrU8, ColorSpaceTraits, GrayU8};
//!
//! let mut px = [10u8, 20, 30, 128];
//! assert_eq!(BgrU8::opacity_u8(&px), 128);
//! BgrU8::set_opacity_u8(&mut px, 255, 1);
//! assert_eq!(px[3], 255);
//!
//! // No alpha: always opaque, setters are no-ops.
//! let mut gray = [42u8];
//! GrayU8::set_opacity_u8(&mut gray, 0, 1);
//! assert_eq!(GrayU8::opacity_u8(&gray), 255);
//! ```

use crate::channel::{ChannelValue, read_channel, write_channel};
use half::f16;

/// Upper bound on channels per pixel across all layouts in this crate.
///
/// Lets per-pixel scratch live on the stack.
pub const MAX_CHANNELS: usize = 8;

// ============================================================================
// ColorSpaceTraits
// ============================================================================

/// Compile-time description of a pixel layout.
pub trait ColorSpaceTraits: Send + Sync + 'static {
    /// Native storage type of every channel.
    type Channel: ChannelValue;

    /// Channel count, alpha included.
    const CHANNELS_NB: usize;

    /// Storage index of the alpha channel, if any.
    const ALPHA_POS: Option<usize>;

    /// Storage index of each color channel in canonical model order
    /// (R,G,B / C,M,Y,K / L,a,b / X,Y,Z / Gray).
    const COLOR_POSITIONS: &'static [usize];

    /// Bytes per pixel.
    const PIXEL_SIZE: usize = Self::CHANNELS_NB * std::mem::size_of::<Self::Channel>();

    /// Reads channel `index` from a pixel.
    #[inline]
    fn channel(pixel: &[u8], index: usize) -> Self::Channel {
        debug_assert!(index < Self::CHANNELS_NB);
        read_channel(pixel, index)
    }

    /// Writes channel `index` of a pixel.
    #[inline]
    fn set_channel(pixel: &mut [u8], index: usize, value: Self::Channel) {
        debug_assert!(index < Self::CHANNELS_NB);
        write_channel(pixel, index, value)
    }

    /// Returns `true` if `index` is a color (non-alpha) channel.
    #[inline]
    fn is_color_channel(index: usize) -> bool {
        Self::ALPHA_POS != Some(index)
    }

    /// Opacity scaled to `0..=255`; 255 for alpha-free layouts.
    #[inline]
    fn opacity_u8(pixel: &[u8]) -> u8 {
        match Self::ALPHA_POS {
            Some(a) => Self::channel(pixel, a).scale_to_u8(),
            None => u8::MAX,
        }
    }

    /// Opacity normalised to `[0, 1]`; 1 for alpha-free layouts.
    #[inline]
    fn opacity_f(pixel: &[u8]) -> f64 {
        match Self::ALPHA_POS {
            Some(a) => Self::channel(pixel, a).to_normalized(),
            None => 1.0,
        }
    }

    /// Sets the alpha of `n_pixels` consecutive pixels.
    fn set_opacity_u8(pixels: &mut [u8], alpha: u8, n_pixels: usize) {
        if let Some(a) = Self::ALPHA_POS {
            let value = Self::Channel::scale_from_u8(alpha);
            for px in pixels.chunks_exact_mut(Self::PIXEL_SIZE).take(n_pixels) {
                Self::set_channel(px, a, value);
            }
        }
    }

    /// Sets the alpha of `n_pixels` consecutive pixels from a `[0, 1]` value.
    fn set_opacity_f(pixels: &mut [u8], alpha: f64, n_pixels: usize) {
        if let Some(a) = Self::ALPHA_POS {
            let value = Self::Channel::from_normalized(alpha);
            for px in pixels.chunks_exact_mut(Self::PIXEL_SIZE).take(n_pixels) {
                Self::set_channel(px, a, value);
            }
        }
    }

    /// Multiplies the alpha of `n_pixels` pixels by `alpha / 255`.
    fn multiply_alpha(pixels: &mut [u8], alpha: u8, n_pixels: usize) {
        if let Some(a) = Self::ALPHA_POS {
            let k = alpha as f64 / 255.0;
            for px in pixels.chunks_exact_mut(Self::PIXEL_SIZE).take(n_pixels) {
                let v = Self::channel(px, a).to_f64() * k;
                Self::set_channel(px, a, Self::Channel::from_f64(v));
            }
        }
    }

    /// Multiplies each pixel's alpha by the matching 8-bit mask value.
    fn apply_alpha_u8_mask(pixels: &mut [u8], mask: &[u8], n_pixels: usize) {
        if let Some(a) = Self::ALPHA_POS {
            for (px, &m) in pixels
                .chunks_exact_mut(Self::PIXEL_SIZE)
                .zip(mask)
                .take(n_pixels)
            {
                let v = Self::channel(px, a).to_f64() * (m as f64 / 255.0);
                Self::set_channel(px, a, Self::Channel::from_f64(v));
            }
        }
    }

    /// Multiplies each pixel's alpha by the complement of the mask value.
    fn apply_inverse_alpha_u8_mask(pixels: &mut [u8], mask: &[u8], n_pixels: usize) {
        if let Some(a) = Self::ALPHA_POS {
            for (px, &m) in pixels
                .chunks_exact_mut(Self::PIXEL_SIZE)
                .zip(mask)
                .take(n_pixels)
            {
                let v = Self::channel(px, a).to_f64() * ((255 - m) as f64 / 255.0);
                Self::set_channel(px, a, Self::Channel::from_f64(v));
            }
        }
    }

    /// Writes every channel of `pixel` into `out` as `[0, 1]` floats,
    /// in storage order.
    fn normalised_channels_value(pixel: &[u8], out: &mut [f32]) {
        debug_assert!(out.len() >= Self::CHANNELS_NB);
        for (i, o) in out.iter_mut().enumerate().take(Self::CHANNELS_NB) {
            *o = Self::channel(pixel, i).to_normalized() as f32;
        }
    }

    /// Inverse of [`normalised_channels_value`](Self::normalised_channels_value),
    /// clamping to the native type's range.
    fn from_normalised_channels_value(pixel: &mut [u8], values: &[f32]) {
        debug_assert!(values.len() >= Self::CHANNELS_NB);
        for (i, &v) in values.iter().enumerate().take(Self::CHANNELS_NB) {
            Self::set_channel(pixel, i, Self::Channel::from_normalized(v as f64));
        }
    }
}

// ============================================================================
// LAB ranges
// ============================================================================

/// Native value ranges of the `L`, `a` and `b` channels of a LAB layout.
pub trait LabRange {
    /// Native value of `L* = 100`.
    const UNIT_L: f64;
    /// Native value of the most negative `a`/`b`.
    const ZERO_AB: f64;
    /// Native value of `a`/`b` = 0.
    const HALF_AB: f64;
    /// Native value of the most positive `a`/`b`.
    const UNIT_AB: f64;

    /// Native `a`/`b` value to `[0, 1]`, with `HALF_AB` landing on 0.5.
    #[inline]
    fn normalise_ab(v: f64) -> f64 {
        if v <= Self::HALF_AB {
            (v - Self::ZERO_AB) / (2.0 * (Self::HALF_AB - Self::ZERO_AB))
        } else {
            0.5 + (v - Self::HALF_AB) / (2.0 * (Self::UNIT_AB - Self::HALF_AB))
        }
    }

    /// Inverse of [`normalise_ab`](Self::normalise_ab).
    #[inline]
    fn denormalise_ab(n: f64) -> f64 {
        if n <= 0.5 {
            Self::ZERO_AB + 2.0 * n * (Self::HALF_AB - Self::ZERO_AB)
        } else {
            Self::HALF_AB + 2.0 * (n - 0.5) * (Self::UNIT_AB - Self::HALF_AB)
        }
    }
}

// ============================================================================
// Concrete layouts
// ============================================================================

macro_rules! color_traits {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $nb:expr, $alpha:expr, $colors:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl ColorSpaceTraits for $name {
            type Channel = $ty;
            const CHANNELS_NB: usize = $nb;
            const ALPHA_POS: Option<usize> = $alpha;
            const COLOR_POSITIONS: &'static [usize] = &$colors;
        }
    };
}

macro_rules! lab_traits {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $unit_l:expr, $zero_ab:expr, $half_ab:expr, $unit_ab:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name;

        impl LabRange for $name {
            const UNIT_L: f64 = $unit_l;
            const ZERO_AB: f64 = $zero_ab;
            const HALF_AB: f64 = $half_ab;
            const UNIT_AB: f64 = $unit_ab;
        }

        impl ColorSpaceTraits for $name {
            type Channel = $ty;
            const CHANNELS_NB: usize = 4;
            const ALPHA_POS: Option<usize> = Some(3);
            const COLOR_POSITIONS: &'static [usize] = &[0, 1, 2];

            fn normalised_channels_value(pixel: &[u8], out: &mut [f32]) {
                debug_assert!(out.len() >= 4);
                out[0] = (Self::channel(pixel, 0).to_f64() / Self::UNIT_L) as f32;
                out[1] = Self::normalise_ab(Self::channel(pixel, 1).to_f64()) as f32;
                out[2] = Self::normalise_ab(Self::channel(pixel, 2).to_f64()) as f32;
                out[3] = Self::channel(pixel, 3).to_normalized() as f32;
            }

            fn from_normalised_channels_value(pixel: &mut [u8], values: &[f32]) {
                debug_assert!(values.len() >= 4);
                let l = (values[0] as f64).clamp(0.0, 1.0) * Self::UNIT_L;
                let a = Self::denormalise_ab((values[1] as f64).clamp(0.0, 1.0));
                let b = Self::denormalise_ab((values[2] as f64).clamp(0.0, 1.0));
                Self::set_channel(pixel, 0, <$ty>::from_f64(l));
                Self::set_channel(pixel, 1, <$ty>::from_f64(a));
                Self::set_channel(pixel, 2, <$ty>::from_f64(b));
                Self::set_channel(pixel, 3, <$ty>::from_normalized(values[3] as f64));
            }
        }
    };
}

color_traits!(
    /// 8-bit RGB stored as B, G, R, A.
    BgrU8, u8, 4, Some(3), [2, 1, 0]
);
color_traits!(
    /// 16-bit RGB stored as B, G, R, A.
    BgrU16, u16, 4, Some(3), [2, 1, 0]
);
color_traits!(
    /// Half float RGBA.
    RgbF16, f16, 4, Some(3), [0, 1, 2]
);
color_traits!(
    /// 32-bit float RGBA.
    RgbF32, f32, 4, Some(3), [0, 1, 2]
);
color_traits!(
    /// 64-bit float RGBA.
    RgbF64, f64, 4, Some(3), [0, 1, 2]
);
color_traits!(
    /// 8-bit CMYK + alpha.
    CmykU8, u8, 5, Some(4), [0, 1, 2, 3]
);
color_traits!(
    /// 16-bit CMYK + alpha.
    CmykU16, u16, 5, Some(4), [0, 1, 2, 3]
);
color_traits!(
    /// 32-bit float CMYK + alpha.
    CmykF32, f32, 5, Some(4), [0, 1, 2, 3]
);
color_traits!(
    /// 16-bit CIE XYZ + alpha.
    XyzU16, u16, 4, Some(3), [0, 1, 2]
);
color_traits!(
    /// 32-bit float CIE XYZ + alpha.
    XyzF32, f32, 4, Some(3), [0, 1, 2]
);
color_traits!(
    /// 8-bit gray + alpha.
    GrayAU8, u8, 2, Some(1), [0]
);
color_traits!(
    /// 16-bit gray + alpha.
    GrayAU16, u16, 2, Some(1), [0]
);
color_traits!(
    /// 32-bit float gray + alpha.
    GrayAF32, f32, 2, Some(1), [0]
);
color_traits!(
    /// 8-bit gray, no alpha.
    GrayU8, u8, 1, None, [0]
);
color_traits!(
    /// 16-bit gray, no alpha.
    GrayU16, u16, 1, None, [0]
);
color_traits!(
    /// 8-bit alpha only.
    AlphaU8, u8, 1, Some(0), []
);
color_traits!(
    /// 16-bit alpha only.
    AlphaU16, u16, 1, Some(0), []
);
color_traits!(
    /// Half float alpha only.
    AlphaF16, f16, 1, Some(0), []
);
color_traits!(
    /// 32-bit float alpha only.
    AlphaF32, f32, 1, Some(0), []
);

lab_traits!(
    /// 8-bit CIELAB + alpha.
    LabU8, u8, 255.0, 0.0, 128.0, 255.0
);
lab_traits!(
    /// 16-bit CIELAB + alpha. `a`/`b` zero sits at `0x8080`.
    LabU16, u16, 65535.0, 0.0, 32896.0, 65535.0
);
lab_traits!(
    /// 32-bit float CIELAB + alpha in natural units
    /// (`L` 0..100, `a`/`b` -128..127).
    LabF32, f32, 100.0, -128.0, 0.0, 127.0
);
