//! Compositing a source row onto a destination row.
//!
//! Every operator works on straight (non-premultiplied) channel values
//! normalised to `[0, 1]`. Opacity and the optional 8-bit mask scale the
//! source alpha before the operator runs; a pixel whose combined
//! `opacity · mask` is zero is left untouched.
//!
//! # Porter-Duff Operators
//!
//! With `sa`/`da` the source and destination alpha and `sc`/`dc` one color
//! channel:
//!
//! | Op                   | Result alpha            | Result color                              |
//! |----------------------|-------------------------|-------------------------------------------|
//! | [`Over`]             | `sa + da - sa·da`       | separable with `B = sc`                   |
//! | [`Behind`]           | `sa + da - sa·da`       | `(da·dc + (1-da)·sa·sc) / ra`             |
//! | [`In`]               | `sa·da`                 | `sc`                                      |
//! | [`Out`]              | `sa·(1-da)`             | `sc`                                      |
//! | [`Atop`]             | `da`                    | `sa·sc + (1-sa)·dc`                       |
//! | [`Xor`]              | `sa·(1-da) + da·(1-sa)` | `(sa·(1-da)·sc + da·(1-sa)·dc) / ra`      |
//! | [`DestinationIn`]    | `sa·da`                 | `dc`                                      |
//! | [`DestinationAtop`]  | `sa`                    | `da·dc + (1-da)·sc`                       |
//! | [`Plus`]             | `min(sa + da, 1)`       | `(sa·sc + da·dc) / ra`                    |
//!
//! # Blend Modes
//!
//! Separable modes combine a per-channel function `B(sc, dc)` with source
//! over alpha:
//!
//! ```text
//! ra = sa + da - sa·da
//! rc = ((1-da)·sa·sc + (1-sa)·da·dc + sa·da·B(sc, dc)) / ra
//! ```
//!
//! [`Minus`] is `max(dc - sc, 0)`, [`Difference`] is `|sc - dc|`, then
//! [`Darken`], [`Lighten`], [`Multiply`] and [`Screen`] as usual.
//!
//! [`Copy`] interpolates premultiplied source and destination by the
//! opacity and copies raw channels at full opacity. [`Clear`] scales the
//! destination alpha by `1 - opacity`.
//!
//! A result alpha of zero leaves the color channels as they were. Integer
//! writes round and clamp; float channels keep values above one. Only
//! channels selected by the [`ChannelFlags`] are written, so clearing the
//! alpha bit locks the destination alpha.
//!
//! [`Over`]: CompositeOpId::Over
//! [`Behind`]: CompositeOpId::Behind
//! [`In`]: CompositeOpId::In
//! [`Out`]: CompositeOpId::Out
//! [`Atop`]: CompositeOpId::Atop
//! [`Xor`]: CompositeOpId::Xor
//! [`DestinationIn`]: CompositeOpId::DestinationIn
//! [`DestinationAtop`]: CompositeOpId::DestinationAtop
//! [`Plus`]: CompositeOpId::Plus
//! [`Minus`]: CompositeOpId::Minus
//! [`Difference`]: CompositeOpId::Difference
//! [`Darken`]: CompositeOpId::Darken
//! [`Lighten`]: CompositeOpId::Lighten
//! [`Multiply`]: CompositeOpId::Multiply
//! [`Screen`]: CompositeOpId::Screen
//! [`Copy`]: CompositeOpId::Copy
//! [`Clear`]: CompositeOpId::Clear
//!
//! # Example
//!
//! ```rust
//! use pigment_core::channel_info::ChannelFlags;
//! use pigment_core::composite::{CompositeOp, CompositeOpId, CompositeOpImpl};
//! use pigment_core::traits::BgrU8;
//!
//! let over = CompositeOpImpl::<BgrU8>::new(CompositeOpId::Over);
//! let red = [0u8, 0, 255, 255];
//! let mut dst = [255u8, 0, 0, 255]; // opaque blue
//! over.composite(&mut dst, &red, None, 1, 0.5, ChannelFlags::ALL);
//! assert_eq!(dst, [128, 0, 128, 255]);
//! ```

use crate::channel::ChannelValue;
use crate::channel_info::ChannelFlags;
use crate::traits::{ColorSpaceTraits, MAX_CHANNELS};
use std::fmt;
use std::marker::PhantomData;

/// Result alphas at or below this are treated as fully transparent.
const ALPHA_EPSILON: f64 = 1e-8;

/// Identifies a compositing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompositeOpId {
    /// Source over destination.
    #[default]
    Over,
    /// Destination over source.
    Behind,
    /// Source where the destination is.
    In,
    /// Source where the destination is not.
    Out,
    /// Source over destination, keeping the destination alpha.
    Atop,
    /// Source and destination where the other is not.
    Xor,
    /// Destination where the source is.
    DestinationIn,
    /// Destination over source, keeping the source alpha.
    DestinationAtop,
    /// Sum of premultiplied values.
    Plus,
    /// Destination minus source.
    Minus,
    /// Absolute difference.
    Difference,
    /// Per-channel minimum.
    Darken,
    /// Per-channel maximum.
    Lighten,
    /// Per-channel product.
    Multiply,
    /// Inverted product of inverses.
    Screen,
    /// Replace the destination.
    Copy,
    /// Erase the destination.
    Clear,
}

impl CompositeOpId {
    /// Every operator, in declaration order.
    pub const ALL: [CompositeOpId; 17] = [
        Self::Over,
        Self::Behind,
        Self::In,
        Self::Out,
        Self::Atop,
        Self::Xor,
        Self::DestinationIn,
        Self::DestinationAtop,
        Self::Plus,
        Self::Minus,
        Self::Difference,
        Self::Darken,
        Self::Lighten,
        Self::Multiply,
        Self::Screen,
        Self::Copy,
        Self::Clear,
    ];

    /// Stable string id.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Over => "normal",
            Self::Behind => "behind",
            Self::In => "in",
            Self::Out => "out",
            Self::Atop => "atop",
            Self::Xor => "xor",
            Self::DestinationIn => "destination-in",
            Self::DestinationAtop => "destination-atop",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Difference => "diff",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Copy => "copy",
            Self::Clear => "clear",
        }
    }

    /// Looks an operator up by its string id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.id() == id)
    }

    /// `true` if the result color is an affine mix of the inputs, so
    /// compositing inverted channels gives the inverted result. Operators
    /// without this property look different on subtractive models such as
    /// CMYK and should run in an additive space there.
    pub const fn preserves_inversion(self) -> bool {
        !matches!(
            self,
            Self::Plus
                | Self::Minus
                | Self::Difference
                | Self::Darken
                | Self::Lighten
                | Self::Multiply
                | Self::Screen
        )
    }

    fn is_separable(self) -> bool {
        matches!(
            self,
            Self::Over
                | Self::Minus
                | Self::Difference
                | Self::Darken
                | Self::Lighten
                | Self::Multiply
                | Self::Screen
        )
    }
}

impl fmt::Display for CompositeOpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Per-channel function of the separable modes.
#[inline]
fn blend_channel(op: CompositeOpId, sc: f64, dc: f64) -> f64 {
    match op {
        CompositeOpId::Minus => (dc - sc).max(0.0),
        CompositeOpId::Difference => (sc - dc).abs(),
        CompositeOpId::Darken => sc.min(dc),
        CompositeOpId::Lighten => sc.max(dc),
        CompositeOpId::Multiply => sc * dc,
        CompositeOpId::Screen => sc + dc - sc * dc,
        _ => sc,
    }
}

/// Composites pixels of one color space.
pub trait CompositeOp: Send + Sync {
    /// The operator this instance runs.
    fn id(&self) -> CompositeOpId;

    /// Composites `n_pixels` of `src` onto `dst`.
    ///
    /// `mask` holds one 8-bit coverage value per pixel. `opacity` is
    /// clamped to `[0, 1]`.
    fn composite(
        &self,
        dst: &mut [u8],
        src: &[u8],
        mask: Option<&[u8]>,
        n_pixels: usize,
        opacity: f64,
        flags: ChannelFlags,
    );
}

/// [`CompositeOp`] for a compile-time layout.
pub struct CompositeOpImpl<T> {
    id: CompositeOpId,
    _traits: PhantomData<fn() -> T>,
}

impl<T: ColorSpaceTraits> CompositeOpImpl<T> {
    /// Creates the operator.
    pub const fn new(id: CompositeOpId) -> Self {
        Self {
            id,
            _traits: PhantomData,
        }
    }

    fn composite_pixel(&self, dst: &mut [u8], src: &[u8], blend: f64, flags: ChannelFlags) {
        use CompositeOpId as Op;

        if self.id == Op::Copy && blend >= 1.0 {
            for i in (0..T::CHANNELS_NB).filter(|&i| flags.test(i)) {
                T::set_channel(dst, i, T::channel(src, i));
            }
            return;
        }

        let src_alpha = T::opacity_f(src);
        let sa = src_alpha * blend;
        let da = T::opacity_f(dst);
        let ra = match self.id {
            Op::In | Op::DestinationIn => sa * da,
            Op::Out => sa * (1.0 - da),
            Op::Atop => da,
            Op::Xor => sa * (1.0 - da) + da * (1.0 - sa),
            Op::DestinationAtop => sa,
            Op::Plus => (sa + da).min(1.0),
            Op::Copy => da + (src_alpha - da) * blend,
            Op::Clear => da * (1.0 - blend),
            _ => sa + da - sa * da,
        };

        if ra > ALPHA_EPSILON && self.id != Op::Clear {
            let mut out = [0f64; MAX_CHANNELS];
            for (k, &pos) in T::COLOR_POSITIONS.iter().enumerate() {
                let sc = T::channel(src, pos).to_normalized();
                let dc = T::channel(dst, pos).to_normalized();
                out[k] = match self.id {
                    op if op.is_separable() => {
                        ((1.0 - da) * sa * sc
                            + (1.0 - sa) * da * dc
                            + sa * da * blend_channel(op, sc, dc))
                            / ra
                    }
                    Op::Behind => (da * dc + (1.0 - da) * sa * sc) / ra,
                    Op::Atop => sa * sc + (1.0 - sa) * dc,
                    Op::Xor => (sa * (1.0 - da) * sc + da * (1.0 - sa) * dc) / ra,
                    Op::DestinationIn => dc,
                    Op::DestinationAtop => da * dc + (1.0 - da) * sc,
                    Op::Plus => (sa * sc + da * dc) / ra,
                    Op::Copy => (dc * da * (1.0 - blend) + sc * src_alpha * blend) / ra,
                    _ => sc,
                };
            }
            for (k, &pos) in T::COLOR_POSITIONS.iter().enumerate() {
                if flags.test(pos) {
                    T::set_channel(dst, pos, T::Channel::from_normalized(out[k]));
                }
            }
        }

        if let Some(a) = T::ALPHA_POS.filter(|&a| flags.test(a)) {
            T::set_channel(dst, a, T::Channel::from_normalized(ra));
        }
    }
}

impl<T: ColorSpaceTraits> CompositeOp for CompositeOpImpl<T> {
    fn id(&self) -> CompositeOpId {
        self.id
    }

    fn composite(
        &self,
        dst: &mut [u8],
        src: &[u8],
        mask: Option<&[u8]>,
        n_pixels: usize,
        opacity: f64,
        flags: ChannelFlags,
    ) {
        debug_assert!(dst.len() >= n_pixels * T::PIXEL_SIZE);
        debug_assert!(src.len() >= n_pixels * T::PIXEL_SIZE);
        debug_assert!(mask.is_none_or(|m| m.len() >= n_pixels));

        let opacity = opacity.clamp(0.0, 1.0);
        let pixels = dst
            .chunks_exact_mut(T::PIXEL_SIZE)
            .zip(src.chunks_exact(T::PIXEL_SIZE))
            .take(n_pixels);
        for (i, (d, s)) in pixels.enumerate() {
            let blend = match mask {
                Some(m) => opacity * m[i] as f64 / 255.0,
                None => opacity,
            };
            if blend > 0.0 {
                self.composite_pixel(d, s, blend, flags);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{BgrU8, GrayU8, RgbF32};

    fn f32_px(v: [f32; 4]) -> Vec<u8> {
        bytemuck::cast_slice(&v).to_vec()
    }

    fn f32_read(px: &[u8]) -> [f32; 4] {
        bytemuck::pod_read_unaligned(px)
    }

    fn run_f32(op: CompositeOpId, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let mut d = f32_px(dst);
        CompositeOpImpl::<RgbF32>::new(op).composite(&mut d, &f32_px(src), None, 1, 1.0, ChannelFlags::ALL);
        f32_read(&d)
    }

    #[test]
    fn test_ids_round_trip() {
        for op in CompositeOpId::ALL {
            assert_eq!(CompositeOpId::from_id(op.id()), Some(op));
        }
        assert_eq!(CompositeOpId::default().to_string(), "normal");
        assert!(CompositeOpId::from_id("dissolve").is_none());
    }

    #[test]
    fn test_over_opaque_and_half() {
        let over = CompositeOpImpl::<BgrU8>::new(CompositeOpId::Over);
        let src = [10u8, 20, 30, 255];
        let mut dst = [200u8, 200, 200, 255];
        over.composite(&mut dst, &src, None, 1, 1.0, ChannelFlags::ALL);
        assert_eq!(dst, src);

        let mut dst = [255u8, 0, 0, 255];
        over.composite(&mut dst, &[0, 0, 255, 255], None, 1, 0.5, ChannelFlags::ALL);
        assert_eq!(dst, [128, 0, 128, 255]);
    }

    #[test]
    fn test_over_transparent_destination_takes_source() {
        let mut dst = [0u8; 4];
        CompositeOpImpl::<BgrU8>::new(CompositeOpId::Over).composite(
            &mut dst,
            &[0, 0, 255, 128],
            None,
            1,
            1.0,
            ChannelFlags::ALL,
        );
        assert_eq!(dst, [0, 0, 255, 128]);
    }

    #[test]
    fn test_mask_and_zero_opacity_skip() {
        let over = CompositeOpImpl::<BgrU8>::new(CompositeOpId::Over);
        let src = [9u8, 9, 9, 255, 9, 9, 9, 255];
        let mut dst = [1u8, 2, 3, 255, 1, 2, 3, 255];
        over.composite(&mut dst, &src, Some(&[0, 255]), 2, 1.0, ChannelFlags::ALL);
        assert_eq!(dst, [1, 2, 3, 255, 9, 9, 9, 255]);

        let mut dst = [1u8, 2, 3, 4];
        over.composite(&mut dst, &src, None, 1, 0.0, ChannelFlags::ALL);
        assert_eq!(dst, [1, 2, 3, 4]);
    }

    #[test]
    fn test_flags_lock_alpha() {
        let flags = ChannelFlags::color_only(4, Some(3));
        let mut dst = [200u8, 200, 200, 100];
        CompositeOpImpl::<BgrU8>::new(CompositeOpId::Over).composite(
            &mut dst,
            &[10, 20, 30, 255],
            None,
            1,
            1.0,
            flags,
        );
        assert_eq!(dst, [10, 20, 30, 100]);
    }

    #[test]
    fn test_porter_duff_alpha() {
        let src = [1.0f32, 0.0, 0.0, 0.5];
        let dst = [0.0f32, 0.0, 1.0, 0.5];
        let cases = [
            (CompositeOpId::Over, 0.75),
            (CompositeOpId::Behind, 0.75),
            (CompositeOpId::In, 0.25),
            (CompositeOpId::Out, 0.25),
            (CompositeOpId::Atop, 0.5),
            (CompositeOpId::Xor, 0.5),
            (CompositeOpId::DestinationIn, 0.25),
            (CompositeOpId::DestinationAtop, 0.5),
            (CompositeOpId::Plus, 1.0),
            (CompositeOpId::Copy, 0.5),
            (CompositeOpId::Clear, 0.0),
        ];
        for (op, alpha) in cases {
            assert_eq!(run_f32(op, src, dst)[3], alpha, "{op}");
        }
        // Colors follow the operator, not the destination.
        assert_eq!(run_f32(CompositeOpId::In, src, dst)[..3], [1.0, 0.0, 0.0]);
        assert_eq!(run_f32(CompositeOpId::DestinationIn, src, dst)[..3], [0.0, 0.0, 1.0]);
        // Clear keeps the color bytes.
        assert_eq!(run_f32(CompositeOpId::Clear, src, dst)[..3], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_separable_modes_opaque() {
        let src = [0.5f32, 0.25, 1.0, 1.0];
        let dst = [0.5f32, 1.0, 0.0, 1.0];
        let cases = [
            (CompositeOpId::Multiply, [0.25, 0.25, 0.0]),
            (CompositeOpId::Screen, [0.75, 1.0, 1.0]),
            (CompositeOpId::Darken, [0.5, 0.25, 0.0]),
            (CompositeOpId::Lighten, [0.5, 1.0, 1.0]),
            (CompositeOpId::Difference, [0.0, 0.75, 1.0]),
            (CompositeOpId::Minus, [0.0, 0.75, 0.0]),
            (CompositeOpId::Plus, [1.0, 1.25, 1.0]),
        ];
        for (op, expected) in cases {
            let out = run_f32(op, src, dst);
            assert_eq!(out[..3], expected, "{op}");
            assert_eq!(out[3], 1.0, "{op}");
        }
    }

    #[test]
    fn test_alpha_free_layout_fades_by_opacity() {
        let mut dst = [0u8];
        CompositeOpImpl::<GrayU8>::new(CompositeOpId::Over).composite(
            &mut dst,
            &[200],
            None,
            1,
            0.5,
            ChannelFlags::ALL,
        );
        assert_eq!(dst, [100]);
    }

    /// Composites red against inverted green across alpha and opacity
    /// combinations; the inversion-preserving operators keep the two in
    /// lockstep to within rounding.
    fn max_inversion_error(op: CompositeOpId) -> i32 {
        let composite = CompositeOpImpl::<BgrU8>::new(op);
        let alphas = [16u8, 64, 128, 192, 255];
        let values = [0u8, 32, 92, 160, 224, 255];
        let mut worst = 0;
        for opacity in alphas {
            for sa in alphas {
                for da in alphas {
                    for sv in values {
                        for dv in values {
                            let src = [255, 255 - sv, sv, sa];
                            let mut dst = [255, 255 - dv, dv, da];
                            composite.composite(
                                &mut dst,
                                &src,
                                None,
                                1,
                                opacity as f64 / 255.0,
                                ChannelFlags::ALL,
                            );
                            let green = 255 - dst[1] as i32;
                            worst = worst.max((dst[2] as i32 - green).abs());
                        }
                    }
                }
            }
        }
        worst
    }

    #[test]
    fn test_inversion_invariance() {
        for op in CompositeOpId::ALL {
            let err = max_inversion_error(op);
            assert_eq!(err <= 1, op.preserves_inversion(), "{op}: max error {err}");
        }
    }
}
