//! Runtime color spaces.
//!
//! [`ColorSpace`] is the object-safe face of a pixel layout. Pixel buffers
//! are raw byte spans and never describe themselves; whoever holds one also
//! holds the `Arc<dyn ColorSpace>` that explains it.
//!
//! The only implementation shipped here is [`TraitColorSpace`], generic
//! over a compile-time layout ([`ColorSpaceTraits`]) and a color model
//! ([`ColorModel`]). Each instantiation owns its monomorphized
//! [`MixColorsOpImpl`], [`ConvolutionOpImpl`] and one [`CompositeOpImpl`]
//! per [`CompositeOpId`], so choosing a color space
//! once per call picks the specialized inner loops.
//!
//! # Canonical forms
//!
//! Every color space converts to and from two 16-bit interchange forms:
//!
//! - **Lab16**: `L, a, b, A` as `u16`, `a`/`b` zero at `0x8080`
//! - **RGBA16**: `B, G, R, A` as `u16`, sRGB encoded (same storage as the
//!   16-bit RGB color space, so it converts by plain copy)
//!
//! [`ColorSpace::convert_pixels_to`] uses them as the universal fallback
//! when two spaces have no direct path.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::colorspace::{ColorSpace, Rgba8, TraitColorSpace};
//! use pigment_core::model::RgbModel;
//! use pigment_core::traits::BgrU8;
//!
//! let cs = TraitColorSpace::<BgrU8, RgbModel>::new("sRGB");
//! let mut px = [0u8; 4];
//! cs.from_rgba8(Rgba8::new(255, 128, 0, 255), &mut px);
//! assert_eq!(px, [0, 128, 255, 255]);
//! assert_eq!(cs.to_rgba8(&px), Rgba8::new(255, 128, 0, 255));
//! ```

use crate::channel::{ChannelValue, ChannelValueType, ColorDepthId};
use crate::channel_info::{self, ChannelInfo, ChannelKind};
use crate::composite::{CompositeOp, CompositeOpId, CompositeOpImpl};
use crate::convolution::{ConvolutionOp, ConvolutionOpImpl};
use crate::error::{Error, Result};
use crate::mix::{MixColorsOp, MixColorsOpImpl};
use crate::model::{self, ColorModel, ColorModelId};
use crate::traits::{BgrU16, ColorSpaceTraits, LabU16, MAX_CHANNELS};
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Bytes per pixel of the Lab16 interchange form.
pub const LABA16_PIXEL_SIZE: usize = 8;

/// Bytes per pixel of the RGBA16 interchange form.
pub const RGBA16_PIXEL_SIZE: usize = 8;

const CONVERT_CHUNK: usize = 256;

// ============================================================================
// Identification
// ============================================================================

/// An 8-bit-per-channel sRGB color with alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    /// Red
    pub r: u8,
    /// Green
    pub g: u8,
    /// Blue
    pub b: u8,
    /// Alpha
    pub a: u8,
}

impl Rgba8 {
    /// Creates a color from its components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

/// Identity of a color space: model, depth and profile name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorSpaceId {
    /// Color model
    pub model: ColorModelId,
    /// Channel depth
    pub depth: ColorDepthId,
    /// Profile name
    pub profile: String,
}

impl ColorSpaceId {
    /// Creates an id.
    pub fn new(model: ColorModelId, depth: ColorDepthId, profile: impl Into<String>) -> Self {
        Self {
            model,
            depth,
            profile: profile.into(),
        }
    }
}

impl fmt::Display for ColorSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.model, self.depth, self.profile)
    }
}

/// Rendering intent for conversions between spaces.
///
/// The built-in fallback conversion ignores it; transform providers map it
/// onto their own intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderingIntent {
    /// Perceptual
    #[default]
    Perceptual,
    /// Relative colorimetric
    RelativeColorimetric,
    /// Saturation
    Saturation,
    /// Absolute colorimetric
    AbsoluteColorimetric,
}

// ============================================================================
// ColorSpace
// ============================================================================

/// A runtime color space.
///
/// Channel indices passed to any method must be below
/// [`channel_count`](Self::channel_count) and buffers must hold the stated
/// number of pixels; violations are programmer errors checked only in
/// debug builds, except in [`convert_pixels_to`](Self::convert_pixels_to)
/// which validates its buffers.
pub trait ColorSpace: Send + Sync + fmt::Debug {
    /// Model, depth and profile.
    fn id(&self) -> &ColorSpaceId;

    /// Bytes per pixel.
    fn pixel_size(&self) -> usize;

    /// Channel count, alpha included.
    fn channel_count(&self) -> usize;

    /// Storage index of the alpha channel, if any.
    fn alpha_pos(&self) -> Option<usize>;

    /// Channel descriptors in storage order.
    fn channels(&self) -> &[ChannelInfo];

    /// Native type shared by all channels.
    fn channel_value_type(&self) -> ChannelValueType;

    /// The weighted mixing operator of this space.
    fn mix_colors_op(&self) -> &dyn MixColorsOp;

    /// The convolution operator of this space.
    fn convolution_op(&self) -> &dyn ConvolutionOp;

    /// The compositing operator `id` of this space.
    fn composite_op(&self, id: CompositeOpId) -> &dyn CompositeOp;

    /// Human readable name.
    fn name(&self) -> String {
        self.id().to_string()
    }

    /// Channel count without alpha.
    fn color_channel_count(&self) -> usize {
        self.channel_count() - usize::from(self.alpha_pos().is_some())
    }

    /// Returns `true` if pixels carry an alpha channel.
    fn has_alpha(&self) -> bool {
        self.alpha_pos().is_some()
    }

    /// Storage index → display position.
    fn channel_index_to_display_position(&self, index: usize) -> usize {
        channel_info::channel_index_to_display_position(self.channels(), index)
    }

    /// Display position → storage index.
    fn display_position_to_channel_index(&self, display: usize) -> usize {
        channel_info::display_position_to_channel_index(self.channels(), display)
    }

    // --- alpha -------------------------------------------------------------

    /// Opacity in `0..=255`.
    fn opacity_u8(&self, pixel: &[u8]) -> u8;
    /// Opacity in `[0, 1]`.
    fn opacity_f(&self, pixel: &[u8]) -> f64;
    /// Sets the alpha of `n_pixels` pixels.
    fn set_opacity_u8(&self, pixels: &mut [u8], alpha: u8, n_pixels: usize);
    /// Sets the alpha of `n_pixels` pixels from `[0, 1]`.
    fn set_opacity_f(&self, pixels: &mut [u8], alpha: f64, n_pixels: usize);
    /// Multiplies the alpha of `n_pixels` pixels by `alpha / 255`.
    fn multiply_alpha(&self, pixels: &mut [u8], alpha: u8, n_pixels: usize);
    /// Multiplies each alpha by the matching mask value.
    fn apply_alpha_u8_mask(&self, pixels: &mut [u8], mask: &[u8], n_pixels: usize);
    /// Multiplies each alpha by the complement of the mask value.
    fn apply_inverse_alpha_u8_mask(&self, pixels: &mut [u8], mask: &[u8], n_pixels: usize);

    // --- channel values ----------------------------------------------------

    /// All channels of one pixel as `[0, 1]` floats in storage order.
    fn normalised_channels_value(&self, pixel: &[u8], out: &mut [f32]);
    /// Inverse of [`normalised_channels_value`](Self::normalised_channels_value).
    fn from_normalised_channels_value(&self, pixel: &mut [u8], values: &[f32]);
    /// One channel scaled to `0..=255`.
    fn scale_to_u8(&self, pixel: &[u8], channel: usize) -> u8;

    // --- conversions -------------------------------------------------------

    /// Converts one pixel to 8-bit sRGB.
    fn to_rgba8(&self, pixel: &[u8]) -> Rgba8;
    /// Writes an 8-bit sRGB color into one pixel.
    fn from_rgba8(&self, color: Rgba8, pixel: &mut [u8]);
    /// Converts `n_pixels` pixels to Lab16.
    fn to_laba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize);
    /// Converts `n_pixels` Lab16 pixels into this space.
    fn from_laba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize);
    /// Converts `n_pixels` pixels to RGBA16.
    fn to_rgba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize);
    /// Converts `n_pixels` RGBA16 pixels into this space.
    fn from_rgba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize);

    /// Converts `n_pixels` pixels into `dst_cs`.
    ///
    /// Identical spaces copy bytes. Spaces of the same model copy
    /// normalised channel values. Everything else takes a double hop
    /// through Lab16 or RGBA16, which may lose precision but never fails.
    fn convert_pixels_to(
        &self,
        src: &[u8],
        dst: &mut [u8],
        dst_cs: &dyn ColorSpace,
        n_pixels: usize,
        intent: RenderingIntent,
    ) -> Result<()> {
        let src_ps = self.pixel_size();
        let dst_ps = dst_cs.pixel_size();
        if src.len() < n_pixels * src_ps {
            return Err(Error::buffer_mismatch(n_pixels * src_ps, src.len()));
        }
        if dst.len() < n_pixels * dst_ps {
            return Err(Error::buffer_mismatch(n_pixels * dst_ps, dst.len()));
        }

        if self.id() == dst_cs.id() {
            let len = n_pixels * src_ps;
            dst[..len].copy_from_slice(&src[..len]);
            return Ok(());
        }

        if self.id().model == dst_cs.id().model && self.channel_count() == dst_cs.channel_count() {
            if self.id().profile != dst_cs.id().profile {
                debug!(
                    src = %self.id(),
                    dst = %dst_cs.id(),
                    "profiles differ, copying normalised values unchanged"
                );
            }
            let mut map = [0usize; MAX_CHANNELS];
            for (j, m) in map.iter_mut().enumerate().take(dst_cs.channel_count()) {
                *m = self
                    .display_position_to_channel_index(dst_cs.channel_index_to_display_position(j));
            }
            let mut n_src = [0f32; MAX_CHANNELS];
            let mut n_dst = [0f32; MAX_CHANNELS];
            for (s, d) in src
                .chunks_exact(src_ps)
                .zip(dst.chunks_exact_mut(dst_ps))
                .take(n_pixels)
            {
                self.normalised_channels_value(s, &mut n_src);
                for j in 0..dst_cs.channel_count() {
                    n_dst[j] = n_src[map[j]];
                }
                dst_cs.from_normalised_channels_value(d, &n_dst);
            }
            return Ok(());
        }

        let via_lab = dst_cs.id().model.prefers_lab();
        debug!(
            src = %self.id(),
            dst = %dst_cs.id(),
            ?intent,
            via = if via_lab { "Lab16" } else { "RGBA16" },
            "no direct conversion, using double hop"
        );

        let mut tmp = [0u8; CONVERT_CHUNK * 8];
        let mut start = 0;
        while start < n_pixels {
            let count = CONVERT_CHUNK.min(n_pixels - start);
            let s = &src[start * src_ps..(start + count) * src_ps];
            let d = &mut dst[start * dst_ps..(start + count) * dst_ps];
            let t = &mut tmp[..count * 8];
            if via_lab {
                self.to_laba16(s, t, count);
                dst_cs.from_laba16(t, d, count);
            } else {
                self.to_rgba16(s, t, count);
                dst_cs.from_rgba16(t, d, count);
            }
            start += count;
        }
        Ok(())
    }

    /// Perceptual distance between two pixels, clamped to 255.
    ///
    /// CIE76 ΔE over Lab with the alpha difference as a fourth axis scaled
    /// like `L`.
    fn difference(&self, a: &[u8], b: &[u8]) -> u8 {
        let mut la = [0u8; LABA16_PIXEL_SIZE];
        let mut lb = [0u8; LABA16_PIXEL_SIZE];
        self.to_laba16(a, &mut la, 1);
        self.to_laba16(b, &mut lb, 1);
        let (mut na, mut nb) = ([0f32; 4], [0f32; 4]);
        LabU16::normalised_channels_value(&la, &mut na);
        LabU16::normalised_channels_value(&lb, &mut nb);
        let dl = (na[0] - nb[0]) as f64 * 100.0;
        let da = model::denormalise_ab(na[1] as f64) - model::denormalise_ab(nb[1] as f64);
        let db = model::denormalise_ab(na[2] as f64) - model::denormalise_ab(nb[2] as f64);
        let dalpha = (na[3] - nb[3]) as f64 * 100.0;
        (dl * dl + da * da + db * db + dalpha * dalpha)
            .sqrt()
            .min(255.0) as u8
    }

    /// Luma of the pixel's 8-bit sRGB rendering.
    fn intensity8(&self, pixel: &[u8]) -> u8 {
        let c = self.to_rgba8(pixel);
        (c.r as f64 * 0.30 + c.g as f64 * 0.59 + c.b as f64 * 0.11 + 0.5) as u8
    }
}

// ============================================================================
// TraitColorSpace
// ============================================================================

/// The generic [`ColorSpace`] over a layout `T` and a model `M`.
pub struct TraitColorSpace<T, M> {
    id: ColorSpaceId,
    channels: Vec<ChannelInfo>,
    mix_op: MixColorsOpImpl<T>,
    convolution_op: ConvolutionOpImpl<T>,
    composite_ops: Vec<CompositeOpImpl<T>>,
    _model: PhantomData<fn() -> M>,
}

impl<T: ColorSpaceTraits, M: ColorModel> TraitColorSpace<T, M> {
    /// Creates the color space with the given profile name.
    pub fn new(profile: impl Into<String>) -> Self {
        debug_assert!(T::CHANNELS_NB <= MAX_CHANNELS);
        debug_assert_eq!(T::COLOR_POSITIONS.len(), M::CHANNEL_NAMES.len());

        let value_type = T::Channel::VALUE_TYPE;
        let color_count = T::COLOR_POSITIONS.len();
        let channels = (0..T::CHANNELS_NB)
            .map(|i| {
                let (name, display_position, kind) = if T::ALPHA_POS == Some(i) {
                    ("Alpha", color_count, ChannelKind::Alpha)
                } else {
                    let k = T::COLOR_POSITIONS
                        .iter()
                        .position(|&p| p == i)
                        .unwrap_or(i);
                    let name = M::CHANNEL_NAMES.get(k).copied().unwrap_or("Channel");
                    (name, k, ChannelKind::Color)
                };
                ChannelInfo {
                    name: name.to_string(),
                    position: i * value_type.size(),
                    index: i,
                    display_position,
                    value_type,
                    kind,
                }
            })
            .collect();

        Self {
            id: ColorSpaceId::new(M::ID, value_type.depth(), profile),
            channels,
            mix_op: MixColorsOpImpl::new(),
            convolution_op: ConvolutionOpImpl::new(),
            composite_ops: CompositeOpId::ALL.into_iter().map(CompositeOpImpl::new).collect(),
            _model: PhantomData,
        }
    }

    /// Color components in canonical order plus alpha.
    #[inline]
    fn split(pixel: &[u8]) -> ([f64; MAX_CHANNELS], f64) {
        let mut n = [0f32; MAX_CHANNELS];
        T::normalised_channels_value(pixel, &mut n);
        let mut color = [0f64; MAX_CHANNELS];
        for (k, &pos) in T::COLOR_POSITIONS.iter().enumerate() {
            color[k] = n[pos] as f64;
        }
        (color, T::ALPHA_POS.map_or(1.0, |a| n[a] as f64))
    }

    #[inline]
    fn join(pixel: &mut [u8], color: &[f64], alpha: f64) {
        let mut n = [0f32; MAX_CHANNELS];
        for (k, &pos) in T::COLOR_POSITIONS.iter().enumerate() {
            n[pos] = color[k] as f32;
        }
        if let Some(a) = T::ALPHA_POS {
            n[a] = alpha as f32;
        }
        T::from_normalised_channels_value(pixel, &n);
    }
}

impl<T, M> fmt::Debug for TraitColorSpace<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitColorSpace")
            .field("id", &self.id)
            .field("channels", &self.channels.len())
            .finish()
    }
}

impl<T: ColorSpaceTraits, M: ColorModel> ColorSpace for TraitColorSpace<T, M> {
    fn id(&self) -> &ColorSpaceId {
        &self.id
    }

    fn pixel_size(&self) -> usize {
        T::PIXEL_SIZE
    }

    fn channel_count(&self) -> usize {
        T::CHANNELS_NB
    }

    fn alpha_pos(&self) -> Option<usize> {
        T::ALPHA_POS
    }

    fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    fn channel_value_type(&self) -> ChannelValueType {
        T::Channel::VALUE_TYPE
    }

    fn mix_colors_op(&self) -> &dyn MixColorsOp {
        &self.mix_op
    }

    fn convolution_op(&self) -> &dyn ConvolutionOp {
        &self.convolution_op
    }

    fn composite_op(&self, id: CompositeOpId) -> &dyn CompositeOp {
        &self.composite_ops[id as usize]
    }

    fn opacity_u8(&self, pixel: &[u8]) -> u8 {
        T::opacity_u8(pixel)
    }

    fn opacity_f(&self, pixel: &[u8]) -> f64 {
        T::opacity_f(pixel)
    }

    fn set_opacity_u8(&self, pixels: &mut [u8], alpha: u8, n_pixels: usize) {
        T::set_opacity_u8(pixels, alpha, n_pixels)
    }

    fn set_opacity_f(&self, pixels: &mut [u8], alpha: f64, n_pixels: usize) {
        T::set_opacity_f(pixels, alpha, n_pixels)
    }

    fn multiply_alpha(&self, pixels: &mut [u8], alpha: u8, n_pixels: usize) {
        T::multiply_alpha(pixels, alpha, n_pixels)
    }

    fn apply_alpha_u8_mask(&self, pixels: &mut [u8], mask: &[u8], n_pixels: usize) {
        T::apply_alpha_u8_mask(pixels, mask, n_pixels)
    }

    fn apply_inverse_alpha_u8_mask(&self, pixels: &mut [u8], mask: &[u8], n_pixels: usize) {
        T::apply_inverse_alpha_u8_mask(pixels, mask, n_pixels)
    }

    fn normalised_channels_value(&self, pixel: &[u8], out: &mut [f32]) {
        T::normalised_channels_value(pixel, out)
    }

    fn from_normalised_channels_value(&self, pixel: &mut [u8], values: &[f32]) {
        T::from_normalised_channels_value(pixel, values)
    }

    fn scale_to_u8(&self, pixel: &[u8], channel: usize) -> u8 {
        T::channel(pixel, channel).scale_to_u8()
    }

    fn to_rgba8(&self, pixel: &[u8]) -> Rgba8 {
        let (color, alpha) = Self::split(pixel);
        let (rgb, a) = M::to_rgb(&color[..T::COLOR_POSITIONS.len()], alpha);
        Rgba8::new(
            u8::from_normalized(rgb[0]),
            u8::from_normalized(rgb[1]),
            u8::from_normalized(rgb[2]),
            u8::from_normalized(a),
        )
    }

    fn from_rgba8(&self, c: Rgba8, pixel: &mut [u8]) {
        let rgb = [c.r as f64 / 255.0, c.g as f64 / 255.0, c.b as f64 / 255.0];
        let cc = T::COLOR_POSITIONS.len();
        let mut color = [0f64; MAX_CHANNELS];
        let alpha = M::from_rgb(rgb, c.a as f64 / 255.0, &mut color[..cc]);
        Self::join(pixel, &color[..cc], alpha);
    }

    fn to_laba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize) {
        let cc = T::COLOR_POSITIONS.len();
        for (s, d) in src
            .chunks_exact(T::PIXEL_SIZE)
            .zip(dst.chunks_exact_mut(LABA16_PIXEL_SIZE))
            .take(n_pixels)
        {
            let (color, alpha) = Self::split(s);
            let (lab, a) = M::to_lab(&color[..cc], alpha);
            LabU16::from_normalised_channels_value(
                d,
                &[
                    (lab[0] / 100.0) as f32,
                    model::normalise_ab(lab[1]) as f32,
                    model::normalise_ab(lab[2]) as f32,
                    a as f32,
                ],
            );
        }
    }

    fn from_laba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize) {
        let cc = T::COLOR_POSITIONS.len();
        for (s, d) in src
            .chunks_exact(LABA16_PIXEL_SIZE)
            .zip(dst.chunks_exact_mut(T::PIXEL_SIZE))
            .take(n_pixels)
        {
            let mut n = [0f32; 4];
            LabU16::normalised_channels_value(s, &mut n);
            let lab = [
                n[0] as f64 * 100.0,
                model::denormalise_ab(n[1] as f64),
                model::denormalise_ab(n[2] as f64),
            ];
            let mut color = [0f64; MAX_CHANNELS];
            let alpha = M::from_lab(lab, n[3] as f64, &mut color[..cc]);
            Self::join(d, &color[..cc], alpha);
        }
    }

    fn to_rgba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize) {
        let cc = T::COLOR_POSITIONS.len();
        for (s, d) in src
            .chunks_exact(T::PIXEL_SIZE)
            .zip(dst.chunks_exact_mut(RGBA16_PIXEL_SIZE))
            .take(n_pixels)
        {
            let (color, alpha) = Self::split(s);
            let (rgb, a) = M::to_rgb(&color[..cc], alpha);
            BgrU16::from_normalised_channels_value(
                d,
                &[rgb[2] as f32, rgb[1] as f32, rgb[0] as f32, a as f32],
            );
        }
    }

    fn from_rgba16(&self, src: &[u8], dst: &mut [u8], n_pixels: usize) {
        let cc = T::COLOR_POSITIONS.len();
        for (s, d) in src
            .chunks_exact(RGBA16_PIXEL_SIZE)
            .zip(dst.chunks_exact_mut(T::PIXEL_SIZE))
            .take(n_pixels)
        {
            let mut n = [0f32; 4];
            BgrU16::normalised_channels_value(s, &mut n);
            let rgb = [n[2] as f64, n[1] as f64, n[0] as f64];
            let mut color = [0f64; MAX_CHANNELS];
            let alpha = M::from_rgb(rgb, n[3] as f64, &mut color[..cc]);
            Self::join(d, &color[..cc], alpha);
        }
    }
}
