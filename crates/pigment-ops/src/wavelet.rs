//! Math toolbox: Haar-like wavelet transforms over paint devices.
//!
//! A region of any color space is copied into a [`FloatRepresentation`],
//! a dense `size × size × depth` block of `f32` coefficients holding the
//! native values of the color channels (alpha excluded). The forward
//! transform then splits the block into four sub-bands and recurses on the
//! low-pass quadrant:
//!
//! ```text
//! ┌──────┬──────┐      LL = (s11 + s12 + s21 + s22) / √2
//! │  LL  │  HL  │      HL = (s11 - s12 + s21 - s22) / √2
//! ├──────┼──────┤      LH = (s11 + s12 - s21 - s22) / √2
//! │  LH  │  HH  │      HH = (s11 - s12 - s21 + s22) / √2
//! └──────┴──────┘
//! ```
//!
//! The inverse rebuilds each 2×2 block with the factor `√2 / 4`, so a
//! forward pass followed by an inverse pass reproduces the input up to
//! float rounding.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::{ColorSpaceRegistry, Rect};
//! use pigment_ops::device::PaintDevice;
//! use pigment_ops::progress::NoProgress;
//! use pigment_ops::wavelet::{BasicMathToolbox, MathToolbox};
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let rect = Rect::new(0, 0, 6, 5);
//! let src = PaintDevice::from_bytes(registry.rgb8().unwrap(), rect, vec![90; 6 * 5 * 4]).unwrap();
//!
//! let toolbox = BasicMathToolbox;
//! let mut wav = toolbox.fast_wavelet_transformation(&src, rect, None, &NoProgress).unwrap();
//! assert_eq!((wav.size(), wav.depth()), (8, 3));
//!
//! let mut dst = src.clone();
//! toolbox.fast_wavelet_untransformation(&mut dst, rect, &mut wav, None, &NoProgress).unwrap();
//! assert_eq!(dst.data(), src.data());
//! ```

use crate::device::{EdgePolicy, PaintDevice};
use crate::progress::{ProgressSink, percent};
use crate::{OpsError, OpsResult};
use half::f16;
use pigment_core::channel::{ChannelValue, read_channel, write_channel};
use pigment_core::{ChannelValueType, ColorModelId, ColorSpace, Rect};
use std::collections::HashMap;
use std::f32::consts::{FRAC_1_SQRT_2, SQRT_2};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

// ============================================================================
// FloatRepresentation
// ============================================================================

/// Dense `size × size × depth` coefficient block.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatRepresentation {
    coeffs: Vec<f32>,
    size: usize,
    depth: usize,
}

impl FloatRepresentation {
    /// Allocates a zeroed block. `size` must be a power of two, at least 2.
    pub fn new(size: usize, depth: usize) -> OpsResult<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(OpsError::InvalidDimensions(format!(
                "wavelet size {} is not a power of two >= 2",
                size
            )));
        }
        let len = size * size * depth;
        let mut coeffs = Vec::new();
        coeffs
            .try_reserve_exact(len)
            .map_err(|e| pigment_core::Error::allocation_failed(len * 4, e.to_string()))?;
        coeffs.resize(len, 0.0);
        Ok(Self {
            coeffs,
            size,
            depth,
        })
    }

    /// Side length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Channels per sample.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Coefficients, row-major with channels interleaved.
    #[inline]
    pub fn coeffs(&self) -> &[f32] {
        &self.coeffs
    }

    /// Mutable coefficients.
    #[inline]
    pub fn coeffs_mut(&mut self) -> &mut [f32] {
        &mut self.coeffs
    }

    #[inline]
    fn index(&self, x: usize, y: usize, channel: usize) -> usize {
        debug_assert!(x < self.size && y < self.size && channel < self.depth);
        (y * self.size + x) * self.depth + channel
    }

    /// Coefficient at column `x`, row `y`.
    #[inline]
    pub fn value(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.coeffs[self.index(x, y, channel)]
    }

    /// Overwrites one coefficient.
    #[inline]
    pub fn set_value(&mut self, x: usize, y: usize, channel: usize, v: f32) {
        let i = self.index(x, y, channel);
        self.coeffs[i] = v;
    }

    fn same_shape(&self, other: &FloatRepresentation) -> OpsResult<()> {
        if self.size != other.size || self.depth != other.depth {
            return Err(OpsError::SizeMismatch(format!(
                "wavelet buffer {}x{}x{} vs {}x{}x{}",
                other.size, other.size, other.depth, self.size, self.size, self.depth
            )));
        }
        Ok(())
    }
}

/// Allocates the representation for `rect` of `src`: the smallest power of
/// two covering both dimensions, one layer per color channel.
pub fn init_wavelet(src: &PaintDevice, rect: Rect) -> OpsResult<FloatRepresentation> {
    let extent = rect.width.max(rect.height).max(0) as usize;
    let size = extent.next_power_of_two().max(2);
    FloatRepresentation::new(size, src.color_space().color_channel_count())
}

// ============================================================================
// Channel access
// ============================================================================

type ToDouble = fn(&[u8], usize) -> f64;
type FromDouble = fn(&mut [u8], usize, f64);

fn to_double<T: ChannelValue>(pixel: &[u8], position: usize) -> f64 {
    read_channel::<T>(pixel, position / std::mem::size_of::<T>()).to_f64()
}

fn from_double<T: ChannelValue>(pixel: &mut [u8], position: usize, v: f64) {
    write_channel(pixel, position / std::mem::size_of::<T>(), T::from_f64(v));
}

fn to_double_fn(vt: ChannelValueType) -> ToDouble {
    match vt {
        ChannelValueType::UInt8 => to_double::<u8>,
        ChannelValueType::UInt16 => to_double::<u16>,
        ChannelValueType::Float16 => to_double::<f16>,
        ChannelValueType::Float32 => to_double::<f32>,
        ChannelValueType::Float64 => to_double::<f64>,
    }
}

fn from_double_fn(vt: ChannelValueType) -> FromDouble {
    match vt {
        ChannelValueType::UInt8 => from_double::<u8>,
        ChannelValueType::UInt16 => from_double::<u16>,
        ChannelValueType::Float16 => from_double::<f16>,
        ChannelValueType::Float32 => from_double::<f32>,
        ChannelValueType::Float64 => from_double::<f64>,
    }
}

/// Byte positions of the color channels, storage order.
fn color_positions(cs: &dyn ColorSpace) -> Vec<(usize, ChannelValueType)> {
    cs.channels()
        .iter()
        .filter(|c| !c.is_alpha())
        .map(|c| (c.position, c.value_type))
        .collect()
}

fn check_fits(cs: &dyn ColorSpace, fr: &FloatRepresentation, rect: Rect) -> OpsResult<()> {
    if rect.width as usize > fr.size || rect.height as usize > fr.size {
        return Err(OpsError::InvalidDimensions(format!(
            "rect {} exceeds wavelet size {}",
            rect, fr.size
        )));
    }
    if cs.color_channel_count() != fr.depth {
        return Err(OpsError::SizeMismatch(format!(
            "{} has {} color channels, wavelet depth is {}",
            cs.name(),
            cs.color_channel_count(),
            fr.depth
        )));
    }
    Ok(())
}

/// Copies the color channels of `rect` into the top-left of `fr`.
pub fn transform_to_fr(src: &PaintDevice, fr: &mut FloatRepresentation, rect: Rect) -> OpsResult<()> {
    let cs = src.color_space();
    check_fits(cs.as_ref(), fr, rect)?;
    let readers: Vec<(ToDouble, usize)> = color_positions(cs.as_ref())
        .into_iter()
        .map(|(pos, vt)| (to_double_fn(vt), pos))
        .collect();

    let (size, depth) = (fr.size, fr.depth);
    let mut cursor = src.hline_cursor(rect, EdgePolicy::Standard);
    for row in 0..rect.height.max(0) as usize {
        for col in 0..rect.width as usize {
            let px = cursor.pixel();
            let base = (row * size + col) * depth;
            for (k, (read, pos)) in readers.iter().enumerate() {
                fr.coeffs[base + k] = read(px, *pos) as f32;
            }
            cursor.next_pixel();
        }
        cursor.next_row();
    }
    Ok(())
}

/// Writes the top-left `rect`-sized area of `fr` back into the color
/// channels of `dst`. Alpha is left as is.
pub fn transform_from_fr(dst: &mut PaintDevice, fr: &FloatRepresentation, rect: Rect) -> OpsResult<()> {
    let cs = dst.color_space().clone();
    check_fits(cs.as_ref(), fr, rect)?;
    let writers: Vec<(FromDouble, usize)> = color_positions(cs.as_ref())
        .into_iter()
        .map(|(pos, vt)| (from_double_fn(vt), pos))
        .collect();

    let (size, depth) = (fr.size, fr.depth);
    let mut out = dst.hline_cursor_mut(rect)?;
    for row in 0..rect.height.max(0) as usize {
        for col in 0..rect.width as usize {
            let px = out.pixel_mut();
            let base = (row * size + col) * depth;
            for (k, (write, pos)) in writers.iter().enumerate() {
                write(px, *pos, fr.coeffs[base + k] as f64);
            }
            out.next_pixel();
        }
        out.next_row();
    }
    Ok(())
}

// ============================================================================
// Transforms
// ============================================================================

fn copy_square(from: &FloatRepresentation, to: &mut FloatRepresentation, side: usize) {
    let stride = from.size * from.depth;
    let len = side * from.depth;
    for row in 0..side {
        let p = row * stride;
        to.coeffs[p..p + len].copy_from_slice(&from.coeffs[p..p + len]);
    }
}

/// One forward level on the top-left `2·halfsize` square of `wav`, then
/// recursion on its LL quadrant down to `halfsize == 1`.
///
/// `buff` is scratch of the same shape. `step` runs once per processed
/// output row.
pub fn wavetrans<F: FnMut()>(
    wav: &mut FloatRepresentation,
    buff: &mut FloatRepresentation,
    halfsize: usize,
    step: &mut F,
) {
    debug_assert!(halfsize >= 1 && 2 * halfsize <= wav.size);
    debug_assert_eq!((wav.size, wav.depth), (buff.size, buff.depth));
    for i in 0..halfsize {
        for j in 0..halfsize {
            for k in 0..wav.depth {
                let s11 = wav.value(2 * j, 2 * i, k);
                let s12 = wav.value(2 * j + 1, 2 * i, k);
                let s21 = wav.value(2 * j, 2 * i + 1, k);
                let s22 = wav.value(2 * j + 1, 2 * i + 1, k);
                buff.set_value(j, i, k, (s11 + s12 + s21 + s22) * FRAC_1_SQRT_2);
                buff.set_value(j + halfsize, i, k, (s11 - s12 + s21 - s22) * FRAC_1_SQRT_2);
                buff.set_value(j, i + halfsize, k, (s11 + s12 - s21 - s22) * FRAC_1_SQRT_2);
                buff.set_value(
                    j + halfsize,
                    i + halfsize,
                    k,
                    (s11 - s12 - s21 + s22) * FRAC_1_SQRT_2,
                );
            }
        }
        step();
    }
    copy_square(buff, wav, 2 * halfsize);
    if halfsize > 1 {
        wavetrans(wav, buff, halfsize / 2, step);
    }
}

/// Inverse of [`wavetrans`], from `halfsize` up to the full size. Start
/// with `halfsize == 1`.
pub fn waveuntrans<F: FnMut()>(
    wav: &mut FloatRepresentation,
    buff: &mut FloatRepresentation,
    halfsize: usize,
    step: &mut F,
) {
    debug_assert!(halfsize >= 1 && 2 * halfsize <= wav.size);
    debug_assert_eq!((wav.size, wav.depth), (buff.size, buff.depth));
    let scale = SQRT_2 * 0.25;
    for i in 0..halfsize {
        for j in 0..halfsize {
            for k in 0..wav.depth {
                let ll = wav.value(j, i, k);
                let hl = wav.value(j + halfsize, i, k);
                let lh = wav.value(j, i + halfsize, k);
                let hh = wav.value(j + halfsize, i + halfsize, k);
                buff.set_value(2 * j, 2 * i, k, (ll + hl + lh + hh) * scale);
                buff.set_value(2 * j + 1, 2 * i, k, (ll - hl + lh - hh) * scale);
                buff.set_value(2 * j, 2 * i + 1, k, (ll + hl - lh - hh) * scale);
                buff.set_value(2 * j + 1, 2 * i + 1, k, (ll - hl - lh + hh) * scale);
            }
        }
        step();
    }
    copy_square(buff, wav, 2 * halfsize);
    if halfsize != wav.size / 2 {
        waveuntrans(wav, buff, halfsize * 2, step);
    }
}

fn scratch_for<'b>(
    wav: &FloatRepresentation,
    buff: Option<&'b mut FloatRepresentation>,
    owned: &'b mut Option<FloatRepresentation>,
) -> OpsResult<&'b mut FloatRepresentation> {
    match buff {
        Some(b) => {
            wav.same_shape(b)?;
            Ok(b)
        }
        None => Ok(owned.insert(FloatRepresentation::new(wav.size, wav.depth)?)),
    }
}

fn progress_step(progress: &dyn ProgressSink, total: usize) -> impl FnMut() + '_ {
    let mut done = 0;
    move || {
        done += 1;
        progress.set_progress(percent(done, total));
    }
}

// ============================================================================
// Toolbox
// ============================================================================

/// Wavelet toolbox for one family of color models.
pub trait MathToolbox: Send + Sync {
    /// Stable identifier.
    fn id(&self) -> &str;

    /// Reads `rect` of `src` and transforms it.
    ///
    /// `buff` is optional scratch of the result's shape.
    fn fast_wavelet_transformation(
        &self,
        src: &PaintDevice,
        rect: Rect,
        buff: Option<&mut FloatRepresentation>,
        progress: &dyn ProgressSink,
    ) -> OpsResult<FloatRepresentation>;

    /// Inverts `wav` in place and writes it into `rect` of `dst`.
    fn fast_wavelet_untransformation(
        &self,
        dst: &mut PaintDevice,
        rect: Rect,
        wav: &mut FloatRepresentation,
        buff: Option<&mut FloatRepresentation>,
        progress: &dyn ProgressSink,
    ) -> OpsResult<()>;
}

/// Toolbox working on native channel values; valid for every color model.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMathToolbox;

impl BasicMathToolbox {
    /// Identifier of this toolbox.
    pub const ID: &'static str = "Basic";
}

impl MathToolbox for BasicMathToolbox {
    fn id(&self) -> &str {
        Self::ID
    }

    fn fast_wavelet_transformation(
        &self,
        src: &PaintDevice,
        rect: Rect,
        buff: Option<&mut FloatRepresentation>,
        progress: &dyn ProgressSink,
    ) -> OpsResult<FloatRepresentation> {
        trace!(%rect, "wavelet forward");
        let mut wav = init_wavelet(src, rect)?;
        let mut owned = None;
        let scratch = scratch_for(&wav, buff, &mut owned)?;
        transform_to_fr(src, &mut wav, rect)?;

        let half = wav.size / 2;
        let mut step = progress_step(progress, wav.size - 1);
        wavetrans(&mut wav, scratch, half, &mut step);
        Ok(wav)
    }

    fn fast_wavelet_untransformation(
        &self,
        dst: &mut PaintDevice,
        rect: Rect,
        wav: &mut FloatRepresentation,
        buff: Option<&mut FloatRepresentation>,
        progress: &dyn ProgressSink,
    ) -> OpsResult<()> {
        trace!(%rect, "wavelet inverse");
        let mut owned = None;
        let scratch = scratch_for(wav, buff, &mut owned)?;

        let mut step = progress_step(progress, wav.size - 1);
        waveuntrans(wav, scratch, 1, &mut step);
        transform_from_fr(dst, wav, rect)
    }
}

/// Caller-owned map from color model to toolbox.
///
/// Models without an explicit entry use the default toolbox, initially
/// [`BasicMathToolbox`].
pub struct MathToolboxRegistry {
    toolboxes: HashMap<ColorModelId, Arc<dyn MathToolbox>>,
    default: Arc<dyn MathToolbox>,
}

impl Default for MathToolboxRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MathToolboxRegistry {
    /// Registry with only the default toolbox.
    pub fn new() -> Self {
        Self {
            toolboxes: HashMap::new(),
            default: Arc::new(BasicMathToolbox),
        }
    }

    /// Registers (or replaces) the toolbox of a model.
    pub fn register(&mut self, model: ColorModelId, toolbox: Arc<dyn MathToolbox>) {
        self.toolboxes.insert(model, toolbox);
    }

    /// Replaces the fallback toolbox.
    pub fn set_default(&mut self, toolbox: Arc<dyn MathToolbox>) {
        self.default = toolbox;
    }

    /// Toolbox for `model`, or the default one.
    pub fn get(&self, model: ColorModelId) -> Arc<dyn MathToolbox> {
        self.toolboxes
            .get(&model)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    /// Toolbox for the model of `cs`.
    pub fn for_color_space(&self, cs: &dyn ColorSpace) -> Arc<dyn MathToolbox> {
        self.get(cs.id().model)
    }
}

impl fmt::Debug for MathToolboxRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut models: Vec<_> = self.toolboxes.keys().collect();
        models.sort();
        f.debug_struct("MathToolboxRegistry")
            .field("models", &models)
            .field("default", &self.default.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NoProgress, ProgressCounter};
    use approx::assert_abs_diff_eq;
    use pigment_core::{ColorDepthId, ColorSpaceRegistry};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn device(model: ColorModelId, depth: ColorDepthId, rect: Rect, seed: u64) -> PaintDevice {
        let registry = ColorSpaceRegistry::with_defaults();
        let cs = registry.color_space(model, depth, None).unwrap();
        let mut dev = PaintDevice::new(cs.clone(), rect).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = vec![0f32; cs.channel_count()];
        for (x, y) in rect.iter_coords() {
            for v in values.iter_mut() {
                *v = rng.r#gen::<f32>();
            }
            let px = dev.pixel_mut(x, y).unwrap();
            cs.from_normalised_channels_value(px, &values);
        }
        dev
    }

    #[test]
    fn test_init_wavelet_size() {
        let dev = device(ColorModelId::Rgb, ColorDepthId::U8, Rect::new(0, 0, 4, 4), 1);
        assert_eq!(init_wavelet(&dev, Rect::new(0, 0, 5, 3)).unwrap().size(), 8);
        assert_eq!(init_wavelet(&dev, Rect::new(0, 0, 1, 1)).unwrap().size(), 2);
        assert_eq!(init_wavelet(&dev, Rect::new(0, 0, 16, 9)).unwrap().size(), 16);
        assert_eq!(init_wavelet(&dev, Rect::new(0, 0, 16, 9)).unwrap().depth(), 3);
    }

    #[test]
    fn test_invalid_size() {
        assert!(FloatRepresentation::new(6, 1).is_err());
        assert!(FloatRepresentation::new(1, 1).is_err());
    }

    #[test]
    fn test_single_block() {
        let mut wav = FloatRepresentation::new(2, 1).unwrap();
        wav.coeffs_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut buff = FloatRepresentation::new(2, 1).unwrap();
        let mut steps = 0;
        wavetrans(&mut wav, &mut buff, 1, &mut || steps += 1);
        assert_eq!(steps, 1);
        let r = FRAC_1_SQRT_2;
        assert_abs_diff_eq!(wav.value(0, 0, 0), 10.0 * r, epsilon = 1e-6);
        assert_abs_diff_eq!(wav.value(1, 0, 0), -2.0 * r, epsilon = 1e-6);
        assert_abs_diff_eq!(wav.value(0, 1, 0), -4.0 * r, epsilon = 1e-6);
        assert_abs_diff_eq!(wav.value(1, 1, 0), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_trip_coefficients() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut wav = FloatRepresentation::new(16, 2).unwrap();
        for v in wav.coeffs_mut() {
            *v = rng.gen_range(-100.0..100.0);
        }
        let original = wav.clone();
        let mut buff = FloatRepresentation::new(16, 2).unwrap();
        let mut steps = 0;
        wavetrans(&mut wav, &mut buff, 8, &mut || steps += 1);
        assert_eq!(steps, 15);
        assert_ne!(wav, original);
        waveuntrans(&mut wav, &mut buff, 1, &mut || steps += 1);
        assert_eq!(steps, 30);
        for (a, b) in wav.coeffs().iter().zip(original.coeffs()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_device_round_trip_depths() {
        let rect = Rect::new(1, 2, 10, 7);
        for depth in [ColorDepthId::U8, ColorDepthId::U16, ColorDepthId::F32] {
            let src = device(ColorModelId::Rgb, depth, Rect::new(0, 0, 12, 10), 3);
            let toolbox = BasicMathToolbox;
            let mut wav = toolbox.fast_wavelet_transformation(&src, rect, None, &NoProgress).unwrap();
            let mut dst = src.clone();
            dst.fill(rect, &vec![0; src.pixel_size()]);
            toolbox
                .fast_wavelet_untransformation(&mut dst, rect, &mut wav, None, &NoProgress)
                .unwrap();
            let cs = src.color_space();
            let alpha = cs.alpha_pos().unwrap();
            for (x, y) in rect.iter_coords() {
                for c in 0..cs.channel_count() {
                    let (a, b) = (cs.scale_to_u8(src.pixel(x, y), c), cs.scale_to_u8(dst.pixel(x, y), c));
                    if c == alpha {
                        assert_eq!(b, 0);
                    } else {
                        assert!((a as i32 - b as i32).abs() <= 1, "{:?} ({},{}) ch{}", depth, x, y, c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_progress_and_scratch() {
        let src = device(ColorModelId::Gray, ColorDepthId::U8, Rect::new(0, 0, 8, 8), 5);
        let rect = src.extent();
        let progress = ProgressCounter::new();
        let mut scratch = FloatRepresentation::new(8, 1).unwrap();
        let wav = BasicMathToolbox
            .fast_wavelet_transformation(&src, rect, Some(&mut scratch), &progress)
            .unwrap();
        assert_eq!(wav.depth(), 1);
        assert_eq!(progress.progress(), 100);
        assert_eq!(progress.updates(), 7);

        let mut wrong = FloatRepresentation::new(4, 1).unwrap();
        assert!(matches!(
            BasicMathToolbox.fast_wavelet_transformation(&src, rect, Some(&mut wrong), &NoProgress),
            Err(OpsError::SizeMismatch(_))
        ));
    }

    #[test]
    fn test_alpha_space_has_no_layers() {
        let src = device(ColorModelId::Alpha, ColorDepthId::U8, Rect::new(0, 0, 3, 3), 9);
        let wav = BasicMathToolbox
            .fast_wavelet_transformation(&src, src.extent(), None, &NoProgress)
            .unwrap();
        assert_eq!(wav.depth(), 0);
        assert!(wav.coeffs().is_empty());
    }

    #[test]
    fn test_registry_fallback() {
        struct Custom;
        impl MathToolbox for Custom {
            fn id(&self) -> &str {
                "custom"
            }
            fn fast_wavelet_transformation(
                &self,
                src: &PaintDevice,
                rect: Rect,
                buff: Option<&mut FloatRepresentation>,
                progress: &dyn ProgressSink,
            ) -> OpsResult<FloatRepresentation> {
                BasicMathToolbox.fast_wavelet_transformation(src, rect, buff, progress)
            }
            fn fast_wavelet_untransformation(
                &self,
                dst: &mut PaintDevice,
                rect: Rect,
                wav: &mut FloatRepresentation,
                buff: Option<&mut FloatRepresentation>,
                progress: &dyn ProgressSink,
            ) -> OpsResult<()> {
                BasicMathToolbox.fast_wavelet_untransformation(dst, rect, wav, buff, progress)
            }
        }

        let mut registry = MathToolboxRegistry::new();
        assert_eq!(registry.get(ColorModelId::Lab).id(), "Basic");
        registry.register(ColorModelId::Lab, Arc::new(Custom));
        assert_eq!(registry.get(ColorModelId::Lab).id(), "custom");
        assert_eq!(registry.get(ColorModelId::Rgb).id(), "Basic");

        let cs = ColorSpaceRegistry::with_defaults().lab16().unwrap();
        assert_eq!(registry.for_color_space(cs.as_ref()).id(), "custom");
    }
}
