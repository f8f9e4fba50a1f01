//! Image plus binary mask, one pyramid level of the inpainting solver.

use crate::device::PaintDevice;
use crate::resize::{Filter, resize_f32};
use crate::{OpsError, OpsResult};
use pigment_core::{ColorSpace, Rect};
use std::fmt;
use std::sync::Arc;

/// Mask value of a pixel to be filled.
pub const MASK_SET: u8 = 255;
/// Mask value of a known pixel.
pub const MASK_CLEAR: u8 = 0;

/// Pixels of one color space with a per-pixel mask.
///
/// Raw pixels are kept in the color space layout for mixing and write-back;
/// normalised channel values are cached next to them for patch distances.
#[derive(Clone)]
pub struct MaskedImage {
    cs: Arc<dyn ColorSpace>,
    width: i32,
    height: i32,
    pixels: Vec<u8>,
    values: Vec<f32>,
    mask: Vec<u8>,
}

impl MaskedImage {
    /// Copies `rect` of `image` and `mask`.
    ///
    /// The mask device must have one channel; any non-zero value marks the
    /// pixel as masked.
    pub fn from_devices(image: &PaintDevice, mask: &PaintDevice, rect: Rect) -> OpsResult<Self> {
        let mask_cs = mask.color_space();
        if mask_cs.channel_count() != 1 {
            return Err(OpsError::InvalidParameter(format!(
                "mask color space {} must have a single channel",
                mask_cs.name()
            )));
        }
        let mask = rect
            .iter_coords()
            .map(|(x, y)| {
                if mask_cs.scale_to_u8(mask.pixel(x, y), 0) > MASK_CLEAR {
                    MASK_SET
                } else {
                    MASK_CLEAR
                }
            })
            .collect();
        Ok(Self::from_parts(
            image.color_space().clone(),
            rect.width,
            rect.height,
            image.read_bytes(rect),
            mask,
        ))
    }

    /// Builds an image from raw pixels and mask bytes, row-major.
    pub fn from_parts(
        cs: Arc<dyn ColorSpace>,
        width: i32,
        height: i32,
        pixels: Vec<u8>,
        mask: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize * cs.pixel_size());
        debug_assert_eq!(mask.len(), (width * height) as usize);
        let mut image = Self {
            values: vec![0.0; pixels.len() / cs.pixel_size() * cs.channel_count()],
            cs,
            width,
            height,
            pixels,
            mask,
        };
        image.refresh_values();
        image
    }

    fn refresh_values(&mut self) {
        let (ps, n) = (self.cs.pixel_size(), self.cs.channel_count());
        for (px, v) in self.pixels.chunks_exact(ps).zip(self.values.chunks_exact_mut(n)) {
            self.cs.normalised_channels_value(px, v);
        }
    }

    /// Color space of the pixels.
    #[inline]
    pub fn color_space(&self) -> &Arc<dyn ColorSpace> {
        &self.cs
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Channels per pixel, alpha included.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.cs.channel_count()
    }

    /// Raw pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(x >= 0 && x < self.width && y >= 0 && y < self.height);
        (y * self.width + x) as usize
    }

    /// Raw pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> &[u8] {
        let ps = self.cs.pixel_size();
        let i = self.index(x, y) * ps;
        &self.pixels[i..i + ps]
    }

    /// Normalised channel values at `(x, y)`.
    #[inline]
    pub fn pixel_values(&self, x: i32, y: i32) -> &[f32] {
        let n = self.channel_count();
        let i = self.index(x, y) * n;
        &self.values[i..i + n]
    }

    /// Overwrites the pixel at `(x, y)`.
    pub fn set_pixel(&mut self, x: i32, y: i32, pixel: &[u8]) {
        let ps = self.cs.pixel_size();
        let i = self.index(x, y);
        self.pixels[i * ps..(i + 1) * ps].copy_from_slice(pixel);
        self.refresh_pixel(i);
    }

    fn refresh_pixel(&mut self, i: usize) {
        let (ps, n) = (self.cs.pixel_size(), self.cs.channel_count());
        self.cs
            .normalised_channels_value(&self.pixels[i * ps..(i + 1) * ps], &mut self.values[i * n..(i + 1) * n]);
    }

    /// Returns `true` if `(x, y)` must be filled.
    #[inline]
    pub fn is_masked(&self, x: i32, y: i32) -> bool {
        self.mask[self.index(x, y)] > MASK_CLEAR
    }

    /// Sets the mask value of `(x, y)`.
    #[inline]
    pub fn set_mask(&mut self, x: i32, y: i32, v: u8) {
        let i = self.index(x, y);
        self.mask[i] = v;
    }

    /// Marks every pixel as known.
    pub fn clear_mask(&mut self) {
        self.mask.fill(MASK_CLEAR);
    }

    /// Number of masked pixels.
    pub fn count_masked(&self) -> usize {
        self.mask.iter().filter(|&&v| v > MASK_CLEAR).count()
    }

    /// Returns `true` if a masked pixel lies within `s` of `(x, y)`, window
    /// clipped to the image.
    pub fn contains_masked(&self, x: i32, y: i32, s: i32) -> bool {
        let (y0, y1) = ((y - s).max(0), (y + s).min(self.height - 1));
        let (x0, x1) = ((x - s).max(0), (x + s).min(self.width - 1));
        (y0..=y1).any(|ys| (x0..=x1).any(|xs| self.is_masked(xs, ys)))
    }

    /// Squared difference of normalised channels between `(x, y)` here and
    /// `(xo, yo)` in `other`. At most the channel count.
    #[inline]
    pub fn distance(&self, x: i32, y: i32, other: &MaskedImage, xo: i32, yo: i32) -> f32 {
        self.pixel_values(x, y)
            .iter()
            .zip(other.pixel_values(xo, yo))
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Replaces `(x, y)` with the weighted mix of `pixels`.
    ///
    /// Float weights are spread onto the 0..255 integer scale of the mixing
    /// operator with the rounding error carried from one weight to the next.
    pub fn mix_colors(&mut self, x: i32, y: i32, pixels: &[&[u8]], weights: &[f32], wsum: f32) {
        debug_assert_eq!(pixels.len(), weights.len());
        let scale = 255.0 / (wsum + 0.001);
        let mut carry = 0.0f32;
        let weights: Vec<i16> = weights
            .iter()
            .map(|w| {
                let v = w * scale + carry;
                let r = v.round();
                carry = v - r;
                r as i16
            })
            .collect();

        let ps = self.cs.pixel_size();
        let i = self.index(x, y);
        self.cs
            .mix_colors_op()
            .mix_colors(pixels, &weights, &mut self.pixels[i * ps..(i + 1) * ps]);
        self.refresh_pixel(i);
    }

    /// Halves both dimensions with a bicubic filter.
    ///
    /// Colors are resampled from known pixels only. Pixels whose resampled
    /// mask stays fully set remain masked and are zeroed.
    pub fn downsample_2x(&mut self) -> OpsResult<()> {
        let (w, h) = (self.width as usize, self.height as usize);
        let (nw, nh) = (w / 2, h / 2);
        let n = self.channel_count();

        let known: Vec<f32> = self
            .mask
            .iter()
            .map(|&m| if m > MASK_CLEAR { 0.0 } else { 1.0 })
            .collect();
        let weighted: Vec<f32> = self
            .values
            .chunks_exact(n)
            .zip(&known)
            .flat_map(|(v, &k)| v.iter().map(move |c| c * k))
            .collect();
        let values = resize_f32(&weighted, w, h, n, nw, nh, Filter::Bicubic)?;
        let coverage = resize_f32(&known, w, h, 1, nw, nh, Filter::Bicubic)?;

        let ps = self.cs.pixel_size();
        let mut pixels = vec![0u8; nw * nh * ps];
        let mut new_mask = vec![MASK_CLEAR; nw * nh];
        let mut unweighted = vec![0f32; n];
        for (i, (px, &c)) in pixels.chunks_exact_mut(ps).zip(&coverage).enumerate() {
            // Same as the resampled mask rounding to MASK_SET.
            if ((1.0 - c) * MASK_SET as f32).round() >= MASK_SET as f32 {
                new_mask[i] = MASK_SET;
                continue;
            }
            for (u, v) in unweighted.iter_mut().zip(&values[i * n..(i + 1) * n]) {
                *u = v / c;
            }
            self.cs.from_normalised_channels_value(px, &unweighted);
        }

        self.width = nw as i32;
        self.height = nh as i32;
        self.pixels = pixels;
        self.mask = new_mask;
        self.values = vec![0.0; nw * nh * n];
        self.refresh_values();
        Ok(())
    }

    /// Nearest-neighbour resize to `new_w × new_h`. Masked sources give
    /// zeroed, masked pixels.
    pub fn upscale(&mut self, new_w: i32, new_h: i32) {
        let ps = self.cs.pixel_size();
        let mut pixels = vec![0u8; (new_w * new_h) as usize * ps];
        let mut mask = vec![MASK_CLEAR; (new_w * new_h) as usize];
        for y in 0..new_h {
            let ys = y * self.height / new_h;
            for x in 0..new_w {
                let xs = x * self.width / new_w;
                let i = (y * new_w + x) as usize;
                if self.is_masked(xs, ys) {
                    mask[i] = MASK_SET;
                } else {
                    pixels[i * ps..(i + 1) * ps].copy_from_slice(self.pixel(xs, ys));
                }
            }
        }

        self.width = new_w;
        self.height = new_h;
        self.pixels = pixels;
        self.mask = mask;
        self.values = vec![0.0; (new_w * new_h) as usize * self.channel_count()];
        self.refresh_values();
    }

    /// Writes the pixels into `rect` of `dst`.
    ///
    /// With a selection, each pixel is blended with the existing one by the
    /// selection's coverage at that position.
    pub fn write_to(
        &self,
        dst: &mut PaintDevice,
        rect: Rect,
        selection: Option<&PaintDevice>,
    ) -> OpsResult<()> {
        if rect.width != self.width || rect.height != self.height {
            return Err(OpsError::SizeMismatch(format!(
                "image {}x{} vs target {}",
                self.width, self.height, rect
            )));
        }
        let Some(selection) = selection else {
            return dst.write_bytes(&self.pixels, rect);
        };

        let sel_cs = selection.color_space().clone();
        let cs = self.cs.clone();
        let mut blended = vec![0u8; cs.pixel_size()];
        for (i, (x, y)) in rect.iter_coords().enumerate() {
            let coverage = sel_cs.scale_to_u8(selection.pixel(x, y), 0);
            let src = &self.pixels[i * blended.len()..(i + 1) * blended.len()];
            let Some(old) = dst.pixel_mut(x, y) else {
                continue;
            };
            match coverage {
                0 => {}
                255 => old.copy_from_slice(src),
                c => {
                    let weights = [c as i16, 255 - c as i16];
                    cs.mix_colors_op().mix_colors(&[src, &*old], &weights, &mut blended);
                    old.copy_from_slice(&blended);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MaskedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskedImage")
            .field("color_space", &self.cs.name())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("masked", &self.count_masked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pigment_core::ColorSpaceRegistry;

    fn image(w: i32, h: i32, masked: Rect) -> MaskedImage {
        let registry = ColorSpaceRegistry::with_defaults();
        let bounds = Rect::new(0, 0, w, h);
        let pixels = bounds
            .iter_coords()
            .flat_map(|(x, y)| [(x * 10) as u8, (y * 10) as u8, 50, 255])
            .collect();
        let mask = bounds
            .iter_coords()
            .map(|(x, y)| if masked.contains(x, y) { MASK_SET } else { MASK_CLEAR })
            .collect();
        MaskedImage::from_parts(registry.rgb8().unwrap(), w, h, pixels, mask)
    }

    #[test]
    fn test_from_devices_binarizes() {
        let registry = ColorSpaceRegistry::with_defaults();
        let rect = Rect::new(0, 0, 3, 1);
        let img = PaintDevice::new(registry.rgb8().unwrap(), rect).unwrap();
        let mask = PaintDevice::from_bytes(registry.alpha8().unwrap(), rect, vec![0, 1, 200]).unwrap();
        let m = MaskedImage::from_devices(&img, &mask, rect).unwrap();
        assert!(!m.is_masked(0, 0));
        assert!(m.is_masked(1, 0));
        assert!(m.is_masked(2, 0));
        assert_eq!(m.count_masked(), 2);

        assert!(MaskedImage::from_devices(&img, &img, rect).is_err());
    }

    #[test]
    fn test_contains_masked() {
        let m = image(10, 10, Rect::new(5, 5, 1, 1));
        assert!(m.contains_masked(3, 3, 2));
        assert!(!m.contains_masked(2, 2, 2));
        assert!(m.contains_masked(9, 9, 4));
    }

    #[test]
    fn test_distance_normalised() {
        let m = image(4, 4, Rect::default());
        assert_eq!(m.distance(1, 1, &m, 1, 1), 0.0);
        let d = m.distance(0, 0, &m, 3, 0);
        let expected = (30.0f32 / 255.0).powi(2);
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_mix_single_copies() {
        let mut m = image(4, 4, Rect::default());
        let src = m.pixel(3, 3).to_vec();
        m.mix_colors(0, 0, &[&src], &[1.0], 1.0);
        assert_eq!(m.pixel(0, 0), &src[..]);
        assert_eq!(m.pixel_values(0, 0), m.pixel_values(3, 3));
    }

    #[test]
    fn test_downsample_keeps_solid_mask() {
        let mut m = image(16, 16, Rect::new(4, 4, 8, 8));
        m.downsample_2x().unwrap();
        assert_eq!((m.width(), m.height()), (8, 8));
        assert!(m.is_masked(4, 4));
        assert_eq!(m.pixel(4, 4), &[0, 0, 0, 0]);
        assert!(!m.is_masked(0, 0));
        assert!(!m.is_masked(7, 7));
        assert!(m.count_masked() < 16);
    }

    #[test]
    fn test_upscale_nearest() {
        let mut m = image(2, 2, Rect::new(1, 1, 1, 1));
        let top_left = m.pixel(0, 0).to_vec();
        m.upscale(4, 4);
        assert_eq!(m.pixel(1, 1), &top_left[..]);
        assert!(m.is_masked(3, 3));
        assert_eq!(m.pixel(3, 3), &[0, 0, 0, 0]);
        assert_eq!(m.count_masked(), 4);
    }

    #[test]
    fn test_write_with_selection() {
        let registry = ColorSpaceRegistry::with_defaults();
        let rect = Rect::new(0, 0, 3, 1);
        let m = MaskedImage::from_parts(registry.rgb8().unwrap(), 3, 1, vec![200; 12], vec![0; 3]);
        let mut dst = PaintDevice::from_bytes(registry.rgb8().unwrap(), rect, vec![100, 100, 100, 255].repeat(3)).unwrap();
        let sel = PaintDevice::from_bytes(registry.alpha8().unwrap(), rect, vec![0, 255, 128]).unwrap();
        m.write_to(&mut dst, rect, Some(&sel)).unwrap();
        assert_eq!(dst.pixel(0, 0), &[100, 100, 100, 255]);
        assert_eq!(dst.pixel(1, 0), &[200, 200, 200, 200]);
        let mixed = dst.pixel(2, 0);
        assert!(mixed[0] > 100 && mixed[0] < 200);
    }
}
