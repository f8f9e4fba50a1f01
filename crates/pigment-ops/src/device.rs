//! Paint devices and line cursors.
//!
//! A [`PaintDevice`] is a rectangular pixel buffer paired with the color
//! space that gives its bytes meaning. Pixels outside the allocated extent
//! read as the device's default pixel (transparent black unless changed).
//!
//! Convolution and inpainting never index devices randomly in their hot
//! loops; they walk them with cursors:
//!
//! - [`HLineCursor`] - row-major read cursor
//! - [`VLineCursor`] - column-major read cursor
//! - [`HLineCursorMut`] - row-major write cursor
//!
//! Read cursors may run past the device extent. What they return there is
//! decided by the [`EdgePolicy`].
//!
//! # Example
//!
//! ```rust
//! use pigment_core::{ColorSpaceRegistry, Rect};
//! use pigment_ops::device::{EdgePolicy, PaintDevice};
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let mut dev = PaintDevice::new(registry.rgb8().unwrap(), Rect::new(0, 0, 4, 4)).unwrap();
//! dev.set_pixel(1, 1, &[10, 20, 30, 255]);
//!
//! assert_eq!(dev.exact_bounds(), Rect::new(1, 1, 1, 1));
//! let mut cursor = dev.hline_cursor(Rect::new(0, 1, 3, 1), EdgePolicy::Standard);
//! cursor.next_pixel();
//! assert_eq!(cursor.pixel(), &[10, 20, 30, 255]);
//! ```

use crate::{OpsError, OpsResult};
use pigment_core::{ColorSpace, Rect};
use std::fmt;
use std::sync::Arc;

/// What read cursors return outside the device extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePolicy {
    /// The device's default pixel.
    #[default]
    Standard,
    /// The nearest pixel inside the extent.
    Repeat,
}

/// Pixel buffer paired with its color space.
#[derive(Clone)]
pub struct PaintDevice {
    cs: Arc<dyn ColorSpace>,
    bounds: Rect,
    data: Vec<u8>,
    default_pixel: Vec<u8>,
}

impl PaintDevice {
    /// Allocates a device covering `bounds`, filled with zero bytes.
    pub fn new(cs: Arc<dyn ColorSpace>, bounds: Rect) -> OpsResult<Self> {
        if bounds.width < 0 || bounds.height < 0 {
            return Err(OpsError::InvalidDimensions(format!(
                "negative device size {}",
                bounds
            )));
        }
        let ps = cs.pixel_size();
        let len = bounds.area() as usize * ps;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| pigment_core::Error::allocation_failed(len, e.to_string()))?;
        data.resize(len, 0);
        Ok(Self {
            default_pixel: vec![0; ps],
            cs,
            bounds,
            data,
        })
    }

    /// Wraps existing pixel bytes laid out row-major over `bounds`.
    pub fn from_bytes(cs: Arc<dyn ColorSpace>, bounds: Rect, data: Vec<u8>) -> OpsResult<Self> {
        if bounds.width < 0 || bounds.height < 0 {
            return Err(OpsError::InvalidDimensions(format!(
                "negative device size {}",
                bounds
            )));
        }
        let ps = cs.pixel_size();
        let expected = bounds.area() as usize * ps;
        if data.len() != expected {
            return Err(OpsError::SizeMismatch(format!(
                "device {} needs {} bytes, got {}",
                bounds,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            default_pixel: vec![0; ps],
            cs,
            bounds,
            data,
        })
    }

    /// Same extent and default pixel, all pixels reset to the default.
    pub fn empty_like(&self) -> OpsResult<Self> {
        let mut dev = Self::new(self.cs.clone(), self.bounds)?;
        dev.set_default_pixel(&self.default_pixel)?;
        dev.fill(self.bounds, &self.default_pixel);
        Ok(dev)
    }

    /// Replaces the default pixel. Existing pixels are unchanged.
    pub fn set_default_pixel(&mut self, pixel: &[u8]) -> OpsResult<()> {
        if pixel.len() != self.pixel_size() {
            return Err(OpsError::SizeMismatch(format!(
                "default pixel has {} bytes, color space needs {}",
                pixel.len(),
                self.pixel_size()
            )));
        }
        self.default_pixel.copy_from_slice(pixel);
        Ok(())
    }

    /// The default pixel.
    pub fn default_pixel(&self) -> &[u8] {
        &self.default_pixel
    }

    /// The color space of the pixels.
    pub fn color_space(&self) -> &Arc<dyn ColorSpace> {
        &self.cs
    }

    /// Bytes per pixel.
    #[inline]
    pub fn pixel_size(&self) -> usize {
        self.cs.pixel_size()
    }

    /// Allocated extent.
    #[inline]
    pub fn extent(&self) -> Rect {
        self.bounds
    }

    /// Raw row-major pixel bytes of the extent.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw pixel bytes of the extent.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        let ps = self.pixel_size();
        ((y - self.bounds.y) as usize * self.bounds.width as usize + (x - self.bounds.x) as usize)
            * ps
    }

    /// Pixel at `(x, y)`, or the default pixel outside the extent.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> &[u8] {
        if self.bounds.contains(x, y) {
            let o = self.offset(x, y);
            &self.data[o..o + self.pixel_size()]
        } else {
            &self.default_pixel
        }
    }

    /// Pixel at `(x, y)` read under an edge policy.
    #[inline]
    pub fn pixel_with_edge(&self, x: i32, y: i32, edge: EdgePolicy) -> &[u8] {
        match edge {
            EdgePolicy::Repeat if !self.bounds.is_empty() => {
                let (cx, cy) = self.bounds.clamp_point(x, y);
                self.pixel(cx, cy)
            }
            _ => self.pixel(x, y),
        }
    }

    /// Mutable pixel at `(x, y)`, `None` outside the extent.
    #[inline]
    pub fn pixel_mut(&mut self, x: i32, y: i32) -> Option<&mut [u8]> {
        if self.bounds.contains(x, y) {
            let o = self.offset(x, y);
            let ps = self.pixel_size();
            Some(&mut self.data[o..o + ps])
        } else {
            None
        }
    }

    /// Overwrites the pixel at `(x, y)`; ignored outside the extent.
    pub fn set_pixel(&mut self, x: i32, y: i32, pixel: &[u8]) {
        debug_assert_eq!(pixel.len(), self.pixel_size());
        if let Some(dst) = self.pixel_mut(x, y) {
            dst.copy_from_slice(pixel);
        }
    }

    /// Sets every pixel of `rect` inside the extent to `pixel`.
    pub fn fill(&mut self, rect: Rect, pixel: &[u8]) {
        debug_assert_eq!(pixel.len(), self.pixel_size());
        let Some(area) = rect.intersect(&self.bounds) else {
            return;
        };
        for (x, y) in area.iter_coords() {
            let o = self.offset(x, y);
            self.data[o..o + pixel.len()].copy_from_slice(pixel);
        }
    }

    /// Copies `rect` into a new row-major buffer. Pixels outside the extent
    /// read as the default pixel.
    pub fn read_bytes(&self, rect: Rect) -> Vec<u8> {
        let ps = self.pixel_size();
        let mut out = Vec::with_capacity(rect.area() as usize * ps);
        for (x, y) in rect.iter_coords() {
            out.extend_from_slice(self.pixel(x, y));
        }
        out
    }

    /// Writes a row-major buffer covering `rect`. Pixels falling outside the
    /// extent are dropped.
    pub fn write_bytes(&mut self, data: &[u8], rect: Rect) -> OpsResult<()> {
        let ps = self.pixel_size();
        let expected = rect.area() as usize * ps;
        if data.len() < expected {
            return Err(pigment_core::Error::buffer_mismatch(expected, data.len()).into());
        }
        for (i, (x, y)) in rect.iter_coords().enumerate() {
            if let Some(dst) = self.pixel_mut(x, y) {
                dst.copy_from_slice(&data[i * ps..(i + 1) * ps]);
            }
        }
        Ok(())
    }

    /// Bounding box of the pixels that differ from the default pixel.
    pub fn non_default_pixel_area(&self) -> Rect {
        let ps = self.pixel_size();
        let w = self.bounds.width.max(0) as usize;
        let (mut x0, mut y0, mut x1, mut y1) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
        if w > 0 {
            for (row, line) in self.data.chunks_exact(w * ps).enumerate() {
                for (col, px) in line.chunks_exact(ps).enumerate() {
                    if px != self.default_pixel.as_slice() {
                        let (x, y) = (col as i32, row as i32);
                        x0 = x0.min(x);
                        x1 = x1.max(x);
                        y0 = y0.min(y);
                        y1 = y1.max(y);
                    }
                }
            }
        }
        if x0 > x1 {
            return Rect::default();
        }
        Rect::new(
            self.bounds.x + x0,
            self.bounds.y + y0,
            x1 - x0 + 1,
            y1 - y0 + 1,
        )
    }

    /// Bounds of the painted content.
    ///
    /// Storage is one flat extent, so this is the same precise area as
    /// [`non_default_pixel_area`](Self::non_default_pixel_area).
    pub fn exact_bounds(&self) -> Rect {
        self.non_default_pixel_area()
    }

    /// Read cursor walking `rect` row by row.
    pub fn hline_cursor(&self, rect: Rect, edge: EdgePolicy) -> HLineCursor<'_> {
        HLineCursor {
            device: self,
            rect,
            x: rect.x,
            y: rect.y,
            edge,
        }
    }

    /// Read cursor walking `rect` column by column.
    pub fn vline_cursor(&self, rect: Rect, edge: EdgePolicy) -> VLineCursor<'_> {
        VLineCursor {
            device: self,
            rect,
            x: rect.x,
            y: rect.y,
            edge,
        }
    }

    /// Write cursor walking `rect` row by row. `rect` must lie inside the
    /// extent.
    pub fn hline_cursor_mut(&mut self, rect: Rect) -> OpsResult<HLineCursorMut<'_>> {
        if !rect.is_empty() && !self.bounds.contains_rect(&rect) {
            return Err(OpsError::InvalidDimensions(format!(
                "write area {} outside device extent {}",
                rect, self.bounds
            )));
        }
        Ok(HLineCursorMut {
            device: self,
            rect,
            x: rect.x,
            y: rect.y,
        })
    }
}

impl fmt::Debug for PaintDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintDevice")
            .field("color_space", &self.cs.name())
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Cursors
// ============================================================================

/// Row-major read cursor.
#[derive(Debug)]
pub struct HLineCursor<'a> {
    device: &'a PaintDevice,
    rect: Rect,
    x: i32,
    y: i32,
    edge: EdgePolicy,
}

impl<'a> HLineCursor<'a> {
    /// Current pixel.
    #[inline]
    pub fn pixel(&self) -> &'a [u8] {
        self.device.pixel_with_edge(self.x, self.y, self.edge)
    }

    /// Current column.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Current row.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Moves one pixel right. Returns `false` at the end of the row, where
    /// the cursor stays.
    #[inline]
    pub fn next_pixel(&mut self) -> bool {
        if self.x + 1 < self.rect.right() {
            self.x += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the first pixel of the next row.
    #[inline]
    pub fn next_row(&mut self) {
        self.x = self.rect.x;
        self.y += 1;
    }

    /// Returns `true` once the cursor moved past the last row.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.rect.is_empty() || self.y >= self.rect.bottom()
    }
}

/// Column-major read cursor.
#[derive(Debug)]
pub struct VLineCursor<'a> {
    device: &'a PaintDevice,
    rect: Rect,
    x: i32,
    y: i32,
    edge: EdgePolicy,
}

impl<'a> VLineCursor<'a> {
    /// Current pixel.
    #[inline]
    pub fn pixel(&self) -> &'a [u8] {
        self.device.pixel_with_edge(self.x, self.y, self.edge)
    }

    /// Current column.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Current row.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Moves one pixel down. Returns `false` at the end of the column.
    #[inline]
    pub fn next_pixel(&mut self) -> bool {
        if self.y + 1 < self.rect.bottom() {
            self.y += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the top pixel of the next column.
    #[inline]
    pub fn next_column(&mut self) {
        self.y = self.rect.y;
        self.x += 1;
    }

    /// Returns `true` once the cursor moved past the last column.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.rect.is_empty() || self.x >= self.rect.right()
    }
}

/// Row-major write cursor.
#[derive(Debug)]
pub struct HLineCursorMut<'a> {
    device: &'a mut PaintDevice,
    rect: Rect,
    x: i32,
    y: i32,
}

impl HLineCursorMut<'_> {
    /// Current pixel.
    #[inline]
    pub fn pixel_mut(&mut self) -> &mut [u8] {
        let o = self.device.offset(self.x, self.y);
        let ps = self.device.pixel_size();
        &mut self.device.data[o..o + ps]
    }

    /// Current column.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Current row.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Moves one pixel right. Returns `false` at the end of the row.
    #[inline]
    pub fn next_pixel(&mut self) -> bool {
        if self.x + 1 < self.rect.right() {
            self.x += 1;
            true
        } else {
            false
        }
    }

    /// Moves to the first pixel of the next row.
    #[inline]
    pub fn next_row(&mut self) {
        self.x = self.rect.x;
        self.y += 1;
    }

    /// Returns `true` once the cursor moved past the last row.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.rect.is_empty() || self.y >= self.rect.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pigment_core::ColorSpaceRegistry;

    fn gray_device(w: i32, h: i32) -> PaintDevice {
        let registry = ColorSpaceRegistry::with_defaults();
        let cs = registry.alpha8().unwrap();
        let data = (0..w * h).map(|i| i as u8).collect();
        PaintDevice::from_bytes(cs, Rect::new(0, 0, w, h), data).unwrap()
    }

    #[test]
    fn test_pixel_outside_is_default() {
        let mut dev = gray_device(3, 3);
        assert_eq!(dev.pixel(1, 1), &[4]);
        assert_eq!(dev.pixel(-1, 0), &[0]);
        dev.set_default_pixel(&[9]).unwrap();
        assert_eq!(dev.pixel(5, 5), &[9]);
        assert!(dev.set_default_pixel(&[1, 2]).is_err());
    }

    #[test]
    fn test_edge_repeat() {
        let dev = gray_device(3, 3);
        assert_eq!(dev.pixel_with_edge(-2, -2, EdgePolicy::Repeat), &[0]);
        assert_eq!(dev.pixel_with_edge(10, 1, EdgePolicy::Repeat), &[5]);
        assert_eq!(dev.pixel_with_edge(10, 1, EdgePolicy::Standard), &[0]);
    }

    #[test]
    fn test_read_write_bytes() {
        let mut dev = gray_device(4, 4);
        let bytes = dev.read_bytes(Rect::new(-1, 0, 3, 1));
        assert_eq!(bytes, vec![0, 0, 1]);

        dev.write_bytes(&[100, 101, 102, 103], Rect::new(3, 3, 2, 2)).unwrap();
        assert_eq!(dev.pixel(3, 3), &[100]);
        assert!(dev.write_bytes(&[1], Rect::new(0, 0, 2, 2)).is_err());
    }

    #[test]
    fn test_non_default_area() {
        let registry = ColorSpaceRegistry::with_defaults();
        let mut dev = PaintDevice::new(registry.alpha8().unwrap(), Rect::new(10, 10, 8, 8)).unwrap();
        assert!(dev.exact_bounds().is_empty());
        dev.set_pixel(12, 13, &[255]);
        dev.set_pixel(15, 11, &[1]);
        assert_eq!(dev.non_default_pixel_area(), Rect::new(12, 11, 4, 3));
    }

    #[test]
    fn test_hline_cursor() {
        let dev = gray_device(3, 2);
        let mut cursor = dev.hline_cursor(Rect::new(0, 0, 3, 2), EdgePolicy::Standard);
        let mut seen = Vec::new();
        while !cursor.is_done() {
            loop {
                seen.push(cursor.pixel()[0]);
                if !cursor.next_pixel() {
                    break;
                }
            }
            cursor.next_row();
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_vline_cursor() {
        let dev = gray_device(2, 3);
        let mut cursor = dev.vline_cursor(Rect::new(0, 0, 2, 3), EdgePolicy::Standard);
        let mut seen = Vec::new();
        while !cursor.is_done() {
            loop {
                seen.push(cursor.pixel()[0]);
                if !cursor.next_pixel() {
                    break;
                }
            }
            cursor.next_column();
        }
        assert_eq!(seen, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_hline_cursor_mut() {
        let mut dev = gray_device(2, 2);
        {
            let mut cursor = dev.hline_cursor_mut(Rect::new(0, 1, 2, 1)).unwrap();
            while !cursor.is_done() {
                loop {
                    cursor.pixel_mut()[0] = 77;
                    if !cursor.next_pixel() {
                        break;
                    }
                }
                cursor.next_row();
            }
        }
        assert_eq!(dev.data(), &[0, 1, 77, 77]);
        assert!(dev.hline_cursor_mut(Rect::new(1, 1, 2, 2)).is_err());
    }

    #[test]
    fn test_empty_like() {
        let dev = gray_device(2, 2);
        let empty = dev.empty_like().unwrap();
        assert_eq!(empty.extent(), dev.extent());
        assert!(empty.data().iter().all(|&b| b == 0));
    }
}
