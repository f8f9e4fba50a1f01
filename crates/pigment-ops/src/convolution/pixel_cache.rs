//! Sliding-window pixel cache.
//!
//! Holds the `width × height` pixels under a kernel. Moving the window one
//! pixel right or one row down only replaces one column or one row: the
//! cache rotates its logical origin and the caller refills the freed slots.

/// Fixed-capacity ring buffer of pixels, addressed by logical column and row.
#[derive(Debug, Clone)]
pub struct PixelCache {
    width: usize,
    height: usize,
    pixel_size: usize,
    data: Vec<u8>,
    col0: usize,
    row0: usize,
}

impl PixelCache {
    /// Creates a zeroed cache.
    pub fn new(width: usize, height: usize, pixel_size: usize) -> Self {
        debug_assert!(width > 0 && height > 0 && pixel_size > 0);
        Self {
            width,
            height,
            pixel_size,
            data: vec![0; width * height * pixel_size],
            col0: 0,
            row0: 0,
        }
    }

    /// Window width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Window height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn physical(&self, col: usize, row: usize) -> usize {
        debug_assert!(col < self.width && row < self.height);
        let c = (col + self.col0) % self.width;
        let r = (row + self.row0) % self.height;
        (r * self.width + c) * self.pixel_size
    }

    /// Pixel at logical `(col, row)`.
    #[inline]
    pub fn pixel(&self, col: usize, row: usize) -> &[u8] {
        let o = self.physical(col, row);
        &self.data[o..o + self.pixel_size]
    }

    /// Overwrites the pixel at logical `(col, row)`.
    #[inline]
    pub fn set(&mut self, col: usize, row: usize, pixel: &[u8]) {
        let o = self.physical(col, row);
        self.data[o..o + self.pixel_size].copy_from_slice(pixel);
    }

    /// Drops the leftmost column. The rightmost logical column then holds
    /// stale pixels to be refilled.
    #[inline]
    pub fn rotate_left(&mut self) {
        self.col0 = (self.col0 + 1) % self.width;
    }

    /// Drops the top row. The bottom logical row then holds stale pixels to
    /// be refilled.
    #[inline]
    pub fn rotate_up(&mut self) {
        self.row0 = (self.row0 + 1) % self.height;
    }

    /// Copies contents and rotation state from a cache of the same shape.
    pub fn copy_from(&mut self, other: &PixelCache) {
        debug_assert_eq!(self.data.len(), other.data.len());
        self.data.copy_from_slice(&other.data);
        self.col0 = other.col0;
        self.row0 = other.row0;
    }

    /// Writes the window row-major in logical order into `out`.
    pub fn pack_into(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= self.data.len());
        let ps = self.pixel_size;
        let row_bytes = self.width * ps;
        let split = self.col0 * ps;
        for row in 0..self.height {
            let r = (row + self.row0) % self.height;
            let src = &self.data[r * row_bytes..(r + 1) * row_bytes];
            let dst = &mut out[row * row_bytes..(row + 1) * row_bytes];
            // logical column 0 starts at the physical column col0
            dst[..row_bytes - split].copy_from_slice(&src[split..]);
            dst[row_bytes - split..].copy_from_slice(&src[..split]);
        }
    }
}
