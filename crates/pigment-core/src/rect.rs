//! Integer pixel rectangles.
//!
//! Devices, kernels and masks all address pixels with signed coordinates,
//! since a filter margin can reach past the device origin. `x`/`y` is the
//! top-left pixel; the rectangle spans `width` columns and `height` rows.
//!
//! ```rust
//! use pigment_core::Rect;
//!
//! let margin = Rect::new(0, 0, 4, 4).adjusted(1, 1, 1, 1);
//! assert_eq!(margin, Rect::new(-1, -1, 6, 6));
//! assert_eq!(margin.intersect(&Rect::new(0, 0, 100, 100)), Some(Rect::new(0, 0, 5, 5)));
//! ```

/// Axis-aligned pixel rectangle. Non-positive width or height means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Leftmost column.
    pub x: i32,
    /// Topmost row.
    pub y: i32,
    /// Number of columns.
    pub width: i32,
    /// Number of rows.
    pub height: i32,
}

impl Rect {
    /// Rectangle at `(x, y)` spanning `width` by `height` pixels.
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// One past the last column.
    #[inline]
    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    /// One past the last row.
    #[inline]
    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// `true` when no pixel is covered.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Pixel count.
    #[inline]
    pub const fn area(&self) -> u64 {
        match self.is_empty() {
            true => 0,
            false => self.width as u64 * self.height as u64,
        }
    }

    /// Whether pixel `(x, y)` lies inside.
    #[inline]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        self.x <= x && x < self.right() && self.y <= y && y < self.bottom()
    }

    /// Whether every pixel of `inner` lies inside.
    #[inline]
    pub const fn contains_rect(&self, inner: &Rect) -> bool {
        self.x <= inner.x
            && self.y <= inner.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    /// Overlap of the two rectangles, `None` if they only touch or are apart.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let (left, top) = (self.x.max(other.x), self.y.max(other.y));
        let width = self.right().min(other.right()) - left;
        let height = self.bottom().min(other.bottom()) - top;
        (width > 0 && height > 0).then(|| Rect::new(left, top, width, height))
    }

    /// Grows the left, top, right and bottom edges by the given amounts.
    /// Negative amounts shrink.
    ///
    /// ```rust
    /// use pigment_core::Rect;
    ///
    /// assert_eq!(Rect::new(10, 10, 20, 20).adjusted(2, 3, 4, 5), Rect::new(8, 7, 26, 28));
    /// ```
    #[inline]
    pub const fn adjusted(&self, left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect {
            x: self.x - left,
            y: self.y - top,
            width: self.width + left + right,
            height: self.height + top + bottom,
        }
    }

    /// Nearest pixel inside a non-empty rectangle.
    #[inline]
    pub fn clamp_point(&self, x: i32, y: i32) -> (i32, i32) {
        debug_assert!(!self.is_empty());
        (x.clamp(self.x, self.right() - 1), y.clamp(self.y, self.bottom() - 1))
    }

    /// Every covered pixel, row by row.
    pub fn iter_coords(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.y..self.bottom()).flat_map(move |y| (self.x..self.right()).map(move |x| (x, y)))
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}
