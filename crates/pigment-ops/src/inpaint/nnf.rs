//! Nearest-neighbour field between two masked images of one pyramid level.

use super::masked_image::MaskedImage;
use rand::Rng;
use std::sync::OnceLock;

/// Patch distance of a correspondence with no usable overlap.
pub const MAX_DIST: i32 = 65535;

/// Random draws per pixel before accepting a [`MAX_DIST`] link.
const MAX_RETRY: u32 = 20;

/// Best known source position of one target pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NnLink {
    /// Source column.
    pub x: i32,
    /// Source row.
    pub y: i32,
    /// Patch distance, `0..=MAX_DIST`.
    pub distance: i32,
}

/// Blend weight of a patch at each distance, decreasing from ~1 to ~0.
///
/// The curve is `0.5 - 0.5 * tanh(coef * (t - 0.10))` with `t` the distance
/// scaled to `[0, 1)`, steep enough that `t = 0` maps to 0.999.
pub fn similarity_curve() -> &'static [f32] {
    static CURVE: OnceLock<Vec<f32>> = OnceLock::new();
    CURVE.get_or_init(|| {
        let base = 0.10f64;
        let s_zero = 0.999f64;
        let coef = ((s_zero - 0.5) * 2.0).atanh() / base;
        let len = MAX_DIST as usize + 1;
        (0..len)
            .map(|i| {
                let t = i as f64 / len as f64;
                (0.5 - 0.5 * (coef * (t - base)).tanh()) as f32
            })
            .collect()
    })
}

/// One link per input pixel pointing into the output image.
///
/// The images themselves are passed to every call so a field can be reused
/// while its input is replaced between EM iterations.
#[derive(Debug, Clone)]
pub struct NearestNeighborField {
    patch_size: i32,
    width: i32,
    height: i32,
    field: Vec<NnLink>,
}

impl NearestNeighborField {
    /// Field covering `input` with half patch size `patch_size`.
    pub fn new(input: &MaskedImage, patch_size: i32) -> Self {
        let (width, height) = (input.width(), input.height());
        Self {
            patch_size,
            width,
            height,
            field: vec![NnLink::default(); (width * height).max(0) as usize],
        }
    }

    /// Half patch size.
    #[inline]
    pub fn patch_size(&self) -> i32 {
        self.patch_size
    }

    /// Field width, the input width.
    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Field height, the input height.
    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Link of input pixel `(x, y)`.
    #[inline]
    pub fn link(&self, x: i32, y: i32) -> NnLink {
        self.field[(y * self.width + x) as usize]
    }

    /// Overwrites the link of input pixel `(x, y)`.
    #[inline]
    pub fn set_link(&mut self, x: i32, y: i32, link: NnLink) {
        self.field[(y * self.width + x) as usize] = link;
    }

    fn random_link<R: Rng>(
        &self,
        input: &MaskedImage,
        output: &MaskedImage,
        x: i32,
        y: i32,
        rng: &mut R,
    ) -> NnLink {
        let xp = rng.gen_range(0..output.width());
        let yp = rng.gen_range(0..output.height());
        NnLink {
            x: xp,
            y: yp,
            distance: self.distance(input, x, y, output, xp, yp),
        }
    }

    fn retry_unmatched<R: Rng>(
        &mut self,
        input: &MaskedImage,
        output: &MaskedImage,
        x: i32,
        y: i32,
        rng: &mut R,
    ) {
        let mut retries = 0;
        while self.link(x, y).distance == MAX_DIST && retries < MAX_RETRY {
            let link = self.random_link(input, output, x, y, rng);
            self.set_link(x, y, link);
            retries += 1;
        }
    }

    /// Points every pixel at a random output position.
    pub fn randomize<R: Rng>(&mut self, input: &MaskedImage, output: &MaskedImage, rng: &mut R) {
        for y in 0..self.height {
            for x in 0..self.width {
                let link = self.random_link(input, output, x, y, rng);
                self.set_link(x, y, link);
                self.retry_unmatched(input, output, x, y, rng);
            }
        }
    }

    /// Seeds the field from the field of the coarser level, scaling its
    /// positions up.
    pub fn initialize_from<R: Rng>(
        &mut self,
        coarse: &NearestNeighborField,
        input: &MaskedImage,
        output: &MaskedImage,
        rng: &mut R,
    ) {
        let xscale = self.width as f32 / coarse.width as f32;
        let yscale = self.height as f32 / coarse.height as f32;
        for y in 0..self.height {
            let ylow = ((y as f32 / yscale) as i32).min(coarse.height - 1);
            for x in 0..self.width {
                let xlow = ((x as f32 / xscale) as i32).min(coarse.width - 1);
                let old = coarse.link(xlow, ylow);
                let xp = ((old.x as f32 * xscale) as i32).min(output.width() - 1);
                let yp = ((old.y as f32 * yscale) as i32).min(output.height() - 1);
                let link = NnLink {
                    x: xp,
                    y: yp,
                    distance: self.distance(input, x, y, output, xp, yp),
                };
                self.set_link(x, y, link);
                self.retry_unmatched(input, output, x, y, rng);
            }
        }
    }

    /// Runs `passes` rounds of propagation and random search, alternating
    /// scan direction. Links at distance 0 are left alone.
    pub fn minimize<R: Rng>(
        &mut self,
        input: &MaskedImage,
        output: &MaskedImage,
        passes: u32,
        rng: &mut R,
    ) {
        for _ in 0..passes {
            for y in 0..self.height {
                for x in 0..self.width {
                    if self.link(x, y).distance > 0 {
                        self.minimize_link(input, output, (x, y), 1, rng);
                    }
                }
            }
            for y in (0..self.height).rev() {
                for x in (0..self.width).rev() {
                    if self.link(x, y).distance > 0 {
                        self.minimize_link(input, output, (x, y), -1, rng);
                    }
                }
            }
        }
    }

    fn try_candidate(
        &mut self,
        input: &MaskedImage,
        output: &MaskedImage,
        (x, y): (i32, i32),
        (xp, yp): (i32, i32),
    ) {
        if xp < 0 || yp < 0 || xp >= output.width() || yp >= output.height() {
            return;
        }
        let distance = self.distance(input, x, y, output, xp, yp);
        if distance < self.link(x, y).distance {
            self.set_link(x, y, NnLink { x: xp, y: yp, distance });
        }
    }

    fn minimize_link<R: Rng>(
        &mut self,
        input: &MaskedImage,
        output: &MaskedImage,
        (x, y): (i32, i32),
        dir: i32,
        rng: &mut R,
    ) {
        // Propagation from the horizontal neighbour.
        if x - dir >= 0 && x - dir < self.width {
            let n = self.link(x - dir, y);
            self.try_candidate(input, output, (x, y), (n.x + dir, n.y));
        }
        // Propagation from the vertical neighbour.
        if y - dir >= 0 && y - dir < self.height {
            let n = self.link(x, y - dir);
            self.try_candidate(input, output, (x, y), (n.x, n.y + dir));
        }

        // Random search in a halving window around the current best.
        let mut wi = output.width().max(output.height());
        let best = self.link(x, y);
        while wi > 0 {
            let xp = (best.x + rng.gen_range(0..2 * wi) - wi).clamp(0, output.width() - 1);
            let yp = (best.y + rng.gen_range(0..2 * wi) - wi).clamp(0, output.height() - 1);
            self.try_candidate(input, output, (x, y), (xp, yp));
            wi /= 2;
        }
    }

    /// Patch distance between input `(x, y)` and output `(xp, yp)`, scaled
    /// to `0..=MAX_DIST`.
    ///
    /// Taps falling outside either image or on a masked pixel count as the
    /// largest per-pixel difference.
    pub fn distance(
        &self,
        input: &MaskedImage,
        x: i32,
        y: i32,
        output: &MaskedImage,
        xp: i32,
        yp: i32,
    ) -> i32 {
        let ssdmax = input.channel_count() as f32;
        let mut dist = 0f32;
        let mut wsum = 0f32;
        let s = self.patch_size;
        for dy in -s..=s {
            for dx in -s..=s {
                wsum += ssdmax;
                let (xks, yks) = (x + dx, y + dy);
                let (xkt, ykt) = (xp + dx, yp + dy);
                let outside = xks < 0
                    || yks < 0
                    || xks >= input.width()
                    || yks >= input.height()
                    || xkt < 0
                    || ykt < 0
                    || xkt >= output.width()
                    || ykt >= output.height();
                if outside || input.is_masked(xks, yks) || output.is_masked(xkt, ykt) {
                    dist += ssdmax;
                    continue;
                }
                dist += input.distance(xks, yks, output, xkt, ykt).min(ssdmax);
            }
        }
        ((MAX_DIST as f32 * dist / wsum) as i32).clamp(0, MAX_DIST)
    }
}
