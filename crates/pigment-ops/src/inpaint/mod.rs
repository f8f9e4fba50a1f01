//! Content-aware fill with multiscale PatchMatch.
//!
//! [`patch_image`] fills the masked pixels of a paint device with patches
//! taken from the rest of the image:
//!
//! 1. The area around the mask's bounding box is copied into a
//!    [`MaskedImage`] and halved repeatedly into a pyramid until the image
//!    gets smaller than the patch radius or no masked pixel is left.
//! 2. At the coarsest level a [`NearestNeighborField`] links every target
//!    pixel to a random source position.
//! 3. At each level, expectation-maximization alternates PatchMatch
//!    minimization of the field with a vote where every pixel becomes the
//!    similarity-weighted mix of the source pixels its patches point at.
//!    The last iteration of a level produces the target of the next finer
//!    one.
//!
//! The result is written back over the whole working rectangle; pixels
//! outside it are never touched.
//!
//! # Parameters
//!
//! | Parameter  | Meaning                                                  |
//! |------------|----------------------------------------------------------|
//! | `radius`   | Half patch size; patches are `2·radius + 1` pixels wide   |
//! | `accuracy` | `0..=100`; grows the working rectangle by `1 + accuracy/25` mask sizes |
//! | `seed`     | Random search seed ([`InpaintConfig`] only, default 0)   |
//!
//! Runs with the same inputs and seed produce identical pixels.
//!
//! # Limits
//!
//! Filling happens while climbing from a coarser pyramid level to a finer
//! one. If the working rectangle is already no larger than `radius` in
//! either direction, the pyramid has a single level and the masked pixels
//! are written back unchanged. Use a smaller radius for tiny images.
//!
//! # Example
//!
//! ```rust
//! use pigment_core::{ColorSpaceRegistry, Rect};
//! use pigment_ops::device::PaintDevice;
//! use pigment_ops::inpaint::patch_image;
//! use pigment_ops::progress::NoProgress;
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let bounds = Rect::new(0, 0, 32, 32);
//! let mut image = PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, vec![90; 32 * 32 * 4]).unwrap();
//! let mut mask = PaintDevice::new(registry.alpha8().unwrap(), bounds).unwrap();
//! mask.fill(Rect::new(14, 14, 4, 4), &[255]);
//!
//! let rect = patch_image(&mut image, &mask, 2, 25, None, &NoProgress).unwrap();
//! assert!(rect.contains_rect(&Rect::new(14, 14, 4, 4)));
//! ```

mod masked_image;
mod nnf;

pub use masked_image::{MASK_CLEAR, MASK_SET, MaskedImage};
pub use nnf::{MAX_DIST, NearestNeighborField, NnLink, similarity_curve};

use crate::config::InpaintConfig;
use crate::device::PaintDevice;
use crate::progress::{ProgressSink, percent};
use crate::{OpsError, OpsResult};
use pigment_core::Rect;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, trace};

/// Extra context around the patch window below which the vote is skipped
/// and the source pixel copied.
const FAST_PATH_MARGIN: i32 = 4;

/// Multiscale PatchMatch solver.
pub struct Inpaint<'a> {
    radius: i32,
    rng: StdRng,
    progress: &'a dyn ProgressSink,
}

impl<'a> Inpaint<'a> {
    /// Solver with half patch size `radius` and a seeded random search.
    pub fn new(radius: i32, seed: u64, progress: &'a dyn ProgressSink) -> OpsResult<Self> {
        if radius < 1 {
            return Err(OpsError::InvalidParameter(format!(
                "inpaint radius must be >= 1, got {}",
                radius
            )));
        }
        Ok(Self {
            radius,
            rng: StdRng::seed_from_u64(seed),
            progress,
        })
    }

    /// Half patch size.
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Fills the masked pixels of `initial`.
    ///
    /// Returns `None` when interrupted. A single-level pyramid returns
    /// `initial` with its mask cleared and its pixels unchanged.
    pub fn patch(&mut self, initial: MaskedImage) -> OpsResult<Option<MaskedImage>> {
        let mut pyramid = vec![initial];
        while let Some(last) = pyramid.last() {
            if last.width() <= self.radius || last.height() <= self.radius || last.count_masked() == 0 {
                break;
            }
            let mut next = last.clone();
            next.downsample_2x()?;
            pyramid.push(next);
        }
        let max_level = pyramid.len();
        debug!(levels = max_level, radius = self.radius, "inpaint pyramid built");

        let Some(coarsest) = pyramid.last() else {
            return Ok(None);
        };
        let mut target = coarsest.clone();
        target.clear_mask();

        let mut nnf: Option<NearestNeighborField> = None;
        for level in (1..max_level).rev() {
            if self.progress.is_interrupted() {
                return Ok(None);
            }
            let source = &pyramid[level];
            let mut field = NearestNeighborField::new(&target, self.radius);
            match &nnf {
                None => field.randomize(&target, source, &mut self.rng),
                Some(coarse) => field.initialize_from(coarse, &target, source, &mut self.rng),
            }
            trace!(level, width = target.width(), height = target.height(), "inpaint level");

            let Some(next) = self.expectation_maximization(target, &mut field, level, &pyramid) else {
                return Ok(None);
            };
            target = next;
            nnf = Some(field);
            self.progress.set_progress(percent(max_level - level, max_level - 1));
        }
        Ok(Some(target))
    }

    /// EM iterations of one level. The result has the size of the next finer
    /// level.
    fn expectation_maximization(
        &mut self,
        mut target: MaskedImage,
        nnf: &mut NearestNeighborField,
        level: usize,
        pyramid: &[MaskedImage],
    ) -> Option<MaskedImage> {
        let iter_em = (2 * level).min(4);
        let iter_nnf = (1 + level).min(5) as u32;
        let source = &pyramid[level];

        for em_loop in 1..=iter_em {
            if self.progress.is_interrupted() {
                return None;
            }

            // Known regions map onto themselves.
            for y in 0..nnf.height() {
                for x in 0..nnf.width() {
                    if !source.contains_masked(x, y, self.radius) {
                        nnf.set_link(x, y, NnLink { x, y, distance: 0 });
                    }
                }
            }
            nnf.minimize(&target, source, iter_nnf, &mut self.rng);

            let last = em_loop == iter_em;
            let new_source = if last { &pyramid[level - 1] } else { source };
            let mut new_target = target.clone();
            if last {
                new_target.upscale(new_source.width(), new_source.height());
            }
            expectation_step(nnf, new_source, &mut new_target, last);
            target = new_target;
        }
        Some(target)
    }
}

impl std::fmt::Debug for Inpaint<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inpaint")
            .field("radius", &self.radius)
            .finish_non_exhaustive()
    }
}

/// Rebuilds `target` from the source pixels its field votes for.
///
/// With `upscaled`, the field belongs to the level below and each link is
/// scaled by two.
fn expectation_step(
    nnf: &NearestNeighborField,
    source: &MaskedImage,
    target: &mut MaskedImage,
    upscaled: bool,
) {
    let r = if upscaled { nnf.patch_size() * 2 } else { nnf.patch_size() };
    let similarity = similarity_curve();
    let mut pixels: Vec<&[u8]> = Vec::new();
    let mut weights: Vec<f32> = Vec::new();

    for x in 0..target.width() {
        for y in 0..target.height() {
            if !source.contains_masked(x, y, r + FAST_PATH_MARGIN) {
                target.set_pixel(x, y, source.pixel(x, y));
                continue;
            }

            pixels.clear();
            weights.clear();
            let mut wsum = 0f32;
            for dx in -r..=r {
                for dy in -r..=r {
                    let (xpt, ypt) = (x + dx, y + dy);
                    if xpt < 0 || ypt < 0 {
                        continue;
                    }
                    let (xst, yst, w) = if upscaled {
                        if xpt / 2 >= nnf.width() || ypt / 2 >= nnf.height() {
                            continue;
                        }
                        let link = nnf.link(xpt / 2, ypt / 2);
                        (2 * link.x + xpt % 2, 2 * link.y + ypt % 2, similarity[link.distance as usize])
                    } else {
                        if xpt >= nnf.width() || ypt >= nnf.height() {
                            continue;
                        }
                        let link = nnf.link(xpt, ypt);
                        (link.x, link.y, similarity[link.distance as usize])
                    };

                    let (xs, ys) = (xst - dx, yst - dy);
                    if xs < 0 || ys < 0 || xs >= source.width() || ys >= source.height() {
                        continue;
                    }
                    if source.is_masked(xs, ys) {
                        continue;
                    }
                    pixels.push(source.pixel(xs, ys));
                    weights.push(w);
                    wsum += w;
                }
            }

            if wsum < 1.0 {
                continue;
            }
            target.mix_colors(x, y, &pixels, &weights, wsum);
        }
    }
}

/// Fills the masked area of `image` and returns the rectangle written.
///
/// The working rectangle is the mask's bounding box grown on every side by
/// `1 + accuracy / 25` times its size, clipped to the painted bounds of
/// `image`. Any non-zero mask value marks a pixel to fill. With a selection,
/// the result is blended into `image` by the selection coverage.
///
/// An empty mask or an interrupted run writes nothing and returns an empty
/// rectangle. A working rectangle no larger than `radius` leaves the hole
/// as it was.
pub fn patch_image(
    image: &mut PaintDevice,
    mask: &PaintDevice,
    radius: i32,
    accuracy: i32,
    selection: Option<&PaintDevice>,
    progress: &dyn ProgressSink,
) -> OpsResult<Rect> {
    let config = InpaintConfig {
        radius,
        accuracy,
        ..InpaintConfig::default()
    };
    patch_image_with_config(image, mask, &config, selection, progress)
}

/// [`patch_image`] with parameters and seed from an [`InpaintConfig`].
pub fn patch_image_with_config(
    image: &mut PaintDevice,
    mask: &PaintDevice,
    config: &InpaintConfig,
    selection: Option<&PaintDevice>,
    progress: &dyn ProgressSink,
) -> OpsResult<Rect> {
    config.validate()?;
    let mask_rect = mask.non_default_pixel_area();
    if mask_rect.is_empty() {
        return Ok(Rect::default());
    }

    let scale = 1.0 + config.accuracy as f32 / 25.0;
    let dx = (mask_rect.width as f32 * scale) as i32;
    let dy = (mask_rect.height as f32 * scale) as i32;
    let Some(rect) = mask_rect
        .adjusted(dx, dy, dx, dy)
        .intersect(&image.exact_bounds())
    else {
        return Ok(Rect::default());
    };
    trace!(mask = %mask_rect, rect = %rect, radius = config.radius, "patch_image");

    let initial = MaskedImage::from_devices(image, mask, rect)?;
    let mut inpaint = Inpaint::new(config.radius, config.seed, progress)?;
    let Some(result) = inpaint.patch(initial)? else {
        debug!("inpaint interrupted");
        return Ok(Rect::default());
    };
    result.write_to(image, rect, selection)?;
    Ok(rect)
}
