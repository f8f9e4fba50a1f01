//! Float RGB lcms transform.

use crate::{IccError, IccResult, Profile, lcms_intent};
use lcms2::{Flags, PixelFormat};
use pigment_core::RenderingIntent;

/// Converts normalised RGB triples from one profile to another.
///
/// Built with `NO_CACHE` so that each pixel is computed independently of the
/// one before it.
///
/// ```rust
/// use pigment_core::RenderingIntent;
/// use pigment_icc::{Profile, RgbTransform, StandardProfile};
///
/// let linear = StandardProfile::LinearSrgb.to_profile().unwrap();
/// let decode = RgbTransform::new(&Profile::srgb(), &linear, RenderingIntent::RelativeColorimetric).unwrap();
/// let mut px = [[0.5f32; 3]];
/// decode.run(&mut px);
/// assert!(px[0][1] < 0.25);
/// ```
pub struct RgbTransform {
    inner: lcms2::Transform<[f32; 3], [f32; 3]>,
}

impl RgbTransform {
    /// Links `from` to `to` under `intent`.
    pub fn new(from: &Profile, to: &Profile, intent: RenderingIntent) -> IccResult<Self> {
        lcms2::Transform::new_flags(
            &from.inner,
            PixelFormat::RGB_FLT,
            &to.inner,
            PixelFormat::RGB_FLT,
            lcms_intent(intent),
            Flags::NO_CACHE,
        )
        .map(|inner| Self { inner })
        .map_err(|e| IccError::Transform(e.to_string()))
    }

    /// Rewrites `rgb` in place.
    pub fn run(&self, rgb: &mut [[f32; 3]]) {
        self.inner.transform_in_place(rgb);
    }
}

impl std::fmt::Debug for RgbTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RgbTransform")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StandardProfile;

    #[test]
    fn test_same_profile_is_identity() {
        let p = Profile::srgb();
        let t = RgbTransform::new(&p, &p, RenderingIntent::Perceptual).unwrap();
        let mut rgb = [[0.1f32, 0.6, 0.9], [1.0, 0.0, 0.5]];
        let before = rgb;
        t.run(&mut rgb);
        for (a, b) in rgb.iter().flatten().zip(before.iter().flatten()) {
            assert!((a - b).abs() < 0.01, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_decode_srgb_mid_grey() {
        let linear = StandardProfile::LinearSrgb.to_profile().unwrap();
        let t = RgbTransform::new(&Profile::srgb(), &linear, RenderingIntent::RelativeColorimetric).unwrap();
        let mut rgb = [[0.5f32; 3]];
        t.run(&mut rgb);
        assert!((rgb[0][0] - 0.214).abs() < 0.01, "got {}", rgb[0][0]);
    }
}
