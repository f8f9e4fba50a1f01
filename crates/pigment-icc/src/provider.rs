//! [`ColorTransformProvider`] backed by Little CMS.
//!
//! The provider only answers RGB to RGB requests between profiles it knows
//! by name. Everything else returns `None`, and the registry falls back to
//! the built-in Lab/RGBA16 double hop.
//!
//! lcms2 handles are not shared across threads: the provider stores profile
//! sources and each [`ColorTransformation`] opens its profiles and builds
//! the lcms transform when it runs.

use crate::{IccError, IccResult, Profile, RgbTransform, StandardProfile};
use pigment_core::channel::{read_as_f64, write_from_f64};
use pigment_core::{
    ChannelValueType, ColorModelId, ColorSpace, ColorTransformProvider, ColorTransformation,
    RenderingIntent,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Pixels transformed per lcms call.
const CHUNK: usize = 1024;

#[derive(Debug, Clone)]
enum ProfileSource {
    Standard(StandardProfile),
    Icc(Arc<Vec<u8>>),
}

impl ProfileSource {
    fn open(&self) -> IccResult<Profile> {
        match self {
            Self::Standard(s) => s.to_profile(),
            Self::Icc(bytes) => Profile::from_icc(bytes),
        }
    }
}

/// Transform provider resolving color space profile names to ICC profiles.
///
/// # Example
///
/// ```rust
/// use pigment_core::ColorSpaceRegistry;
/// use pigment_icc::LcmsTransformProvider;
/// use std::sync::Arc;
///
/// let mut registry = ColorSpaceRegistry::with_defaults();
/// registry.set_transform_provider(Arc::new(LcmsTransformProvider::new()));
/// ```
#[derive(Debug, Clone)]
pub struct LcmsTransformProvider {
    profiles: HashMap<String, ProfileSource>,
}

impl LcmsTransformProvider {
    /// Creates a provider that knows every [`StandardProfile`].
    pub fn new() -> Self {
        let profiles = StandardProfile::ALL
            .into_iter()
            .map(|s| (s.name().to_string(), ProfileSource::Standard(s)))
            .collect();
        Self { profiles }
    }

    /// Registers raw ICC data under `name`. Only RGB profiles are accepted.
    pub fn register_icc(&mut self, name: impl Into<String>, data: Vec<u8>) -> IccResult<()> {
        let profile = Profile::from_icc(&data)?;
        if !profile.is_rgb() {
            return Err(IccError::NotRgb {
                signature: format!("{:?}", profile.signature()),
            });
        }
        let name = name.into();
        debug!(name = %name, description = %profile.description(), "registered ICC profile");
        self.profiles.insert(name, ProfileSource::Icc(Arc::new(data)));
        Ok(())
    }

    /// Returns `true` if a profile is known under `name`.
    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Names of all known profiles, sorted.
    pub fn profile_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for LcmsTransformProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorTransformProvider for LcmsTransformProvider {
    fn create_transform(
        &self,
        src: &dyn ColorSpace,
        dst: &dyn ColorSpace,
        intent: RenderingIntent,
    ) -> Option<Box<dyn ColorTransformation>> {
        if src.id().model != ColorModelId::Rgb || dst.id().model != ColorModelId::Rgb {
            return None;
        }
        let source = self.profiles.get(&src.id().profile)?.clone();
        let dest = self.profiles.get(&dst.id().profile)?.clone();
        trace!(src = %src.id(), dst = %dst.id(), ?intent, "creating lcms transform");
        Some(Box::new(LcmsColorTransformation {
            source,
            dest,
            intent,
            src_layout: RgbLayout::of(src),
            dst_layout: RgbLayout::of(dst),
        }))
    }
}

/// Byte offsets of an RGB layout, in R, G, B order.
#[derive(Debug, Clone, Copy)]
struct RgbLayout {
    value_type: ChannelValueType,
    pixel_size: usize,
    rgb: [usize; 3],
    alpha: Option<usize>,
}

impl RgbLayout {
    fn of(cs: &dyn ColorSpace) -> Self {
        let channels = cs.channels();
        let offset = |display: usize| channels[cs.display_position_to_channel_index(display)].position;
        Self {
            value_type: cs.channel_value_type(),
            pixel_size: cs.pixel_size(),
            rgb: [offset(0), offset(1), offset(2)],
            alpha: cs.alpha_pos().map(|i| channels[i].position),
        }
    }

    fn unit(&self) -> f64 {
        self.value_type.unit_value()
    }
}

struct LcmsColorTransformation {
    source: ProfileSource,
    dest: ProfileSource,
    intent: RenderingIntent,
    src_layout: RgbLayout,
    dst_layout: RgbLayout,
}

impl ColorTransformation for LcmsColorTransformation {
    fn transform(&self, src: &[u8], dst: &mut [u8], n_pixels: usize) -> pigment_core::Result<()> {
        let (sl, dl) = (self.src_layout, self.dst_layout);
        if src.len() < n_pixels * sl.pixel_size {
            return Err(pigment_core::Error::buffer_mismatch(
                n_pixels * sl.pixel_size,
                src.len(),
            ));
        }
        if dst.len() < n_pixels * dl.pixel_size {
            return Err(pigment_core::Error::buffer_mismatch(
                n_pixels * dl.pixel_size,
                dst.len(),
            ));
        }

        let transform = RgbTransform::new(&self.source.open()?, &self.dest.open()?, self.intent)?;
        let (src_unit, dst_unit) = (sl.unit(), dl.unit());
        let mut buf = vec![[0f32; 3]; CHUNK.min(n_pixels)];

        for start in (0..n_pixels).step_by(CHUNK) {
            let count = CHUNK.min(n_pixels - start);
            let rows = &mut buf[..count];
            for (i, rgb) in rows.iter_mut().enumerate() {
                let px = &src[(start + i) * sl.pixel_size..];
                for (c, v) in rgb.iter_mut().enumerate() {
                    *v = (read_as_f64(sl.value_type, px, sl.rgb[c]) / src_unit) as f32;
                }
            }
            transform.run(rows);
            for (i, rgb) in rows.iter().enumerate() {
                let s = &src[(start + i) * sl.pixel_size..];
                let d = &mut dst[(start + i) * dl.pixel_size..];
                for (c, v) in rgb.iter().enumerate() {
                    write_from_f64(dl.value_type, d, dl.rgb[c], *v as f64 * dst_unit);
                }
                if let Some(da) = dl.alpha {
                    let alpha = match sl.alpha {
                        Some(sa) => read_as_f64(sl.value_type, s, sa) / src_unit,
                        None => 1.0,
                    };
                    write_from_f64(dl.value_type, d, da, alpha * dst_unit);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pigment_core::{ColorDepthId, ColorSpaceRegistry};

    fn registry() -> ColorSpaceRegistry {
        let mut registry = ColorSpaceRegistry::with_defaults();
        registry.set_transform_provider(Arc::new(LcmsTransformProvider::new()));
        registry
    }

    #[test]
    fn test_srgb_to_linear_u8() {
        let registry = registry();
        let src = registry.rgb8().unwrap();
        let dst = registry
            .color_space(ColorModelId::Rgb, ColorDepthId::U8, Some("sRGB linear"))
            .unwrap();

        // BGRA storage
        let pixel = [128u8, 128, 128, 77];
        let mut out = [0u8; 4];
        registry
            .convert_pixels(&*src, &pixel, &*dst, &mut out, 1, RenderingIntent::RelativeColorimetric)
            .unwrap();
        for c in &out[..3] {
            assert!((*c as i32 - 55).abs() <= 2, "got {:?}", out);
        }
        assert_eq!(out[3], 77);
    }

    #[test]
    fn test_non_rgb_declined() {
        let registry = registry();
        let provider = LcmsTransformProvider::new();
        let rgb = registry.rgb8().unwrap();
        let lab = registry.lab16().unwrap();
        assert!(provider
            .create_transform(&*rgb, &*lab, RenderingIntent::Perceptual)
            .is_none());
    }

    #[test]
    fn test_unknown_profile_declined() {
        let registry = registry();
        let provider = LcmsTransformProvider::new();
        let rgb = registry.rgb8().unwrap();
        let other = registry
            .color_space(ColorModelId::Rgb, ColorDepthId::U8, Some("ProPhoto"))
            .unwrap();
        assert!(provider
            .create_transform(&*rgb, &*other, RenderingIntent::Perceptual)
            .is_none());
    }

    #[test]
    fn test_registered_icc_profile() {
        let mut provider = LcmsTransformProvider::new();
        let bytes = Profile::srgb().to_icc().unwrap();
        provider.register_icc("custom", bytes).unwrap();
        assert!(provider.has_profile("custom"));

        let registry = ColorSpaceRegistry::with_defaults();
        let src = registry
            .color_space(ColorModelId::Rgb, ColorDepthId::F32, None)
            .unwrap();
        let dst = registry
            .color_space(ColorModelId::Rgb, ColorDepthId::F32, Some("custom"))
            .unwrap();
        let t = provider
            .create_transform(&*src, &*dst, RenderingIntent::Perceptual)
            .unwrap();

        let mut pixel = Vec::new();
        for v in [0.2f32, 0.4, 0.6, 1.0] {
            pixel.extend_from_slice(&v.to_ne_bytes());
        }
        let mut out = vec![0u8; 16];
        t.transform(&pixel, &mut out, 1).unwrap();
        for (i, expected) in [0.2f32, 0.4, 0.6, 1.0].into_iter().enumerate() {
            let got = f32::from_ne_bytes([out[i * 4], out[i * 4 + 1], out[i * 4 + 2], out[i * 4 + 3]]);
            assert!((got - expected).abs() < 0.01, "channel {}: {}", i, got);
        }
    }

    #[test]
    fn test_register_rejects_garbage() {
        let mut provider = LcmsTransformProvider::new();
        assert!(provider.register_icc("bad", vec![1, 2, 3]).is_err());
        assert!(!provider.has_profile("bad"));
    }

    #[test]
    fn test_short_buffer() {
        let registry = registry();
        let provider = LcmsTransformProvider::new();
        let rgb = registry.rgb8().unwrap();
        let t = provider
            .create_transform(&*rgb, &*rgb, RenderingIntent::Perceptual)
            .unwrap();
        let mut out = [0u8; 4];
        assert!(t.transform(&[0u8; 4], &mut out, 2).is_err());
    }
}
