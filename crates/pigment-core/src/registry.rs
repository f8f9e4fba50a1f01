//! Color space registry and transform provider seam.
//!
//! [`ColorSpaceRegistry`] is an explicit, caller-owned object: create one at
//! startup, share it by reference or `Arc`, drop it at shutdown. It holds
//!
//! - factories keyed by (model, depth), fixed once the registry is built;
//! - interned color spaces keyed by the full [`ColorSpaceId`], created
//!   lazily on first lookup and shared as `Arc<dyn ColorSpace>` afterwards.
//!
//! Lookups take a read lock; only the first lookup of a new id takes the
//! write lock, so the cache is cheap for the read-mostly access pattern of
//! a paint pipeline.
//!
//! # Transform providers
//!
//! Profile-accurate conversion lives outside this crate. A
//! [`ColorTransformProvider`] can be installed to produce a
//! [`ColorTransformation`] for a pair of spaces; when it declines or fails,
//! [`ColorSpaceRegistry::convert_pixels`] falls back to
//! [`ColorSpace::convert_pixels_to`].
//!
//! # Usage
//!
//! ```rust
//! use pigment_core::registry::ColorSpaceRegistry;
//! use pigment_core::{ColorDepthId, ColorModelId};
//! use std::sync::Arc;
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let a = registry.color_space(ColorModelId::Rgb, ColorDepthId::U8, None).unwrap();
//! let b = registry.rgb8().unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

use crate::channel::ColorDepthId;
use crate::colorspace::{ColorSpace, ColorSpaceId, RenderingIntent, TraitColorSpace};
use crate::error::{Error, Result};
use crate::model::{
    AlphaModel, CmykModel, ColorModel, ColorModelId, GrayModel, GrayNoAlphaModel, LabModel,
    RgbModel, XyzModel,
};
use crate::traits::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Builds a color space for a profile name.
pub type ColorSpaceFactory = fn(profile: &str) -> Arc<dyn ColorSpace>;

/// A prepared pixel conversion between two fixed color spaces.
pub trait ColorTransformation: Send {
    /// Converts `n_pixels` pixels from `src` into `dst`.
    fn transform(&self, src: &[u8], dst: &mut [u8], n_pixels: usize) -> Result<()>;
}

/// Opaque source of profile-accurate transforms.
pub trait ColorTransformProvider: Send + Sync {
    /// Returns a transform for the pair, or `None` if this provider cannot
    /// handle it.
    fn create_transform(
        &self,
        src: &dyn ColorSpace,
        dst: &dyn ColorSpace,
        intent: RenderingIntent,
    ) -> Option<Box<dyn ColorTransformation>>;
}

/// Profile used when a lookup does not name one.
pub fn default_profile(model: ColorModelId) -> &'static str {
    match model {
        ColorModelId::Rgb => "sRGB",
        ColorModelId::Lab => "Lab D65",
        ColorModelId::Xyz => "XYZ D65",
        ColorModelId::Gray | ColorModelId::GrayNoAlpha => "Gray sRGB",
        ColorModelId::Cmyk | ColorModelId::Alpha => "default",
    }
}

fn make<T: ColorSpaceTraits, M: ColorModel>(profile: &str) -> Arc<dyn ColorSpace> {
    Arc::new(TraitColorSpace::<T, M>::new(profile))
}

// ============================================================================
// Registry
// ============================================================================

/// Caller-owned registry of color spaces.
pub struct ColorSpaceRegistry {
    factories: HashMap<(ColorModelId, ColorDepthId), ColorSpaceFactory>,
    cache: RwLock<HashMap<ColorSpaceId, Arc<dyn ColorSpace>>>,
    provider: Option<Arc<dyn ColorTransformProvider>>,
}

impl ColorSpaceRegistry {
    /// Creates a registry with no factories.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
            provider: None,
        }
    }

    /// Creates a registry with every built-in layout registered.
    pub fn with_defaults() -> Self {
        use ColorDepthId::*;
        use ColorModelId::*;

        let mut r = Self::new();
        r.register_factory(Rgb, U8, make::<BgrU8, RgbModel>);
        r.register_factory(Rgb, U16, make::<BgrU16, RgbModel>);
        r.register_factory(Rgb, F16, make::<RgbF16, RgbModel>);
        r.register_factory(Rgb, F32, make::<RgbF32, RgbModel>);
        r.register_factory(Rgb, F64, make::<RgbF64, RgbModel>);
        r.register_factory(Cmyk, U8, make::<CmykU8, CmykModel>);
        r.register_factory(Cmyk, U16, make::<CmykU16, CmykModel>);
        r.register_factory(Cmyk, F32, make::<CmykF32, CmykModel>);
        r.register_factory(Lab, U8, make::<LabU8, LabModel>);
        r.register_factory(Lab, U16, make::<LabU16, LabModel>);
        r.register_factory(Lab, F32, make::<LabF32, LabModel>);
        r.register_factory(Xyz, U16, make::<XyzU16, XyzModel>);
        r.register_factory(Xyz, F32, make::<XyzF32, XyzModel>);
        r.register_factory(Gray, U8, make::<GrayAU8, GrayModel>);
        r.register_factory(Gray, U16, make::<GrayAU16, GrayModel>);
        r.register_factory(Gray, F32, make::<GrayAF32, GrayModel>);
        r.register_factory(GrayNoAlpha, U8, make::<GrayU8, GrayNoAlphaModel>);
        r.register_factory(GrayNoAlpha, U16, make::<GrayU16, GrayNoAlphaModel>);
        r.register_factory(Alpha, U8, make::<AlphaU8, AlphaModel>);
        r.register_factory(Alpha, U16, make::<AlphaU16, AlphaModel>);
        r.register_factory(Alpha, F16, make::<AlphaF16, AlphaModel>);
        r.register_factory(Alpha, F32, make::<AlphaF32, AlphaModel>);
        r
    }

    /// Registers (or replaces) the factory for a model/depth pair.
    pub fn register_factory(
        &mut self,
        model: ColorModelId,
        depth: ColorDepthId,
        factory: ColorSpaceFactory,
    ) {
        self.factories.insert((model, depth), factory);
    }

    /// Installs the transform provider consulted by
    /// [`convert_pixels`](Self::convert_pixels).
    pub fn set_transform_provider(&mut self, provider: Arc<dyn ColorTransformProvider>) {
        self.provider = Some(provider);
    }

    /// Looks up (creating on first use) the color space for a triple.
    ///
    /// `None` as profile selects [`default_profile`] for the model.
    pub fn color_space(
        &self,
        model: ColorModelId,
        depth: ColorDepthId,
        profile: Option<&str>,
    ) -> Result<Arc<dyn ColorSpace>> {
        let profile = profile.unwrap_or_else(|| default_profile(model));
        let id = ColorSpaceId::new(model, depth, profile);

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cs) = cache.get(&id) {
                return Ok(Arc::clone(cs));
            }
        }

        let factory = self
            .factories
            .get(&(model, depth))
            .ok_or_else(|| Error::unknown_color_space(model.id(), depth.id(), profile))?;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let cs = cache.entry(id).or_insert_with_key(|id| {
            debug!(id = %id, "interning color space");
            factory(profile)
        });
        Ok(Arc::clone(cs))
    }

    /// Looks up a color space from string ids, e.g. `("RGBA", "U16", None)`.
    pub fn color_space_by_name(
        &self,
        model: &str,
        depth: &str,
        profile: Option<&str>,
    ) -> Result<Arc<dyn ColorSpace>> {
        match (ColorModelId::from_id(model), ColorDepthId::from_id(depth)) {
            (Some(m), Some(d)) => self.color_space(m, d, profile),
            _ => Err(Error::unknown_color_space(
                model,
                depth,
                profile.unwrap_or("default"),
            )),
        }
    }

    /// 8-bit sRGB.
    pub fn rgb8(&self) -> Result<Arc<dyn ColorSpace>> {
        self.color_space(ColorModelId::Rgb, ColorDepthId::U8, None)
    }

    /// 16-bit sRGB, the RGBA16 interchange space.
    pub fn rgb16(&self) -> Result<Arc<dyn ColorSpace>> {
        self.color_space(ColorModelId::Rgb, ColorDepthId::U16, None)
    }

    /// 16-bit Lab, the Lab16 interchange space.
    pub fn lab16(&self) -> Result<Arc<dyn ColorSpace>> {
        self.color_space(ColorModelId::Lab, ColorDepthId::U16, None)
    }

    /// 8-bit alpha, used for masks and selections.
    pub fn alpha8(&self) -> Result<Arc<dyn ColorSpace>> {
        self.color_space(ColorModelId::Alpha, ColorDepthId::U8, None)
    }

    /// Models with at least one registered depth, sorted.
    pub fn model_ids(&self) -> Vec<ColorModelId> {
        let mut ids: Vec<_> = self.factories.keys().map(|(m, _)| *m).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Depths registered for a model, shallowest first.
    pub fn depth_ids(&self, model: ColorModelId) -> Vec<ColorDepthId> {
        let mut ids: Vec<_> = self
            .factories
            .keys()
            .filter(|(m, _)| *m == model)
            .map(|(_, d)| *d)
            .collect();
        ids.sort();
        ids
    }

    /// Number of interned color spaces.
    pub fn interned_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Converts pixels between two spaces, preferring the installed
    /// transform provider and falling back to the built-in conversion.
    pub fn convert_pixels(
        &self,
        src_cs: &dyn ColorSpace,
        src: &[u8],
        dst_cs: &dyn ColorSpace,
        dst: &mut [u8],
        n_pixels: usize,
        intent: RenderingIntent,
    ) -> Result<()> {
        if src_cs.id() != dst_cs.id() {
            if let Some(transform) = self
                .provider
                .as_ref()
                .and_then(|p| p.create_transform(src_cs, dst_cs, intent))
            {
                match transform.transform(src, dst, n_pixels) {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!(
                        src = %src_cs.id(),
                        dst = %dst_cs.id(),
                        error = %e,
                        "transform provider failed, using built-in conversion"
                    ),
                }
            }
        }
        src_cs.convert_pixels_to(src, dst, dst_cs, n_pixels, intent)
    }
}

impl Default for ColorSpaceRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ColorSpaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorSpaceRegistry")
            .field("factories", &self.factories.len())
            .field("interned", &self.interned_count())
            .field("provider", &self.provider.is_some())
            .finish()
    }
}
