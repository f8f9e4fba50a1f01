//! # pigment-icc
//!
//! Profile-accurate RGB conversions for pigment color spaces, built on
//! Little CMS 2.
//!
//! A pigment color space carries a profile *name* in its id. This crate
//! maps those names to ICC profiles and plugs into
//! [`pigment_core::ColorSpaceRegistry`] as a
//! [`ColorTransformProvider`](pigment_core::ColorTransformProvider):
//!
//! ```text
//! registry.convert_pixels(src, dst)
//!     │
//!     ├─ LcmsTransformProvider knows both profiles?  ──► lcms2 RGB_FLT transform
//!     │
//!     └─ otherwise ──► built-in Lab16 / RGBA16 double hop
//! ```
//!
//! # Example
//!
//! ```rust
//! use pigment_core::{ColorDepthId, ColorModelId, ColorSpaceRegistry, RenderingIntent};
//! use pigment_icc::LcmsTransformProvider;
//! use std::sync::Arc;
//!
//! let mut registry = ColorSpaceRegistry::with_defaults();
//! registry.set_transform_provider(Arc::new(LcmsTransformProvider::new()));
//!
//! let srgb = registry.rgb8().unwrap();
//! let p3 = registry
//!     .color_space(ColorModelId::Rgb, ColorDepthId::U8, Some("Display P3"))
//!     .unwrap();
//!
//! let src = [0u8, 0, 255, 255];
//! let mut dst = [0u8; 4];
//! registry
//!     .convert_pixels(&*srgb, &src, &*p3, &mut dst, 1, RenderingIntent::Perceptual)
//!     .unwrap();
//! assert_eq!(dst[3], 255);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod profile;
mod provider;
mod standard;
mod transform;

pub use error::{IccError, IccResult};
pub use profile::Profile;
pub use provider::LcmsTransformProvider;
pub use standard::StandardProfile;
pub use transform::RgbTransform;

use pigment_core::RenderingIntent;

fn lcms_intent(intent: RenderingIntent) -> lcms2::Intent {
    match intent {
        RenderingIntent::Perceptual => lcms2::Intent::Perceptual,
        RenderingIntent::RelativeColorimetric => lcms2::Intent::RelativeColorimetric,
        RenderingIntent::Saturation => lcms2::Intent::Saturation,
        RenderingIntent::AbsoluteColorimetric => lcms2::Intent::AbsoluteColorimetric,
    }
}
