//! # pigment-core
//!
//! Type-erased pixel pipeline over statically typed channel layouts.
//!
//! This crate provides the foundation the rest of the workspace builds on:
//!
//! - [`ChannelValue`] - Native channel types (`u8`, `u16`, `f16`, `f32`, `f64`)
//! - [`ColorSpaceTraits`] - Zero-size pixel layout descriptors
//! - [`ColorModel`] - Meaning of the color channels (RGB, CMYK, Lab, XYZ, Gray, Alpha)
//! - [`ColorSpace`] - Runtime, object-safe color space with conversions
//! - [`MixColorsOp`], [`ConvolutionOp`] - Alpha-aware weighted mixing and convolution
//! - [`CompositeOp`] - Porter-Duff operators and separable blend modes
//! - [`ColorSpaceRegistry`] - Caller-owned, interned color space lookup
//! - [`Rect`] - Signed device rectangles
//!
//! ## Design
//!
//! Pixels are raw byte spans. Their layout is defined entirely by the color
//! space they are paired with:
//!
//! ```text
//! &[u8] ──(paired with)──► Arc<dyn ColorSpace>
//!                                 │
//!                      TraitColorSpace<T, M>
//!                        │               │
//!        T: ColorSpaceTraits        M: ColorModel
//!        (u8 × 4, alpha at 3)      (sRGB ↔ Lab math)
//! ```
//!
//! Generic code is monomorphized per layout; callers dispatch once per
//! operation through the `dyn ColorSpace` and never per pixel.
//!
//! ## Crate Structure
//!
//! ```text
//! pigment-core (this crate)
//!    ^
//!    +-- pigment-icc (lcms2 transform provider)
//!    +-- pigment-ops (convolution, wavelets, inpainting)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod channel_info;
pub mod colorspace;
pub mod composite;
pub mod convolution;
pub mod error;
pub mod mix;
pub mod model;
pub mod rect;
pub mod registry;
pub mod traits;

// Re-exports for convenience
pub use channel::{ChannelValue, ChannelValueType, ColorDepthId};
pub use channel_info::{ChannelFlags, ChannelInfo, ChannelKind};
pub use colorspace::{ColorSpace, ColorSpaceId, RenderingIntent, Rgba8, TraitColorSpace};
pub use composite::{CompositeOp, CompositeOpId, CompositeOpImpl};
pub use convolution::{ConvolutionOp, ConvolutionOpImpl};
pub use error::*;
pub use mix::{MixColorsOp, MixColorsOpImpl};
pub use model::{ColorModel, ColorModelId};
pub use rect::*;
pub use registry::{ColorSpaceRegistry, ColorTransformProvider, ColorTransformation};
pub use traits::{ColorSpaceTraits, MAX_CHANNELS};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use pigment_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::channel::{ChannelValue, ChannelValueType, ColorDepthId};
    pub use crate::channel_info::{ChannelFlags, ChannelInfo, ChannelKind};
    pub use crate::colorspace::{ColorSpace, ColorSpaceId, RenderingIntent, Rgba8};
    pub use crate::composite::{CompositeOp, CompositeOpId};
    pub use crate::convolution::ConvolutionOp;
    pub use crate::error::{Error, Result};
    pub use crate::mix::MixColorsOp;
    pub use crate::model::ColorModelId;
    pub use crate::rect::Rect;
    pub use crate::registry::{ColorSpaceRegistry, ColorTransformProvider, ColorTransformation};
}
