//! # pigment-ops
//!
//! Higher-order pixel algorithms over pigment color spaces.
//!
//! Everything here works on a [`PaintDevice`](device::PaintDevice), a
//! rectangle of raw pixels paired with an `Arc<dyn ColorSpace>`, and reaches
//! the pixels only through the color space contract. Any registered layout
//! works without specialisation in this crate.
//!
//! # Modules
//!
//! - [`device`] - Paint devices and line cursors
//! - [`kernel`] - Convolution kernels
//! - [`convolution`] - Spatial and FFT convolution painters
//! - [`wavelet`] - Math toolbox with the fast wavelet transform
//! - [`inpaint`] - PatchMatch content-aware fill
//! - [`resize`] - Separable resampling used by the inpainting pyramid
//! - [`config`] - Property bags and typed configurations
//! - [`progress`] - Progress reporting and cancellation
//!
//! # Example
//!
//! ```rust
//! use pigment_core::{ColorSpaceRegistry, Rect};
//! use pigment_ops::prelude::*;
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let bounds = Rect::new(0, 0, 32, 32);
//! let src = PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, vec![128; 32 * 32 * 4]).unwrap();
//! let mut dst = src.empty_like().unwrap();
//!
//! ConvolutionPainter::new()
//!     .apply_matrix(&ConvolutionKernel::box_blur(5), &src, bounds, &mut dst, (0, 0))
//!     .unwrap();
//! assert_eq!(dst.pixel(16, 16), &[128, 128, 128, 128]);
//! ```
//!
//! # Features
//!
//! - `parallel` (default) - Transforms FFT planes on the rayon pool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod config;
pub mod convolution;
pub mod device;
pub mod inpaint;
pub mod kernel;
pub mod progress;
pub mod resize;
pub mod wavelet;

pub use error::{OpsError, OpsResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{ConvolutionConfig, InpaintConfig, PropertyBag};
    pub use crate::convolution::{ConvolutionEngine, ConvolutionPainter};
    pub use crate::device::{EdgePolicy, PaintDevice};
    pub use crate::error::{OpsError, OpsResult};
    pub use crate::inpaint::{patch_image, patch_image_with_config};
    pub use crate::kernel::ConvolutionKernel;
    pub use crate::progress::{NoProgress, ProgressCounter, ProgressSink};
    pub use crate::wavelet::{BasicMathToolbox, FloatRepresentation, MathToolbox, MathToolboxRegistry};
}
