//! Kernel convolution over paint devices.
//!
//! [`ConvolutionPainter::apply_matrix`] convolves a region of a source
//! device into a destination device of the same color space. Two workers
//! do the numeric work:
//!
//! | Worker                       | Cost per pixel   | Transparency handling               |
//! |------------------------------|------------------|-------------------------------------|
//! | [`SpatialConvolutionWorker`] | `O(kh)` reads    | color space `ConvolutionOp` (exact) |
//! | [`FftConvolutionWorker`]     | `O(log n)`       | coverage-masked planes              |
//!
//! With [`ConvolutionEngine::Auto`] the FFT worker is used once either
//! kernel dimension exceeds [`FFT_THRESHOLD`]. Both workers treat samples
//! with zero opacity the same way, so they agree to within one code value.
//!
//! # Borders
//!
//! Reads outside the source extent follow the [`EdgePolicy`]:
//!
//! - `Standard` returns the device's default pixel (usually transparent)
//! - `Repeat` clamps to the nearest edge pixel
//!
//! # Channels, factor and offset
//!
//! [`ConvolutionPainter::with_channel_flags`] restricts the written
//! channels; the others keep their destination values. The kernel's
//! factor and offset apply unless a [`ConvolutionConfig`] overrides them.
//!
//! # Examples
//!
//! Blurring a flat device keeps it flat:
//!
//! ```rust
//! use pigment_core::{ColorSpaceRegistry, Rect};
//! use pigment_ops::convolution::ConvolutionPainter;
//! use pigment_ops::device::PaintDevice;
//! use pigment_ops::kernel::ConvolutionKernel;
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let bounds = Rect::new(0, 0, 16, 16);
//! let src = PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, vec![200; 16 * 16 * 4]).unwrap();
//! let mut dst = src.clone();
//!
//! ConvolutionPainter::new()
//!     .apply_matrix(&ConvolutionKernel::box_blur(3), &src, bounds, &mut dst, (0, 0))
//!     .unwrap();
//! assert_eq!(dst.pixel(8, 8), &[200, 200, 200, 200]);
//! ```
//!
//! Locking alpha while blurring the colors:
//!
//! ```rust
//! use pigment_core::{ChannelFlags, ColorSpaceRegistry, Rect};
//! use pigment_ops::convolution::ConvolutionPainter;
//! use pigment_ops::device::{EdgePolicy, PaintDevice};
//! use pigment_ops::kernel::ConvolutionKernel;
//!
//! let registry = ColorSpaceRegistry::with_defaults();
//! let rgb8 = registry.rgb8().unwrap();
//! let bounds = Rect::new(0, 0, 16, 16);
//! let src = PaintDevice::from_bytes(rgb8.clone(), bounds, vec![200; 16 * 16 * 4]).unwrap();
//! let mut dst = PaintDevice::new(rgb8, bounds).unwrap();
//! dst.fill(bounds, &[0, 0, 0, 77]);
//!
//! ConvolutionPainter::new()
//!     .with_edge_policy(EdgePolicy::Repeat)
//!     .with_channel_flags(ChannelFlags::color_only(4, Some(3)))
//!     .apply_matrix(&ConvolutionKernel::box_blur(7), &src, bounds, &mut dst, (0, 0))
//!     .unwrap();
//! assert_eq!(dst.pixel(0, 0), &[200, 200, 200, 77]);
//! ```

mod fft;
mod pixel_cache;
mod spatial;

pub use fft::{FftConvolutionWorker, optimal_fft_size};
pub use pixel_cache::PixelCache;
pub use spatial::SpatialConvolutionWorker;

use crate::config::ConvolutionConfig;
use crate::device::{EdgePolicy, PaintDevice};
use crate::kernel::ConvolutionKernel;
use crate::progress::{NoProgress, ProgressSink};
use crate::{OpsError, OpsResult};
use pigment_core::{ChannelFlags, Rect};
use tracing::{debug, trace};

/// Largest kernel dimension [`ConvolutionEngine::Auto`] keeps spatial.
pub const FFT_THRESHOLD: usize = 5;

/// Worker selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvolutionEngine {
    /// Spatial for small kernels, FFT above [`FFT_THRESHOLD`].
    #[default]
    Auto,
    /// Always the sliding-window worker.
    Spatial,
    /// Always the FFT worker.
    Fft,
}

/// One convolution request, as handed to a worker.
#[derive(Clone, Copy)]
pub struct ConvolutionJob<'a> {
    /// Kernel weights.
    pub kernel: &'a ConvolutionKernel,
    /// Source device.
    pub src: &'a PaintDevice,
    /// Source region; its pixels map one to one onto the destination.
    pub src_rect: Rect,
    /// Divisor, never 0.
    pub factor: f64,
    /// Bias in native channel units.
    pub offset: f64,
    /// Channels to write; empty means all.
    pub flags: ChannelFlags,
    /// Reads outside the source extent.
    pub edge: EdgePolicy,
    /// Progress and cancellation.
    pub progress: &'a dyn ProgressSink,
}

/// Numeric back end of the painter.
pub trait ConvolutionWorker {
    /// Convolves `job.src_rect` into `dst` starting at `dst_pos`.
    ///
    /// Returns `Ok` on interruption; rows written so far stay.
    fn execute(
        &self,
        job: &ConvolutionJob<'_>,
        dst: &mut PaintDevice,
        dst_pos: (i32, i32),
    ) -> OpsResult<()>;
}

/// Applies kernels to paint devices.
#[derive(Clone, Copy)]
pub struct ConvolutionPainter<'a> {
    engine: ConvolutionEngine,
    edge: EdgePolicy,
    flags: ChannelFlags,
    factor: Option<f64>,
    offset: Option<f64>,
    progress: &'a dyn ProgressSink,
}

impl Default for ConvolutionPainter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ConvolutionPainter<'a> {
    /// Painter with automatic worker selection, standard edges and all
    /// channels.
    pub fn new() -> Self {
        Self {
            engine: ConvolutionEngine::Auto,
            edge: EdgePolicy::Standard,
            flags: ChannelFlags::ALL,
            factor: None,
            offset: None,
            progress: &NoProgress,
        }
    }

    /// Painter configured from a property bag view.
    pub fn from_config(config: &ConvolutionConfig) -> Self {
        Self {
            engine: config.engine,
            edge: config.edge,
            factor: config.factor,
            offset: config.offset,
            ..Self::new()
        }
    }

    /// Sets the worker selection.
    pub fn with_engine(mut self, engine: ConvolutionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Sets the border handling.
    pub fn with_edge_policy(mut self, edge: EdgePolicy) -> Self {
        self.edge = edge;
        self
    }

    /// Restricts the written channels.
    pub fn with_channel_flags(mut self, flags: ChannelFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Reports progress to `progress` and polls it for cancellation.
    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Worker `apply_matrix` would use for `kernel`.
    pub fn select_engine(&self, kernel: &ConvolutionKernel) -> ConvolutionEngine {
        match self.engine {
            ConvolutionEngine::Auto
                if kernel.width() > FFT_THRESHOLD || kernel.height() > FFT_THRESHOLD =>
            {
                ConvolutionEngine::Fft
            }
            ConvolutionEngine::Auto => ConvolutionEngine::Spatial,
            other => other,
        }
    }

    /// Convolves `src_rect` of `src` with `kernel` into `dst` at `dst_pos`.
    ///
    /// Both devices must share a color space and the destination area must
    /// lie inside `dst`'s extent. Channels outside the flags keep their
    /// destination values.
    pub fn apply_matrix(
        &self,
        kernel: &ConvolutionKernel,
        src: &PaintDevice,
        src_rect: Rect,
        dst: &mut PaintDevice,
        dst_pos: (i32, i32),
    ) -> OpsResult<()> {
        if src.color_space().id() != dst.color_space().id() {
            return Err(OpsError::ColorSpaceMismatch {
                expected: src.color_space().name(),
                actual: dst.color_space().name(),
            });
        }
        if src_rect.is_empty() {
            return Ok(());
        }
        let dst_rect = Rect::new(dst_pos.0, dst_pos.1, src_rect.width, src_rect.height);
        if !dst.extent().contains_rect(&dst_rect) {
            return Err(OpsError::InvalidDimensions(format!(
                "destination area {} outside device extent {}",
                dst_rect,
                dst.extent()
            )));
        }

        let factor = match self.factor {
            Some(f) if f != 0.0 => f,
            Some(_) => 1.0,
            None => kernel.effective_factor(),
        };
        let job = ConvolutionJob {
            kernel,
            src,
            src_rect,
            factor,
            offset: self.offset.unwrap_or(kernel.offset()),
            flags: self.flags,
            edge: self.edge,
            progress: self.progress,
        };
        trace!(rect = %src_rect, kernel_w = kernel.width(), kernel_h = kernel.height(), "apply_matrix");

        let engine = self.select_engine(kernel);
        debug!(?engine, kernel_w = kernel.width(), kernel_h = kernel.height(), "convolution worker selected");
        match engine {
            ConvolutionEngine::Fft => FftConvolutionWorker.execute(&job, dst, dst_pos),
            _ => SpatialConvolutionWorker.execute(&job, dst, dst_pos),
        }
    }
}

impl std::fmt::Debug for ConvolutionPainter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvolutionPainter")
            .field("engine", &self.engine)
            .field("edge", &self.edge)
            .field("flags", &self.flags)
            .field("factor", &self.factor)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
