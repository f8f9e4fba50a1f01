//! Sliding-window spatial convolution.
//!
//! The worker keeps the pixels under the kernel in two [`PixelCache`]s:
//!
//! ```text
//! row cache   window at the start of the current row
//!             next row: rotate_up + load one kernel row (HLineCursor)
//! work cache  copy of the row cache, slid right along the row
//!             next pixel: rotate_left + load one kernel column (VLineCursor)
//! ```
//!
//! Each output pixel costs one kernel column of reads instead of the whole
//! window. The color space's [`ConvolutionOp`](pigment_core::ConvolutionOp)
//! combines the window, so transparency handling matches it exactly.

use super::pixel_cache::PixelCache;
use super::{ConvolutionJob, ConvolutionWorker};
use crate::OpsResult;
use crate::device::PaintDevice;
use crate::progress::percent;
use pigment_core::Rect;
use tracing::trace;

/// Spatial-domain worker, exact for every kernel size.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialConvolutionWorker;

impl SpatialConvolutionWorker {
    fn load_row(
        cache: &mut PixelCache,
        job: &ConvolutionJob<'_>,
        origin_x: i32,
        y: i32,
        row: usize,
    ) {
        let mut cursor = job
            .src
            .hline_cursor(Rect::new(origin_x, y, cache.width() as i32, 1), job.edge);
        for col in 0..cache.width() {
            cache.set(col, row, cursor.pixel());
            cursor.next_pixel();
        }
    }

    fn load_column(
        cache: &mut PixelCache,
        job: &ConvolutionJob<'_>,
        x: i32,
        origin_y: i32,
        col: usize,
    ) {
        let mut cursor = job
            .src
            .vline_cursor(Rect::new(x, origin_y, 1, cache.height() as i32), job.edge);
        for row in 0..cache.height() {
            cache.set(col, row, cursor.pixel());
            cursor.next_pixel();
        }
    }
}

impl ConvolutionWorker for SpatialConvolutionWorker {
    fn execute(
        &self,
        job: &ConvolutionJob<'_>,
        dst: &mut PaintDevice,
        dst_pos: (i32, i32),
    ) -> OpsResult<()> {
        let area = job.src_rect;
        let (kw, kh) = (job.kernel.width(), job.kernel.height());
        let (rx, ry) = job.kernel.radius();
        let (rx, ry) = (rx as i32, ry as i32);
        let ps = job.src.pixel_size();
        trace!(
            width = area.width,
            height = area.height,
            kernel_w = kw,
            kernel_h = kh,
            "spatial convolution"
        );

        let op = job.src.color_space().convolution_op();
        let weights = job.kernel.data();
        let mut row_cache = PixelCache::new(kw, kh, ps);
        let mut work = PixelCache::new(kw, kh, ps);
        let mut window = vec![0u8; kw * kh * ps];

        let origin_x = area.x - rx;
        for row in 0..kh {
            Self::load_row(&mut row_cache, job, origin_x, area.y - ry + row as i32, row);
        }

        let mut out = dst.hline_cursor_mut(Rect::new(dst_pos.0, dst_pos.1, area.width, area.height))?;
        for r in 0..area.height {
            if job.progress.is_interrupted() {
                return Ok(());
            }
            if r > 0 {
                row_cache.rotate_up();
                Self::load_row(&mut row_cache, job, origin_x, area.y + r - ry + kh as i32 - 1, kh - 1);
            }
            work.copy_from(&row_cache);

            for c in 0..area.width {
                if c > 0 {
                    work.rotate_left();
                    Self::load_column(&mut work, job, origin_x + c + kw as i32 - 1, area.y + r - ry, kw - 1);
                }
                work.pack_into(&mut window);
                op.convolve_colors_packed(
                    &window,
                    weights,
                    out.pixel_mut(),
                    job.factor,
                    job.offset,
                    job.flags,
                );
                out.next_pixel();
            }
            out.next_row();
            job.progress
                .set_progress(percent(r as usize + 1, area.height as usize));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::EdgePolicy;
    use crate::kernel::ConvolutionKernel;
    use crate::progress::{NoProgress, ProgressCounter};
    use pigment_core::{ChannelFlags, ColorSpaceRegistry};

    fn alpha_device(w: i32, h: i32, f: impl Fn(i32, i32) -> u8) -> PaintDevice {
        let registry = ColorSpaceRegistry::with_defaults();
        let data = Rect::new(0, 0, w, h).iter_coords().map(|(x, y)| f(x, y)).collect();
        PaintDevice::from_bytes(registry.alpha8().unwrap(), Rect::new(0, 0, w, h), data).unwrap()
    }

    fn run(kernel: &ConvolutionKernel, src: &PaintDevice, edge: EdgePolicy) -> PaintDevice {
        let mut dst = src.clone();
        let job = ConvolutionJob {
            kernel,
            src,
            src_rect: src.extent(),
            factor: kernel.effective_factor(),
            offset: kernel.offset(),
            flags: ChannelFlags::ALL,
            edge,
            progress: &NoProgress,
        };
        SpatialConvolutionWorker.execute(&job, &mut dst, (0, 0)).unwrap();
        dst
    }

    #[test]
    fn test_identity_kernel() {
        let src = alpha_device(5, 4, |x, y| (x * 40 + y) as u8);
        let k = ConvolutionKernel::new(3, 3, vec![0., 0., 0., 0., 1., 0., 0., 0., 0.], 1.0, 0.0)
            .unwrap();
        assert_eq!(run(&k, &src, EdgePolicy::Standard).data(), src.data());
    }

    #[test]
    fn test_shift_kernel_reads_right_neighbour() {
        let src = alpha_device(4, 2, |x, _| (x * 10 + 10) as u8);
        let k = ConvolutionKernel::new(3, 1, vec![0.0, 0.0, 1.0], 1.0, 0.0).unwrap();
        let out = run(&k, &src, EdgePolicy::Repeat);
        assert_eq!(&out.data()[..4], &[20, 30, 40, 40]);
    }

    #[test]
    fn test_box_sum_interior() {
        let src = alpha_device(6, 6, |x, y| (x + y * 6) as u8);
        let k = ConvolutionKernel::box_blur(3);
        let out = run(&k, &src, EdgePolicy::Standard);
        for y in 1..5 {
            for x in 1..5 {
                let mut sum = 0u32;
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        sum += src.pixel(x + dx, y + dy)[0] as u32;
                    }
                }
                let expected = (sum as f64 / 9.0).round() as u8;
                assert_eq!(out.pixel(x, y)[0], expected, "at {},{}", x, y);
            }
        }
    }

    #[test]
    fn test_interrupt_stops_early() {
        let src = alpha_device(4, 4, |_, _| 100);
        let k = ConvolutionKernel::from_matrix(1, 1, vec![2.0]).unwrap().with_factor(1.0).unwrap();
        let mut dst = src.clone();
        let progress = ProgressCounter::cancel_after(1);
        let job = ConvolutionJob {
            kernel: &k,
            src: &src,
            src_rect: src.extent(),
            factor: 1.0,
            offset: 0.0,
            flags: ChannelFlags::ALL,
            edge: EdgePolicy::Standard,
            progress: &progress,
        };
        SpatialConvolutionWorker.execute(&job, &mut dst, (0, 0)).unwrap();
        assert_eq!(&dst.data()[..4], &[200; 4]);
        assert_eq!(&dst.data()[4..], &[100; 12]);
    }
}
