//! Frequency-domain convolution for large kernels.
//!
//! The source region plus a kernel-sized margin is read once, one plane per
//! processed channel, padded to sizes [`rustfft`] handles quickly and
//! transformed with a row pass followed by a column pass:
//!
//! ```text
//! plane ──rows──► transpose ──cols──► × kernel spectrum ──cols⁻¹──► transpose ──rows⁻¹──► result
//! ```
//!
//! Transparency follows the same cases as the spatial worker. A sample
//! whose 8-bit opacity is zero contributes nothing to the channel planes,
//! and an extra plane of ones at those samples yields the transparent
//! kernel weight per pixel. The result is then renormalised exactly like
//! [`ConvolutionOp`](pigment_core::ConvolutionOp) cases A, B and C, so
//! both workers agree for any alpha. Pixels whose whole neighbourhood is
//! transparent are left untouched.
//!
//! Plans come from one process-wide [`FftPlanner`] guarded by a mutex.
//! `rustfft` plans are plain `Arc`s with no global teardown, so dropping
//! them needs no lock. The planner cache holds one entry per distinct
//! length and direction.

use super::{ConvolutionJob, ConvolutionWorker};
use crate::OpsResult;
use crate::device::PaintDevice;
use pigment_core::Rect;
use pigment_core::channel::{read_as_f64, write_from_f64};
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const EPS: f64 = 1e-9;

/// Smallest length `>= n` whose prime factors are all 2, 3, 5 or 7.
///
/// ```rust
/// use pigment_ops::convolution::optimal_fft_size;
///
/// assert_eq!(optimal_fft_size(11), 12);
/// assert_eq!(optimal_fft_size(121), 125);
/// ```
pub fn optimal_fft_size(n: usize) -> usize {
    (n.max(1)..)
        .find(|&m| {
            let mut m = m;
            for p in [2, 3, 5, 7] {
                while m % p == 0 {
                    m /= p;
                }
            }
            m == 1
        })
        .unwrap_or(n)
}

fn planner() -> &'static Mutex<FftPlanner<f64>> {
    static PLANNER: OnceLock<Mutex<FftPlanner<f64>>> = OnceLock::new();
    PLANNER.get_or_init(|| Mutex::new(FftPlanner::new()))
}

/// Row and column plans for one padded size.
struct Plans {
    fw: usize,
    fh: usize,
    row_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
}

impl Plans {
    fn new(fw: usize, fh: usize) -> Self {
        // Held only while planning. Dropping a plan just releases an `Arc`.
        let mut planner = planner().lock().unwrap_or_else(PoisonError::into_inner);
        Self {
            fw,
            fh,
            row_fwd: planner.plan_fft_forward(fw),
            row_inv: planner.plan_fft_inverse(fw),
            col_fwd: planner.plan_fft_forward(fh),
            col_inv: planner.plan_fft_inverse(fh),
        }
    }

    /// Forward transform of `plane`; the spectrum lands transposed in `spectrum`.
    fn forward(&self, plane: &mut [Complex64], spectrum: &mut [Complex64]) {
        self.row_fwd.process(plane);
        transpose(plane, spectrum, self.fw, self.fh);
        self.col_fwd.process(spectrum);
    }

    /// Inverse of [`forward`](Self::forward), unscaled.
    fn inverse(&self, spectrum: &mut [Complex64], plane: &mut [Complex64]) {
        self.col_inv.process(spectrum);
        transpose(spectrum, plane, self.fh, self.fw);
        self.row_inv.process(plane);
    }
}

/// `dst[x * h + y] = src[y * w + x]`
fn transpose(src: &[Complex64], dst: &mut [Complex64], w: usize, h: usize) {
    for (y, row) in src.chunks_exact(w).enumerate().take(h) {
        for (x, v) in row.iter().enumerate() {
            dst[x * h + y] = *v;
        }
    }
}

/// One channel being convolved, or the transparent-weight plane when
/// `channel` is `None`.
struct Plane {
    channel: Option<usize>,
    is_alpha: bool,
    data: Vec<Complex64>,
}

/// FFT worker, `O(log n)` per pixel regardless of kernel size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FftConvolutionWorker;

impl ConvolutionWorker for FftConvolutionWorker {
    fn execute(
        &self,
        job: &ConvolutionJob<'_>,
        dst: &mut PaintDevice,
        dst_pos: (i32, i32),
    ) -> OpsResult<()> {
        let area = job.src_rect;
        let kernel = job.kernel;
        let (kw, kh) = (kernel.width(), kernel.height());
        let (rx, ry) = kernel.radius();
        let data_rect = Rect::new(
            area.x - rx as i32,
            area.y - ry as i32,
            area.width + kw as i32 - 1,
            area.height + kh as i32 - 1,
        );
        let (dw, dh) = (data_rect.width as usize, data_rect.height as usize);
        let (fw, fh) = (optimal_fft_size(dw), optimal_fft_size(dh));
        let n = fw * fh;
        debug!(
            width = area.width,
            height = area.height,
            fft_w = fw,
            fft_h = fh,
            "fft convolution"
        );

        let cs = job.src.color_space();
        let vt = cs.channel_value_type();
        let channels = cs.channels();

        let mut planes: Vec<Plane> = channels
            .iter()
            .filter(|c| job.flags.test(c.index))
            .map(|c| Plane {
                channel: Some(c.index),
                is_alpha: c.is_alpha(),
                data: vec![Complex64::new(0.0, 0.0); n],
            })
            .collect();
        if cs.has_alpha() {
            planes.push(Plane {
                channel: None,
                is_alpha: false,
                data: vec![Complex64::new(0.0, 0.0); n],
            });
        }

        let mut cursor = job.src.hline_cursor(data_rect, job.edge);
        for row in 0..dh {
            for col in 0..dw {
                let px = cursor.pixel();
                let transparent = cs.opacity_u8(px) == 0;
                let i = row * fw + col;
                for plane in planes.iter_mut() {
                    plane.data[i].re = match plane.channel {
                        None if transparent => 1.0,
                        Some(c) if !transparent => read_as_f64(vt, px, channels[c].position),
                        _ => 0.0,
                    };
                }
                cursor.next_pixel();
            }
            cursor.next_row();
        }
        if job.progress.is_interrupted() {
            return Ok(());
        }
        job.progress.set_progress(10);

        let plans = Plans::new(fw, fh);

        // Flipped so the product computes correlation, like the spatial worker.
        let mut kernel_plane = vec![Complex64::new(0.0, 0.0); n];
        for j in 0..kh {
            for i in 0..kw {
                kernel_plane[((fh - j) % fh) * fw + (fw - i) % fw].re = kernel.value(i, j);
            }
        }
        let mut kernel_spectrum = vec![Complex64::new(0.0, 0.0); n];
        plans.forward(&mut kernel_plane, &mut kernel_spectrum);
        let scale = 1.0 / n as f64;

        let progress = job.progress;
        let convolve = |plane: &mut Plane| {
            if progress.is_interrupted() {
                return;
            }
            let mut spectrum = vec![Complex64::new(0.0, 0.0); n];
            plans.forward(&mut plane.data, &mut spectrum);
            for (s, k) in spectrum.iter_mut().zip(&kernel_spectrum) {
                *s *= *k * scale;
            }
            plans.inverse(&mut spectrum, &mut plane.data);
            trace!(channel = ?plane.channel, "plane convolved");
        };
        #[cfg(feature = "parallel")]
        planes.par_iter_mut().for_each(convolve);
        #[cfg(not(feature = "parallel"))]
        planes.iter_mut().for_each(convolve);

        if job.progress.is_interrupted() {
            return Ok(());
        }
        job.progress.set_progress(80);

        let ksum = kernel.sum();
        let factor = job.factor;
        let weight_is_factor = (ksum - factor).abs() < EPS;
        let transparent_plane = planes.iter().position(|p| p.channel.is_none());
        let mut out = dst.hline_cursor_mut(Rect::new(dst_pos.0, dst_pos.1, area.width, area.height))?;
        for row in 0..area.height as usize {
            for col in 0..area.width as usize {
                let i = row * fw + col;
                let transparent_weight = transparent_plane.map_or(0.0, |t| planes[t].data[i].re);
                let opaque_weight = ksum - transparent_weight;
                let has_transparent = transparent_weight.abs() > EPS;
                if has_transparent && opaque_weight.abs() < EPS {
                    out.next_pixel();
                    continue;
                }

                let px = out.pixel_mut();
                for plane in &planes {
                    let Some(channel) = plane.channel else {
                        continue;
                    };
                    let total = plane.data[i].re;
                    let v = if !has_transparent {
                        total / factor
                    } else if weight_is_factor {
                        if plane.is_alpha { total / ksum } else { total / opaque_weight }
                    } else if plane.is_alpha {
                        total / factor
                    } else {
                        total * ksum / (factor * opaque_weight)
                    };
                    write_from_f64(vt, px, channels[channel].position, v + job.offset);
                }
                out.next_pixel();
            }
            out.next_row();
        }
        job.progress.set_progress(100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convolution::SpatialConvolutionWorker;
    use crate::device::EdgePolicy;
    use crate::kernel::ConvolutionKernel;
    use crate::progress::{NoProgress, ProgressCounter};
    use pigment_core::{ChannelFlags, ColorSpaceRegistry};

    fn rgb_device(w: i32, h: i32, f: impl Fn(i32, i32) -> [u8; 4]) -> PaintDevice {
        let registry = ColorSpaceRegistry::with_defaults();
        let bounds = Rect::new(0, 0, w, h);
        let data = bounds.iter_coords().flat_map(|(x, y)| f(x, y)).collect();
        PaintDevice::from_bytes(registry.rgb8().unwrap(), bounds, data).unwrap()
    }

    fn job<'a>(
        kernel: &'a ConvolutionKernel,
        src: &'a PaintDevice,
        edge: EdgePolicy,
    ) -> ConvolutionJob<'a> {
        ConvolutionJob {
            kernel,
            src,
            src_rect: src.extent(),
            factor: kernel.effective_factor(),
            offset: kernel.offset(),
            flags: ChannelFlags::ALL,
            edge,
            progress: &NoProgress,
        }
    }

    fn assert_close(a: &PaintDevice, b: &PaintDevice) {
        for (i, (x, y)) in a.data().iter().zip(b.data()).enumerate() {
            assert!((*x as i32 - *y as i32).abs() <= 1, "byte {}: {} vs {}", i, x, y);
        }
    }

    #[test]
    fn test_optimal_size() {
        assert_eq!(optimal_fft_size(0), 1);
        assert_eq!(optimal_fft_size(1), 1);
        assert_eq!(optimal_fft_size(11), 12);
        assert_eq!(optimal_fft_size(13), 14);
        assert_eq!(optimal_fft_size(17), 18);
        assert_eq!(optimal_fft_size(64), 64);
    }

    #[test]
    fn test_plans_from_many_threads() {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                std::thread::spawn(move || {
                    let (fw, fh) = (12, 14);
                    let plans = Plans::new(fw, fh);
                    let mut plane = vec![Complex64::new(0.0, 0.0); fw * fh];
                    plane[t * fw + 3].re = 1.0;
                    let original = plane.clone();
                    let mut spectrum = vec![Complex64::new(0.0, 0.0); fw * fh];
                    plans.forward(&mut plane, &mut spectrum);
                    plans.inverse(&mut spectrum, &mut plane);
                    let scale = 1.0 / (fw * fh) as f64;
                    for (a, b) in plane.iter().zip(&original) {
                        assert!((a.re * scale - b.re).abs() < 1e-12);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn test_identity_kernel() {
        let src = rgb_device(9, 7, |x, y| [(x * 20) as u8, (y * 30) as u8, 77, 255]);
        let mut data = vec![0.0; 49];
        data[24] = 1.0;
        let k = ConvolutionKernel::new(7, 7, data, 1.0, 0.0).unwrap();
        let mut dst = src.clone();
        FftConvolutionWorker.execute(&job(&k, &src, EdgePolicy::Standard), &mut dst, (0, 0)).unwrap();
        assert_eq!(dst.data(), src.data());
    }

    #[test]
    fn test_matches_spatial_opaque() {
        let src = rgb_device(20, 15, |x, y| {
            [(x * 11 % 256) as u8, (y * 17 % 256) as u8, ((x * y) % 256) as u8, 255]
        });
        let k = ConvolutionKernel::gaussian(7, 2.0);
        for edge in [EdgePolicy::Repeat, EdgePolicy::Standard] {
            let mut a = src.clone();
            let mut b = src.clone();
            SpatialConvolutionWorker.execute(&job(&k, &src, edge), &mut a, (0, 0)).unwrap();
            FftConvolutionWorker.execute(&job(&k, &src, edge), &mut b, (0, 0)).unwrap();
            assert_close(&a, &b);
        }
    }

    #[test]
    fn test_matches_spatial_binary_alpha() {
        let src = rgb_device(16, 12, |x, y| {
            let alpha = if x < 8 { 255 } else { 0 };
            [(x * 15) as u8, (y * 20) as u8, 200, alpha]
        });
        let k = ConvolutionKernel::box_blur(7);
        let mut a = src.clone();
        let mut b = src.clone();
        SpatialConvolutionWorker.execute(&job(&k, &src, EdgePolicy::Repeat), &mut a, (0, 0)).unwrap();
        FftConvolutionWorker.execute(&job(&k, &src, EdgePolicy::Repeat), &mut b, (0, 0)).unwrap();
        assert_close(&a, &b);
    }

    #[test]
    fn test_matches_spatial_graded_alpha() {
        let src = rgb_device(16, 12, |x, y| {
            [(x * 15) as u8, (y * 20) as u8, 200, (x * 16 + 10) as u8]
        });
        let k = ConvolutionKernel::box_blur(7);
        let mut a = src.clone();
        let mut b = src.clone();
        SpatialConvolutionWorker.execute(&job(&k, &src, EdgePolicy::Repeat), &mut a, (0, 0)).unwrap();
        FftConvolutionWorker.execute(&job(&k, &src, EdgePolicy::Repeat), &mut b, (0, 0)).unwrap();
        assert_close(&a, &b);
    }

    #[test]
    fn test_matches_spatial_mixed_transparency_with_factor() {
        // Some transparent samples and a factor that differs from the kernel sum.
        let src = rgb_device(14, 10, |x, y| {
            let alpha = if (x + y) % 3 == 0 { 0 } else { (40 + x * 12) as u8 };
            [(x * 17) as u8, (y * 23) as u8, ((x + y) * 9) as u8, alpha]
        });
        let k = ConvolutionKernel::box_blur(7);
        let mut j = job(&k, &src, EdgePolicy::Standard);
        j.factor = 64.0;
        let mut a = src.clone();
        let mut b = src.clone();
        SpatialConvolutionWorker.execute(&j, &mut a, (0, 0)).unwrap();
        FftConvolutionWorker.execute(&j, &mut b, (0, 0)).unwrap();
        assert_close(&a, &b);
    }

    #[test]
    fn test_transparent_neighbourhood_untouched() {
        let src = rgb_device(10, 10, |_, _| [0, 0, 0, 0]);
        let mut dst = rgb_device(10, 10, |_, _| [1, 2, 3, 4]);
        let k = ConvolutionKernel::box_blur(7);
        FftConvolutionWorker.execute(&job(&k, &src, EdgePolicy::Standard), &mut dst, (0, 0)).unwrap();
        assert!(dst.data().chunks_exact(4).all(|p| p == [1, 2, 3, 4]));
    }

    #[test]
    fn test_cancelled_before_write() {
        let src = rgb_device(8, 8, |_, _| [100, 100, 100, 255]);
        let mut dst = rgb_device(8, 8, |_, _| [0, 0, 0, 0]);
        let progress = ProgressCounter::new();
        progress.cancel();
        let k = ConvolutionKernel::box_blur(7);
        let mut j = job(&k, &src, EdgePolicy::Repeat);
        j.progress = &progress;
        FftConvolutionWorker.execute(&j, &mut dst, (0, 0)).unwrap();
        assert!(dst.data().iter().all(|&v| v == 0));
    }
}
