//! Convolution kernels.
//!
//! A kernel is a `width × height` matrix of weights plus a `factor` that the
//! weighted sum is divided by and an `offset` added afterwards, both in the
//! channel's native units:
//!
//! ```text
//! out = Σ k(x, y) · p(x, y) / factor + offset
//! ```
//!
//! Kernels must have odd dimensions so they have a center pixel. An even
//! kernel is accepted only with `factor == 0`, which marks an unnormalized
//! kernel; painters treat a zero factor as 1.
//!
//! # Presets
//!
//! - [`ConvolutionKernel::box_blur`] - Uniform average
//! - [`ConvolutionKernel::gaussian`] - Gaussian blur
//! - [`ConvolutionKernel::sharpen`] - Laplacian sharpening
//! - [`ConvolutionKernel::edge_detect`] - Laplacian edges
//! - [`ConvolutionKernel::emboss`] - Directional relief
//!
//! # Example
//!
//! ```rust
//! use pigment_ops::kernel::ConvolutionKernel;
//!
//! let k = ConvolutionKernel::from_matrix(3, 3, vec![1.0; 9]).unwrap();
//! assert_eq!(k.factor(), 9.0);
//! assert_eq!(k.radius(), (1, 1));
//! ```

use crate::{OpsError, OpsResult};

/// Immutable convolution kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionKernel {
    width: usize,
    height: usize,
    data: Vec<f64>,
    factor: f64,
    offset: f64,
}

impl ConvolutionKernel {
    /// Creates a kernel from row-major weights.
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f64>,
        factor: f64,
        offset: f64,
    ) -> OpsResult<Self> {
        if width == 0 || height == 0 {
            return Err(OpsError::InvalidKernel(format!(
                "kernel size {}x{} is empty",
                width, height
            )));
        }
        if data.len() != width * height {
            return Err(OpsError::InvalidKernel(format!(
                "kernel data size {} doesn't match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        if (width % 2 == 0 || height % 2 == 0) && factor != 0.0 {
            return Err(OpsError::InvalidKernel(format!(
                "even kernel {}x{} requires factor 0, got {}",
                width, height, factor
            )));
        }
        if !factor.is_finite() || !offset.is_finite() || data.iter().any(|v| !v.is_finite()) {
            return Err(OpsError::InvalidKernel("non-finite kernel value".into()));
        }
        Ok(Self {
            width,
            height,
            data,
            factor,
            offset,
        })
    }

    /// Creates a kernel whose factor is the sum of its weights, or 1 when
    /// the weights sum to zero.
    pub fn from_matrix(width: usize, height: usize, data: Vec<f64>) -> OpsResult<Self> {
        let sum: f64 = data.iter().sum();
        let factor = if sum.abs() < 1e-12 { 1.0 } else { sum };
        Self::new(width, height, data, factor, 0.0)
    }

    /// `size × size` uniform average; even sizes are rounded up.
    pub fn box_blur(size: usize) -> Self {
        let size = size.max(1) | 1;
        let count = size * size;
        Self {
            width: size,
            height: size,
            data: vec![1.0; count],
            factor: count as f64,
            offset: 0.0,
        }
    }

    /// Gaussian blur with standard deviation `sigma`.
    ///
    /// Weights are left unnormalized and the factor holds their sum.
    pub fn gaussian(size: usize, sigma: f64) -> Self {
        let size = size.max(1) | 1;
        let half = (size / 2) as i64;
        let sigma2 = 2.0 * sigma.max(1e-6) * sigma.max(1e-6);

        let mut data = Vec::with_capacity(size * size);
        for y in -half..=half {
            for x in -half..=half {
                data.push((-((x * x + y * y) as f64) / sigma2).exp());
            }
        }
        let factor = data.iter().sum();
        Self {
            width: size,
            height: size,
            data,
            factor,
            offset: 0.0,
        }
    }

    /// 3x3 Laplacian sharpening; `amount` around 0.5..2.
    #[rustfmt::skip]
    pub fn sharpen(amount: f64) -> Self {
        let center = 1.0 + 4.0 * amount;
        Self {
            width: 3,
            height: 3,
            data: vec![
                0.0, -amount, 0.0,
                -amount, center, -amount,
                0.0, -amount, 0.0,
            ],
            factor: 1.0,
            offset: 0.0,
        }
    }

    /// 3x3 Laplacian edge detector.
    #[rustfmt::skip]
    pub fn edge_detect() -> Self {
        Self {
            width: 3,
            height: 3,
            data: vec![
                0.0, -1.0, 0.0,
                -1.0, 4.0, -1.0,
                0.0, -1.0, 0.0,
            ],
            factor: 1.0,
            offset: 0.0,
        }
    }

    /// 3x3 emboss, lit from the bottom right.
    #[rustfmt::skip]
    pub fn emboss() -> Self {
        Self {
            width: 3,
            height: 3,
            data: vec![
                -2.0, -1.0, 0.0,
                -1.0, 1.0, 1.0,
                0.0, 1.0, 2.0,
            ],
            factor: 1.0,
            offset: 0.0,
        }
    }

    /// Same weights with another factor.
    pub fn with_factor(mut self, factor: f64) -> OpsResult<Self> {
        if (self.width % 2 == 0 || self.height % 2 == 0) && factor != 0.0 {
            return Err(OpsError::InvalidKernel(
                "even kernels require factor 0".into(),
            ));
        }
        self.factor = factor;
        Ok(self)
    }

    /// Same weights with another offset.
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Kernel width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Kernel height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major weights.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Weight at column `x`, row `y`.
    #[inline]
    pub fn value(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Declared normalizing divisor.
    #[inline]
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Divisor painters use: the factor, or 1 when it is 0.
    #[inline]
    pub fn effective_factor(&self) -> f64 {
        if self.factor == 0.0 { 1.0 } else { self.factor }
    }

    /// Additive bias.
    #[inline]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Half sizes `(width / 2, height / 2)`.
    #[inline]
    pub fn radius(&self) -> (usize, usize) {
        (self.width / 2, self.height / 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_even_requires_zero_factor() {
        assert!(ConvolutionKernel::new(2, 2, vec![1.0; 4], 4.0, 0.0).is_err());
        let k = ConvolutionKernel::new(2, 2, vec![1.0; 4], 0.0, 0.0).unwrap();
        assert_eq!(k.effective_factor(), 1.0);
    }

    #[test]
    fn test_size_mismatch() {
        assert!(matches!(
            ConvolutionKernel::new(3, 3, vec![1.0; 8], 1.0, 0.0),
            Err(OpsError::InvalidKernel(_))
        ));
        assert!(ConvolutionKernel::new(0, 3, vec![], 1.0, 0.0).is_err());
    }

    #[test]
    fn test_from_matrix_factor() {
        let k = ConvolutionKernel::from_matrix(3, 1, vec![1.0, 2.0, 1.0]).unwrap();
        assert_eq!(k.factor(), 4.0);
        let edge = ConvolutionKernel::from_matrix(3, 1, vec![-1.0, 0.0, 1.0]).unwrap();
        assert_eq!(edge.factor(), 1.0);
        assert!(ConvolutionKernel::from_matrix(2, 1, vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_presets() {
        let b = ConvolutionKernel::box_blur(4);
        assert_eq!((b.width(), b.height()), (5, 5));
        assert_eq!(b.factor(), 25.0);

        let g = ConvolutionKernel::gaussian(5, 1.0);
        assert_relative_eq!(g.factor(), g.sum(), epsilon = 1e-12);
        assert!(g.value(2, 2) > g.value(0, 0));

        assert_relative_eq!(ConvolutionKernel::sharpen(1.0).sum(), 1.0);
        assert_relative_eq!(ConvolutionKernel::edge_detect().sum(), 0.0);
        assert_relative_eq!(ConvolutionKernel::emboss().sum(), 1.0);
    }

    #[test]
    fn test_with_factor_and_offset() {
        let k = ConvolutionKernel::box_blur(3)
            .with_factor(3.0)
            .unwrap()
            .with_offset(10.0);
        assert_eq!(k.factor(), 3.0);
        assert_eq!(k.offset(), 10.0);
    }
}
