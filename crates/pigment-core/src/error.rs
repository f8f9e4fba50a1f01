//! Failures of the pixel pipeline.
//!
//! Pixel arithmetic itself never fails: values saturate and lossy
//! conversions still produce output. Errors are reserved for inputs that
//! cannot be processed at all, such as a short buffer or a model/depth pair
//! with no registered factory.
//!
//! ```rust
//! use pigment_core::{Error, Result};
//!
//! fn need(bytes: &[u8], pixel_size: usize, n: usize) -> Result<()> {
//!     match bytes.len() >= pixel_size * n {
//!         true => Ok(()),
//!         false => Err(Error::buffer_mismatch(pixel_size * n, bytes.len())),
//!     }
//! }
//! assert!(need(&[0; 3], 4, 1).unwrap_err().is_buffer_error());
//! ```

use thiserror::Error;

/// `Result` with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Pixel pipeline error.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw pixel span holds fewer bytes than `pixel_size * n_pixels`.
    #[error("pixel buffer holds {got} bytes, {expected} required")]
    BufferMismatch {
        /// Required length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// The registry has no factory for this model and depth.
    #[error("no color space registered for {model}/{depth} ({profile})")]
    UnknownColorSpace {
        /// Color model id.
        model: String,
        /// Channel depth id.
        depth: String,
        /// Requested profile.
        profile: String,
    },

    /// A pixel or coefficient buffer could not be allocated.
    #[error("cannot allocate {requested} bytes: {reason}")]
    AllocationFailed {
        /// Size of the failed reservation.
        requested: usize,
        /// Allocator message.
        reason: String,
    },

    /// An external transform provider gave up on a conversion.
    #[error("color conversion failed: {0}")]
    ConversionFailed(String),
}

impl Error {
    /// [`Error::BufferMismatch`] for a span of `got` bytes.
    pub fn buffer_mismatch(expected: usize, got: usize) -> Self {
        Self::BufferMismatch { expected, got }
    }

    /// [`Error::UnknownColorSpace`] from the three id parts.
    pub fn unknown_color_space(
        model: impl Into<String>,
        depth: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self::UnknownColorSpace {
            model: model.into(),
            depth: depth.into(),
            profile: profile.into(),
        }
    }

    /// [`Error::AllocationFailed`].
    pub fn allocation_failed(requested: usize, reason: impl ToString) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.to_string(),
        }
    }

    /// The registry lookup found nothing.
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Self::UnknownColorSpace { .. })
    }

    /// A caller handed in a short buffer.
    pub fn is_buffer_error(&self) -> bool {
        matches!(self, Self::BufferMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_message() {
        let err = Error::buffer_mismatch(16, 12);
        assert_eq!(err.to_string(), "pixel buffer holds 12 bytes, 16 required");
        assert!(err.is_buffer_error());
        assert!(!err.is_lookup_error());
    }

    #[test]
    fn test_lookup_message() {
        let err = Error::unknown_color_space("CMYKA", "F64", "default");
        assert!(err.to_string().contains("CMYKA/F64"));
        assert!(err.is_lookup_error());
    }
}
