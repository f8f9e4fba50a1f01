//! Error type shared by the painters, the toolbox and inpainting.

use thiserror::Error;

/// Why an operation refused to run.
#[derive(Error, Debug)]
pub enum OpsError {
    /// A device or rectangle has an unusable size.
    #[error("bad geometry: {0}")]
    InvalidDimensions(String),

    /// Two buffers that must line up do not.
    #[error("extent mismatch: {0}")]
    SizeMismatch(String),

    /// A setting is out of its accepted range.
    #[error("bad parameter: {0}")]
    InvalidParameter(String),

    /// The convolution matrix cannot be applied.
    #[error("unusable kernel: {0}")]
    InvalidKernel(String),

    /// Source and destination devices use different color spaces.
    #[error("device color spaces differ: {expected} vs {actual}")]
    ColorSpaceMismatch {
        /// Source color space name.
        expected: String,
        /// Destination color space name.
        actual: String,
    },

    /// A property bag failed to (de)serialize.
    #[error("property bag: {0}")]
    Config(#[from] serde_yaml::Error),

    /// Raised by the color space layer.
    #[error(transparent)]
    Core(#[from] pigment_core::Error),
}

/// `Result` with [`OpsError`].
pub type OpsResult<T> = Result<T, OpsError>;
