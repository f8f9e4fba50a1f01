//! Errors raised while opening profiles or building lcms transforms.

use thiserror::Error;

/// Shorthand for results in this crate.
pub type IccResult<T> = Result<T, IccError>;

/// Failure inside the lcms2 bridge.
#[derive(Debug, Error)]
pub enum IccError {
    /// The bytes are not a readable ICC profile.
    #[error("unreadable ICC data: {0}")]
    Parse(String),

    /// A synthetic profile could not be assembled.
    #[error("cannot build profile {name}: {reason}")]
    Build {
        /// Profile name.
        name: String,
        /// lcms diagnostic.
        reason: String,
    },

    /// lcms refused the profile pair.
    #[error("no lcms transform for this profile pair: {0}")]
    Transform(String),

    /// Only RGB profiles can back a pigment RGB color space.
    #[error("profile describes {signature}, not RGB")]
    NotRgb {
        /// lcms color space signature of the rejected profile.
        signature: String,
    },
}

impl From<IccError> for pigment_core::Error {
    fn from(e: IccError) -> Self {
        pigment_core::Error::ConversionFailed(e.to_string())
    }
}
