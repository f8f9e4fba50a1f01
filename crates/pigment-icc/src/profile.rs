//! Owned lcms profile handle.

use crate::{IccError, IccResult};
use lcms2::{ColorSpaceSignature, InfoType, Locale};

/// An opened ICC profile.
///
/// Handles are opened on demand while a conversion runs; the provider only
/// keeps what is needed to reopen them.
///
/// ```rust
/// use pigment_icc::Profile;
///
/// let bytes = Profile::srgb().to_icc().unwrap();
/// let reopened = Profile::from_icc(&bytes).unwrap();
/// assert!(reopened.is_rgb());
/// ```
pub struct Profile {
    pub(crate) inner: lcms2::Profile,
}

impl Profile {
    /// Opens a profile from its serialized form.
    pub fn from_icc(data: &[u8]) -> IccResult<Self> {
        lcms2::Profile::new_icc(data)
            .map(|inner| Self { inner })
            .map_err(|e| IccError::Parse(e.to_string()))
    }

    /// lcms' built-in sRGB.
    pub fn srgb() -> Self {
        Self {
            inner: lcms2::Profile::new_srgb(),
        }
    }

    /// Serializes back to ICC bytes.
    pub fn to_icc(&self) -> IccResult<Vec<u8>> {
        self.inner.icc().map_err(|e| IccError::Parse(e.to_string()))
    }

    /// The `desc` tag, or an empty string.
    pub fn description(&self) -> String {
        self.inner
            .info(InfoType::Description, Locale::none())
            .unwrap_or_default()
    }

    pub(crate) fn signature(&self) -> ColorSpaceSignature {
        self.inner.color_space()
    }

    /// Whether the data color space is RGB.
    pub fn is_rgb(&self) -> bool {
        matches!(self.signature(), ColorSpaceSignature::RgbData)
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Profile({:?}, {:?})", self.description(), self.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_has_description() {
        let p = Profile::srgb();
        assert!(p.is_rgb());
        assert!(!p.description().is_empty());
        assert!(format!("{:?}", p).starts_with("Profile("));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = Profile::from_icc(b"not an icc profile").unwrap_err();
        assert!(matches!(err, IccError::Parse(_)));
    }
}
