//! Built-in RGB profile definitions.
//!
//! The names returned by [`StandardProfile::name`] are the profile names a
//! pigment color space carries in its id, so `"sRGB"` (the registry default
//! for RGB) resolves to [`StandardProfile::Srgb`].

use crate::{IccError, IccResult, Profile};
use lcms2::{CIExyY, CIExyYTRIPLE, Profile as LcmsProfile, ToneCurve};

/// Standard RGB profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardProfile {
    /// IEC 61966-2-1 sRGB.
    Srgb,
    /// sRGB primaries, linear transfer.
    LinearSrgb,
    /// Adobe RGB (1998).
    AdobeRgb,
    /// Display P3.
    DisplayP3,
    /// ITU-R BT.709.
    Rec709,
    /// ITU-R BT.2020.
    Rec2020,
}

impl StandardProfile {
    /// All standard profiles.
    pub const ALL: [StandardProfile; 6] = [
        Self::Srgb,
        Self::LinearSrgb,
        Self::AdobeRgb,
        Self::DisplayP3,
        Self::Rec709,
        Self::Rec2020,
    ];

    /// Profile name as used in color space ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Srgb => "sRGB",
            Self::LinearSrgb => "sRGB linear",
            Self::AdobeRgb => "Adobe RGB",
            Self::DisplayP3 => "Display P3",
            Self::Rec709 => "Rec.709",
            Self::Rec2020 => "Rec.2020",
        }
    }

    /// Finds a standard profile by name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Builds the lcms2 profile.
    pub fn to_profile(self) -> IccResult<Profile> {
        let (primaries, gamma) = match self {
            Self::Srgb => {
                return Ok(Profile {
                    inner: LcmsProfile::new_srgb(),
                });
            }
            Self::LinearSrgb => (rec709_primaries(), 1.0),
            Self::AdobeRgb => (
                triple((0.6400, 0.3300), (0.2100, 0.7100), (0.1500, 0.0600)),
                563.0 / 256.0,
            ),
            Self::DisplayP3 => (
                triple((0.680, 0.320), (0.265, 0.690), (0.150, 0.060)),
                2.2,
            ),
            Self::Rec709 => (rec709_primaries(), 2.4),
            Self::Rec2020 => (
                triple((0.708, 0.292), (0.170, 0.797), (0.131, 0.046)),
                2.4,
            ),
        };
        let curve = ToneCurve::new(gamma);
        let curves = [&curve, &curve, &curve];
        let inner = LcmsProfile::new_rgb(&d65_white(), &primaries, &curves)
            .map_err(|e| IccError::Build {
                name: self.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Profile { inner })
    }
}

fn d65_white() -> CIExyY {
    CIExyY {
        x: 0.3127,
        y: 0.3290,
        Y: 1.0,
    }
}

fn triple(r: (f64, f64), g: (f64, f64), b: (f64, f64)) -> CIExyYTRIPLE {
    let xyy = |(x, y): (f64, f64)| CIExyY { x, y, Y: 1.0 };
    CIExyYTRIPLE {
        Red: xyy(r),
        Green: xyy(g),
        Blue: xyy(b),
    }
}

fn rec709_primaries() -> CIExyYTRIPLE {
    triple((0.6400, 0.3300), (0.3000, 0.6000), (0.1500, 0.0600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_standards_are_rgb() {
        for std in StandardProfile::ALL {
            let profile = std.to_profile().unwrap();
            assert!(profile.is_rgb(), "{:?} should be RGB", std);
        }
    }

    #[test]
    fn test_names_roundtrip() {
        for std in StandardProfile::ALL {
            assert_eq!(StandardProfile::from_name(std.name()), Some(std));
        }
        assert_eq!(StandardProfile::from_name("srgb"), Some(StandardProfile::Srgb));
        assert!(StandardProfile::from_name("ProPhoto").is_none());
    }
}
