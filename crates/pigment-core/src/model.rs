//! Color models: what the color channels of a layout mean.
//!
//! A [`ColorModel`] is a zero-size tag, like a channel trait, that knows how
//! to move the *color* part of a pixel to and from the two canonical
//! interchange forms every color space supports: sRGB-encoded RGB and
//! CIELAB. All values crossing this interface are `f64`:
//!
//! - model color components are normalised `[0, 1]` in canonical model
//!   order (see [`crate::traits::ColorSpaceTraits::COLOR_POSITIONS`]);
//! - RGB is sRGB-encoded `[0, 1]`;
//! - LAB is `L*` in `[0, 100]`, `a*`/`b*` in `[-128, 127]`, D65 white.
//!
//! Colorimetry here is deliberately simple (fixed sRGB primaries, naive
//! CMYK). Profile-accurate conversion is the job of an external
//! [`ColorTransformProvider`](crate::registry::ColorTransformProvider).
//!
//! # Reference
//!
//! - IEC 61966-2-1:1999 (sRGB transfer)
//! - CIE 15:2004 (CIELAB)

use std::fmt;

// ============================================================================
// Model ids
// ============================================================================

/// Color model half of a color space id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorModelId {
    /// Red, green, blue
    Rgb,
    /// Cyan, magenta, yellow, key
    Cmyk,
    /// CIELAB
    Lab,
    /// CIE XYZ
    Xyz,
    /// Single gray channel
    Gray,
    /// Single gray channel without alpha
    GrayNoAlpha,
    /// Coverage only
    Alpha,
}

impl ColorModelId {
    /// All models.
    pub const ALL: [ColorModelId; 7] = [
        Self::Rgb,
        Self::Cmyk,
        Self::Lab,
        Self::Xyz,
        Self::Gray,
        Self::GrayNoAlpha,
        Self::Alpha,
    ];

    /// Stable string id.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Rgb => "RGBA",
            Self::Cmyk => "CMYKA",
            Self::Lab => "LABA",
            Self::Xyz => "XYZA",
            Self::Gray => "GRAYA",
            Self::GrayNoAlpha => "GRAY",
            Self::Alpha => "A",
        }
    }

    /// Parses a string id as produced by [`ColorModelId::id`].
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id().eq_ignore_ascii_case(id))
    }

    /// Whether cross-model conversions into this model should hop through
    /// Lab16 rather than RGB16.
    pub const fn prefers_lab(self) -> bool {
        matches!(self, Self::Lab | Self::Xyz | Self::Alpha)
    }
}

impl fmt::Display for ColorModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ============================================================================
// Conversion math
// ============================================================================

/// D65 reference white, `Y = 1`.
pub const D65_WHITE: [f64; 3] = [0.95047, 1.0, 1.08883];

/// Linear sRGB → XYZ (D65).
pub const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
];

/// XYZ (D65) → linear sRGB.
pub const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [3.2404542, -1.5371385, -0.4985314],
    [-0.9692660, 1.8760108, 0.0415560],
    [0.0556434, -0.2040259, 1.0572252],
];

const LAB_EPSILON: f64 = 216.0 / 24389.0;
const LAB_KAPPA: f64 = 24389.0 / 27.0;

/// sRGB decode: encoded `[0, 1]` → linear.
#[inline]
pub fn srgb_to_linear(v: f64) -> f64 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB encode: linear → encoded `[0, 1]`.
#[inline]
pub fn linear_to_srgb(l: f64) -> f64 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn mul3(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// sRGB-encoded RGB → XYZ.
pub fn srgb_to_xyz(rgb: [f64; 3]) -> [f64; 3] {
    mul3(&SRGB_TO_XYZ, rgb.map(srgb_to_linear))
}

/// XYZ → sRGB-encoded RGB (unclamped).
pub fn xyz_to_srgb(xyz: [f64; 3]) -> [f64; 3] {
    mul3(&XYZ_TO_SRGB, xyz).map(linear_to_srgb)
}

/// XYZ → CIELAB relative to [`D65_WHITE`].
pub fn xyz_to_lab(xyz: [f64; 3]) -> [f64; 3] {
    let f = |t: f64| {
        if t > LAB_EPSILON {
            t.cbrt()
        } else {
            (LAB_KAPPA * t + 16.0) / 116.0
        }
    };
    let fx = f(xyz[0] / D65_WHITE[0]);
    let fy = f(xyz[1] / D65_WHITE[1]);
    let fz = f(xyz[2] / D65_WHITE[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// CIELAB → XYZ relative to [`D65_WHITE`].
pub fn lab_to_xyz(lab: [f64; 3]) -> [f64; 3] {
    let [l, a, b] = lab;
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let inv = |t: f64| {
        let t3 = t * t * t;
        if t3 > LAB_EPSILON {
            t3
        } else {
            (116.0 * t - 16.0) / LAB_KAPPA
        }
    };
    let yr = if l > LAB_KAPPA * LAB_EPSILON {
        fy * fy * fy
    } else {
        l / LAB_KAPPA
    };
    [inv(fx) * D65_WHITE[0], yr * D65_WHITE[1], inv(fz) * D65_WHITE[2]]
}

/// sRGB-encoded RGB → CIELAB.
#[inline]
pub fn srgb_to_lab(rgb: [f64; 3]) -> [f64; 3] {
    xyz_to_lab(srgb_to_xyz(rgb))
}

/// CIELAB → sRGB-encoded RGB (unclamped).
#[inline]
pub fn lab_to_srgb(lab: [f64; 3]) -> [f64; 3] {
    xyz_to_srgb(lab_to_xyz(lab))
}

/// Normalised `a`/`b` component → `a*`/`b*` in `[-128, 127]`.
#[inline]
pub fn denormalise_ab(n: f64) -> f64 {
    if n <= 0.5 {
        -128.0 + n * 256.0
    } else {
        (n - 0.5) * 254.0
    }
}

/// `a*`/`b*` → normalised `[0, 1]`, zero landing on 0.5.
#[inline]
pub fn normalise_ab(v: f64) -> f64 {
    if v <= 0.0 {
        (v + 128.0) / 256.0
    } else {
        0.5 + v / 254.0
    }
}

// ============================================================================
// ColorModel
// ============================================================================

/// Semantics of a layout's color channels.
///
/// Implementors override at least one of `to_lab`/`to_rgb` and at least one
/// of `from_lab`/`from_rgb`; the defaults route through the other.
pub trait ColorModel: Send + Sync + 'static {
    /// Model id.
    const ID: ColorModelId;

    /// Color channel names in canonical order.
    const CHANNEL_NAMES: &'static [&'static str];

    /// Color components + alpha → CIELAB + alpha.
    fn to_lab(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        let (rgb, a) = Self::to_rgb(color, alpha);
        (srgb_to_lab(rgb), a)
    }

    /// CIELAB + alpha → color components; returns the resulting alpha.
    fn from_lab(lab: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        Self::from_rgb(lab_to_srgb(lab), alpha, color)
    }

    /// Color components + alpha → sRGB-encoded RGB + alpha.
    fn to_rgb(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        let (lab, a) = Self::to_lab(color, alpha);
        (lab_to_srgb(lab), a)
    }

    /// sRGB-encoded RGB + alpha → color components; returns the resulting
    /// alpha.
    fn from_rgb(rgb: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        Self::from_lab(srgb_to_lab(rgb), alpha, color)
    }
}

/// Red, green, blue in sRGB encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbModel;

impl ColorModel for RgbModel {
    const ID: ColorModelId = ColorModelId::Rgb;
    const CHANNEL_NAMES: &'static [&'static str] = &["Red", "Green", "Blue"];

    fn to_rgb(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        ([color[0], color[1], color[2]], alpha)
    }

    fn from_rgb(rgb: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        color[..3].copy_from_slice(&rgb);
        alpha
    }
}

/// Naive device CMYK.
#[derive(Debug, Clone, Copy, Default)]
pub struct CmykModel;

impl ColorModel for CmykModel {
    const ID: ColorModelId = ColorModelId::Cmyk;
    const CHANNEL_NAMES: &'static [&'static str] = &["Cyan", "Magenta", "Yellow", "Black"];

    fn to_rgb(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        let k = 1.0 - color[3];
        (
            [
                (1.0 - color[0]) * k,
                (1.0 - color[1]) * k,
                (1.0 - color[2]) * k,
            ],
            alpha,
        )
    }

    fn from_rgb(rgb: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        let max = rgb[0].max(rgb[1]).max(rgb[2]).clamp(0.0, 1.0);
        let k = 1.0 - max;
        if max <= 0.0 {
            color[..4].copy_from_slice(&[0.0, 0.0, 0.0, 1.0]);
        } else {
            for i in 0..3 {
                color[i] = (max - rgb[i]) / max;
            }
            color[3] = k;
        }
        alpha
    }
}

/// CIELAB, components normalised per [`normalise_ab`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LabModel;

impl ColorModel for LabModel {
    const ID: ColorModelId = ColorModelId::Lab;
    const CHANNEL_NAMES: &'static [&'static str] = &["L", "a", "b"];

    fn to_lab(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        (
            [
                color[0] * 100.0,
                denormalise_ab(color[1]),
                denormalise_ab(color[2]),
            ],
            alpha,
        )
    }

    fn from_lab(lab: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        color[0] = lab[0] / 100.0;
        color[1] = normalise_ab(lab[1]);
        color[2] = normalise_ab(lab[2]);
        alpha
    }
}

/// CIE XYZ, unit value = `Y` of the D65 white.
#[derive(Debug, Clone, Copy, Default)]
pub struct XyzModel;

impl ColorModel for XyzModel {
    const ID: ColorModelId = ColorModelId::Xyz;
    const CHANNEL_NAMES: &'static [&'static str] = &["X", "Y", "Z"];

    fn to_lab(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        (xyz_to_lab([color[0], color[1], color[2]]), alpha)
    }

    fn from_lab(lab: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        color[..3].copy_from_slice(&lab_to_xyz(lab));
        alpha
    }
}

/// Single sRGB-encoded gray channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayModel;

impl ColorModel for GrayModel {
    const ID: ColorModelId = ColorModelId::Gray;
    const CHANNEL_NAMES: &'static [&'static str] = &["Gray"];

    fn to_rgb(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        ([color[0]; 3], alpha)
    }

    fn from_rgb(rgb: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        let lin = rgb.map(srgb_to_linear);
        let y = SRGB_TO_XYZ[1][0] * lin[0] + SRGB_TO_XYZ[1][1] * lin[1] + SRGB_TO_XYZ[1][2] * lin[2];
        color[0] = linear_to_srgb(y);
        alpha
    }
}

/// [`GrayModel`] for layouts that carry no alpha channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayNoAlphaModel;

impl ColorModel for GrayNoAlphaModel {
    const ID: ColorModelId = ColorModelId::GrayNoAlpha;
    const CHANNEL_NAMES: &'static [&'static str] = GrayModel::CHANNEL_NAMES;

    fn to_rgb(color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        GrayModel::to_rgb(color, alpha)
    }

    fn from_rgb(rgb: [f64; 3], alpha: f64, color: &mut [f64]) -> f64 {
        GrayModel::from_rgb(rgb, alpha, color)
    }
}

/// Coverage only. The coverage is exchanged as LAB lightness over an opaque
/// pixel, so a mask survives a trip through any other model.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaModel;

impl ColorModel for AlphaModel {
    const ID: ColorModelId = ColorModelId::Alpha;
    const CHANNEL_NAMES: &'static [&'static str] = &[];

    fn to_lab(_color: &[f64], alpha: f64) -> ([f64; 3], f64) {
        ([alpha * 100.0, 0.0, 0.0], 1.0)
    }

    fn from_lab(lab: [f64; 3], _alpha: f64, _color: &mut [f64]) -> f64 {
        lab[0] / 100.0
    }
}
