//! Native channel value types.
//!
//! Every pixel layout stores its channels as one of five numeric types. The
//! [`ChannelValue`] trait gives the pixel pipeline a uniform view over them:
//! range constants, lossless widening to `f64`, clamped narrowing back, and
//! the fixed-point scalings used at 8-bit and 16-bit boundaries.
//!
//! # Types
//!
//! | Type    | [`ChannelValueType`] | Unit value | Representable range |
//! |---------|----------------------|------------|---------------------|
//! | `u8`    | `UInt8`              | 255        | 0 ..= 255           |
//! | `u16`   | `UInt16`             | 65535      | 0 ..= 65535         |
//! | `f16`   | `Float16`            | 1.0        | ±65504              |
//! | `f32`   | `Float32`            | 1.0        | ±`f32::MAX`         |
//! | `f64`   | `Float64`            | 1.0        | ±`f64::MAX`         |
//!
//! Floating point channels may legitimately hold values outside `[0, 1]`
//! (HDR), so clamping only ever limits them to what the type can represent.
//!
//! # Raw access
//!
//! Pixel buffers are plain byte spans that carry no alignment guarantee.
//! [`read_channel`] and [`write_channel`] go through `bytemuck` unaligned
//! reads so any offset is valid.
//!
//! # Dependencies
//!
//! - `half` for `f16`
//! - `bytemuck` for unaligned reads and writes

use half::f16;
use std::fmt;

// ============================================================================
// Value type and depth ids
// ============================================================================

/// Runtime tag for the numeric type of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelValueType {
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// IEEE half precision float
    Float16,
    /// IEEE single precision float
    Float32,
    /// IEEE double precision float
    Float64,
}

impl ChannelValueType {
    /// Size of one value in bytes.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::UInt16 | Self::Float16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Returns `true` for the floating point types.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Native value of full intensity (`255`, `65535` or `1.0`).
    #[inline]
    pub const fn unit_value(self) -> f64 {
        match self {
            Self::UInt8 => u8::MAX as f64,
            Self::UInt16 => u16::MAX as f64,
            _ => 1.0,
        }
    }

    /// The color depth id that stores channels of this type.
    #[inline]
    pub const fn depth(self) -> ColorDepthId {
        match self {
            Self::UInt8 => ColorDepthId::U8,
            Self::UInt16 => ColorDepthId::U16,
            Self::Float16 => ColorDepthId::F16,
            Self::Float32 => ColorDepthId::F32,
            Self::Float64 => ColorDepthId::F64,
        }
    }
}

/// Color depth half of a color space id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorDepthId {
    /// 8 bits per channel, integer
    U8,
    /// 16 bits per channel, integer
    U16,
    /// 16 bits per channel, half float
    F16,
    /// 32 bits per channel, float
    F32,
    /// 64 bits per channel, float
    F64,
}

impl ColorDepthId {
    /// All depths, shallowest first.
    pub const ALL: [ColorDepthId; 5] = [Self::U8, Self::U16, Self::F16, Self::F32, Self::F64];

    /// Stable string id ("U8", "U16", "F16", "F32", "F64").
    pub const fn id(self) -> &'static str {
        match self {
            Self::U8 => "U8",
            Self::U16 => "U16",
            Self::F16 => "F16",
            Self::F32 => "F32",
            Self::F64 => "F64",
        }
    }

    /// Parses a string id as produced by [`ColorDepthId::id`].
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.id().eq_ignore_ascii_case(id))
    }

    /// The channel value type stored at this depth.
    pub const fn value_type(self) -> ChannelValueType {
        match self {
            Self::U8 => ChannelValueType::UInt8,
            Self::U16 => ChannelValueType::UInt16,
            Self::F16 => ChannelValueType::Float16,
            Self::F32 => ChannelValueType::Float32,
            Self::F64 => ChannelValueType::Float64,
        }
    }
}

impl fmt::Display for ColorDepthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ============================================================================
// ChannelValue
// ============================================================================

/// A native channel storage type.
///
/// All range constants are expressed as `f64` so generic code can do its
/// arithmetic in one wide type and narrow once on write-back.
pub trait ChannelValue: Copy + Default + PartialOrd + Send + Sync + bytemuck::Pod + 'static {
    /// Runtime tag for this type.
    const VALUE_TYPE: ChannelValueType;
    /// Whether this is a floating point type.
    const IS_FLOAT: bool;
    /// Value of a fully transparent alpha / black color channel.
    const ZERO: f64;
    /// Value of a fully opaque alpha / full-intensity color channel.
    const UNIT: f64;
    /// Midpoint between `ZERO` and `UNIT`.
    const HALF: f64;
    /// Smallest representable value.
    const MIN: f64;
    /// Largest representable value.
    const MAX: f64;

    /// Widens to `f64` without scaling.
    fn to_f64(self) -> f64;

    /// Narrows from `f64` without scaling: rounds integers to nearest and
    /// clamps to `[MIN, MAX]`.
    fn from_f64(v: f64) -> Self;

    /// Maps `[ZERO, UNIT]` onto `[0, 1]`.
    #[inline]
    fn to_normalized(self) -> f64 {
        self.to_f64() / Self::UNIT
    }

    /// Maps `[0, 1]` onto `[ZERO, UNIT]`, clamping to the representable range.
    #[inline]
    fn from_normalized(v: f64) -> Self {
        Self::from_f64(v * Self::UNIT)
    }

    /// Scales to the 8-bit range, clamping.
    #[inline]
    fn scale_to_u8(self) -> u8 {
        (self.to_normalized() * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Scales from the 8-bit range.
    #[inline]
    fn scale_from_u8(v: u8) -> Self {
        Self::from_normalized(v as f64 / 255.0)
    }

    /// Scales to the 16-bit range, clamping.
    #[inline]
    fn scale_to_u16(self) -> u16 {
        (self.to_normalized() * 65535.0).round().clamp(0.0, 65535.0) as u16
    }

    /// Scales from the 16-bit range.
    #[inline]
    fn scale_from_u16(v: u16) -> Self {
        Self::from_normalized(v as f64 / 65535.0)
    }
}

impl ChannelValue for u8 {
    const VALUE_TYPE: ChannelValueType = ChannelValueType::UInt8;
    const IS_FLOAT: bool = false;
    const ZERO: f64 = 0.0;
    const UNIT: f64 = 255.0;
    const HALF: f64 = 128.0;
    const MIN: f64 = 0.0;
    const MAX: f64 = 255.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v.round().clamp(<Self as ChannelValue>::MIN, <Self as ChannelValue>::MAX) as u8
    }

    #[inline]
    fn scale_to_u8(self) -> u8 {
        self
    }

    #[inline]
    fn scale_from_u8(v: u8) -> Self {
        v
    }

    #[inline]
    fn scale_to_u16(self) -> u16 {
        self as u16 * 257
    }

    #[inline]
    fn scale_from_u16(v: u16) -> Self {
        u16_to_u8(v)
    }
}

impl ChannelValue for u16 {
    const VALUE_TYPE: ChannelValueType = ChannelValueType::UInt16;
    const IS_FLOAT: bool = false;
    const ZERO: f64 = 0.0;
    const UNIT: f64 = 65535.0;
    const HALF: f64 = 32767.0;
    const MIN: f64 = 0.0;
    const MAX: f64 = 65535.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v.round().clamp(<Self as ChannelValue>::MIN, <Self as ChannelValue>::MAX) as u16
    }

    #[inline]
    fn scale_to_u8(self) -> u8 {
        u16_to_u8(self)
    }

    #[inline]
    fn scale_from_u8(v: u8) -> Self {
        v as u16 * 257
    }

    #[inline]
    fn scale_to_u16(self) -> u16 {
        self
    }

    #[inline]
    fn scale_from_u16(v: u16) -> Self {
        v
    }
}

impl ChannelValue for f16 {
    const VALUE_TYPE: ChannelValueType = ChannelValueType::Float16;
    const IS_FLOAT: bool = true;
    const ZERO: f64 = 0.0;
    const UNIT: f64 = 1.0;
    const HALF: f64 = 0.5;
    const MIN: f64 = -65504.0;
    const MAX: f64 = 65504.0;

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v.clamp(<Self as ChannelValue>::MIN, <Self as ChannelValue>::MAX))
    }
}

impl ChannelValue for f32 {
    const VALUE_TYPE: ChannelValueType = ChannelValueType::Float32;
    const IS_FLOAT: bool = true;
    const ZERO: f64 = 0.0;
    const UNIT: f64 = 1.0;
    const HALF: f64 = 0.5;
    const MIN: f64 = f32::MIN as f64;
    const MAX: f64 = f32::MAX as f64;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v.clamp(<Self as ChannelValue>::MIN, <Self as ChannelValue>::MAX) as f32
    }
}

impl ChannelValue for f64 {
    const VALUE_TYPE: ChannelValueType = ChannelValueType::Float64;
    const IS_FLOAT: bool = true;
    const ZERO: f64 = 0.0;
    const UNIT: f64 = 1.0;
    const HALF: f64 = 0.5;
    const MIN: f64 = f64::MIN;
    const MAX: f64 = f64::MAX;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

/// Rounded 16 → 8 bit reduction.
#[inline]
pub const fn u16_to_u8(v: u16) -> u8 {
    let c = v as u32;
    ((c - (c >> 8) + 128) >> 8) as u8
}

// ============================================================================
// Raw access
// ============================================================================

/// Reads channel `index` of type `T` from a pixel's bytes.
///
/// Precondition: `pixel.len() >= (index + 1) * size_of::<T>()`.
#[inline]
pub fn read_channel<T: ChannelValue>(pixel: &[u8], index: usize) -> T {
    let size = std::mem::size_of::<T>();
    let start = index * size;
    bytemuck::pod_read_unaligned(&pixel[start..start + size])
}

/// Writes channel `index` of type `T` into a pixel's bytes.
#[inline]
pub fn write_channel<T: ChannelValue>(pixel: &mut [u8], index: usize, value: T) {
    let size = std::mem::size_of::<T>();
    let start = index * size;
    pixel[start..start + size].copy_from_slice(bytemuck::bytes_of(&value));
}

/// Reads a value of the given runtime type at a byte offset, widened to f64.
///
/// Used where the channel type is only known at runtime (float
/// representations, generic readers).
#[inline]
pub fn read_as_f64(value_type: ChannelValueType, bytes: &[u8], offset: usize) -> f64 {
    let b = &bytes[offset..offset + value_type.size()];
    match value_type {
        ChannelValueType::UInt8 => b[0] as f64,
        ChannelValueType::UInt16 => bytemuck::pod_read_unaligned::<u16>(b) as f64,
        ChannelValueType::Float16 => bytemuck::pod_read_unaligned::<f16>(b).to_f64(),
        ChannelValueType::Float32 => bytemuck::pod_read_unaligned::<f32>(b) as f64,
        ChannelValueType::Float64 => bytemuck::pod_read_unaligned::<f64>(b),
    }
}

/// Narrows `v` into the given runtime type at a byte offset, with the same
/// rounding and clamping as [`ChannelValue::from_f64`].
#[inline]
pub fn write_from_f64(value_type: ChannelValueType, bytes: &mut [u8], offset: usize, v: f64) {
    let b = &mut bytes[offset..offset + value_type.size()];
    match value_type {
        ChannelValueType::UInt8 => b[0] = u8::from_f64(v),
        ChannelValueType::UInt16 => b.copy_from_slice(bytemuck::bytes_of(&u16::from_f64(v))),
        ChannelValueType::Float16 => {
            b.copy_from_slice(bytemuck::bytes_of(&<f16 as ChannelValue>::from_f64(v)))
        }
        ChannelValueType::Float32 => b.copy_from_slice(bytemuck::bytes_of(&f32::from_f64(v))),
        ChannelValueType::Float64 => b.copy_from_slice(bytemuck::bytes_of(&f64::from_f64(v))),
    }
}
