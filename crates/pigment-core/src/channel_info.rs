//! Runtime channel descriptors and channel selection flags.
//!
//! A color space publishes one [`ChannelInfo`] per channel, in storage
//! order. Storage order and display order can differ (BGR layouts store
//! blue first but present red first), so the two index spaces are kept
//! apart and converted only through [`channel_index_to_display_position`]
//! and [`display_position_to_channel_index`].

use crate::channel::ChannelValueType;
use std::fmt;

/// Whether a channel carries color or coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// A color component
    Color,
    /// The alpha (coverage) channel
    Alpha,
}

/// Description of one channel of a pixel layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Human readable name ("Red", "Alpha", ...)
    pub name: String,
    /// Byte offset of the channel inside a pixel
    pub position: usize,
    /// Storage index of the channel
    pub index: usize,
    /// Index of the channel when presented to a user
    pub display_position: usize,
    /// Native numeric type
    pub value_type: ChannelValueType,
    /// Color or alpha
    pub kind: ChannelKind,
}

impl ChannelInfo {
    /// Size of the channel in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.value_type.size()
    }

    /// Returns `true` for the alpha channel.
    #[inline]
    pub fn is_alpha(&self) -> bool {
        self.kind == ChannelKind::Alpha
    }
}

/// Maps a storage index to its display position.
#[inline]
pub fn channel_index_to_display_position(channels: &[ChannelInfo], index: usize) -> usize {
    debug_assert!(index < channels.len());
    channels[index].display_position
}

/// Maps a display position back to the storage index showing there.
///
/// Inverse of [`channel_index_to_display_position`].
pub fn display_position_to_channel_index(channels: &[ChannelInfo], display: usize) -> usize {
    debug_assert!(display < channels.len());
    channels
        .iter()
        .position(|c| c.display_position == display)
        .unwrap_or(display)
}

// ============================================================================
// ChannelFlags
// ============================================================================

/// Set of storage channel indices an operation may write.
///
/// The empty set means "all channels", so a default-constructed value
/// never silently disables an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelFlags(u32);

impl ChannelFlags {
    /// Selects every channel.
    pub const ALL: ChannelFlags = ChannelFlags(0);

    /// Builds a set from storage indices.
    pub fn from_indices(indices: &[usize]) -> Self {
        let mut flags = Self(0);
        for &i in indices {
            flags = flags.with(i);
        }
        flags
    }

    /// Selects the first `count` channels except `alpha_pos`.
    pub fn color_only(count: usize, alpha_pos: Option<usize>) -> Self {
        let mut flags = Self(0);
        for i in (0..count).filter(|&i| Some(i) != alpha_pos) {
            flags = flags.with(i);
        }
        flags
    }

    /// Returns a copy with `index` selected.
    #[inline]
    pub const fn with(self, index: usize) -> Self {
        debug_assert!(index < 32);
        Self(self.0 | (1 << index))
    }

    /// Returns `true` when no explicit selection was made.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if channel `index` may be written.
    #[inline]
    pub const fn test(self, index: usize) -> bool {
        self.0 == 0 || (self.0 >> index) & 1 == 1
    }

    /// Returns `true` if `index` is explicitly selected.
    #[inline]
    pub const fn contains(self, index: usize) -> bool {
        (self.0 >> index) & 1 == 1
    }
}

impl fmt::Display for ChannelFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("all")
        } else {
            write!(f, "{:#b}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra() -> Vec<ChannelInfo> {
        let names = ["Blue", "Green", "Red", "Alpha"];
        let display = [2, 1, 0, 3];
        (0..4)
            .map(|i| ChannelInfo {
                name: names[i].to_string(),
                position: i,
                index: i,
                display_position: display[i],
                value_type: ChannelValueType::UInt8,
                kind: if i == 3 {
                    ChannelKind::Alpha
                } else {
                    ChannelKind::Color
                },
            })
            .collect()
    }

    #[test]
    fn test_display_mapping_inverts() {
        let channels = bgra();
        for i in 0..4 {
            let d = channel_index_to_display_position(&channels, i);
            assert_eq!(display_position_to_channel_index(&channels, d), i);
        }
        assert_eq!(display_position_to_channel_index(&channels, 0), 2);
    }

    #[test]
    fn test_flags_empty_means_all() {
        let flags = ChannelFlags::default();
        assert!(flags.test(0) && flags.test(7));
        assert!(!flags.contains(0));
    }

    #[test]
    fn test_color_only() {
        let flags = ChannelFlags::color_only(4, Some(3));
        assert!(flags.test(0) && flags.test(2));
        assert!(!flags.test(3));
        assert_eq!(ChannelFlags::from_indices(&[0, 1, 2]), flags);
    }
}
