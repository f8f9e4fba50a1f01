//! Fixtures shared by the pigment benchmarks.

use pigment_core::{ColorSpaceRegistry, Rect};
use pigment_ops::OpsResult;
use pigment_ops::device::PaintDevice;

/// Opaque RGB8 square with a deterministic non-flat pattern.
pub fn pattern(registry: &ColorSpaceRegistry, size: i32) -> OpsResult<PaintDevice> {
    let bounds = Rect::new(0, 0, size, size);
    let data = bounds
        .iter_coords()
        .flat_map(|(x, y)| [(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x ^ y) % 256) as u8, 255])
        .collect();
    PaintDevice::from_bytes(registry.rgb8()?, bounds, data)
}
