//! Shared value types used across descriptors and passes.

/// Two-dimensional size in texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total number of texels covered by the extent.
    pub const fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Extent2d {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Rectangular region of a render target, in texels.
///
/// Depth range is fixed to `0..=1`; passes that need less clip in the
/// shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering a whole target of the given extent.
    pub fn of_extent(extent: Extent2d) -> Self {
        Self::new(0.0, 0.0, extent.width as f32, extent.height as f32)
    }
}
