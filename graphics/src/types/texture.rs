//! Texture descriptors, formats and usage flags.

use bitflags::bitflags;

use super::common::Extent2d;

/// Texel formats supported by the deferred pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    R8Unorm,
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_texel(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rgba8Unorm | Self::Bgra8Unorm | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
        }
    }

    pub const fn is_depth(&self) -> bool {
        matches!(self, Self::Depth32Float)
    }
}

bitflags! {
    /// How a texture may be used by the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled from shaders.
        const SAMPLED = 1 << 0;
        /// Color attachment of a render pass.
        const RENDER_TARGET = 1 << 1;
        /// Depth attachment of a render pass.
        const DEPTH_TARGET = 1 << 2;
        /// Written from the CPU after creation.
        const COPY_DST = 1 << 3;
    }
}

/// Describes a texture to be created on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label carried through to backend objects and logs.
    pub label: String,
    pub extent: Extent2d,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    pub fn new(
        label: impl Into<String>,
        extent: Extent2d,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label: label.into(),
            extent,
            format,
            usage,
        }
    }

    /// Descriptor for a sampled color render target.
    pub fn render_target(label: impl Into<String>, extent: Extent2d, format: TextureFormat) -> Self {
        Self::new(
            label,
            extent,
            format,
            TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED,
        )
    }

    /// Descriptor for a sampled depth target.
    pub fn depth_target(label: impl Into<String>, extent: Extent2d) -> Self {
        Self::new(
            label,
            extent,
            TextureFormat::Depth32Float,
            TextureUsage::DEPTH_TARGET | TextureUsage::SAMPLED,
        )
    }

    /// Total byte size of the texture's contents.
    pub fn byte_size(&self) -> u64 {
        self.extent.texel_count() * self.format.bytes_per_texel() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TextureFormat::R8Unorm, 1)]
    #[case(TextureFormat::Rgba8Unorm, 4)]
    #[case(TextureFormat::Bgra8Unorm, 4)]
    #[case(TextureFormat::Rgba16Float, 8)]
    #[case(TextureFormat::Depth32Float, 4)]
    fn test_bytes_per_texel(#[case] format: TextureFormat, #[case] expected: u32) {
        assert_eq!(format.bytes_per_texel(), expected);
    }

    #[test]
    fn test_byte_size_scales_with_extent_and_format() {
        let desc = TextureDescriptor::render_target(
            "gbuffer_albedo",
            Extent2d::new(128, 64),
            TextureFormat::Rgba16Float,
        );
        assert_eq!(desc.byte_size(), 128 * 64 * 8);
    }

    #[test]
    fn test_depth_target_shorthand() {
        let desc = TextureDescriptor::depth_target("depth", Extent2d::new(4, 4));
        assert!(desc.format.is_depth());
        assert!(desc.usage.contains(TextureUsage::DEPTH_TARGET));
        assert!(!desc.usage.contains(TextureUsage::RENDER_TARGET));
    }
}
