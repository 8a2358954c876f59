//! Buffer descriptors and usage flags.

use bitflags::bitflags;

bitflags! {
    /// How a buffer may be used by the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Bound as a vertex buffer.
        const VERTEX = 1 << 0;
        /// Bound as an index buffer.
        const INDEX = 1 << 1;
        /// Bound as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Written from the CPU after creation.
        const COPY_DST = 1 << 3;
        /// Read back to the CPU.
        const COPY_SRC = 1 << 4;
    }
}

/// Describes a buffer to be created on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Debug label carried through to backend objects and logs.
    pub label: String,
    /// Size in bytes. Must be non-zero.
    pub size: u64,
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    pub fn new(label: impl Into<String>, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: label.into(),
            size,
            usage,
        }
    }

    /// Descriptor for a vertex buffer that is filled once from the CPU.
    pub fn vertex(label: impl Into<String>, size: u64) -> Self {
        Self::new(label, size, BufferUsage::VERTEX | BufferUsage::COPY_DST)
    }

    /// Descriptor for an index buffer that is filled once from the CPU.
    pub fn index(label: impl Into<String>, size: u64) -> Self {
        Self::new(label, size, BufferUsage::INDEX | BufferUsage::COPY_DST)
    }

    /// Descriptor for a uniform buffer updated from the CPU.
    pub fn uniform(label: impl Into<String>, size: u64) -> Self {
        Self::new(label, size, BufferUsage::UNIFORM | BufferUsage::COPY_DST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_flags_combine() {
        let usage = BufferUsage::VERTEX | BufferUsage::COPY_DST;
        assert!(usage.contains(BufferUsage::VERTEX));
        assert!(usage.contains(BufferUsage::COPY_DST));
        assert!(!usage.contains(BufferUsage::INDEX));
    }

    #[test]
    fn test_shorthand_descriptors_carry_copy_dst() {
        assert!(BufferDescriptor::vertex("v", 64)
            .usage
            .contains(BufferUsage::COPY_DST));
        assert!(BufferDescriptor::index("i", 64)
            .usage
            .contains(BufferUsage::INDEX));
        assert_eq!(BufferDescriptor::uniform("u", 256).size, 256);
    }
}
