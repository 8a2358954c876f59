//! Material kinds and shading parameters.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use crate::backend::PipelineId;

/// Shading model of a material. Each kind maps to one geometry pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Lambert,
    Phong,
}

impl MaterialKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Lambert => "lambert",
            Self::Phong => "phong",
        }
    }
}

/// Shader-visible material constants.
///
/// Layout is fixed; the block is written verbatim into uniform buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialParams {
    pub base_color: [f32; 4],
    pub specular: [f32; 3],
    pub shininess: f32,
}

const_assert_eq!(std::mem::size_of::<MaterialParams>(), 32);

impl MaterialParams {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Flat-colored matte parameters.
    pub fn matte(base_color: [f32; 4]) -> Self {
        Self {
            base_color,
            specular: [0.0; 3],
            shininess: 1.0,
        }
    }
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self::matte([1.0, 1.0, 1.0, 1.0])
    }
}

/// A material registered in the materials table.
#[derive(Debug, Clone)]
pub struct Material {
    pub kind: MaterialKind,
    pub params: MaterialParams,
    /// Geometry pipeline baked for this material's kind.
    pub pipeline: PipelineId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_block_is_pod() {
        let params = MaterialParams {
            base_color: [1.0, 0.5, 0.25, 1.0],
            specular: [0.1, 0.2, 0.3],
            shininess: 32.0,
        };
        let bytes: &[u8] = bytemuck::bytes_of(&params);
        assert_eq!(bytes.len(), MaterialParams::SIZE);
        let back: MaterialParams = bytemuck::pod_read_unaligned(bytes);
        assert_eq!(back, params);
    }

    #[test]
    fn test_kind_labels_are_distinct() {
        assert_ne!(MaterialKind::Lambert.label(), MaterialKind::Phong.label());
    }
}
