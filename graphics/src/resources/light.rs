//! Light kinds and their shader-visible data blocks.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// Kind of a light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Ambient,
}

impl LightKind {
    /// Discriminant written into [`LightData::kind`].
    pub const fn raw(&self) -> u32 {
        match self {
            Self::Directional => 0,
            Self::Point => 1,
            Self::Ambient => 2,
        }
    }
}

/// Shader-visible light block as packed into the lights buffer.
///
/// Every kind shares one stride; `direction` matters only for directional
/// lights and `position` only for point lights. The `w` components carry
/// intensity (`color`) and range (`position`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub kind: u32,
    pub _pad: [u32; 3],
    pub color: [f32; 4],
    pub direction: [f32; 4],
    pub position: [f32; 4],
}

const_assert_eq!(std::mem::size_of::<LightData>(), 64);

impl LightData {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn directional(color: [f32; 3], intensity: f32, direction: [f32; 3]) -> Self {
        Self {
            kind: LightKind::Directional.raw(),
            _pad: [0; 3],
            color: [color[0], color[1], color[2], intensity],
            direction: [direction[0], direction[1], direction[2], 0.0],
            position: [0.0; 4],
        }
    }

    pub fn point(color: [f32; 3], intensity: f32, position: [f32; 3], range: f32) -> Self {
        Self {
            kind: LightKind::Point.raw(),
            _pad: [0; 3],
            color: [color[0], color[1], color[2], intensity],
            direction: [0.0; 4],
            position: [position[0], position[1], position[2], range],
        }
    }

    pub fn ambient(color: [f32; 3], intensity: f32) -> Self {
        Self {
            kind: LightKind::Ambient.raw(),
            _pad: [0; 3],
            color: [color[0], color[1], color[2], intensity],
            direction: [0.0; 4],
            position: [0.0; 4],
        }
    }
}

/// A light registered in the lights table.
#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub data: LightData,
    /// Whether the shadowing pass renders a shadow map for this light.
    pub casts_shadows: bool,
}

impl Light {
    pub fn new(kind: LightKind, data: LightData) -> Self {
        debug_assert_eq!(data.kind, kind.raw(), "light data kind mismatch");
        Self {
            kind,
            data,
            casts_shadows: false,
        }
    }

    pub fn with_shadows(mut self) -> Self {
        self.casts_shadows = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_data_stride_is_stable() {
        assert_eq!(LightData::SIZE, 64);
        let light = LightData::point([1.0, 1.0, 1.0], 2.0, [0.0, 3.0, 0.0], 10.0);
        assert_eq!(light.kind, LightKind::Point.raw());
        assert_eq!(light.position[3], 10.0);
        assert_eq!(light.color[3], 2.0);
    }

    #[test]
    fn test_shadow_flag_defaults_off() {
        let light = Light::new(
            LightKind::Directional,
            LightData::directional([1.0; 3], 1.0, [0.0, -1.0, 0.0]),
        );
        assert!(!light.casts_shadows);
        assert!(light.with_shadows().casts_shadows);
    }
}
