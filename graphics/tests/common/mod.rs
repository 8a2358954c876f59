//! Shared fixtures for graphics integration tests.
//!
//! Everything here goes through the public API only: fixtures record work
//! into command lists exactly the way a producer thread would.

use firethorn_graphics::backend::RecordedOp;
use firethorn_graphics::{
    DrawDesc, DummyBackend, Extent2d, FrameSlots, GraphicsCommandList, GraphicsCommands, Light,
    LightData, LightHandle, LightKind, MaterialHandle, MaterialKind, MaterialParams,
    ResourceHandle, TextureFormat, Viewport,
};
use firethorn_service::OutSlot;

/// Initialize logging for test output.
pub fn init_logs() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .is_test(true)
        .try_init();
}

pub const FRAME_EXTENT: Extent2d = Extent2d {
    width: 64,
    height: 64,
};

/// Viewport covering the whole test frame.
pub fn frame_viewport() -> Viewport {
    Viewport::of_extent(FRAME_EXTENT)
}

/// Indexed unit quad in the XY plane.
pub const QUAD_VERTICES: [[f32; 3]; 4] = [
    [-0.5, -0.5, 0.0],
    [0.5, -0.5, 0.0],
    [-0.5, 0.5, 0.0],
    [0.5, 0.5, 0.0],
];
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// Every per-frame target set a full deferred frame renders into.
pub struct FrameTargets {
    pub albedo: OutSlot<FrameSlots<ResourceHandle>>,
    pub normal: OutSlot<FrameSlots<ResourceHandle>>,
    pub depth: OutSlot<FrameSlots<ResourceHandle>>,
    pub shadow_map: OutSlot<FrameSlots<ResourceHandle>>,
    pub shadow_mask: OutSlot<FrameSlots<ResourceHandle>>,
    pub light_accumulation: OutSlot<FrameSlots<ResourceHandle>>,
    pub final_color: OutSlot<FrameSlots<ResourceHandle>>,
}

/// Records creation of the full deferred target set.
pub fn record_frame_targets(list: &mut GraphicsCommandList<DummyBackend>) -> FrameTargets {
    FrameTargets {
        albedo: list.create_frame_targets("gbuffer_albedo", FRAME_EXTENT, TextureFormat::Rgba8Unorm),
        normal: list.create_frame_targets("gbuffer_normal", FRAME_EXTENT, TextureFormat::Rgba16Float),
        depth: list.create_frame_targets("gbuffer_depth", FRAME_EXTENT, TextureFormat::Depth32Float),
        shadow_map: list.create_frame_targets("shadow_map", FRAME_EXTENT, TextureFormat::Depth32Float),
        shadow_mask: list.create_frame_targets("shadow_mask", FRAME_EXTENT, TextureFormat::R8Unorm),
        light_accumulation: list.create_frame_targets(
            "light_accumulation",
            FRAME_EXTENT,
            TextureFormat::Rgba16Float,
        ),
        final_color: list.create_frame_targets("final_color", FRAME_EXTENT, TextureFormat::Rgba8Unorm),
    }
}

/// Handles of a one-quad scene with a single directional light.
pub struct SceneHandles {
    pub vertices: OutSlot<ResourceHandle>,
    pub indices: OutSlot<ResourceHandle>,
    pub material: OutSlot<MaterialHandle>,
    pub light: OutSlot<LightHandle>,
    pub lights_buffer: OutSlot<ResourceHandle>,
    pub light_data: LightData,
}

/// Records creation of the scene and stages its light for upload.
pub fn record_scene(
    list: &mut GraphicsCommandList<DummyBackend>,
    casts_shadows: bool,
) -> SceneHandles {
    let vertices = list.create_vertex_buffer("quad_vertices", &QUAD_VERTICES);
    let indices = list.create_index_buffer("quad_indices", &QUAD_INDICES);
    let material = list.create_material(MaterialKind::Phong, MaterialParams::default());

    let light_data = LightData::directional([1.0, 1.0, 1.0], 1.0, [0.0, -1.0, 0.0]);
    let mut light = Light::new(LightKind::Directional, light_data);
    if casts_shadows {
        light = light.with_shadows();
    }
    let light = list.create_light(light);
    let lights_buffer = list.create_lights_buffer("scene_lights", 4);
    list.stage_light_upload(&lights_buffer, &light);

    SceneHandles {
        vertices,
        indices,
        material,
        light,
        lights_buffer,
        light_data,
    }
}

/// One indexed draw of the scene quad.
pub fn quad_draw(scene: &SceneHandles) -> DrawDesc {
    DrawDesc {
        vertex_buffer: scene.vertices.clone(),
        index_buffer: Some(scene.indices.clone()),
        count: QUAD_INDICES.len() as u32,
        material: scene.material.clone(),
    }
}

/// Labels of every `BeginPass` op, in recording order.
pub fn begin_labels(ops: &[RecordedOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            RecordedOp::BeginPass { label, .. } => Some(label.clone()),
            _ => None,
        })
        .collect()
}
