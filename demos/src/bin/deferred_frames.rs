//! # Deferred Frames Demo
//!
//! Demonstrates:
//! - Creating a [`GraphicsService`] over the dummy backend
//! - Recording command lists from a producer thread
//! - Waiting on submission tickets while the main thread drains
//! - A full deferred frame: uploads, G-buffer, shadows, lighting,
//!   composition and an overlay

use std::thread;
use std::time::Duration;

use firethorn_graphics::{
    CommandSetHandle, CompositionPassDesc, DrawDesc, DummyBackend, Extent2d, FrameSlots,
    GeometryPassDesc, GraphicsCommandList, GraphicsCommands, GraphicsConfig, GraphicsService,
    Light, LightData, LightHandle, LightKind, LightingPassDesc, MaterialHandle, MaterialKind,
    MaterialParams, OverlayHandle, OverlayPassDesc, PassId, ResourceHandle,
    ShadowCompositionPassDesc, ShadowingPassDesc, TextureFormat, Viewport,
};
use firethorn_service::{OutSlot, Service};

const FRAMES: u64 = 120;
const EXTENT: Extent2d = Extent2d {
    width: 1280,
    height: 720,
};

// === Scene setup ===

/// Handles every frame re-uses, created once up front.
#[derive(Clone)]
struct Scene {
    set: OutSlot<CommandSetHandle>,
    albedo: OutSlot<FrameSlots<ResourceHandle>>,
    normal: OutSlot<FrameSlots<ResourceHandle>>,
    depth: OutSlot<FrameSlots<ResourceHandle>>,
    shadow_map: OutSlot<FrameSlots<ResourceHandle>>,
    shadow_mask: OutSlot<FrameSlots<ResourceHandle>>,
    light_accumulation: OutSlot<FrameSlots<ResourceHandle>>,
    final_color: OutSlot<FrameSlots<ResourceHandle>>,
    vertices: OutSlot<ResourceHandle>,
    indices: OutSlot<ResourceHandle>,
    instance: OutSlot<ResourceHandle>,
    material: OutSlot<MaterialHandle>,
    light: OutSlot<LightHandle>,
    lights_buffer: OutSlot<ResourceHandle>,
    overlay: OutSlot<OverlayHandle>,
}

fn record_setup(list: &mut GraphicsCommandList<DummyBackend>) -> Scene {
    let quad = [
        [-0.5f32, -0.5, 0.0],
        [0.5, -0.5, 0.0],
        [-0.5, 0.5, 0.0],
        [0.5, 0.5, 0.0],
    ];
    Scene {
        set: list.create_command_set("frame"),
        albedo: list.create_frame_targets("gbuffer_albedo", EXTENT, TextureFormat::Rgba8Unorm),
        normal: list.create_frame_targets("gbuffer_normal", EXTENT, TextureFormat::Rgba16Float),
        depth: list.create_frame_targets("gbuffer_depth", EXTENT, TextureFormat::Depth32Float),
        shadow_map: list.create_frame_targets("shadow_map", EXTENT, TextureFormat::Depth32Float),
        shadow_mask: list.create_frame_targets("shadow_mask", EXTENT, TextureFormat::R8Unorm),
        light_accumulation: list.create_frame_targets(
            "light_accumulation",
            EXTENT,
            TextureFormat::Rgba16Float,
        ),
        final_color: list.create_frame_targets("final_color", EXTENT, TextureFormat::Rgba8Unorm),
        vertices: list.create_vertex_buffer("quad_vertices", &quad),
        indices: list.create_index_buffer("quad_indices", &[0u32, 1, 2, 2, 1, 3]),
        instance: list.create_uniform_buffer("instance_data", 0u64),
        material: list.create_material(MaterialKind::Phong, MaterialParams::default()),
        light: list.create_light(
            Light::new(
                LightKind::Directional,
                LightData::directional([1.0, 0.98, 0.92], 1.2, [0.3, -1.0, 0.2]),
            )
            .with_shadows(),
        ),
        lights_buffer: list.create_lights_buffer("scene_lights", 8),
        overlay: list.create_overlay("hud", 6),
    }
}

// === Frame recording ===

fn record_frame(list: &mut GraphicsCommandList<DummyBackend>, scene: &Scene, frame: u64) {
    list.bind_command_set(&scene.set);
    list.update_buffer(&scene.instance, 0, bytemuck::bytes_of(&frame).to_vec());
    list.stage_light_upload(&scene.lights_buffer, &scene.light);
    list.schedule_pass(PassId::LightUpload);

    let viewport = Viewport::of_extent(EXTENT);
    let draw = DrawDesc {
        vertex_buffer: scene.vertices.clone(),
        index_buffer: Some(scene.indices.clone()),
        count: 6,
        material: scene.material.clone(),
    };
    list.schedule_geometry_pass(GeometryPassDesc {
        albedo: scene.albedo.clone(),
        normal: scene.normal.clone(),
        depth: scene.depth.clone(),
        draws: vec![draw.clone()],
        clear_color: [0.02, 0.02, 0.05, 1.0],
        viewport,
    });
    list.schedule_shadowing_pass(ShadowingPassDesc {
        shadow_map: scene.shadow_map.clone(),
        casters: vec![draw],
    });
    list.schedule_shadow_composition_pass(ShadowCompositionPassDesc {
        shadow_map: scene.shadow_map.clone(),
        output: scene.shadow_mask.clone(),
        viewport,
    });
    list.schedule_lighting_pass(LightingPassDesc {
        albedo: scene.albedo.clone(),
        normal: scene.normal.clone(),
        depth: scene.depth.clone(),
        lights_buffer: scene.lights_buffer.clone(),
        output: scene.light_accumulation.clone(),
        viewport,
    });
    list.schedule_composition_pass(CompositionPassDesc {
        light_accumulation: scene.light_accumulation.clone(),
        shadow_mask: Some(scene.shadow_mask.clone()),
        target: scene.final_color.clone(),
        viewport,
    });
    list.schedule_overlay_pass(OverlayPassDesc {
        overlay: scene.overlay.clone(),
        target: scene.final_color.clone(),
    });
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    firethorn_graphics::init();

    let mut service = GraphicsService::new(&GraphicsConfig::default(), DummyBackend::new());
    let proxy = service.proxy();

    let mut setup = proxy.create_command_list();
    let scene = record_setup(&mut setup);
    proxy.submit_command_list(setup);
    service.update().expect("setup cycle failed");

    let producer = {
        let proxy = proxy.clone();
        let scene = scene.clone();
        thread::spawn(move || {
            for frame in 0..FRAMES {
                let mut list = proxy.create_command_list();
                record_frame(&mut list, &scene, frame);
                let ticket = proxy.submit_command_list(list);
                if !proxy.wait_for(ticket, Duration::from_secs(1)) {
                    log::warn!("frame {frame} was not drained within a second");
                }
            }
            log::info!("producer recorded {FRAMES} frames");
        })
    };

    while !producer.is_finished() {
        service.update().expect("frame cycle failed");
        thread::sleep(Duration::from_millis(1));
    }
    producer.join().expect("producer thread panicked");
    // One more cycle in case the producer's last list raced past the check.
    service.update().expect("final cycle failed");

    let view = service.view();
    log::info!(
        "done: progress {}, {} resources, {} lights, {} backend submissions",
        service.progress(),
        view.resource_count(),
        view.light_count(),
        service.backend().submit_count()
    );
}
