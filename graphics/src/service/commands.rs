//! Builder methods producers call on a graphics command list.
//!
//! Every builder pushes one deferred closure onto the list. Inputs arrive as
//! [`OutSlot`]s so a command can consume handles produced by an earlier
//! command, even one in the same list; outputs come back as slots the
//! closure fulfills during execution. A handle obtained outside the command
//! stream feeds in through [`OutSlot::ready`].
//!
//! Resolution happens at execution time on the drain thread. A slot whose
//! producing command never ran fails the consuming command with
//! [`GraphicsError::UnfulfilledDependency`], which aborts the cycle.

use firethorn_service::OutSlot;

use crate::backend::RenderBackend;
use crate::error::{GraphicsError, GraphicsResult};
use crate::frame::FrameSlots;
use crate::pipeline::{
    CompositionConfig, DrawCall, GeometryConfig, LightingConfig, OverlayConfig, PassId,
    ShadowCompositionConfig, ShadowingConfig,
};
use crate::resources::{
    CommandSetHandle, Light, LightData, LightHandle, MaterialHandle, MaterialKind, MaterialParams,
    OverlayHandle, ResourceHandle,
};
use crate::service::GraphicsCommandList;
use crate::types::{BufferDescriptor, Extent2d, TextureDescriptor, TextureFormat, Viewport};

/// Resolves a dependency slot, naming the input when it is missing.
fn resolve<T: Clone>(slot: &OutSlot<T>, what: &'static str) -> GraphicsResult<T> {
    slot.get().ok_or(GraphicsError::UnfulfilledDependency(what))
}

/// One draw, described with dependency slots instead of handles.
#[derive(Clone)]
pub struct DrawDesc {
    pub vertex_buffer: OutSlot<ResourceHandle>,
    pub index_buffer: Option<OutSlot<ResourceHandle>>,
    /// Index count when indexed, vertex count otherwise.
    pub count: u32,
    pub material: OutSlot<MaterialHandle>,
}

impl DrawDesc {
    fn resolve(&self) -> GraphicsResult<DrawCall> {
        Ok(DrawCall {
            vertex_buffer: resolve(&self.vertex_buffer, "vertex buffer")?,
            index_buffer: self
                .index_buffer
                .as_ref()
                .map(|slot| resolve(slot, "index buffer"))
                .transpose()?,
            count: self.count,
            material: resolve(&self.material, "material")?,
        })
    }
}

fn resolve_draws(draws: &[DrawDesc]) -> GraphicsResult<Vec<DrawCall>> {
    draws.iter().map(DrawDesc::resolve).collect()
}

/// Slot-flavored [`GeometryConfig`].
#[derive(Clone)]
pub struct GeometryPassDesc {
    pub albedo: OutSlot<FrameSlots<ResourceHandle>>,
    pub normal: OutSlot<FrameSlots<ResourceHandle>>,
    pub depth: OutSlot<FrameSlots<ResourceHandle>>,
    pub draws: Vec<DrawDesc>,
    pub clear_color: [f32; 4],
    pub viewport: Viewport,
}

/// Slot-flavored [`ShadowingConfig`].
#[derive(Clone)]
pub struct ShadowingPassDesc {
    pub shadow_map: OutSlot<FrameSlots<ResourceHandle>>,
    pub casters: Vec<DrawDesc>,
}

/// Slot-flavored [`ShadowCompositionConfig`].
#[derive(Clone)]
pub struct ShadowCompositionPassDesc {
    pub shadow_map: OutSlot<FrameSlots<ResourceHandle>>,
    pub output: OutSlot<FrameSlots<ResourceHandle>>,
    pub viewport: Viewport,
}

/// Slot-flavored [`LightingConfig`].
#[derive(Clone)]
pub struct LightingPassDesc {
    pub albedo: OutSlot<FrameSlots<ResourceHandle>>,
    pub normal: OutSlot<FrameSlots<ResourceHandle>>,
    pub depth: OutSlot<FrameSlots<ResourceHandle>>,
    pub lights_buffer: OutSlot<ResourceHandle>,
    pub output: OutSlot<FrameSlots<ResourceHandle>>,
    pub viewport: Viewport,
}

/// Slot-flavored [`CompositionConfig`].
#[derive(Clone)]
pub struct CompositionPassDesc {
    pub light_accumulation: OutSlot<FrameSlots<ResourceHandle>>,
    pub shadow_mask: Option<OutSlot<FrameSlots<ResourceHandle>>>,
    pub target: OutSlot<FrameSlots<ResourceHandle>>,
    pub viewport: Viewport,
}

/// Slot-flavored [`OverlayConfig`].
#[derive(Clone)]
pub struct OverlayPassDesc {
    pub overlay: OutSlot<OverlayHandle>,
    pub target: OutSlot<FrameSlots<ResourceHandle>>,
}

/// Graphics builders over [`GraphicsCommandList`].
pub trait GraphicsCommands<B: RenderBackend> {
    /// Creates a command set the graph can record into.
    fn create_command_set(&mut self, label: impl Into<String>) -> OutSlot<CommandSetHandle>;

    /// Selects the command set this cycle's graph records into.
    fn bind_command_set(&mut self, set: &OutSlot<CommandSetHandle>);

    /// Creates an empty buffer from a descriptor.
    fn create_buffer(&mut self, desc: BufferDescriptor) -> OutSlot<ResourceHandle>;

    /// Creates a vertex buffer holding `vertices`.
    fn create_vertex_buffer<V: bytemuck::Pod>(
        &mut self,
        label: impl Into<String>,
        vertices: &[V],
    ) -> OutSlot<ResourceHandle>;

    /// Creates an index buffer holding `indices`.
    fn create_index_buffer(
        &mut self,
        label: impl Into<String>,
        indices: &[u32],
    ) -> OutSlot<ResourceHandle>;

    /// Creates a uniform buffer holding `contents`.
    fn create_uniform_buffer<T: bytemuck::Pod>(
        &mut self,
        label: impl Into<String>,
        contents: T,
    ) -> OutSlot<ResourceHandle>;

    /// Creates an empty uniform buffer sized for `capacity` packed lights.
    fn create_lights_buffer(
        &mut self,
        label: impl Into<String>,
        capacity: usize,
    ) -> OutSlot<ResourceHandle>;

    /// Creates an empty texture from a descriptor.
    fn create_texture(&mut self, desc: TextureDescriptor) -> OutSlot<ResourceHandle>;

    /// Creates one render or depth target per frame slot.
    fn create_frame_targets(
        &mut self,
        label: impl Into<String>,
        extent: Extent2d,
        format: TextureFormat,
    ) -> OutSlot<FrameSlots<ResourceHandle>>;

    /// Creates a material; its geometry pipeline is cached per kind.
    fn create_material(
        &mut self,
        kind: MaterialKind,
        params: MaterialParams,
    ) -> OutSlot<MaterialHandle>;

    /// Registers a light.
    fn create_light(&mut self, light: Light) -> OutSlot<LightHandle>;

    /// Registers an overlay layer drawing `quad_count` quads.
    fn create_overlay(
        &mut self,
        label: impl Into<String>,
        quad_count: u32,
    ) -> OutSlot<OverlayHandle>;

    /// Writes bytes into a buffer immediately when the command executes.
    ///
    /// Immediate writes land in submission order, so when two lists write
    /// the same range in one cycle, the later submission wins.
    fn update_buffer(&mut self, buffer: &OutSlot<ResourceHandle>, offset: u64, data: Vec<u8>);

    /// Stages bytes for the buffer upload pass.
    fn stage_buffer_upload(&mut self, target: &OutSlot<ResourceHandle>, offset: u64, bytes: Vec<u8>);

    /// Stages texel data for the texture upload pass.
    fn stage_texture_upload(&mut self, target: &OutSlot<ResourceHandle>, bytes: Vec<u8>);

    /// Stages a light for packing into `buffer` by the light upload pass.
    fn stage_light_upload(&mut self, buffer: &OutSlot<ResourceHandle>, light: &OutSlot<LightHandle>);

    /// Schedules an already-configured pass. Upload passes need no
    /// configuration beyond their staged work.
    fn schedule_pass(&mut self, id: PassId);

    fn schedule_geometry_pass(&mut self, desc: GeometryPassDesc);

    fn schedule_shadowing_pass(&mut self, desc: ShadowingPassDesc);

    fn schedule_shadow_composition_pass(&mut self, desc: ShadowCompositionPassDesc);

    fn schedule_lighting_pass(&mut self, desc: LightingPassDesc);

    fn schedule_composition_pass(&mut self, desc: CompositionPassDesc);

    fn schedule_overlay_pass(&mut self, desc: OverlayPassDesc);

    /// Destroys a buffer or texture and frees its backend object.
    fn destroy_resource(&mut self, handle: &OutSlot<ResourceHandle>);

    fn destroy_material(&mut self, handle: &OutSlot<MaterialHandle>);

    fn destroy_light(&mut self, handle: &OutSlot<LightHandle>);

    fn destroy_command_set(&mut self, handle: &OutSlot<CommandSetHandle>);

    fn destroy_overlay(&mut self, handle: &OutSlot<OverlayHandle>);
}

impl<B: RenderBackend> GraphicsCommands<B> for GraphicsCommandList<B> {
    fn create_command_set(&mut self, label: impl Into<String>) -> OutSlot<CommandSetHandle> {
        let label = label.into();
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_command_set(&label)?);
            Ok(())
        });
        slot
    }

    fn bind_command_set(&mut self, set: &OutSlot<CommandSetHandle>) {
        let set = set.clone();
        self.push(move |api| api.bind_command_set(resolve(&set, "command set")?));
    }

    fn create_buffer(&mut self, desc: BufferDescriptor) -> OutSlot<ResourceHandle> {
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_buffer(&desc, None)?);
            Ok(())
        });
        slot
    }

    fn create_vertex_buffer<V: bytemuck::Pod>(
        &mut self,
        label: impl Into<String>,
        vertices: &[V],
    ) -> OutSlot<ResourceHandle> {
        let bytes = bytemuck::cast_slice::<V, u8>(vertices).to_vec();
        let desc = BufferDescriptor::vertex(label, bytes.len() as u64);
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_buffer(&desc, Some(&bytes))?);
            Ok(())
        });
        slot
    }

    fn create_index_buffer(
        &mut self,
        label: impl Into<String>,
        indices: &[u32],
    ) -> OutSlot<ResourceHandle> {
        let bytes = bytemuck::cast_slice::<u32, u8>(indices).to_vec();
        let desc = BufferDescriptor::index(label, bytes.len() as u64);
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_buffer(&desc, Some(&bytes))?);
            Ok(())
        });
        slot
    }

    fn create_uniform_buffer<T: bytemuck::Pod>(
        &mut self,
        label: impl Into<String>,
        contents: T,
    ) -> OutSlot<ResourceHandle> {
        let bytes = bytemuck::bytes_of(&contents).to_vec();
        let desc = BufferDescriptor::uniform(label, bytes.len() as u64);
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_buffer(&desc, Some(&bytes))?);
            Ok(())
        });
        slot
    }

    fn create_lights_buffer(
        &mut self,
        label: impl Into<String>,
        capacity: usize,
    ) -> OutSlot<ResourceHandle> {
        let desc = BufferDescriptor::uniform(label, (capacity * LightData::SIZE) as u64);
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_buffer(&desc, None)?);
            Ok(())
        });
        slot
    }

    fn create_texture(&mut self, desc: TextureDescriptor) -> OutSlot<ResourceHandle> {
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_texture(&desc)?);
            Ok(())
        });
        slot
    }

    fn create_frame_targets(
        &mut self,
        label: impl Into<String>,
        extent: Extent2d,
        format: TextureFormat,
    ) -> OutSlot<FrameSlots<ResourceHandle>> {
        let label = label.into();
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_frame_targets(&label, extent, format)?);
            Ok(())
        });
        slot
    }

    fn create_material(
        &mut self,
        kind: MaterialKind,
        params: MaterialParams,
    ) -> OutSlot<MaterialHandle> {
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_material(kind, params)?);
            Ok(())
        });
        slot
    }

    fn create_light(&mut self, light: Light) -> OutSlot<LightHandle> {
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_light(light));
            Ok(())
        });
        slot
    }

    fn create_overlay(
        &mut self,
        label: impl Into<String>,
        quad_count: u32,
    ) -> OutSlot<OverlayHandle> {
        let label = label.into();
        let slot = OutSlot::new();
        let out = slot.clone();
        self.push(move |api| {
            out.fulfill(api.create_overlay(&label, quad_count));
            Ok(())
        });
        slot
    }

    fn update_buffer(&mut self, buffer: &OutSlot<ResourceHandle>, offset: u64, data: Vec<u8>) {
        let buffer = buffer.clone();
        self.push(move |api| api.update_buffer(resolve(&buffer, "buffer")?, offset, &data));
    }

    fn stage_buffer_upload(
        &mut self,
        target: &OutSlot<ResourceHandle>,
        offset: u64,
        bytes: Vec<u8>,
    ) {
        let target = target.clone();
        self.push(move |api| {
            api.stage_buffer_upload(resolve(&target, "upload target")?, offset, bytes);
            Ok(())
        });
    }

    fn stage_texture_upload(&mut self, target: &OutSlot<ResourceHandle>, bytes: Vec<u8>) {
        let target = target.clone();
        self.push(move |api| {
            api.stage_texture_upload(resolve(&target, "upload target")?, bytes);
            Ok(())
        });
    }

    fn stage_light_upload(
        &mut self,
        buffer: &OutSlot<ResourceHandle>,
        light: &OutSlot<LightHandle>,
    ) {
        let buffer = buffer.clone();
        let light = light.clone();
        self.push(move |api| {
            api.stage_light_upload(resolve(&buffer, "lights buffer")?, resolve(&light, "light")?);
            Ok(())
        });
    }

    fn schedule_pass(&mut self, id: PassId) {
        self.push(move |api| {
            api.schedule_pass(id);
            Ok(())
        });
    }

    fn schedule_geometry_pass(&mut self, desc: GeometryPassDesc) {
        self.push(move |api| {
            let config = GeometryConfig {
                albedo: resolve(&desc.albedo, "geometry albedo target")?,
                normal: resolve(&desc.normal, "geometry normal target")?,
                depth: resolve(&desc.depth, "geometry depth target")?,
                draws: resolve_draws(&desc.draws)?,
                clear_color: desc.clear_color,
                viewport: desc.viewport,
            };
            api.passes_mut().geometry.configure(config);
            api.schedule_pass(PassId::Geometry);
            Ok(())
        });
    }

    fn schedule_shadowing_pass(&mut self, desc: ShadowingPassDesc) {
        self.push(move |api| {
            let config = ShadowingConfig {
                shadow_map: resolve(&desc.shadow_map, "shadow map")?,
                casters: resolve_draws(&desc.casters)?,
            };
            api.passes_mut().shadowing.configure(config);
            api.schedule_pass(PassId::Shadowing);
            Ok(())
        });
    }

    fn schedule_shadow_composition_pass(&mut self, desc: ShadowCompositionPassDesc) {
        self.push(move |api| {
            let config = ShadowCompositionConfig {
                shadow_map: resolve(&desc.shadow_map, "shadow map")?,
                output: resolve(&desc.output, "shadow mask target")?,
                viewport: desc.viewport,
            };
            api.passes_mut().shadow_composition.configure(config);
            api.schedule_pass(PassId::ShadowComposition);
            Ok(())
        });
    }

    fn schedule_lighting_pass(&mut self, desc: LightingPassDesc) {
        self.push(move |api| {
            let config = LightingConfig {
                albedo: resolve(&desc.albedo, "geometry albedo target")?,
                normal: resolve(&desc.normal, "geometry normal target")?,
                depth: resolve(&desc.depth, "geometry depth target")?,
                lights_buffer: resolve(&desc.lights_buffer, "lights buffer")?,
                output: resolve(&desc.output, "light accumulation target")?,
                viewport: desc.viewport,
            };
            api.passes_mut().lighting.configure(config);
            api.schedule_pass(PassId::Lighting);
            Ok(())
        });
    }

    fn schedule_composition_pass(&mut self, desc: CompositionPassDesc) {
        self.push(move |api| {
            let shadow_mask = desc
                .shadow_mask
                .as_ref()
                .map(|slot| resolve(slot, "shadow mask"))
                .transpose()?;
            let config = CompositionConfig {
                light_accumulation: resolve(&desc.light_accumulation, "light accumulation target")?,
                shadow_mask,
                target: resolve(&desc.target, "composition target")?,
                viewport: desc.viewport,
            };
            api.passes_mut().composition.configure(config);
            api.schedule_pass(PassId::Composition);
            Ok(())
        });
    }

    fn schedule_overlay_pass(&mut self, desc: OverlayPassDesc) {
        self.push(move |api| {
            let config = OverlayConfig {
                overlay: resolve(&desc.overlay, "overlay")?,
                target: resolve(&desc.target, "overlay target")?,
            };
            api.passes_mut().overlay.configure(config);
            api.schedule_pass(PassId::Overlay);
            Ok(())
        });
    }

    fn destroy_resource(&mut self, handle: &OutSlot<ResourceHandle>) {
        let handle = handle.clone();
        self.push(move |api| api.destroy_resource(resolve(&handle, "resource")?));
    }

    fn destroy_material(&mut self, handle: &OutSlot<MaterialHandle>) {
        let handle = handle.clone();
        self.push(move |api| api.destroy_material(resolve(&handle, "material")?));
    }

    fn destroy_light(&mut self, handle: &OutSlot<LightHandle>) {
        let handle = handle.clone();
        self.push(move |api| api.destroy_light(resolve(&handle, "light")?));
    }

    fn destroy_command_set(&mut self, handle: &OutSlot<CommandSetHandle>) {
        let handle = handle.clone();
        self.push(move |api| api.destroy_command_set(resolve(&handle, "command set")?));
    }

    fn destroy_overlay(&mut self, handle: &OutSlot<OverlayHandle>) {
        let handle = handle.clone();
        self.push(move |api| api.destroy_overlay(resolve(&handle, "overlay")?));
    }
}
