//! The graphics service: command drain, frame orchestration, teardown.
//!
//! # Architecture
//!
//! | Piece | Role |
//! |-------|------|
//! | [`GraphicsService`] | Owns the backend and drives one cycle per `update` |
//! | [`GraphicsApi`] | Mutable state command closures execute against |
//! | [`GraphicsContext`] | Shared tables and frame cursor, visible to views |
//! | [`GraphicsCommands`] | Builder methods producers call on a command list |
//! | [`GraphicsView`] | Read-only queries for producer threads |
//!
//! # Cycle
//!
//! Each `update` call on the drain thread runs one cycle:
//!
//! 1. `begin_frame` freezes the queue slot producers were filling.
//! 2. Every frozen command list executes against the [`GraphicsApi`],
//!    creating resources, staging uploads, and scheduling passes.
//! 3. The render graph executes into the bound command set and the set is
//!    submitted to the backend.
//! 4. The graph, pass roster, and binding reset, the frame cursor advances,
//!    and `end_frame` publishes progress.
//!
//! A failing command list or graph aborts the cycle: the backend keeps
//! whatever the earlier commands already did, the frame cursor stays put,
//! and progress is withheld until the next successful cycle.

mod commands;
mod view;

pub use commands::{
    CompositionPassDesc, DrawDesc, GeometryPassDesc, GraphicsCommands, LightingPassDesc,
    OverlayPassDesc, ShadowCompositionPassDesc, ShadowingPassDesc,
};
pub use view::GraphicsView;

use std::sync::Arc;

use firethorn_core::{AccessToken, ResourceTable};
use firethorn_service::{
    CommandList, Service, ServiceConfig, ServiceCore, ServiceError, ServiceProgress, ServiceProxy,
    ServiceResult,
};

use crate::backend::RenderBackend;
use crate::error::{GraphicsError, GraphicsResult};
use crate::frame::{FrameCursor, FrameSlots, DEFAULT_FRAME_SLOTS};
use crate::graph::RenderGraph;
use crate::pipeline::{self, PassExecuteContext, PassId, PassRegistry, PipelineCache, PipelineKind};
use crate::resources::{
    Buffer, CommandSet, CommandSetHandle, Light, LightHandle, Material, MaterialHandle,
    MaterialKind, MaterialParams, OverlayContext, OverlayHandle, Resource, ResourceHandle, Texture,
};
use crate::types::{BufferDescriptor, Extent2d, TextureDescriptor, TextureFormat, TextureUsage};

/// Configuration of a [`GraphicsService`].
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    /// Number of frame slots per-frame resources rotate through.
    pub frame_slots: usize,
    /// Command core tuning.
    pub service: ServiceConfig,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            frame_slots: DEFAULT_FRAME_SLOTS,
            service: ServiceConfig::default(),
        }
    }
}

/// Shared graphics state: the five resource tables and the frame cursor.
///
/// The drain thread mutates tables through command execution; producer
/// threads read them through [`GraphicsView`] clones of the same `Arc`.
pub struct GraphicsContext {
    pub(crate) resources: ResourceTable<Resource>,
    pub(crate) materials: ResourceTable<Material>,
    pub(crate) lights: ResourceTable<Light>,
    pub(crate) command_sets: ResourceTable<CommandSet>,
    pub(crate) overlays: ResourceTable<OverlayContext>,
    pub(crate) frame: FrameCursor,
}

impl GraphicsContext {
    fn new(frame_slots: usize) -> Self {
        Self {
            resources: ResourceTable::new(),
            materials: ResourceTable::new(),
            lights: ResourceTable::new(),
            command_sets: ResourceTable::new(),
            overlays: ResourceTable::new(),
            frame: FrameCursor::new(frame_slots),
        }
    }
}

/// Mutable state command lists execute against.
///
/// One instance lives inside [`GraphicsService`] and never leaves the drain
/// thread. Command closures receive `&mut GraphicsApi` and call these
/// methods; producers only ever build closures through [`GraphicsCommands`].
pub struct GraphicsApi<B: RenderBackend> {
    backend: B,
    ctx: Arc<GraphicsContext>,
    passes: PassRegistry,
    graph: RenderGraph,
    pipelines: PipelineCache,
    bound_set: Option<CommandSetHandle>,
}

impl<B: RenderBackend> firethorn_service::ServiceApi for GraphicsApi<B> {
    type Error = GraphicsError;
    type View = GraphicsView;
}

impl<B: RenderBackend> GraphicsApi<B> {
    fn new(backend: B, ctx: Arc<GraphicsContext>) -> Self {
        Self {
            backend,
            ctx,
            passes: PassRegistry::new(),
            graph: RenderGraph::new(),
            pipelines: PipelineCache::new(),
            bound_set: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Frame slot the open cycle records into.
    pub fn current_frame_slot(&self) -> usize {
        self.ctx.frame.current()
    }

    /// The pass roster, for configuring passes before scheduling them.
    pub fn passes_mut(&mut self) -> &mut PassRegistry {
        &mut self.passes
    }

    /// The graph built so far this cycle.
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    /// Creates a backend command set and registers it in the table.
    pub fn create_command_set(&mut self, label: &str) -> GraphicsResult<CommandSetHandle> {
        let gpu = self.backend.create_command_set(label)?;
        let handle = self.ctx.command_sets.adder().add(CommandSet {
            label: label.to_string(),
            gpu,
        });
        log::trace!("created command set `{label}` as {gpu:?}");
        Ok(handle)
    }

    /// Selects the command set the graph records into this cycle.
    pub fn bind_command_set(&mut self, handle: CommandSetHandle) -> GraphicsResult<()> {
        if !self.ctx.command_sets.contains(handle) {
            return Err(GraphicsError::StaleHandle("command set"));
        }
        self.bound_set = Some(handle);
        Ok(())
    }

    pub fn bound_command_set(&self) -> Option<CommandSetHandle> {
        self.bound_set
    }

    /// Creates a buffer, optionally filled with initial contents.
    pub fn create_buffer(
        &mut self,
        desc: &BufferDescriptor,
        contents: Option<&[u8]>,
    ) -> GraphicsResult<ResourceHandle> {
        let gpu = self.backend.create_buffer(desc)?;
        let mut written = 0;
        if let Some(bytes) = contents {
            self.backend.write_buffer(gpu, 0, bytes)?;
            written = bytes.len() as u64;
        }
        let handle = self.ctx.resources.adder().add(Resource::Buffer(Buffer {
            label: desc.label.clone(),
            size: desc.size,
            usage: desc.usage,
            gpu,
            written,
        }));
        log::trace!("created buffer `{}` ({} bytes) as {gpu:?}", desc.label, desc.size);
        Ok(handle)
    }

    /// Creates a texture with no contents.
    pub fn create_texture(&mut self, desc: &TextureDescriptor) -> GraphicsResult<ResourceHandle> {
        let gpu = self.backend.create_texture(desc)?;
        let handle = self.ctx.resources.adder().add(Resource::Texture(Texture {
            label: desc.label.clone(),
            extent: desc.extent,
            format: desc.format,
            usage: desc.usage,
            gpu,
            written: false,
        }));
        log::trace!(
            "created texture `{}` ({}x{}) as {gpu:?}",
            desc.label,
            desc.extent.width,
            desc.extent.height
        );
        Ok(handle)
    }

    /// Creates one render or depth target per frame slot.
    ///
    /// The slot index is appended to the label so backend captures stay
    /// readable.
    pub fn create_frame_targets(
        &mut self,
        label: &str,
        extent: Extent2d,
        format: TextureFormat,
    ) -> GraphicsResult<FrameSlots<ResourceHandle>> {
        let usage = if format.is_depth() {
            TextureUsage::DEPTH_TARGET | TextureUsage::SAMPLED
        } else {
            TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED
        };
        let count = self.ctx.frame.count();
        let mut slots = Vec::with_capacity(count);
        for slot in 0..count {
            let desc = TextureDescriptor::new(format!("{label}[{slot}]"), extent, format, usage);
            slots.push(self.create_texture(&desc)?);
        }
        Ok(FrameSlots::new(slots))
    }

    /// Creates a material and the geometry pipeline its kind shades with.
    ///
    /// Pipelines are cached per kind; two materials of the same kind share
    /// one backend pipeline.
    pub fn create_material(
        &mut self,
        kind: MaterialKind,
        params: MaterialParams,
    ) -> GraphicsResult<MaterialHandle> {
        let pipeline = self
            .pipelines
            .get_or_create(&mut self.backend, PipelineKind::Geometry(kind))?;
        let handle = self.ctx.materials.adder().add(Material {
            kind,
            params,
            pipeline,
        });
        log::trace!("created {} material with pipeline {pipeline:?}", kind.label());
        Ok(handle)
    }

    /// Registers a light. Lights live in CPU tables until the light upload
    /// pass packs them into a buffer.
    pub fn create_light(&mut self, light: Light) -> LightHandle {
        self.ctx.lights.adder().add(light)
    }

    /// Registers an overlay layer with a fixed quad capacity.
    pub fn create_overlay(&mut self, label: &str, quad_count: u32) -> OverlayHandle {
        self.ctx.overlays.adder().add(OverlayContext {
            label: label.to_string(),
            quad_count,
        })
    }

    /// Writes bytes into a live buffer immediately, outside any pass.
    ///
    /// Immediate writes land in command order, so the last list to write a
    /// range wins the frame.
    pub fn update_buffer(
        &mut self,
        handle: ResourceHandle,
        offset: u64,
        data: &[u8],
    ) -> GraphicsResult<()> {
        let mut token = AccessToken::new();
        token.permit(handle);
        let mut guard = self.ctx.resources.write();
        let resource = guard
            .try_get_mut(handle, &token)
            .ok_or(GraphicsError::StaleHandle("buffer"))?;
        let buffer = resource
            .as_buffer_mut()
            .ok_or(GraphicsError::ResourceKindMismatch {
                expected: "buffer",
                actual: "texture",
            })?;
        self.backend.write_buffer(buffer.gpu, offset, data)?;
        buffer.note_write(offset, data.len() as u64);
        Ok(())
    }

    /// Stages bytes for the buffer upload pass.
    pub fn stage_buffer_upload(&mut self, target: ResourceHandle, offset: u64, bytes: Vec<u8>) {
        self.passes.buffer_upload.stage(target, offset, bytes);
    }

    /// Stages texel data for the texture upload pass.
    pub fn stage_texture_upload(&mut self, target: ResourceHandle, bytes: Vec<u8>) {
        self.passes.texture_upload.stage(target, bytes);
    }

    /// Stages a light for packing into `buffer` by the light upload pass.
    pub fn stage_light_upload(&mut self, buffer: ResourceHandle, light: LightHandle) {
        self.passes.light_upload.set_target(buffer);
        self.passes.light_upload.stage(light);
    }

    /// Plans a pass and appends it to this cycle's graph.
    ///
    /// # Panics
    ///
    /// Panics if the pass was already scheduled this cycle, or if a draw
    /// pass is scheduled without configuration.
    pub fn schedule_pass(&mut self, id: PassId) {
        let io = self.passes.plan(id);
        self.graph.add_pass(id, io);
        log::trace!("scheduled {id:?} at position {}", self.graph.len() - 1);
    }

    /// Destroys a buffer or texture and frees its backend object.
    pub fn destroy_resource(&mut self, handle: ResourceHandle) -> GraphicsResult<()> {
        if !self.ctx.resources.contains(handle) {
            return Err(GraphicsError::StaleHandle("resource"));
        }
        match self.ctx.resources.eraser().erase(handle) {
            Resource::Buffer(buffer) => {
                log::trace!("destroying buffer `{}`", buffer.label);
                self.backend.destroy_buffer(buffer.gpu)?;
            }
            Resource::Texture(texture) => {
                log::trace!("destroying texture `{}`", texture.label);
                self.backend.destroy_texture(texture.gpu)?;
            }
        }
        Ok(())
    }

    /// Forgets a material. The shared per-kind pipeline stays cached.
    pub fn destroy_material(&mut self, handle: MaterialHandle) -> GraphicsResult<()> {
        if !self.ctx.materials.contains(handle) {
            return Err(GraphicsError::StaleHandle("material"));
        }
        self.ctx.materials.eraser().erase(handle);
        Ok(())
    }

    /// Forgets a light.
    pub fn destroy_light(&mut self, handle: LightHandle) -> GraphicsResult<()> {
        if !self.ctx.lights.contains(handle) {
            return Err(GraphicsError::StaleHandle("light"));
        }
        self.ctx.lights.eraser().erase(handle);
        Ok(())
    }

    /// Destroys a command set; unbinds it first if it was bound.
    pub fn destroy_command_set(&mut self, handle: CommandSetHandle) -> GraphicsResult<()> {
        if !self.ctx.command_sets.contains(handle) {
            return Err(GraphicsError::StaleHandle("command set"));
        }
        if self.bound_set == Some(handle) {
            self.bound_set = None;
        }
        let set = self.ctx.command_sets.eraser().erase(handle);
        log::trace!("destroying command set `{}`", set.label);
        self.backend.destroy_command_set(set.gpu)?;
        Ok(())
    }

    /// Forgets an overlay layer.
    pub fn destroy_overlay(&mut self, handle: OverlayHandle) -> GraphicsResult<()> {
        if !self.ctx.overlays.contains(handle) {
            return Err(GraphicsError::StaleHandle("overlay"));
        }
        self.ctx.overlays.eraser().erase(handle);
        Ok(())
    }

    /// Records every scheduled pass into the bound command set and submits
    /// it.
    ///
    /// An empty graph is a no-op; a non-empty graph with no bound command
    /// set is an error.
    fn execute_graph(&mut self) -> GraphicsResult<()> {
        if self.graph.is_empty() {
            return Ok(());
        }
        let bound = self.bound_set.ok_or(GraphicsError::NoCommandSetBound)?;
        let encoder = {
            let sets = self.ctx.command_sets.read();
            sets.try_get(bound)
                .ok_or(GraphicsError::StaleHandle("command set"))?
                .gpu
        };
        self.backend.reset_command_set(encoder)?;
        let mut ctx = PassExecuteContext {
            backend: &mut self.backend,
            pipelines: &mut self.pipelines,
            resources: &self.ctx.resources,
            materials: &self.ctx.materials,
            lights: &self.ctx.lights,
            overlays: &self.ctx.overlays,
            frame_slot: self.ctx.frame.current(),
            encoder,
        };
        self.graph.execute(&mut self.passes, &mut ctx)?;
        self.backend.submit_command_set(encoder)?;
        Ok(())
    }

    /// Clears per-cycle state and advances the frame cursor.
    fn finish_cycle(&mut self) {
        self.graph.clear();
        self.passes.reset_all();
        self.bound_set = None;
        let next = self.ctx.frame.advance();
        log::trace!("cycle finished, next frame slot {next}");
    }

    /// Clears per-cycle state after a failed cycle. The frame cursor stays
    /// put so the next cycle re-records the same slot.
    fn cleanup_after_abort(&mut self) {
        self.graph.clear();
        self.passes.reset_all();
        self.bound_set = None;
    }
}

/// Producer handle to a [`GraphicsService`].
pub type GraphicsProxy<B> = ServiceProxy<GraphicsApi<B>>;

/// Command list bound to a [`GraphicsService`].
pub type GraphicsCommandList<B> = CommandList<GraphicsApi<B>>;

/// Deferred renderer driven by deferred command lists.
///
/// Producer threads obtain a [`GraphicsProxy`] and submit command lists; the
/// owning thread calls [`Service::update`] once per frame to drain and
/// render. Everything the backend allocated is destroyed on drop.
pub struct GraphicsService<B: RenderBackend> {
    core: ServiceCore<GraphicsApi<B>>,
    api: GraphicsApi<B>,
}

impl<B: RenderBackend> GraphicsService<B> {
    pub fn new(config: &GraphicsConfig, backend: B) -> Self {
        let ctx = Arc::new(GraphicsContext::new(config.frame_slots));
        let view = GraphicsView::new(Arc::clone(&ctx));
        let core = ServiceCore::new(&config.service, view);
        log::info!(
            "graphics service starting on backend `{}` with {} frame slots",
            backend.name(),
            config.frame_slots
        );
        Self {
            core,
            api: GraphicsApi::new(backend, ctx),
        }
    }

    /// Returns a new producer handle.
    pub fn proxy(&self) -> GraphicsProxy<B> {
        self.core.proxy()
    }

    /// Returns a new read-only view.
    pub fn view(&self) -> GraphicsView {
        GraphicsView::new(Arc::clone(&self.api.ctx))
    }

    /// Last published progress value.
    pub fn progress(&self) -> ServiceProgress {
        self.core.progress()
    }

    pub fn backend(&self) -> &B {
        self.api.backend()
    }

    /// Reads bytes back from a live buffer, drain-thread side.
    pub fn read_buffer(
        &self,
        handle: ResourceHandle,
        offset: u64,
        len: u64,
    ) -> GraphicsResult<Vec<u8>> {
        let gpu = pipeline::resolve_buffer(&self.api.ctx.resources, handle, "buffer")?;
        Ok(self.api.backend.read_buffer(gpu, offset, len)?)
    }
}

impl<B: RenderBackend> Service for GraphicsService<B> {
    fn pre_update(&mut self) -> ServiceResult<()> {
        Ok(())
    }

    /// Runs one full cycle: drain, render, publish.
    fn update(&mut self) -> ServiceResult<()> {
        self.core.begin_frame();
        for list in self.core.take_commands() {
            if let Err(error) = list.execute(&mut self.api) {
                log::error!("graphics command list failed: {error}");
                self.api.cleanup_after_abort();
                self.core.abort_frame();
                return Err(ServiceError::Command(Box::new(error)));
            }
        }
        if let Err(error) = self.api.execute_graph() {
            log::error!("graphics frame failed: {error}");
            self.api.cleanup_after_abort();
            self.core.abort_frame();
            return Err(ServiceError::Frame(Box::new(error)));
        }
        self.api.finish_cycle();
        self.core.end_frame();
        Ok(())
    }

    fn post_update(&mut self) -> ServiceResult<()> {
        Ok(())
    }
}

impl<B: RenderBackend> Drop for GraphicsService<B> {
    fn drop(&mut self) {
        let api = &mut self.api;
        let mut buffers = Vec::new();
        let mut textures = Vec::new();
        {
            let guard = api.ctx.resources.read();
            for (_, resource) in guard.iter() {
                match resource {
                    Resource::Buffer(buffer) => buffers.push(buffer.gpu),
                    Resource::Texture(texture) => textures.push(texture.gpu),
                }
            }
        }
        let sets: Vec<_> = api.ctx.command_sets.read().iter().map(|(_, s)| s.gpu).collect();
        let pipelines: Vec<_> = api.pipelines.ids().collect();

        for gpu in buffers {
            if let Err(error) = api.backend.destroy_buffer(gpu) {
                log::warn!("buffer {gpu:?} leaked at teardown: {error}");
            }
        }
        for gpu in textures {
            if let Err(error) = api.backend.destroy_texture(gpu) {
                log::warn!("texture {gpu:?} leaked at teardown: {error}");
            }
        }
        for gpu in sets {
            if let Err(error) = api.backend.destroy_command_set(gpu) {
                log::warn!("command set {gpu:?} leaked at teardown: {error}");
            }
        }
        for gpu in pipelines {
            if let Err(error) = api.backend.destroy_pipeline(gpu) {
                log::warn!("pipeline {gpu:?} leaked at teardown: {error}");
            }
        }
        log::debug!("graphics service torn down on backend `{}`", api.backend.name());
    }
}
