//! The deferred pass roster.
//!
//! The pipeline is a closed set of passes, one field per pass in
//! [`PassRegistry`]. There is no type-erased pass trait: the graph stores
//! [`PassId`] values and the registry dispatches on them, which keeps pass
//! configuration strongly typed end to end.
//!
//! # Pass lifecycle
//!
//! Every pass walks the same cycle each frame:
//!
//! | State        | Entered by                      |
//! |--------------|---------------------------------|
//! | `Idle`       | `reset` after the cycle         |
//! | `Configured` | a `configure`/`stage` command   |
//! | `Scheduled`  | planning the pass into the graph|
//! | `Executed`   | graph execution                 |
//!
//! Transitions out of order are contract violations and panic.
//!
//! # Frame order
//!
//! The canonical deferred frame schedules, in insertion order: uploads
//! (buffer, texture, light), geometry, shadowing, shadow composition,
//! lighting, composition, overlay. The graph does not reorder; producers
//! schedule what the frame needs and skip the rest.

mod composition;
mod geometry;
mod lighting;
mod overlay;
mod shadow;
mod upload;

pub use composition::{CompositionConfig, CompositionPass};
pub use geometry::{GeometryConfig, GeometryPass};
pub use lighting::{LightingConfig, LightingPass};
pub use overlay::{OverlayConfig, OverlayPass};
pub use shadow::{ShadowCompositionConfig, ShadowCompositionPass, ShadowingConfig, ShadowingPass};
pub use upload::{BufferUploadPass, LightUploadPass, TextureUploadPass};

use std::collections::HashMap;

use firethorn_core::ResourceTable;

use crate::backend::{
    BufferId, CommandSetId, PipelineDescriptor, PipelineId, RenderBackend, TextureId,
};
use crate::error::{GraphicsError, GraphicsResult};
use crate::graph::PassIo;
use crate::resources::{
    Light, Material, MaterialHandle, MaterialKind, OverlayContext, Resource, ResourceHandle,
};

/// Identifies one pass of the deferred roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    BufferUpload,
    TextureUpload,
    LightUpload,
    Geometry,
    Shadowing,
    ShadowComposition,
    Lighting,
    Composition,
    Overlay,
}

impl PassId {
    /// Every pass id, in canonical frame order.
    pub const ALL: [PassId; 9] = [
        PassId::BufferUpload,
        PassId::TextureUpload,
        PassId::LightUpload,
        PassId::Geometry,
        PassId::Shadowing,
        PassId::ShadowComposition,
        PassId::Lighting,
        PassId::Composition,
        PassId::Overlay,
    ];
}

/// Lifecycle state of a pass within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Configured,
    Scheduled,
    Executed,
}

/// Shared state machine embedded in every pass.
#[derive(Debug)]
pub(crate) struct PassLifecycle {
    name: &'static str,
    state: PassState,
}

impl PassLifecycle {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            state: PassState::Idle,
        }
    }

    pub(crate) fn state(&self) -> PassState {
        self.state
    }

    /// Idle or Configured -> Configured. Reconfiguring before scheduling is
    /// allowed; configuring a scheduled pass is not.
    pub(crate) fn on_configure(&mut self) {
        assert!(
            matches!(self.state, PassState::Idle | PassState::Configured),
            "{} pass configured while {:?}",
            self.name,
            self.state
        );
        self.state = PassState::Configured;
    }

    /// Configured -> Scheduled.
    pub(crate) fn on_plan(&mut self) {
        assert_eq!(
            self.state,
            PassState::Configured,
            "{} pass scheduled without configuration",
            self.name
        );
        self.state = PassState::Scheduled;
    }

    /// Scheduled -> Executed.
    pub(crate) fn on_execute(&mut self) {
        assert_eq!(
            self.state,
            PassState::Scheduled,
            "{} pass executed without being scheduled",
            self.name
        );
        self.state = PassState::Executed;
    }

    /// Any -> Idle.
    pub(crate) fn reset(&mut self) {
        self.state = PassState::Idle;
    }
}

/// Selects a backend pipeline. Geometry pipelines vary per material kind;
/// the screen-space passes each have exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Geometry(MaterialKind),
    Shadowing,
    Lighting,
    ShadowComposition,
    Composition,
    Overlay,
}

impl PipelineKind {
    fn label(&self) -> String {
        match self {
            Self::Geometry(kind) => format!("geometry_{}", kind.label()),
            Self::Shadowing => "shadowing".to_string(),
            Self::Lighting => "lighting".to_string(),
            Self::ShadowComposition => "shadow_composition".to_string(),
            Self::Composition => "composition".to_string(),
            Self::Overlay => "overlay".to_string(),
        }
    }
}

/// Lazily created backend pipelines, one per [`PipelineKind`].
#[derive(Debug, Default)]
pub struct PipelineCache {
    pipelines: HashMap<PipelineKind, PipelineId>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipeline for `kind`, creating it on first use.
    pub fn get_or_create<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        kind: PipelineKind,
    ) -> GraphicsResult<PipelineId> {
        if let Some(&id) = self.pipelines.get(&kind) {
            return Ok(id);
        }
        let id = backend.create_pipeline(&PipelineDescriptor::new(kind.label()))?;
        log::debug!("pipeline {:?} created for {:?}", id, kind);
        self.pipelines.insert(kind, id);
        Ok(id)
    }

    /// Every cached pipeline id.
    pub fn ids(&self) -> impl Iterator<Item = PipelineId> + '_ {
        self.pipelines.values().copied()
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }
}

/// One draw recorded by the geometry or shadowing pass.
#[derive(Debug, Clone)]
pub struct DrawCall {
    pub vertex_buffer: ResourceHandle,
    pub index_buffer: Option<ResourceHandle>,
    /// Index count when indexed, vertex count otherwise.
    pub count: u32,
    pub material: MaterialHandle,
}

/// Everything a pass may touch while executing.
///
/// Built by the service for each graph execution; the borrows keep passes
/// from reaching state the frame does not own.
pub struct PassExecuteContext<'a, B: RenderBackend> {
    pub backend: &'a mut B,
    pub pipelines: &'a mut PipelineCache,
    pub resources: &'a ResourceTable<Resource>,
    pub materials: &'a ResourceTable<Material>,
    pub lights: &'a ResourceTable<Light>,
    pub overlays: &'a ResourceTable<OverlayContext>,
    /// Frame slot the cycle records into.
    pub frame_slot: usize,
    /// Command set all passes record into.
    pub encoder: CommandSetId,
}

/// Resolves a resource handle to a backend texture id.
pub(crate) fn resolve_texture(
    resources: &ResourceTable<Resource>,
    handle: ResourceHandle,
    what: &'static str,
) -> GraphicsResult<TextureId> {
    let guard = resources.read();
    let resource = guard
        .try_get(handle)
        .ok_or(GraphicsError::StaleHandle(what))?;
    match resource {
        Resource::Texture(texture) => Ok(texture.gpu),
        Resource::Buffer(_) => Err(GraphicsError::ResourceKindMismatch {
            expected: "texture",
            actual: "buffer",
        }),
    }
}

/// Resolves a resource handle to a backend buffer id.
pub(crate) fn resolve_buffer(
    resources: &ResourceTable<Resource>,
    handle: ResourceHandle,
    what: &'static str,
) -> GraphicsResult<BufferId> {
    let guard = resources.read();
    let resource = guard
        .try_get(handle)
        .ok_or(GraphicsError::StaleHandle(what))?;
    match resource {
        Resource::Buffer(buffer) => Ok(buffer.gpu),
        Resource::Texture(_) => Err(GraphicsError::ResourceKindMismatch {
            expected: "buffer",
            actual: "texture",
        }),
    }
}

/// The full deferred roster, one field per pass.
pub struct PassRegistry {
    pub buffer_upload: BufferUploadPass,
    pub texture_upload: TextureUploadPass,
    pub light_upload: LightUploadPass,
    pub geometry: GeometryPass,
    pub shadowing: ShadowingPass,
    pub shadow_composition: ShadowCompositionPass,
    pub lighting: LightingPass,
    pub composition: CompositionPass,
    pub overlay: OverlayPass,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self {
            buffer_upload: BufferUploadPass::new(),
            texture_upload: TextureUploadPass::new(),
            light_upload: LightUploadPass::new(),
            geometry: GeometryPass::new(),
            shadowing: ShadowingPass::new(),
            shadow_composition: ShadowCompositionPass::new(),
            lighting: LightingPass::new(),
            composition: CompositionPass::new(),
            overlay: OverlayPass::new(),
        }
    }

    /// Moves a configured pass to `Scheduled` and returns its declared I/O.
    pub fn plan(&mut self, id: PassId) -> PassIo {
        match id {
            PassId::BufferUpload => self.buffer_upload.plan(),
            PassId::TextureUpload => self.texture_upload.plan(),
            PassId::LightUpload => self.light_upload.plan(),
            PassId::Geometry => self.geometry.plan(),
            PassId::Shadowing => self.shadowing.plan(),
            PassId::ShadowComposition => self.shadow_composition.plan(),
            PassId::Lighting => self.lighting.plan(),
            PassId::Composition => self.composition.plan(),
            PassId::Overlay => self.overlay.plan(),
        }
    }

    /// Runs a scheduled pass.
    pub fn execute<B: RenderBackend>(
        &mut self,
        id: PassId,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        match id {
            PassId::BufferUpload => self.buffer_upload.execute(ctx),
            PassId::TextureUpload => self.texture_upload.execute(ctx),
            PassId::LightUpload => self.light_upload.execute(ctx),
            PassId::Geometry => self.geometry.execute(ctx),
            PassId::Shadowing => self.shadowing.execute(ctx),
            PassId::ShadowComposition => self.shadow_composition.execute(ctx),
            PassId::Lighting => self.lighting.execute(ctx),
            PassId::Composition => self.composition.execute(ctx),
            PassId::Overlay => self.overlay.execute(ctx),
        }
    }

    pub fn state(&self, id: PassId) -> PassState {
        match id {
            PassId::BufferUpload => self.buffer_upload.state(),
            PassId::TextureUpload => self.texture_upload.state(),
            PassId::LightUpload => self.light_upload.state(),
            PassId::Geometry => self.geometry.state(),
            PassId::Shadowing => self.shadowing.state(),
            PassId::ShadowComposition => self.shadow_composition.state(),
            PassId::Lighting => self.lighting.state(),
            PassId::Composition => self.composition.state(),
            PassId::Overlay => self.overlay.state(),
        }
    }

    /// Returns every pass to `Idle` and drops frame configuration.
    pub fn reset_all(&mut self) {
        self.buffer_upload.reset();
        self.texture_upload.reset();
        self.light_upload.reset();
        self.geometry.reset();
        self.shadowing.reset();
        self.shadow_composition.reset();
        self.lighting.reset();
        self.composition.reset();
        self.overlay.reset();
    }
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod harness {
    //! Fixture for driving passes directly, without a service.

    use super::*;
    use crate::backend::DummyBackend;
    use crate::frame::FrameSlots;
    use crate::resources::{Buffer, LightHandle, OverlayHandle, Texture};
    use crate::types::{
        BufferDescriptor, BufferUsage, Extent2d, TextureDescriptor, TextureFormat, TextureUsage,
        Viewport,
    };

    pub(crate) struct PassHarness {
        pub backend: DummyBackend,
        pub pipelines: PipelineCache,
        pub resources: ResourceTable<Resource>,
        pub materials: ResourceTable<Material>,
        pub lights: ResourceTable<Light>,
        pub overlays: ResourceTable<OverlayContext>,
        pub encoder: CommandSetId,
        pub frame_slot: usize,
    }

    impl PassHarness {
        pub(crate) fn new() -> Self {
            let mut backend = DummyBackend::new();
            let encoder = backend.create_command_set("harness").unwrap();
            Self {
                backend,
                pipelines: PipelineCache::new(),
                resources: ResourceTable::new(),
                materials: ResourceTable::new(),
                lights: ResourceTable::new(),
                overlays: ResourceTable::new(),
                encoder,
                frame_slot: 0,
            }
        }

        /// Viewport covering the harness's 4x4 targets.
        pub(crate) fn viewport() -> Viewport {
            Viewport::of_extent(Extent2d::new(4, 4))
        }

        pub(crate) fn ctx(&mut self) -> PassExecuteContext<'_, DummyBackend> {
            PassExecuteContext {
                backend: &mut self.backend,
                pipelines: &mut self.pipelines,
                resources: &self.resources,
                materials: &self.materials,
                lights: &self.lights,
                overlays: &self.overlays,
                frame_slot: self.frame_slot,
                encoder: self.encoder,
            }
        }

        pub(crate) fn add_buffer(&mut self, label: &str, size: u64) -> ResourceHandle {
            let desc = BufferDescriptor::new(label, size, BufferUsage::COPY_DST);
            let gpu = self.backend.create_buffer(&desc).unwrap();
            self.resources.adder().add(Resource::Buffer(Buffer {
                label: label.to_string(),
                size,
                usage: desc.usage,
                gpu,
                written: 0,
            }))
        }

        pub(crate) fn add_texture(&mut self, label: &str) -> ResourceHandle {
            let desc = TextureDescriptor::new(
                label,
                Extent2d::new(4, 4),
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_TARGET | TextureUsage::SAMPLED | TextureUsage::COPY_DST,
            );
            let gpu = self.backend.create_texture(&desc).unwrap();
            self.resources.adder().add(Resource::Texture(Texture {
                label: label.to_string(),
                extent: desc.extent,
                format: desc.format,
                usage: desc.usage,
                gpu,
                written: false,
            }))
        }

        /// One texture per frame slot.
        pub(crate) fn add_frame_targets(
            &mut self,
            label: &str,
            slots: usize,
        ) -> FrameSlots<ResourceHandle> {
            FrameSlots::per_slot(slots, |slot| {
                self.add_texture(&format!("{label}[{slot}]"))
            })
        }

        pub(crate) fn add_material(&mut self, kind: MaterialKind) -> MaterialHandle {
            let pipeline = self
                .pipelines
                .get_or_create(&mut self.backend, PipelineKind::Geometry(kind))
                .unwrap();
            self.materials.adder().add(Material {
                kind,
                params: Default::default(),
                pipeline,
            })
        }

        pub(crate) fn add_light(&mut self, light: Light) -> LightHandle {
            self.lights.adder().add(light)
        }

        pub(crate) fn add_overlay(&mut self, label: &str, quad_count: u32) -> OverlayHandle {
            let mut overlay = OverlayContext::new(label);
            overlay.quad_count = quad_count;
            self.overlays.adder().add(overlay)
        }

        /// Ops recorded into the harness encoder so far.
        pub(crate) fn recorded(&mut self) -> Vec<crate::backend::dummy::RecordedOp> {
            self.backend.submit_command_set(self.encoder).unwrap();
            self.backend.submitted_ops(self.encoder).unwrap().to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        let mut lifecycle = PassLifecycle::new("test");
        assert_eq!(lifecycle.state(), PassState::Idle);
        lifecycle.on_configure();
        lifecycle.on_configure();
        assert_eq!(lifecycle.state(), PassState::Configured);
        lifecycle.on_plan();
        assert_eq!(lifecycle.state(), PassState::Scheduled);
        lifecycle.on_execute();
        assert_eq!(lifecycle.state(), PassState::Executed);
        lifecycle.reset();
        assert_eq!(lifecycle.state(), PassState::Idle);
    }

    #[test]
    #[should_panic(expected = "scheduled without configuration")]
    fn test_plan_from_idle_panics() {
        let mut lifecycle = PassLifecycle::new("test");
        lifecycle.on_plan();
    }

    #[test]
    #[should_panic(expected = "configured while Scheduled")]
    fn test_configure_after_plan_panics() {
        let mut lifecycle = PassLifecycle::new("test");
        lifecycle.on_configure();
        lifecycle.on_plan();
        lifecycle.on_configure();
    }

    #[test]
    #[should_panic(expected = "executed without being scheduled")]
    fn test_execute_from_configured_panics() {
        let mut lifecycle = PassLifecycle::new("test");
        lifecycle.on_configure();
        lifecycle.on_execute();
    }

    #[test]
    fn test_pipeline_cache_creates_each_kind_once() {
        use crate::backend::DummyBackend;

        let mut backend = DummyBackend::new();
        let mut cache = PipelineCache::new();
        let first = cache
            .get_or_create(&mut backend, PipelineKind::Lighting)
            .unwrap();
        let again = cache
            .get_or_create(&mut backend, PipelineKind::Lighting)
            .unwrap();
        let other = cache
            .get_or_create(&mut backend, PipelineKind::Geometry(MaterialKind::Phong))
            .unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(backend.pipeline_count(), 2);
        assert_eq!(
            backend.pipeline_label(other),
            Some("geometry_phong")
        );
    }

    #[test]
    fn test_registry_passes_start_idle() {
        let registry = PassRegistry::new();
        for id in PassId::ALL {
            assert_eq!(registry.state(id), PassState::Idle, "{id:?}");
        }
    }
}
