//! Shadowing passes: shadow map rendering and screen-space composition.
//!
//! Both passes skip their GPU work when no live light casts shadows. The
//! skip still counts as execution for the pass lifecycle, so the frame's
//! state machine is identical with and without shadow casters.

use crate::backend::PassTarget;
use crate::error::GraphicsResult;
use crate::frame::FrameSlots;
use crate::graph::PassIo;
use crate::pipeline::{
    resolve_buffer, resolve_texture, DrawCall, PassExecuteContext, PassLifecycle, PassState,
    PipelineKind,
};
use crate::resources::{Light, ResourceHandle};
use crate::types::Viewport;
use crate::RenderBackend;

fn any_shadow_caster(lights: &firethorn_core::TableReadGuard<'_, Light>) -> bool {
    lights.iter().any(|(_, light)| light.casts_shadows)
}

/// Frame configuration of the shadowing pass.
#[derive(Debug, Clone)]
pub struct ShadowingConfig {
    /// Depth target receiving the shadow map, per frame slot.
    pub shadow_map: FrameSlots<ResourceHandle>,
    /// Geometry rendered into the shadow map.
    pub casters: Vec<DrawCall>,
}

/// Renders shadow casters into the shadow map.
pub struct ShadowingPass {
    lifecycle: PassLifecycle,
    config: Option<ShadowingConfig>,
    io: PassIo,
}

impl ShadowingPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("shadowing"),
            config: None,
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    pub fn configure(&mut self, config: ShadowingConfig) {
        self.lifecycle.on_configure();
        self.config = Some(config);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let config = self.config.as_ref().expect("configured pass has a config");
        let mut io = PassIo::new();
        for &handle in config.shadow_map.iter() {
            io.write(handle);
        }
        for draw in &config.casters {
            io.read(draw.vertex_buffer);
            if let Some(index_buffer) = draw.index_buffer {
                io.read(index_buffer);
            }
        }
        self.io = io.clone();
        io
    }

    pub(crate) fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        self.lifecycle.on_execute();
        if !any_shadow_caster(&ctx.lights.read()) {
            log::debug!("shadowing: no shadow casting lights, skipping");
            return Ok(());
        }
        let config = self.config.as_ref().expect("scheduled pass has a config");

        let shadow_map = *config.shadow_map.get(ctx.frame_slot);
        let target = PassTarget::cleared(
            resolve_texture(ctx.resources, shadow_map, "shadow map")?,
            [1.0, 0.0, 0.0, 0.0],
        );
        let pipeline = ctx
            .pipelines
            .get_or_create(&mut *ctx.backend, PipelineKind::Shadowing)?;

        ctx.backend.begin_pass(ctx.encoder, "shadowing", &[target])?;
        ctx.backend.bind_pipeline(ctx.encoder, pipeline)?;
        for draw in &config.casters {
            let vertex = resolve_buffer(ctx.resources, draw.vertex_buffer, "vertex buffer")?;
            ctx.backend.bind_vertex_buffer(ctx.encoder, vertex)?;
            match draw.index_buffer {
                Some(handle) => {
                    let index = resolve_buffer(ctx.resources, handle, "index buffer")?;
                    ctx.backend.bind_index_buffer(ctx.encoder, index)?;
                    ctx.backend.draw_indexed(ctx.encoder, draw.count)?;
                }
                None => ctx.backend.draw(ctx.encoder, draw.count)?,
            }
        }
        ctx.backend.end_pass(ctx.encoder)?;
        log::trace!("shadowing: {} casters recorded", config.casters.len());

        let mut guard = ctx.resources.write();
        if let Some(texture) = guard
            .try_get_mut(shadow_map, self.io.writes())
            .and_then(|resource| resource.as_texture_mut())
        {
            texture.written = true;
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.lifecycle.reset();
        self.config = None;
        self.io = PassIo::new();
    }
}

/// Frame configuration of the shadow composition pass.
#[derive(Debug, Clone)]
pub struct ShadowCompositionConfig {
    pub shadow_map: FrameSlots<ResourceHandle>,
    /// Screen-space shadow mask, per frame slot.
    pub output: FrameSlots<ResourceHandle>,
    pub viewport: Viewport,
}

/// Projects the shadow map into a screen-space shadow mask.
pub struct ShadowCompositionPass {
    lifecycle: PassLifecycle,
    config: Option<ShadowCompositionConfig>,
    io: PassIo,
}

impl ShadowCompositionPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("shadow_composition"),
            config: None,
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    pub fn configure(&mut self, config: ShadowCompositionConfig) {
        self.lifecycle.on_configure();
        self.config = Some(config);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let config = self.config.as_ref().expect("configured pass has a config");
        let mut io = PassIo::new();
        for &handle in config.shadow_map.iter() {
            io.read(handle);
        }
        for &handle in config.output.iter() {
            io.write(handle);
        }
        self.io = io.clone();
        io
    }

    pub(crate) fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        self.lifecycle.on_execute();
        if !any_shadow_caster(&ctx.lights.read()) {
            log::debug!("shadow composition: no shadow casting lights, skipping");
            return Ok(());
        }
        let config = self.config.as_ref().expect("scheduled pass has a config");

        let output = *config.output.get(ctx.frame_slot);
        let target = PassTarget::cleared(
            resolve_texture(ctx.resources, output, "shadow mask")?,
            [1.0, 1.0, 1.0, 1.0],
        );
        let shadow_map = resolve_texture(
            ctx.resources,
            *config.shadow_map.get(ctx.frame_slot),
            "shadow map",
        )?;
        let pipeline = ctx
            .pipelines
            .get_or_create(&mut *ctx.backend, PipelineKind::ShadowComposition)?;

        ctx.backend
            .begin_pass(ctx.encoder, "shadow_composition", &[target])?;
        ctx.backend.set_viewport(ctx.encoder, config.viewport)?;
        ctx.backend.bind_pipeline(ctx.encoder, pipeline)?;
        ctx.backend.bind_texture(ctx.encoder, 0, shadow_map)?;
        ctx.backend.draw(ctx.encoder, 3)?;
        ctx.backend.end_pass(ctx.encoder)?;

        let mut guard = ctx.resources.write();
        if let Some(texture) = guard
            .try_get_mut(output, self.io.writes())
            .and_then(|resource| resource.as_texture_mut())
        {
            texture.written = true;
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.lifecycle.reset();
        self.config = None;
        self.io = PassIo::new();
    }
}
