//! Lighting pass: G-buffer and lights buffer into the light accumulation
//! target.

use crate::backend::PassTarget;
use crate::error::GraphicsResult;
use crate::frame::FrameSlots;
use crate::graph::PassIo;
use crate::pipeline::{
    resolve_buffer, resolve_texture, PassExecuteContext, PassLifecycle, PassState, PipelineKind,
};
use crate::resources::ResourceHandle;
use crate::types::Viewport;
use crate::RenderBackend;

/// Frame configuration of the lighting pass.
#[derive(Debug, Clone)]
pub struct LightingConfig {
    pub albedo: FrameSlots<ResourceHandle>,
    pub normal: FrameSlots<ResourceHandle>,
    pub depth: FrameSlots<ResourceHandle>,
    /// Uniform buffer the light upload pass filled this frame.
    pub lights_buffer: ResourceHandle,
    pub output: FrameSlots<ResourceHandle>,
    pub viewport: Viewport,
}

/// Full-screen shading resolve over the G-buffer.
pub struct LightingPass {
    lifecycle: PassLifecycle,
    config: Option<LightingConfig>,
    io: PassIo,
}

impl LightingPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("lighting"),
            config: None,
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    pub fn configure(&mut self, config: LightingConfig) {
        self.lifecycle.on_configure();
        self.config = Some(config);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let config = self.config.as_ref().expect("configured pass has a config");
        let mut io = PassIo::new();
        for inputs in [&config.albedo, &config.normal, &config.depth] {
            for &handle in inputs.iter() {
                io.read(handle);
            }
        }
        io.read(config.lights_buffer);
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
        let config = self.config.as_ref().expect("scheduled pass has a config");

        let output = *config.output.get(ctx.frame_slot);
        let target = PassTarget::cleared(
            resolve_texture(ctx.resources, output, "light accumulation target")?,
            [0.0, 0.0, 0.0, 0.0],
        );
        let albedo = resolve_texture(
            ctx.resources,
            *config.albedo.get(ctx.frame_slot),
            "albedo input",
        )?;
        let normal = resolve_texture(
            ctx.resources,
            *config.normal.get(ctx.frame_slot),
            "normal input",
        )?;
        let depth = resolve_texture(
            ctx.resources,
            *config.depth.get(ctx.frame_slot),
            "depth input",
        )?;
        let lights = resolve_buffer(ctx.resources, config.lights_buffer, "lights buffer")?;
        let pipeline = ctx
            .pipelines
            .get_or_create(&mut *ctx.backend, PipelineKind::Lighting)?;

        ctx.backend.begin_pass(ctx.encoder, "lighting", &[target])?;
        ctx.backend.set_viewport(ctx.encoder, config.viewport)?;
        ctx.backend.bind_pipeline(ctx.encoder, pipeline)?;
        ctx.backend.bind_texture(ctx.encoder, 0, albedo)?;
        ctx.backend.bind_texture(ctx.encoder, 1, normal)?;
        ctx.backend.bind_texture(ctx.encoder, 2, depth)?;
        ctx.backend.bind_uniform_buffer(ctx.encoder, 0, lights)?;
        // Full-screen triangle.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordedOp;
    use crate::pipeline::harness::PassHarness;

    fn configured_pass(harness: &mut PassHarness) -> LightingPass {
        let albedo = harness.add_frame_targets("albedo", 2);
        let normal = harness.add_frame_targets("normal", 2);
        let depth = harness.add_frame_targets("depth", 2);
        let output = harness.add_frame_targets("light_acc", 2);
        let lights_buffer = harness.add_buffer("lights", 256);
        let mut pass = LightingPass::new();
        pass.configure(LightingConfig {
            albedo,
            normal,
            depth,
            lights_buffer,
            output,
            viewport: PassHarness::viewport(),
        });
        pass
    }

    #[test]
    fn test_binds_gbuffer_and_lights_then_draws_fullscreen() {
        let mut harness = PassHarness::new();
        let mut pass = configured_pass(&mut harness);
        pass.plan();
        pass.execute(&mut harness.ctx()).unwrap();

        let ops = harness.recorded();
        assert!(matches!(&ops[0], RecordedOp::BeginPass { label, .. } if label == "lighting"));
        assert_eq!(ops[1], RecordedOp::SetViewport(PassHarness::viewport()));
        assert!(matches!(ops[2], RecordedOp::BindPipeline(_)));
        let textures_bound = ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::BindTexture { .. }))
            .count();
        assert_eq!(textures_bound, 3);
        assert!(ops
            .iter()
            .any(|op| matches!(op, RecordedOp::BindUniformBuffer { slot: 0, .. })));
        assert!(ops.contains(&RecordedOp::Draw { vertices: 3 }));
    }

    #[test]
    fn test_reads_and_writes_are_separated() {
        let mut harness = PassHarness::new();
        let mut pass = configured_pass(&mut harness);
        let io = pass.plan();
        // Three G-buffer inputs with two slots each, plus the lights buffer.
        assert_eq!(io.reads().len(), 7);
        // The output target, both slots.
        assert_eq!(io.writes().len(), 2);
    }
}
