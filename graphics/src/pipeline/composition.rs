//! Composition pass: light accumulation and shadow mask into the final
//! target.

use crate::backend::PassTarget;
use crate::error::GraphicsResult;
use crate::frame::FrameSlots;
use crate::graph::PassIo;
use crate::pipeline::{
    resolve_texture, PassExecuteContext, PassLifecycle, PassState, PipelineKind,
};
use crate::resources::ResourceHandle;
use crate::types::Viewport;
use crate::RenderBackend;

/// Frame configuration of the composition pass.
#[derive(Debug, Clone)]
pub struct CompositionConfig {
    pub light_accumulation: FrameSlots<ResourceHandle>,
    /// Screen-space shadow mask; `None` when the frame has no shadow
    /// passes.
    pub shadow_mask: Option<FrameSlots<ResourceHandle>>,
    /// Final color target, per frame slot.
    pub target: FrameSlots<ResourceHandle>,
    pub viewport: Viewport,
}

/// Combines the deferred outputs into the frame's final image.
pub struct CompositionPass {
    lifecycle: PassLifecycle,
    config: Option<CompositionConfig>,
    io: PassIo,
}

impl CompositionPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("composition"),
            config: None,
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    pub fn configure(&mut self, config: CompositionConfig) {
        self.lifecycle.on_configure();
        self.config = Some(config);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let config = self.config.as_ref().expect("configured pass has a config");
        let mut io = PassIo::new();
        for &handle in config.light_accumulation.iter() {
            io.read(handle);
        }
        if let Some(mask) = &config.shadow_mask {
            for &handle in mask.iter() {
                io.read(handle);
            }
        }
        for &handle in config.target.iter() {
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

        let output = *config.target.get(ctx.frame_slot);
        let target = PassTarget::cleared(
            resolve_texture(ctx.resources, output, "final target")?,
            [0.0, 0.0, 0.0, 1.0],
        );
        let light_accumulation = resolve_texture(
            ctx.resources,
            *config.light_accumulation.get(ctx.frame_slot),
            "light accumulation",
        )?;
        let shadow_mask = match &config.shadow_mask {
            Some(mask) => Some(resolve_texture(
                ctx.resources,
                *mask.get(ctx.frame_slot),
                "shadow mask",
            )?),
            None => None,
        };
        let pipeline = ctx
            .pipelines
            .get_or_create(&mut *ctx.backend, PipelineKind::Composition)?;

        ctx.backend.begin_pass(ctx.encoder, "composition", &[target])?;
        ctx.backend.set_viewport(ctx.encoder, config.viewport)?;
        ctx.backend.bind_pipeline(ctx.encoder, pipeline)?;
        ctx.backend
            .bind_texture(ctx.encoder, 0, light_accumulation)?;
        if let Some(mask) = shadow_mask {
            ctx.backend.bind_texture(ctx.encoder, 1, mask)?;
        }
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

    #[test]
    fn test_composites_without_a_shadow_mask() {
        let mut harness = PassHarness::new();
        let light_accumulation = harness.add_frame_targets("light_acc", 2);
        let target = harness.add_frame_targets("final", 2);
        let mut pass = CompositionPass::new();
        pass.configure(CompositionConfig {
            light_accumulation,
            shadow_mask: None,
            target,
            viewport: PassHarness::viewport(),
        });
        pass.plan();
        pass.execute(&mut harness.ctx()).unwrap();

        let ops = harness.recorded();
        assert!(matches!(&ops[0], RecordedOp::BeginPass { label, .. } if label == "composition"));
        assert_eq!(ops[1], RecordedOp::SetViewport(PassHarness::viewport()));
        let textures_bound = ops
            .iter()
            .filter(|op| matches!(op, RecordedOp::BindTexture { .. }))
            .count();
        assert_eq!(textures_bound, 1);
    }

    #[test]
    fn test_shadow_mask_binds_to_slot_one() {
        let mut harness = PassHarness::new();
        let light_accumulation = harness.add_frame_targets("light_acc", 2);
        let shadow_mask = harness.add_frame_targets("shadow_mask", 2);
        let target = harness.add_frame_targets("final", 2);
        let mut pass = CompositionPass::new();
        pass.configure(CompositionConfig {
            light_accumulation,
            shadow_mask: Some(shadow_mask),
            target,
            viewport: PassHarness::viewport(),
        });
        pass.plan();
        pass.execute(&mut harness.ctx()).unwrap();

        let ops = harness.recorded();
        assert!(ops
            .iter()
            .any(|op| matches!(op, RecordedOp::BindTexture { slot: 1, .. })));
    }
}
