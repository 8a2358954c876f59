//! Overlay pass: 2D layers composited over the final image.

use crate::backend::PassTarget;
use crate::error::{GraphicsError, GraphicsResult};
use crate::frame::FrameSlots;
use crate::graph::PassIo;
use crate::pipeline::{
    resolve_texture, PassExecuteContext, PassLifecycle, PassState, PipelineKind,
};
use crate::resources::{OverlayHandle, ResourceHandle};
use crate::RenderBackend;

/// Frame configuration of the overlay pass.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub overlay: OverlayHandle,
    /// Final color target the overlay draws over, per frame slot.
    pub target: FrameSlots<ResourceHandle>,
}

/// Draws an overlay context's quads over the final target.
///
/// The target is preserved, not cleared; the overlay composites on top of
/// whatever the composition pass produced.
pub struct OverlayPass {
    lifecycle: PassLifecycle,
    config: Option<OverlayConfig>,
    io: PassIo,
}

impl OverlayPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("overlay"),
            config: None,
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    pub fn configure(&mut self, config: OverlayConfig) {
        self.lifecycle.on_configure();
        self.config = Some(config);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let config = self.config.as_ref().expect("configured pass has a config");
        let mut io = PassIo::new();
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

        let quad_count = {
            let overlays = ctx.overlays.read();
            let overlay = overlays
                .try_get(config.overlay)
                .ok_or(GraphicsError::StaleHandle("overlay"))?;
            log::trace!(
                "overlay: '{}' with {} quads",
                overlay.label,
                overlay.quad_count
            );
            overlay.quad_count
        };

        let output = *config.target.get(ctx.frame_slot);
        let target =
            PassTarget::preserved(resolve_texture(ctx.resources, output, "overlay target")?);
        let pipeline = ctx
            .pipelines
            .get_or_create(&mut *ctx.backend, PipelineKind::Overlay)?;

        ctx.backend.begin_pass(ctx.encoder, "overlay", &[target])?;
        ctx.backend.bind_pipeline(ctx.encoder, pipeline)?;
        if quad_count > 0 {
            ctx.backend.draw(ctx.encoder, quad_count * 6)?;
        }
        ctx.backend.end_pass(ctx.encoder)?;
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
    fn test_draws_six_vertices_per_quad_over_a_preserved_target() {
        let mut harness = PassHarness::new();
        let overlay = harness.add_overlay("hud", 3);
        let target = harness.add_frame_targets("final", 2);
        let mut pass = OverlayPass::new();
        pass.configure(OverlayConfig { overlay, target });
        pass.plan();
        pass.execute(&mut harness.ctx()).unwrap();

        let ops = harness.recorded();
        let RecordedOp::BeginPass { targets, .. } = &ops[0] else {
            panic!("expected a begin pass op");
        };
        assert_eq!(targets[0].clear, None);
        assert!(ops.contains(&RecordedOp::Draw { vertices: 18 }));
    }

    #[test]
    fn test_empty_overlay_records_no_draw() {
        let mut harness = PassHarness::new();
        let overlay = harness.add_overlay("empty", 0);
        let target = harness.add_frame_targets("final", 2);
        let mut pass = OverlayPass::new();
        pass.configure(OverlayConfig { overlay, target });
        pass.plan();
        pass.execute(&mut harness.ctx()).unwrap();

        let ops = harness.recorded();
        assert!(!ops.iter().any(|op| matches!(op, RecordedOp::Draw { .. })));
    }

    #[test]
    fn test_destroyed_overlay_fails_the_pass() {
        let mut harness = PassHarness::new();
        let overlay = harness.add_overlay("gone", 1);
        let target = harness.add_frame_targets("final", 2);
        let mut pass = OverlayPass::new();
        pass.configure(OverlayConfig { overlay, target });
        pass.plan();
        harness.overlays.eraser().erase(overlay);

        let err = pass.execute(&mut harness.ctx()).unwrap_err();
        assert!(matches!(err, GraphicsError::StaleHandle("overlay")));
    }
}
