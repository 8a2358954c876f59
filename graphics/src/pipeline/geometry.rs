//! Geometry pass: scene draws into the G-buffer.

use crate::error::{GraphicsError, GraphicsResult};
use crate::frame::FrameSlots;
use crate::graph::PassIo;
use crate::pipeline::{
    resolve_buffer, resolve_texture, DrawCall, PassExecuteContext, PassLifecycle, PassState,
};
use crate::backend::PassTarget;
use crate::resources::ResourceHandle;
use crate::types::Viewport;
use crate::RenderBackend;

/// Frame configuration of the geometry pass.
///
/// Targets are per-frame-slot; the pass declares every slot's target as a
/// write even though only the current slot is rendered, so the frame's
/// write set is independent of cursor position.
#[derive(Debug, Clone)]
pub struct GeometryConfig {
    pub albedo: FrameSlots<ResourceHandle>,
    pub normal: FrameSlots<ResourceHandle>,
    pub depth: FrameSlots<ResourceHandle>,
    pub draws: Vec<DrawCall>,
    pub clear_color: [f32; 4],
    pub viewport: Viewport,
}

/// Renders scene geometry into the G-buffer targets.
pub struct GeometryPass {
    lifecycle: PassLifecycle,
    config: Option<GeometryConfig>,
    io: PassIo,
}

impl GeometryPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("geometry"),
            config: None,
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    pub fn configure(&mut self, config: GeometryConfig) {
        self.lifecycle.on_configure();
        self.config = Some(config);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let config = self.config.as_ref().expect("configured pass has a config");
        let mut io = PassIo::new();
        for targets in [&config.albedo, &config.normal, &config.depth] {
            for &handle in targets.iter() {
                io.write(handle);
            }
        }
        for draw in &config.draws {
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
        let config = self.config.as_ref().expect("scheduled pass has a config");

        let albedo = *config.albedo.get(ctx.frame_slot);
        let normal = *config.normal.get(ctx.frame_slot);
        let depth = *config.depth.get(ctx.frame_slot);
        let targets = [
            PassTarget::cleared(
                resolve_texture(ctx.resources, albedo, "albedo target")?,
                config.clear_color,
            ),
            PassTarget::cleared(
                resolve_texture(ctx.resources, normal, "normal target")?,
                [0.0, 0.0, 0.0, 0.0],
            ),
            PassTarget::cleared(
                resolve_texture(ctx.resources, depth, "depth target")?,
                [1.0, 0.0, 0.0, 0.0],
            ),
        ];
        ctx.backend.begin_pass(ctx.encoder, "geometry", &targets)?;
        ctx.backend.set_viewport(ctx.encoder, config.viewport)?;

        {
            let materials = ctx.materials.read();
            for draw in &config.draws {
                let material = materials
                    .try_get(draw.material)
                    .ok_or(GraphicsError::StaleHandle("material"))?;
                ctx.backend.bind_pipeline(ctx.encoder, material.pipeline)?;
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
        }

        ctx.backend.end_pass(ctx.encoder)?;
        log::trace!("geometry: {} draws recorded", config.draws.len());

        let mut guard = ctx.resources.write();
        for handle in [albedo, normal, depth] {
            if let Some(texture) = guard
                .try_get_mut(handle, self.io.writes())
                .and_then(|resource| resource.as_texture_mut())
            {
                texture.written = true;
            }
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.lifecycle.reset();
        self.config = None;
        self.io = PassIo::new();
    }
}
