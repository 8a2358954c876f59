//! Upload passes: CPU staged data into backend objects.
//!
//! The three upload passes run at the head of the frame and move bytes,
//! not draw commands; they record nothing into the command set. Staging is
//! keyed by destination, so restaging the same destination within one
//! frame keeps only the last write.

use std::collections::HashMap;

use crate::error::{GraphicsError, GraphicsResult};
use crate::graph::PassIo;
use crate::pipeline::{resolve_buffer, PassExecuteContext, PassLifecycle, PassState};
use crate::resources::{LightHandle, Resource, ResourceHandle};
use crate::RenderBackend;

struct StagedWrite {
    offset: u64,
    bytes: Vec<u8>,
}

/// Writes staged byte ranges into buffers.
pub struct BufferUploadPass {
    lifecycle: PassLifecycle,
    staged: HashMap<ResourceHandle, StagedWrite>,
    io: PassIo,
}

impl BufferUploadPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("buffer_upload"),
            staged: HashMap::new(),
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    /// Stages bytes for one buffer. A second stage of the same buffer in
    /// the same frame replaces the first.
    pub fn stage(&mut self, target: ResourceHandle, offset: u64, bytes: Vec<u8>) {
        self.lifecycle.on_configure();
        if self.staged.insert(target, StagedWrite { offset, bytes }).is_some() {
            log::debug!("buffer upload restaged for {:?}, keeping the last write", target);
        }
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let mut io = PassIo::new();
        for &target in self.staged.keys() {
            io.write(target);
        }
        self.io = io.clone();
        io
    }

    pub(crate) fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        self.lifecycle.on_execute();
        let mut guard = ctx.resources.write();
        for (&target, write) in &self.staged {
            let resource = guard
                .try_get_mut(target, self.io.writes())
                .ok_or(GraphicsError::StaleHandle("resource"))?;
            let buffer = match resource {
                Resource::Buffer(buffer) => buffer,
                Resource::Texture(_) => {
                    return Err(GraphicsError::ResourceKindMismatch {
                        expected: "buffer",
                        actual: "texture",
                    })
                }
            };
            ctx.backend
                .write_buffer(buffer.gpu, write.offset, &write.bytes)?;
            buffer.note_write(write.offset, write.bytes.len() as u64);
            log::trace!(
                "buffer upload: {} bytes at {} into '{}'",
                write.bytes.len(),
                write.offset,
                buffer.label
            );
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.lifecycle.reset();
        self.staged.clear();
        self.io = PassIo::new();
    }
}

/// Replaces the full contents of staged textures.
pub struct TextureUploadPass {
    lifecycle: PassLifecycle,
    staged: HashMap<ResourceHandle, Vec<u8>>,
    io: PassIo,
}

impl TextureUploadPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("texture_upload"),
            staged: HashMap::new(),
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    /// Stages full contents for one texture, last write wins.
    pub fn stage(&mut self, target: ResourceHandle, bytes: Vec<u8>) {
        self.lifecycle.on_configure();
        if self.staged.insert(target, bytes).is_some() {
            log::debug!("texture upload restaged for {:?}, keeping the last write", target);
        }
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let mut io = PassIo::new();
        for &target in self.staged.keys() {
            io.write(target);
        }
        self.io = io.clone();
        io
    }

    pub(crate) fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        self.lifecycle.on_execute();
        let mut guard = ctx.resources.write();
        for (&target, bytes) in &self.staged {
            let resource = guard
                .try_get_mut(target, self.io.writes())
                .ok_or(GraphicsError::StaleHandle("resource"))?;
            let texture = match resource {
                Resource::Texture(texture) => texture,
                Resource::Buffer(_) => {
                    return Err(GraphicsError::ResourceKindMismatch {
                        expected: "texture",
                        actual: "buffer",
                    })
                }
            };
            ctx.backend.write_texture(texture.gpu, bytes)?;
            texture.written = true;
            log::trace!(
                "texture upload: {} bytes into '{}'",
                bytes.len(),
                texture.label
            );
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.lifecycle.reset();
        self.staged.clear();
        self.io = PassIo::new();
    }
}

/// Packs staged lights into the frame's lights buffer.
///
/// Lights are packed in staging order as consecutive
/// [`LightData`](crate::resources::LightData) blocks starting at offset
/// zero.
pub struct LightUploadPass {
    lifecycle: PassLifecycle,
    target: Option<ResourceHandle>,
    staged: Vec<LightHandle>,
    io: PassIo,
}

impl LightUploadPass {
    pub(crate) fn new() -> Self {
        Self {
            lifecycle: PassLifecycle::new("light_upload"),
            target: None,
            staged: Vec::new(),
            io: PassIo::new(),
        }
    }

    pub fn state(&self) -> PassState {
        self.lifecycle.state()
    }

    /// Sets the destination lights buffer, last call wins.
    pub fn set_target(&mut self, target: ResourceHandle) {
        self.lifecycle.on_configure();
        self.target = Some(target);
    }

    /// Appends a light to this frame's upload.
    pub fn stage(&mut self, light: LightHandle) {
        self.lifecycle.on_configure();
        self.staged.push(light);
    }

    pub(crate) fn plan(&mut self) -> PassIo {
        self.lifecycle.on_plan();
        let mut io = PassIo::new();
        if let Some(target) = self.target {
            io.write(target);
        }
        self.io = io.clone();
        io
    }

    pub(crate) fn execute<B: RenderBackend>(
        &mut self,
        ctx: &mut PassExecuteContext<'_, B>,
    ) -> GraphicsResult<()> {
        self.lifecycle.on_execute();
        let target = self.target.ok_or(GraphicsError::NoLightsBuffer)?;

        let mut bytes = Vec::with_capacity(self.staged.len() * crate::resources::LightData::SIZE);
        {
            let lights = ctx.lights.read();
            for &handle in &self.staged {
                let light = lights
                    .try_get(handle)
                    .ok_or(GraphicsError::StaleHandle("light"))?;
                bytes.extend_from_slice(bytemuck::bytes_of(&light.data));
            }
        }

        let mut guard = ctx.resources.write();
        let resource = guard
            .try_get_mut(target, self.io.writes())
            .ok_or(GraphicsError::StaleHandle("resource"))?;
        let buffer = match resource {
            Resource::Buffer(buffer) => buffer,
            Resource::Texture(_) => {
                return Err(GraphicsError::ResourceKindMismatch {
                    expected: "buffer",
                    actual: "texture",
                })
            }
        };
        ctx.backend.write_buffer(buffer.gpu, 0, &bytes)?;
        buffer.note_write(0, bytes.len() as u64);
        log::trace!(
            "light upload: {} lights into '{}'",
            self.staged.len(),
            buffer.label
        );
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.lifecycle.reset();
        self.target = None;
        self.staged.clear();
        self.io = PassIo::new();
    }
}
