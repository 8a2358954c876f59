//! In-memory backend used by tests, benchmarks and headless demos.
//!
//! [`DummyBackend`] allocates no GPU objects. Buffers and textures are plain
//! byte vectors, and command recording appends [`RecordedOp`] values that
//! tests inspect to check what a frame would have asked the GPU to do.

use std::collections::HashMap;

use super::{
    BackendError, BackendResult, BufferId, CommandSetId, PassTarget, PipelineDescriptor,
    PipelineId, RenderBackend, TextureId,
};
use crate::types::{BufferDescriptor, TextureDescriptor, Viewport};

/// One recorded command, in recording order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOp {
    BeginPass {
        label: String,
        targets: Vec<PassTarget>,
    },
    SetViewport(Viewport),
    BindPipeline(PipelineId),
    BindVertexBuffer(BufferId),
    BindIndexBuffer(BufferId),
    BindUniformBuffer {
        slot: u32,
        buffer: BufferId,
    },
    BindTexture {
        slot: u32,
        texture: TextureId,
    },
    Draw {
        vertices: u32,
    },
    DrawIndexed {
        indices: u32,
    },
    EndPass,
}

struct DummyBuffer {
    label: String,
    bytes: Vec<u8>,
}

struct DummyTexture {
    label: String,
    bytes: Vec<u8>,
}

struct DummyCommandSet {
    label: String,
    recording: Vec<RecordedOp>,
    submitted: Vec<RecordedOp>,
    pass_open: bool,
}

/// Backend that executes nothing and remembers everything.
#[derive(Default)]
pub struct DummyBackend {
    buffers: HashMap<BufferId, DummyBuffer>,
    textures: HashMap<TextureId, DummyTexture>,
    pipelines: HashMap<PipelineId, String>,
    sets: HashMap<CommandSetId, DummyCommandSet>,
    next_id: u64,
    submits: u64,
    last_submitted: Option<CommandSetId>,
}

impl DummyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn set_mut(&mut self, set: CommandSetId) -> BackendResult<&mut DummyCommandSet> {
        self.sets
            .get_mut(&set)
            .ok_or(BackendError::UnknownCommandSet(set))
    }

    /// Appends an op to a set, requiring an open pass.
    fn record(&mut self, set: CommandSetId, op: RecordedOp) -> BackendResult<()> {
        let state = self.set_mut(set)?;
        if !state.pass_open {
            return Err(BackendError::NoOpenPass(set));
        }
        state.recording.push(op);
        Ok(())
    }

    /// Contents of a buffer, or `None` after destruction.
    pub fn buffer_bytes(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.bytes.as_slice())
    }

    /// Contents of a texture, or `None` after destruction.
    pub fn texture_bytes(&self, texture: TextureId) -> Option<&[u8]> {
        self.textures.get(&texture).map(|t| t.bytes.as_slice())
    }

    /// Ops of the set's most recent submission.
    pub fn submitted_ops(&self, set: CommandSetId) -> Option<&[RecordedOp]> {
        self.sets.get(&set).map(|s| s.submitted.as_slice())
    }

    /// Ops of the most recently submitted set, whichever set that was.
    pub fn last_submitted_ops(&self) -> Option<&[RecordedOp]> {
        self.last_submitted.and_then(|set| self.submitted_ops(set))
    }

    pub fn pipeline_label(&self, pipeline: PipelineId) -> Option<&str> {
        self.pipelines.get(&pipeline).map(String::as_str)
    }

    /// Total number of command set submissions.
    pub fn submit_count(&self) -> u64 {
        self.submits
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn command_set_count(&self) -> usize {
        self.sets.len()
    }
}

impl RenderBackend for DummyBackend {
    fn name(&self) -> &str {
        "dummy"
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferId> {
        if desc.size == 0 {
            return Err(BackendError::ZeroSized("buffer"));
        }
        let id = BufferId(self.next_id());
        log::trace!("dummy: buffer {:?} '{}' ({} bytes)", id, desc.label, desc.size);
        self.buffers.insert(
            id,
            DummyBuffer {
                label: desc.label.clone(),
                bytes: vec![0; desc.size as usize],
            },
        );
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> BackendResult<()> {
        let state = self
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))?;
        let size = state.bytes.len() as u64;
        let len = data.len() as u64;
        if offset.checked_add(len).is_none_or(|end| end > size) {
            return Err(BackendError::WriteOutOfBounds { offset, len, size });
        }
        state.bytes[offset as usize..(offset + len) as usize].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferId, offset: u64, len: u64) -> BackendResult<Vec<u8>> {
        let state = self
            .buffers
            .get(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))?;
        let size = state.bytes.len() as u64;
        if offset.checked_add(len).is_none_or(|end| end > size) {
            return Err(BackendError::ReadOutOfBounds { offset, len, size });
        }
        Ok(state.bytes[offset as usize..(offset + len) as usize].to_vec())
    }

    fn destroy_buffer(&mut self, buffer: BufferId) -> BackendResult<()> {
        let state = self
            .buffers
            .remove(&buffer)
            .ok_or(BackendError::UnknownBuffer(buffer))?;
        log::trace!("dummy: buffer {:?} '{}' destroyed", buffer, state.label);
        Ok(())
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureId> {
        let size = desc.byte_size();
        if size == 0 {
            return Err(BackendError::ZeroSized("texture"));
        }
        let id = TextureId(self.next_id());
        log::trace!(
            "dummy: texture {:?} '{}' ({}x{}, {:?})",
            id,
            desc.label,
            desc.extent.width,
            desc.extent.height,
            desc.format
        );
        self.textures.insert(
            id,
            DummyTexture {
                label: desc.label.clone(),
                bytes: vec![0; size as usize],
            },
        );
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> BackendResult<()> {
        let state = self
            .textures
            .get_mut(&texture)
            .ok_or(BackendError::UnknownTexture(texture))?;
        let size = state.bytes.len() as u64;
        let len = data.len() as u64;
        if len != size {
            return Err(BackendError::WriteOutOfBounds {
                offset: 0,
                len,
                size,
            });
        }
        state.bytes.copy_from_slice(data);
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureId) -> BackendResult<()> {
        let state = self
            .textures
            .remove(&texture)
            .ok_or(BackendError::UnknownTexture(texture))?;
        log::trace!("dummy: texture {:?} '{}' destroyed", texture, state.label);
        Ok(())
    }

    fn create_pipeline(&mut self, desc: &PipelineDescriptor) -> BackendResult<PipelineId> {
        let id = PipelineId(self.next_id());
        log::trace!("dummy: pipeline {:?} '{}'", id, desc.label);
        self.pipelines.insert(id, desc.label.clone());
        Ok(id)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineId) -> BackendResult<()> {
        self.pipelines
            .remove(&pipeline)
            .ok_or(BackendError::UnknownPipeline(pipeline))?;
        Ok(())
    }

    fn create_command_set(&mut self, label: &str) -> BackendResult<CommandSetId> {
        let id = CommandSetId(self.next_id());
        log::trace!("dummy: command set {:?} '{}'", id, label);
        self.sets.insert(
            id,
            DummyCommandSet {
                label: label.to_string(),
                recording: Vec::new(),
                submitted: Vec::new(),
                pass_open: false,
            },
        );
        Ok(id)
    }

    fn reset_command_set(&mut self, set: CommandSetId) -> BackendResult<()> {
        let state = self.set_mut(set)?;
        state.recording.clear();
        state.pass_open = false;
        Ok(())
    }

    fn destroy_command_set(&mut self, set: CommandSetId) -> BackendResult<()> {
        let state = self
            .sets
            .remove(&set)
            .ok_or(BackendError::UnknownCommandSet(set))?;
        log::trace!("dummy: command set {:?} '{}' destroyed", set, state.label);
        Ok(())
    }

    fn begin_pass(
        &mut self,
        set: CommandSetId,
        label: &str,
        targets: &[PassTarget],
    ) -> BackendResult<()> {
        for target in targets {
            if !self.textures.contains_key(&target.texture) {
                return Err(BackendError::UnknownTexture(target.texture));
            }
        }
        let state = self.set_mut(set)?;
        if state.pass_open {
            return Err(BackendError::PassAlreadyOpen(set));
        }
        state.pass_open = true;
        state.recording.push(RecordedOp::BeginPass {
            label: label.to_string(),
            targets: targets.to_vec(),
        });
        Ok(())
    }

    fn set_viewport(&mut self, set: CommandSetId, viewport: Viewport) -> BackendResult<()> {
        self.record(set, RecordedOp::SetViewport(viewport))
    }

    fn bind_pipeline(&mut self, set: CommandSetId, pipeline: PipelineId) -> BackendResult<()> {
        if !self.pipelines.contains_key(&pipeline) {
            return Err(BackendError::UnknownPipeline(pipeline));
        }
        self.record(set, RecordedOp::BindPipeline(pipeline))
    }

    fn bind_vertex_buffer(&mut self, set: CommandSetId, buffer: BufferId) -> BackendResult<()> {
        if !self.buffers.contains_key(&buffer) {
            return Err(BackendError::UnknownBuffer(buffer));
        }
        self.record(set, RecordedOp::BindVertexBuffer(buffer))
    }

    fn bind_index_buffer(&mut self, set: CommandSetId, buffer: BufferId) -> BackendResult<()> {
        if !self.buffers.contains_key(&buffer) {
            return Err(BackendError::UnknownBuffer(buffer));
        }
        self.record(set, RecordedOp::BindIndexBuffer(buffer))
    }

    fn bind_uniform_buffer(
        &mut self,
        set: CommandSetId,
        slot: u32,
        buffer: BufferId,
    ) -> BackendResult<()> {
        if !self.buffers.contains_key(&buffer) {
            return Err(BackendError::UnknownBuffer(buffer));
        }
        self.record(set, RecordedOp::BindUniformBuffer { slot, buffer })
    }

    fn bind_texture(
        &mut self,
        set: CommandSetId,
        slot: u32,
        texture: TextureId,
    ) -> BackendResult<()> {
        if !self.textures.contains_key(&texture) {
            return Err(BackendError::UnknownTexture(texture));
        }
        self.record(set, RecordedOp::BindTexture { slot, texture })
    }

    fn draw(&mut self, set: CommandSetId, vertices: u32) -> BackendResult<()> {
        self.record(set, RecordedOp::Draw { vertices })
    }

    fn draw_indexed(&mut self, set: CommandSetId, indices: u32) -> BackendResult<()> {
        self.record(set, RecordedOp::DrawIndexed { indices })
    }

    fn end_pass(&mut self, set: CommandSetId) -> BackendResult<()> {
        let state = self.set_mut(set)?;
        if !state.pass_open {
            return Err(BackendError::NoOpenPass(set));
        }
        state.pass_open = false;
        state.recording.push(RecordedOp::EndPass);
        Ok(())
    }

    fn submit_command_set(&mut self, set: CommandSetId) -> BackendResult<()> {
        let state = self.set_mut(set)?;
        if state.pass_open {
            return Err(BackendError::SubmitWithOpenPass(set));
        }
        state.submitted = state.recording.clone();
        self.submits += 1;
        self.last_submitted = Some(set);
        log::trace!(
            "dummy: command set {:?} submitted ({} ops)",
            set,
            self.sets[&set].submitted.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferUsage, Extent2d, TextureFormat};

    fn buffer_desc(size: u64) -> BufferDescriptor {
        BufferDescriptor::new("test", size, BufferUsage::COPY_DST)
    }

    #[test]
    fn test_buffer_write_read_roundtrip() {
        let mut backend = DummyBackend::new();
        let buffer = backend.create_buffer(&buffer_desc(8)).unwrap();
        backend.write_buffer(buffer, 2, &[1, 2, 3]).unwrap();
        assert_eq!(backend.read_buffer(buffer, 0, 8).unwrap(), vec![
            0, 0, 1, 2, 3, 0, 0, 0
        ]);
    }

    #[test]
    fn test_out_of_bounds_write_is_rejected() {
        let mut backend = DummyBackend::new();
        let buffer = backend.create_buffer(&buffer_desc(4)).unwrap();
        let err = backend.write_buffer(buffer, 2, &[0; 4]).unwrap_err();
        assert_eq!(err, BackendError::WriteOutOfBounds {
            offset: 2,
            len: 4,
            size: 4
        });
    }

    #[test]
    fn test_destroyed_buffer_is_unknown() {
        let mut backend = DummyBackend::new();
        let buffer = backend.create_buffer(&buffer_desc(4)).unwrap();
        backend.destroy_buffer(buffer).unwrap();
        assert_eq!(
            backend.write_buffer(buffer, 0, &[1]).unwrap_err(),
            BackendError::UnknownBuffer(buffer)
        );
        assert_eq!(backend.buffer_count(), 0);
    }

    #[test]
    fn test_zero_sized_buffer_is_rejected() {
        let mut backend = DummyBackend::new();
        assert_eq!(
            backend.create_buffer(&buffer_desc(0)).unwrap_err(),
            BackendError::ZeroSized("buffer")
        );
    }

    #[test]
    fn test_recording_lands_in_submitted_ops() {
        let mut backend = DummyBackend::new();
        let set = backend.create_command_set("frame").unwrap();
        let pipeline = backend
            .create_pipeline(&PipelineDescriptor::new("geometry"))
            .unwrap();
        let target = backend
            .create_texture(&TextureDescriptor::render_target(
                "color",
                Extent2d::new(4, 4),
                TextureFormat::Rgba8Unorm,
            ))
            .unwrap();

        backend
            .begin_pass(set, "geometry", &[PassTarget::cleared(target, [0.0; 4])])
            .unwrap();
        backend
            .set_viewport(set, Viewport::of_extent(Extent2d::new(4, 4)))
            .unwrap();
        backend.bind_pipeline(set, pipeline).unwrap();
        backend.draw(set, 3).unwrap();
        backend.end_pass(set).unwrap();

        assert!(backend.submitted_ops(set).unwrap().is_empty());
        backend.submit_command_set(set).unwrap();
        assert_eq!(backend.submit_count(), 1);

        let ops = backend.submitted_ops(set).unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[1], RecordedOp::SetViewport(Viewport::new(0.0, 0.0, 4.0, 4.0)));
        assert_eq!(ops[2], RecordedOp::BindPipeline(pipeline));
        assert_eq!(ops[3], RecordedOp::Draw { vertices: 3 });
        assert_eq!(ops[4], RecordedOp::EndPass);
    }

    #[test]
    fn test_draw_outside_a_pass_is_rejected() {
        let mut backend = DummyBackend::new();
        let set = backend.create_command_set("frame").unwrap();
        assert_eq!(
            backend.draw(set, 3).unwrap_err(),
            BackendError::NoOpenPass(set)
        );
    }

    #[test]
    fn test_nested_passes_are_rejected() {
        let mut backend = DummyBackend::new();
        let set = backend.create_command_set("frame").unwrap();
        backend.begin_pass(set, "first", &[]).unwrap();
        assert_eq!(
            backend.begin_pass(set, "second", &[]).unwrap_err(),
            BackendError::PassAlreadyOpen(set)
        );
    }

    #[test]
    fn test_submit_with_open_pass_is_rejected() {
        let mut backend = DummyBackend::new();
        let set = backend.create_command_set("frame").unwrap();
        backend.begin_pass(set, "open", &[]).unwrap();
        assert_eq!(
            backend.submit_command_set(set).unwrap_err(),
            BackendError::SubmitWithOpenPass(set)
        );
    }

    #[test]
    fn test_reset_discards_recording_and_open_pass() {
        let mut backend = DummyBackend::new();
        let set = backend.create_command_set("frame").unwrap();
        backend.begin_pass(set, "stale", &[]).unwrap();
        backend.reset_command_set(set).unwrap();

        backend.begin_pass(set, "fresh", &[]).unwrap();
        backend.end_pass(set).unwrap();
        backend.submit_command_set(set).unwrap();

        let ops = backend.submitted_ops(set).unwrap();
        assert!(matches!(&ops[0], RecordedOp::BeginPass { label, .. } if label == "fresh"));
    }

    #[test]
    fn test_texture_write_requires_exact_size() {
        let mut backend = DummyBackend::new();
        let texture = backend
            .create_texture(&TextureDescriptor::new(
                "tiny",
                Extent2d::new(2, 2),
                TextureFormat::R8Unorm,
                crate::types::TextureUsage::SAMPLED | crate::types::TextureUsage::COPY_DST,
            ))
            .unwrap();
        assert!(backend.write_texture(texture, &[1, 2, 3]).is_err());
        backend.write_texture(texture, &[1, 2, 3, 4]).unwrap();
        assert_eq!(backend.texture_bytes(texture).unwrap(), &[1, 2, 3, 4]);
    }
}
