//! GPU backend abstraction layer.
//!
//! The rest of the crate never talks to a GPU API directly; everything goes
//! through the [`RenderBackend`] trait. Backend objects are referred to by
//! plain integer ids, which keeps the trait object-safe and lets the
//! resource tables stay backend-agnostic.
//!
//! # Architecture
//!
//! | Piece           | Purpose                                          |
//! |-----------------|--------------------------------------------------|
//! | `RenderBackend` | resource lifetime, command recording, submission |
//! | `*Id` newtypes  | opaque names for backend-owned objects           |
//! | `PassTarget`    | render target binding for `begin_pass`           |
//! | `dummy`         | in-memory backend used by tests and demos        |

mod error;

pub mod dummy;

pub use dummy::{DummyBackend, RecordedOp};
pub use error::{BackendError, BackendResult};

use crate::types::{BufferDescriptor, TextureDescriptor, Viewport};

/// Name of a backend buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

/// Name of a backend texture object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Name of a backend pipeline object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub u64);

/// Name of a backend command set, the recording unit submitted once per
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandSetId(pub u64);

/// Describes a pipeline to be created on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescriptor {
    /// Debug label carried through to backend objects and logs.
    pub label: String,
}

impl PipelineDescriptor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

/// One render target binding of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassTarget {
    pub texture: TextureId,
    /// Clear value applied when the pass opens, or `None` to keep the
    /// previous contents.
    pub clear: Option<[f32; 4]>,
}

impl PassTarget {
    pub fn cleared(texture: TextureId, clear: [f32; 4]) -> Self {
        Self {
            texture,
            clear: Some(clear),
        }
    }

    pub fn preserved(texture: TextureId) -> Self {
        Self {
            texture,
            clear: None,
        }
    }
}

/// A GPU backend implementation.
///
/// Creation and destruction take effect immediately. Recording methods
/// append to a command set; nothing reaches the GPU until
/// [`submit_command_set`](RenderBackend::submit_command_set) runs. The
/// drain thread is the only caller, so implementations need no interior
/// locking.
pub trait RenderBackend: Send + 'static {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferId>;

    /// Writes `data` into a buffer at `offset`.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) -> BackendResult<()>;

    /// Reads `len` bytes from a buffer at `offset`.
    fn read_buffer(&self, buffer: BufferId, offset: u64, len: u64) -> BackendResult<Vec<u8>>;

    fn destroy_buffer(&mut self, buffer: BufferId) -> BackendResult<()>;

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureId>;

    /// Replaces the full contents of a texture.
    fn write_texture(&mut self, texture: TextureId, data: &[u8]) -> BackendResult<()>;

    fn destroy_texture(&mut self, texture: TextureId) -> BackendResult<()>;

    fn create_pipeline(&mut self, desc: &PipelineDescriptor) -> BackendResult<PipelineId>;

    fn destroy_pipeline(&mut self, pipeline: PipelineId) -> BackendResult<()>;

    fn create_command_set(&mut self, label: &str) -> BackendResult<CommandSetId>;

    /// Discards everything recorded into the set since its last submission.
    fn reset_command_set(&mut self, set: CommandSetId) -> BackendResult<()>;

    fn destroy_command_set(&mut self, set: CommandSetId) -> BackendResult<()>;

    /// Opens a render pass targeting the given attachments.
    fn begin_pass(
        &mut self,
        set: CommandSetId,
        label: &str,
        targets: &[PassTarget],
    ) -> BackendResult<()>;

    /// Restricts rasterization of the open pass to `viewport`. A pass that
    /// never sets one rasterizes into the whole target.
    fn set_viewport(&mut self, set: CommandSetId, viewport: Viewport) -> BackendResult<()>;

    fn bind_pipeline(&mut self, set: CommandSetId, pipeline: PipelineId) -> BackendResult<()>;

    fn bind_vertex_buffer(&mut self, set: CommandSetId, buffer: BufferId) -> BackendResult<()>;

    fn bind_index_buffer(&mut self, set: CommandSetId, buffer: BufferId) -> BackendResult<()>;

    fn bind_uniform_buffer(
        &mut self,
        set: CommandSetId,
        slot: u32,
        buffer: BufferId,
    ) -> BackendResult<()>;

    fn bind_texture(&mut self, set: CommandSetId, slot: u32, texture: TextureId)
        -> BackendResult<()>;

    fn draw(&mut self, set: CommandSetId, vertices: u32) -> BackendResult<()>;

    fn draw_indexed(&mut self, set: CommandSetId, indices: u32) -> BackendResult<()>;

    /// Closes the open render pass.
    fn end_pass(&mut self, set: CommandSetId) -> BackendResult<()>;

    /// Hands the recorded set to the GPU.
    fn submit_command_set(&mut self, set: CommandSetId) -> BackendResult<()>;
}
