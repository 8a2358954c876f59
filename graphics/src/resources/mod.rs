//! Table-resident graphics objects and their handle aliases.
//!
//! Five tables back the graphics service, one per object family:
//!
//! | Table          | Value type       | Backed by GPU object |
//! |----------------|------------------|----------------------|
//! | resources      | [`Resource`]     | buffer or texture    |
//! | materials      | [`Material`]     | pipeline (shared)    |
//! | lights         | [`Light`]        | none                 |
//! | command sets   | [`CommandSet`]   | command set          |
//! | overlays       | [`OverlayContext`] | none               |
//!
//! Producer threads hold handles, never the objects themselves; all access
//! goes through the tables' guards.

mod light;
mod material;

pub use light::{Light, LightData, LightKind};
pub use material::{Material, MaterialKind, MaterialParams};

use firethorn_core::Handle;

use crate::backend::{BufferId, CommandSetId, TextureId};
use crate::types::{BufferUsage, Extent2d, TextureFormat, TextureUsage};

pub type ResourceHandle = Handle<Resource>;
pub type MaterialHandle = Handle<Material>;
pub type LightHandle = Handle<Light>;
pub type CommandSetHandle = Handle<CommandSet>;
pub type OverlayHandle = Handle<OverlayContext>;

/// CPU-side record of a backend buffer.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
    pub gpu: BufferId,
    /// Byte high-water mark of uploads, kept for validation and stats.
    pub written: u64,
}

impl Buffer {
    /// Records an upload touching `[offset, offset + len)`.
    pub fn note_write(&mut self, offset: u64, len: u64) {
        self.written = self.written.max(offset + len);
    }
}

/// CPU-side record of a backend texture.
#[derive(Debug, Clone)]
pub struct Texture {
    pub label: String,
    pub extent: Extent2d,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub gpu: TextureId,
    /// Whether the texture has received an upload.
    pub written: bool,
}

/// A buffer or texture owned by the resources table.
#[derive(Debug, Clone)]
pub enum Resource {
    Buffer(Buffer),
    Texture(Texture),
}

impl Resource {
    pub fn label(&self) -> &str {
        match self {
            Self::Buffer(buffer) => &buffer.label,
            Self::Texture(texture) => &texture.label,
        }
    }

    /// Name of the resource's kind, used in errors and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Buffer(_) => "buffer",
            Self::Texture(_) => "texture",
        }
    }

    pub fn as_buffer(&self) -> Option<&Buffer> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            Self::Texture(_) => None,
        }
    }

    pub fn as_buffer_mut(&mut self) -> Option<&mut Buffer> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            Self::Texture(_) => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Buffer(_) => None,
        }
    }

    pub fn as_texture_mut(&mut self) -> Option<&mut Texture> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Buffer(_) => None,
        }
    }
}

/// A command set registered in the command sets table.
#[derive(Debug, Clone)]
pub struct CommandSet {
    pub label: String,
    pub gpu: CommandSetId,
}

/// A 2D overlay layer composited after the deferred passes.
#[derive(Debug, Clone)]
pub struct OverlayContext {
    pub label: String,
    /// Quads drawn when the overlay pass runs.
    pub quad_count: u32,
}

impl OverlayContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            quad_count: 0,
        }
    }
}
