//! # Firethorn Graphics
//!
//! Deferred renderer built on the Firethorn command-service layer.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GraphicsService`] - Drains command lists and renders one frame per update
//! - [`GraphicsCommands`] - Builder methods producers call on a command list
//! - [`RenderGraph`] - Per-frame ordering of the fixed deferred pass roster
//! - [`RenderBackend`] - Trait for graphics backend implementations, with
//!   [`DummyBackend`] for tests and headless runs
//!
//! ## Example
//!
//! ```ignore
//! use firethorn_graphics::{DummyBackend, GraphicsCommands, GraphicsConfig, GraphicsService};
//! use firethorn_service::Service;
//!
//! let mut service = GraphicsService::new(&GraphicsConfig::default(), DummyBackend::new());
//! let proxy = service.proxy();
//!
//! let mut list = proxy.create_command_list();
//! let vertices = list.create_vertex_buffer("triangle", &positions);
//! proxy.submit_command_list(list);
//!
//! service.update()?; // drains the list and renders the frame
//! ```

pub mod backend;
pub mod error;
pub mod frame;
pub mod graph;
pub mod pipeline;
pub mod resources;
pub mod service;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendError, DummyBackend, RenderBackend};
pub use error::{GraphicsError, GraphicsResult};
pub use frame::{FrameSlots, DEFAULT_FRAME_SLOTS};
pub use graph::{PassIo, RenderGraph};
pub use pipeline::{PassId, PassState};
pub use resources::{
    CommandSetHandle, Light, LightData, LightHandle, LightKind, Material, MaterialHandle,
    MaterialKind, MaterialParams, OverlayHandle, ResourceHandle,
};
pub use service::{
    CompositionPassDesc, DrawDesc, GeometryPassDesc, GraphicsApi, GraphicsCommandList,
    GraphicsCommands, GraphicsConfig, GraphicsProxy, GraphicsService, GraphicsView,
    LightingPassDesc, OverlayPassDesc, ShadowCompositionPassDesc, ShadowingPassDesc,
};
pub use types::{
    BufferDescriptor, BufferUsage, Extent2d, TextureDescriptor, TextureFormat, TextureUsage,
    Viewport,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before creating any graphics service.
pub fn init() {
    log::info!("Firethorn Graphics v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_render_graph_creation() {
        let graph = RenderGraph::new();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_dummy_backend() {
        let backend = DummyBackend::new();
        assert!(backend.name() == "dummy");
    }
}
