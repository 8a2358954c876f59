//! Read-only snapshot handle for producer threads.

use std::sync::Arc;

use crate::resources::{
    CommandSetHandle, LightHandle, LightKind, MaterialHandle, MaterialKind, OverlayHandle,
    ResourceHandle,
};
use crate::service::GraphicsContext;

/// Cheap, cloneable read access to the graphics tables and frame cursor.
///
/// Views never block the drain thread for long: queries take a table read
/// lock for the duration of one lookup, and the frame cursor is read
/// lock-free. A view cannot mutate anything; all mutation goes through
/// command lists.
#[derive(Clone)]
pub struct GraphicsView {
    ctx: Arc<GraphicsContext>,
}

impl GraphicsView {
    pub(crate) fn new(ctx: Arc<GraphicsContext>) -> Self {
        Self { ctx }
    }

    /// Frame slot the current cycle records into.
    pub fn current_frame_slot(&self) -> usize {
        self.ctx.frame.current()
    }

    /// Number of frame slots in rotation.
    pub fn frame_slot_count(&self) -> usize {
        self.ctx.frame.count()
    }

    pub fn contains_resource(&self, handle: ResourceHandle) -> bool {
        self.ctx.resources.contains(handle)
    }

    pub fn contains_material(&self, handle: MaterialHandle) -> bool {
        self.ctx.materials.contains(handle)
    }

    pub fn contains_light(&self, handle: LightHandle) -> bool {
        self.ctx.lights.contains(handle)
    }

    pub fn contains_command_set(&self, handle: CommandSetHandle) -> bool {
        self.ctx.command_sets.contains(handle)
    }

    pub fn contains_overlay(&self, handle: OverlayHandle) -> bool {
        self.ctx.overlays.contains(handle)
    }

    /// Number of live resources.
    pub fn resource_count(&self) -> usize {
        self.ctx.resources.len()
    }

    /// Number of live lights.
    pub fn light_count(&self) -> usize {
        self.ctx.lights.len()
    }

    /// Label of a live resource.
    pub fn resource_label(&self, handle: ResourceHandle) -> Option<String> {
        self.ctx
            .resources
            .read()
            .try_get(handle)
            .map(|resource| resource.label().to_string())
    }

    /// Shading kind of a live material.
    pub fn material_kind(&self, handle: MaterialHandle) -> Option<MaterialKind> {
        self.ctx
            .materials
            .read()
            .try_get(handle)
            .map(|material| material.kind)
    }

    /// Kind of a live light.
    pub fn light_kind(&self, handle: LightHandle) -> Option<LightKind> {
        self.ctx.lights.read().try_get(handle).map(|light| light.kind)
    }

    /// Whether a live light casts shadows.
    pub fn light_casts_shadows(&self, handle: LightHandle) -> Option<bool> {
        self.ctx
            .lights
            .read()
            .try_get(handle)
            .map(|light| light.casts_shadows)
    }
}
