//! Backend-agnostic descriptor and value types.

mod buffer;
mod common;
mod texture;

pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{Extent2d, Viewport};
pub use texture::{TextureDescriptor, TextureFormat, TextureUsage};
