//! # Firethorn Demos
//!
//! Demo scenes showcasing the Firethorn renderer core.
//!
//! ## Available Demos
//!
//! - `deferred_frames` - Headless deferred frames driven from a producer thread

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
