//! # Firethorn Core
//!
//! Handle, slot-table and access-token primitives shared by the Firethorn
//! renderer crates.

pub mod handle;
pub mod slots;
pub mod table;
pub mod token;

pub use handle::Handle;
pub use slots::SlotTable;
pub use table::{
    ResourceAdder, ResourceEraser, ResourceTable, TableReadGuard, TableWriteGuard,
};
pub use token::AccessToken;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
