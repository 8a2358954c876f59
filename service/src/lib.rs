//! # Firethorn Service
//!
//! The deferred command layer every Firethorn subsystem is built on.
//! Producer threads record work into [`CommandList`]s and submit them
//! through [`ServiceProxy`] handles; the owning service drains the queue
//! once per frame and publishes a monotonic progress counter that producers
//! can poll or wait on.
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | `command`  | [`CommandList`], [`ServiceApi`], [`OutSlot`]          |
//! | `core`     | [`ServiceCore`], [`ServiceProxy`], progress tickets   |
//! | `registry` | [`Service`] trait, [`ServiceRegistry`] frame driver   |
//! | `error`    | [`ServiceError`]                                      |

pub mod command;
pub mod core;
pub mod error;
pub mod registry;

pub use crate::command::{CommandList, OutSlot, ServiceApi};
pub use crate::core::{
    ServiceConfig, ServiceCore, ServiceProgress, ServiceProxy, DEFAULT_COMMAND_QUEUE_SLOTS,
};
pub use crate::error::{BoxedApiError, ServiceError, ServiceResult};
pub use crate::registry::{Service, ServiceRegistry};
