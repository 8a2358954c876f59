//! Backend error type.

use thiserror::Error;

use super::{BufferId, CommandSetId, PipelineId, TextureId};

/// Errors reported by a [`RenderBackend`](super::RenderBackend)
/// implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),

    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),

    #[error("unknown pipeline {0:?}")]
    UnknownPipeline(PipelineId),

    #[error("unknown command set {0:?}")]
    UnknownCommandSet(CommandSetId),

    #[error("write of {len} bytes at offset {offset} exceeds {size} byte buffer")]
    WriteOutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("read of {len} bytes at offset {offset} exceeds {size} byte buffer")]
    ReadOutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("zero-sized {0} is not allowed")]
    ZeroSized(&'static str),

    #[error("command set {0:?} has no open pass")]
    NoOpenPass(CommandSetId),

    #[error("command set {0:?} already has an open pass")]
    PassAlreadyOpen(CommandSetId),

    #[error("command set {0:?} submitted with an open pass")]
    SubmitWithOpenPass(CommandSetId),
}

pub type BackendResult<T> = Result<T, BackendError>;
