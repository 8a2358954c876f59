//! Graphics error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::pipeline::PassId;

/// Errors that can occur while executing graphics commands or the render
/// graph.
///
/// Contract violations (stale-handle lookups through the panicking table
/// accessors, scheduling a pass twice, mismatched frame phases) are not
/// errors; they panic. `GraphicsError` covers the failures a well-formed
/// producer can still run into at execution time.
#[derive(Error, Debug)]
pub enum GraphicsError {
    /// The GPU backend rejected an operation.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// A command referenced a handle that no longer resolves to a live
    /// table entry.
    #[error("stale {0} handle")]
    StaleHandle(&'static str),

    /// A command read an output slot that no earlier command fulfilled.
    #[error("command depends on a {0} that was never produced")]
    UnfulfilledDependency(&'static str),

    /// A buffer operation was pointed at a texture or vice versa.
    #[error("resource is a {actual}, expected a {expected}")]
    ResourceKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The graph had passes to run but no command set was bound.
    #[error("no command set is bound for graph execution")]
    NoCommandSetBound,

    /// The light upload pass was scheduled without a target buffer.
    #[error("light upload scheduled without a lights buffer")]
    NoLightsBuffer,

    /// A scheduled pass failed during graph execution.
    #[error("pass {pass:?} failed")]
    Pass {
        pass: PassId,
        #[source]
        source: Box<GraphicsError>,
    },
}

impl GraphicsError {
    /// Wraps an error with the pass it surfaced from.
    pub(crate) fn in_pass(self, pass: PassId) -> Self {
        Self::Pass {
            pass,
            source: Box::new(self),
        }
    }
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;
