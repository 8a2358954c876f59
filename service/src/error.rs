//! Service error type.

use thiserror::Error;

/// Boxed source error from a concrete service API.
pub type BoxedApiError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by a service's drain phases.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// A command closure returned an error; the cycle was aborted.
    #[error("command execution failed: {0}")]
    Command(#[source] BoxedApiError),

    /// Per-frame work after the command drain failed; the cycle was aborted.
    #[error("frame execution failed: {0}")]
    Frame(#[source] BoxedApiError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
