//! Errors raised by route handlers.

use actors::ActorError;
use db::DbError;
use thiserror::Error;

/// Failure inside a route handler or job operation.
///
/// The dispatcher wraps these in `DispatchError::RouteExecution`, except
/// `JobNotFound`, which callers see as `DispatchError::JobNotFound`.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Job queue error: {0}")]
    Queue(#[from] ActorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl HandlerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        HandlerError::InvalidPayload(message.into())
    }
}
