//! Errors raised to callers of the dispatcher.

use thiserror::Error;

/// Errors returned by `dispatch_route`.
///
/// Job failures are not errors here: they surface as `status: failed` data
/// in poll results.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Route '{route}' failed: {source}")]
    RouteExecution {
        route: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

impl DispatchError {
    /// Short machine-readable kind, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound(_) => "route_not_found",
            DispatchError::RouteExecution { .. } => "route_execution_error",
            DispatchError::JobNotFound(_) => "job_not_found",
        }
    }
}
