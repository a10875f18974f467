//! Route dispatch.

use std::sync::Arc;

use bridge_core::DispatchError;
use serde_json::Value;

use super::registry::RouteRegistry;
use crate::error::HandlerError;

/// Looks up routes by name and runs them.
///
/// The dispatcher never emits events itself; handlers decide what to publish.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteRegistry>,
}

impl Dispatcher {
    pub fn new(routes: Arc<RouteRegistry>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &Arc<RouteRegistry> {
        &self.routes
    }

    /// Run the handler registered under `name` with `payload`.
    pub async fn dispatch_route(&self, name: &str, payload: Value) -> Result<Value, DispatchError> {
        let handler = self
            .routes
            .get(name)
            .ok_or_else(|| DispatchError::RouteNotFound(name.to_string()))?;

        tracing::debug!(route = name, "Dispatching route");

        handler.invoke(payload).await.map_err(|e| match e {
            HandlerError::JobNotFound(job_id) => DispatchError::JobNotFound(job_id),
            other => {
                tracing::warn!(route = name, "Route failed: {}", other);
                DispatchError::RouteExecution {
                    route: name.to_string(),
                    source: Box::new(other),
                }
            }
        })
    }
}
