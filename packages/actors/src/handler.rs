//! Job handler trait and registry.

use bridge_core::Job;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Result type for job handlers. The error string becomes the job's `error`.
pub type HandlerResult = Result<Value, String>;

/// Future type for async job handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Trait for job handlers.
///
/// Implement this trait to define how jobs of one operation are processed.
pub trait JobHandler: Send + Sync + 'static {
    /// The operation this handler processes.
    fn operation(&self) -> &str;

    /// Process a job and return the result.
    fn handle(&self, job: &Job) -> HandlerFuture;
}

/// Registry for job handlers, keyed by operation.
#[derive(Default)]
pub struct JobHandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobHandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous handler for the operation.
    pub fn register<H: JobHandler>(&mut self, handler: H) {
        let operation = handler.operation().to_string();
        self.handlers.insert(operation, Arc::new(handler));
    }

    pub fn get(&self, operation: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(operation).cloned()
    }

    pub fn has_handler(&self, operation: &str) -> bool {
        self.handlers.contains_key(operation)
    }

    /// Registered operations, sorted.
    pub fn operations(&self) -> Vec<String> {
        let mut ops: Vec<String> = self.handlers.keys().cloned().collect();
        ops.sort();
        ops
    }
}

/// A simple function-based job handler.
pub struct FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    operation: String,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    pub fn new(operation: impl Into<String>, handler: F) -> Self {
        Self {
            operation: operation.into(),
            handler,
        }
    }
}

impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    fn operation(&self) -> &str {
        &self.operation
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        (self.handler)(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registry_lists_sorted_operations() {
        let mut registry = JobHandlerRegistry::new();
        registry.register(FnHandler::new("forecast", |_job: &Job| {
            Box::pin(async { Ok(json!(1)) }) as HandlerFuture
        }));
        registry.register(FnHandler::new("audit", |_job: &Job| {
            Box::pin(async { Ok(json!(2)) }) as HandlerFuture
        }));

        assert!(registry.has_handler("audit"));
        assert!(!registry.has_handler("missing"));
        assert_eq!(registry.operations(), vec!["audit", "forecast"]);
    }
}
