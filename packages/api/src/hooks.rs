//! Hook manager: a synchronous publish/subscribe bus for domain events.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use bridge_core::HookEvent;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

const STREAM_CAPACITY: usize = 1024;

/// Failure reported by a single subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("{0}")]
    Failed(String),

    #[error("subscriber panicked: {0}")]
    Panicked(String),
}

impl HookError {
    pub fn failed(message: impl Into<String>) -> Self {
        HookError::Failed(message.into())
    }
}

pub type HookResult = Result<(), HookError>;

/// A callback bound to an event.
pub trait Subscriber: Send + Sync + 'static {
    fn call(&self, event: &HookEvent) -> HookResult;
}

impl<F> Subscriber for F
where
    F: Fn(&HookEvent) -> HookResult + Send + Sync + 'static,
{
    fn call(&self, event: &HookEvent) -> HookResult {
        self(event)
    }
}

/// One subscriber that failed during an emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFailure {
    pub event: String,
    pub subscriber: String,
    pub error: HookError,
}

impl fmt::Display for SubscriberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on '{}': {}", self.subscriber, self.event, self.error)
    }
}

/// Aggregated result of an emit in which some subscribers failed.
///
/// Every subscriber still ran.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("{} subscriber(s) failed", .0.len())]
    SubscriberFailures(Vec<SubscriberFailure>),
}

impl EmitError {
    pub fn failures(&self) -> &[SubscriberFailure] {
        match self {
            EmitError::SubscriberFailures(failures) => failures,
        }
    }
}

#[derive(Clone)]
struct Binding {
    name: String,
    subscriber: Arc<dyn Subscriber>,
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Publish/subscribe bus keyed by event name.
///
/// Subscribers of one event run in subscription order. Each emit works on a
/// snapshot of the subscriber list, so callbacks may subscribe or emit
/// themselves.
pub struct HookManager {
    subscribers: RwLock<HashMap<String, Vec<Binding>>>,
    stream: broadcast::Sender<HookEvent>,
}

impl Default for HookManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HookManager {
    pub fn new() -> Self {
        let (stream, _) = broadcast::channel(STREAM_CAPACITY);
        Self {
            subscribers: RwLock::new(HashMap::new()),
            stream,
        }
    }

    /// Bind a callback to `event` under a display name.
    pub fn subscribe<F>(&self, event: impl Into<String>, name: impl Into<String>, callback: F)
    where
        F: Fn(&HookEvent) -> HookResult + Send + Sync + 'static,
    {
        self.add_subscriber(event, name, Arc::new(callback));
    }

    /// Bind any [`Subscriber`] implementation to `event`.
    pub fn add_subscriber(
        &self,
        event: impl Into<String>,
        name: impl Into<String>,
        subscriber: Arc<dyn Subscriber>,
    ) {
        let event = event.into();
        let name = name.into();
        tracing::debug!(event = %event, subscriber = %name, "Subscribed hook");

        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event)
            .or_default()
            .push(Binding { name, subscriber });
    }

    /// Invoke every subscriber of `event` with `data`.
    ///
    /// Returns the number of subscribers invoked, or the failures if any
    /// subscriber returned an error or panicked.
    pub fn emit(&self, event: &str, data: Value) -> Result<usize, EmitError> {
        let snapshot: Vec<Binding> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        let hook_event = HookEvent::new(event, data);
        let mut failures = Vec::new();

        for binding in &snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| binding.subscriber.call(&hook_event)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => HookError::Panicked(panic_message(panic.as_ref())),
            };
            tracing::warn!(event, subscriber = %binding.name, "Hook subscriber failed: {}", error);
            failures.push(SubscriberFailure {
                event: event.to_string(),
                subscriber: binding.name.clone(),
                error,
            });
        }

        // No stream listeners is fine.
        let _ = self.stream.send(hook_event);

        if failures.is_empty() {
            Ok(snapshot.len())
        } else {
            Err(EmitError::SubscriberFailures(failures))
        }
    }

    /// Emit from a route handler: subscriber failures are logged, never
    /// returned to the caller.
    pub fn publish(&self, event: &str, data: Value) {
        if let Err(e) = self.emit(event, data) {
            for failure in e.failures() {
                tracing::warn!("Ignoring hook failure: {}", failure);
            }
        }
    }

    /// Receive every emitted event, for async observers.
    pub fn stream(&self) -> broadcast::Receiver<HookEvent> {
        self.stream.subscribe()
    }

    /// Event name to subscriber names, in subscription order.
    pub fn bindings(&self) -> BTreeMap<String, Vec<String>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(event, bindings)| {
                let names = bindings.iter().map(|b| b.name.clone()).collect();
                (event.clone(), names)
            })
            .collect()
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }
}
