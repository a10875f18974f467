//! Name to handler table.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use bridge_core::{DEFAULT_CATEGORY, RouteInfo};
use serde_json::Value;

use crate::error::HandlerError;

/// Result type for route handlers.
pub type RouteResult = Result<Value, HandlerError>;

/// Future type for async route handlers.
pub type RouteFuture = Pin<Box<dyn Future<Output = RouteResult> + Send>>;

/// A callable bound to a route name.
pub trait RouteHandler: Send + Sync + 'static {
    fn invoke(&self, payload: Value) -> RouteFuture;

    /// Full documentation; its first line is the default description.
    fn doc(&self) -> &str {
        ""
    }

    /// Explicit one-line description overriding the first doc line.
    fn description(&self) -> Option<&str> {
        None
    }

    fn category(&self) -> &str {
        DEFAULT_CATEGORY
    }
}

/// A route handler built from an async closure.
pub struct FnRoute<F> {
    doc: String,
    description: Option<String>,
    category: String,
    handler: F,
}

impl<F, Fut> FnRoute<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouteResult> + Send + 'static,
{
    pub fn new(doc: impl Into<String>, category: impl Into<String>, handler: F) -> Self {
        Self {
            doc: doc.into(),
            description: None,
            category: category.into(),
            handler,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl<F, Fut> RouteHandler for FnRoute<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouteResult> + Send + 'static,
{
    fn invoke(&self, payload: Value) -> RouteFuture {
        Box::pin((self.handler)(payload))
    }

    fn doc(&self) -> &str {
        &self.doc
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn category(&self) -> &str {
        &self.category
    }
}

struct Entry {
    info: RouteInfo,
    handler: Arc<dyn RouteHandler>,
}

#[derive(Default)]
struct Table {
    /// Names in registration order.
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

/// Registry of routes. Shared by `Arc`; a single write lock covers both the
/// order list and the entries, so readers never see half a registration.
#[derive(Default)]
pub struct RouteRegistry {
    table: RwLock<Table>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(table: &mut Table, name: String, handler: Arc<dyn RouteHandler>) {
        let mut info = RouteInfo::new(name.clone(), handler.doc(), handler.category());
        if let Some(description) = handler.description() {
            info = info.with_description(description);
        }
        tracing::debug!(route = %name, category = %info.category, "Registered route");
        table.order.push(name.clone());
        table.entries.insert(name, Entry { info, handler });
    }

    /// Register `handler` under `name`.
    ///
    /// A name already bound to a different handler keeps its existing handler
    /// and a warning is logged. Returns whether the handler was inserted.
    pub fn register_route(&self, name: impl Into<String>, handler: Arc<dyn RouteHandler>) -> bool {
        let name = name.into();
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = table.entries.get(&name) {
            if !Arc::ptr_eq(&existing.handler, &handler) {
                tracing::warn!(route = %name, "Route already registered to another handler; ignoring");
            }
            return false;
        }

        Self::insert(&mut table, name, handler);
        true
    }

    /// Register `handler` only if `name` is free. Registering an existing
    /// name is a no-op, never an error. Returns whether it inserted.
    pub fn register_route_once(
        &self,
        name: impl Into<String>,
        handler: Arc<dyn RouteHandler>,
    ) -> bool {
        let name = name.into();
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);

        if table.entries.contains_key(&name) {
            tracing::debug!(route = %name, "Route already registered; keeping existing handler");
            return false;
        }

        Self::insert(&mut table, name, handler);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RouteHandler>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(name)
            .map(|e| e.handler.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .contains_key(name)
    }

    /// Route names in registration order.
    pub fn list_routes(&self) -> Vec<String> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .clone()
    }

    pub fn route_info(&self, name: &str) -> Option<RouteInfo> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(name)
            .map(|e| e.info.clone())
    }

    /// Route name to its handler's full doc.
    pub fn describe_routes(&self) -> BTreeMap<String, String> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(name, e)| (name.clone(), e.info.doc.clone()))
            .collect()
    }

    /// Routes grouped by category, each group sorted by name.
    pub fn help(&self) -> BTreeMap<String, Vec<RouteInfo>> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let mut categories: BTreeMap<String, Vec<RouteInfo>> = BTreeMap::new();
        for entry in table.entries.values() {
            categories
                .entry(entry.info.category.clone())
                .or_default()
                .push(entry.info.clone());
        }
        for routes in categories.values_mut() {
            routes.sort_by(|a, b| a.name.cmp(&b.name));
        }
        categories
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
