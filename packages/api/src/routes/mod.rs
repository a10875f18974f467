//! Built-in route modules ("tanks").
//!
//! Each module owns a category, a manifest describing its routes and a
//! `register` function. Modules with long-running work also contribute job
//! operations.

pub mod consensus;
pub mod hypothesis;
pub mod introspection;
pub mod network;
pub mod protocols;
pub mod social;
pub mod system;

use std::future::Future;
use std::sync::{Arc, Weak};

use actors::{JobHandlerRegistry, JobSystem};
use db::Database;
use db::repositories::{
    BridgeRepository, EventLogRepository, FollowRepository, HypothesisRepository,
    JobHistoryRepository,
};
use serde_json::Value;

use crate::bridge::{FnRoute, RouteHandler, RouteRegistry, RouteResult};
use crate::error::HandlerError;
use crate::hooks::HookManager;
use crate::tanks::TankRegistry;

/// Everything a route handler may need. Cheap to clone.
#[derive(Clone)]
pub struct RouteContext {
    pub hooks: Arc<HookManager>,
    pub tanks: Arc<TankRegistry>,
    pub jobs: JobSystem,
    pub hypotheses: HypothesisRepository,
    pub bridges: BridgeRepository,
    pub follows: FollowRepository,
    pub events: EventLogRepository,
    pub history: JobHistoryRepository,
    /// Weak so the registry does not keep itself alive through its handlers.
    pub routes: Weak<RouteRegistry>,
}

impl RouteContext {
    pub fn new(
        db: &Database,
        hooks: Arc<HookManager>,
        tanks: Arc<TankRegistry>,
        jobs: JobSystem,
        routes: &Arc<RouteRegistry>,
    ) -> Self {
        Self {
            hooks,
            tanks,
            jobs,
            hypotheses: HypothesisRepository::new(db.clone()),
            bridges: BridgeRepository::new(db.clone()),
            follows: FollowRepository::new(db.clone()),
            events: EventLogRepository::new(db.clone()),
            history: JobHistoryRepository::new(db.clone()),
            routes: Arc::downgrade(routes),
        }
    }

    pub(crate) fn registry(&self) -> Result<Arc<RouteRegistry>, HandlerError> {
        self.routes
            .upgrade()
            .ok_or_else(|| HandlerError::Unavailable("route registry has been dropped".into()))
    }
}

/// Wrap an async fn of `(context, payload)` as a route handler.
pub(crate) fn route<F, Fut>(
    ctx: &RouteContext,
    doc: &str,
    category: &str,
    handler: F,
) -> Arc<dyn RouteHandler>
where
    F: Fn(RouteContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouteResult> + Send + 'static,
{
    let ctx = ctx.clone();
    Arc::new(FnRoute::new(doc, category, move |payload| {
        handler(ctx.clone(), payload)
    }))
}

/// Register every built-in module's routes and manifest.
pub fn register_all(registry: &RouteRegistry, ctx: &RouteContext) {
    system::register(registry, ctx);
    hypothesis::register(registry, ctx);
    introspection::register(registry, ctx);
    consensus::register(registry, ctx);
    network::register(registry, ctx);
    protocols::register(registry, ctx);
    social::register(registry, ctx);
}

/// Job operations behind the `queue_*` routes.
pub fn register_operations(
    handlers: &mut JobHandlerRegistry,
    hooks: &Arc<HookManager>,
    db: &Database,
) {
    introspection::register_operations(handlers, hooks, db);
    consensus::register_operations(handlers, hooks);
    network::register_operations(handlers, hooks);
}

/// Payload helpers shared by the route modules.
pub(crate) mod payload {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde_json::Value;

    use crate::error::HandlerError;

    /// A required, non-empty string field.
    pub fn required_str<'a>(payload: &'a Value, key: &str) -> Result<&'a str, HandlerError> {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| HandlerError::invalid(format!("{} is required", key)))
    }

    pub fn optional_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
        payload.get(key).and_then(Value::as_str)
    }

    /// The `validations` list; missing or `null` reads as empty.
    pub fn validations(payload: &Value) -> Result<&[Value], HandlerError> {
        match payload.get("validations") {
            None | Some(Value::Null) => Ok(&[]),
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(_) => Err(HandlerError::invalid("validations must be a list")),
        }
    }

    /// RFC 3339, or a naive ISO 8601 date-time taken as UTC.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
    }
}
