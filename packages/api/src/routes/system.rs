//! System routes: introspection of the bridge itself.

use bridge_core::{TankManifest, event_names};
use serde_json::{Map, Value, json};

use super::payload::required_str;
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::error::HandlerError;
use crate::jobs;

pub const TANK: &str = "system";
pub const CATEGORY: &str = "system";

const DEFAULT_HISTORY_LIMIT: usize = 20;

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("list_routes", "Return the names of all registered routes.")
        .route("help", "Display available routes grouped by category.")
        .route("describe_routes", "Return each route name mapped to its documentation.")
        .route("healthz", "Report that the bridge is up.")
        .route("job_status", "Return the status of a background job.")
        .route("list_tanks", "Return the manifest of every registered tank.")
        .route("list_events", "Return the event name catalog.")
        .route("list_hooks", "Return hook subscribers grouped by event.")
        .route("log_event", "Log a system state event.")
        .route("get_event_log", "Return the logged events of a category.")
        .route("job_history", "Return archived jobs of an operation.")
        .mutating()
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "list_routes",
        route(ctx, "Return the names of all registered routes.", CATEGORY, list_routes),
    );
    registry.register_route_once(
        "help",
        route(ctx, "Display available routes grouped by category.", CATEGORY, help),
    );
    registry.register_route_once(
        "describe_routes",
        route(
            ctx,
            "Return each route name mapped to its documentation.",
            CATEGORY,
            describe_routes,
        ),
    );
    registry.register_route_once(
        "healthz",
        route(ctx, "Report that the bridge is up.", CATEGORY, healthz),
    );
    registry.register_route_once(
        "job_status",
        route(
            ctx,
            "Return the status of a background job.\n\nPayload: {\"job_id\": \"...\"}. Looks in every queue.",
            CATEGORY,
            job_status,
        ),
    );
    registry.register_route_once(
        "list_tanks",
        route(ctx, "Return the manifest of every registered tank.", CATEGORY, list_tanks),
    );
    registry.register_route_once(
        "list_events",
        route(ctx, "Return the event name catalog.", CATEGORY, list_events),
    );
    registry.register_route_once(
        "list_hooks",
        route(ctx, "Return hook subscribers grouped by event.", CATEGORY, list_hooks),
    );
    registry.register_route_once(
        "log_event",
        route(
            ctx,
            "Log a system state event.\n\nPayload: {\"category\": str, \"payload\": object}. Returns {\"category\", ...payload}.",
            CATEGORY,
            log_event,
        ),
    );
    registry.register_route_once(
        "get_event_log",
        route(
            ctx,
            "Return the logged events of a category.\n\nPayload: {\"category\"}. Returns {\"category\", \"events\"}, oldest first.",
            CATEGORY,
            get_event_log,
        ),
    );
    registry.register_route_once(
        "job_history",
        route(
            ctx,
            "Return archived jobs of an operation.\n\nPayload: {\"operation\", \"limit\"?: int, default 20}. Returns {\"operation\", \"counts\", \"jobs\"}, newest first.",
            CATEGORY,
            job_history,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

async fn list_routes(ctx: RouteContext, _payload: Value) -> RouteResult {
    let mut routes = ctx.registry()?.list_routes();
    routes.sort();
    Ok(json!({ "routes": routes }))
}

async fn help(ctx: RouteContext, _payload: Value) -> RouteResult {
    let categories: Map<String, Value> = ctx
        .registry()?
        .help()
        .into_iter()
        .map(|(category, routes)| {
            let entries: Vec<Value> = routes
                .into_iter()
                .map(|r| json!({ "name": r.name, "description": r.description, "doc": r.doc }))
                .collect();
            (category, Value::Array(entries))
        })
        .collect();
    Ok(json!({ "categories": categories }))
}

async fn describe_routes(ctx: RouteContext, _payload: Value) -> RouteResult {
    Ok(json!({ "routes": ctx.registry()?.describe_routes() }))
}

async fn healthz(_ctx: RouteContext, _payload: Value) -> RouteResult {
    Ok(json!({ "status": "ok" }))
}

async fn job_status(ctx: RouteContext, payload: Value) -> RouteResult {
    jobs::poll_job(&ctx.jobs, None, &payload).await
}

async fn list_tanks(ctx: RouteContext, _payload: Value) -> RouteResult {
    Ok(json!({ "tanks": ctx.tanks.all() }))
}

async fn list_events(_ctx: RouteContext, _payload: Value) -> RouteResult {
    let events: Map<String, Value> = event_names::CATALOG
        .iter()
        .map(|(name, id)| (name.to_string(), Value::from(*id)))
        .collect();
    Ok(json!({ "events": events }))
}

async fn list_hooks(ctx: RouteContext, _payload: Value) -> RouteResult {
    Ok(json!({ "hooks": ctx.hooks.bindings() }))
}

async fn log_event(ctx: RouteContext, payload: Value) -> RouteResult {
    let category = required_str(&payload, "category")?;
    let Some(Value::Object(fields)) = payload.get("payload") else {
        return Err(HandlerError::invalid("payload must be an object"));
    };

    let entry = ctx.events.append(category, fields.clone()).await?;
    tracing::debug!(category, "Logged system event");

    let mut logged = Map::new();
    logged.insert("category".to_string(), Value::from(category));
    logged.extend(entry.payload);
    let logged = Value::Object(logged);

    ctx.hooks.publish(event_names::AUDIT_LOG, logged.clone());
    Ok(logged)
}

async fn get_event_log(ctx: RouteContext, payload: Value) -> RouteResult {
    let category = required_str(&payload, "category")?;
    let events: Vec<Value> = ctx
        .events
        .for_category(category)
        .await?
        .iter()
        .map(|entry| entry.to_value())
        .collect();
    Ok(json!({ "category": category, "events": events }))
}

async fn job_history(ctx: RouteContext, payload: Value) -> RouteResult {
    let operation = required_str(&payload, "operation")?;
    let limit = payload
        .get("limit")
        .and_then(Value::as_u64)
        .filter(|limit| *limit > 0)
        .map_or(DEFAULT_HISTORY_LIMIT, |limit| limit as usize);

    let counts = ctx.history.count_by_status(operation).await?;
    let jobs: Vec<Value> = ctx
        .history
        .list(operation, limit)
        .await?
        .into_iter()
        .map(|record| {
            json!({
                "job_id": record.job_id,
                "status": record.final_status,
                "duration_ms": record.duration_ms,
                "error": record.error,
                "finished_at": record.finished_at,
            })
        })
        .collect();

    Ok(json!({ "operation": operation, "counts": counts, "jobs": jobs }))
}
