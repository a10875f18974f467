//! Introspection routes: full hypothesis audits, inline or as background jobs.

use std::sync::Arc;

use actors::JobHandlerRegistry;
use bridge_core::{TankManifest, event_names};
use chrono::Utc;
use db::Database;
use db::repositories::HypothesisRepository;
use serde_json::{Value, json};

use super::payload::required_str;
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::error::HandlerError;
use crate::hooks::HookManager;
use crate::jobs::{self, Operation};

pub const TANK: &str = "introspection";
pub const CATEGORY: &str = "introspection";
/// Job operation behind `queue_full_audit`.
pub const FULL_AUDIT: &str = "full_audit";

const PREVIEW_CHARS: usize = 120;

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("trigger_full_audit", "Run a full introspection audit.")
        .route("queue_full_audit", "Queue a full audit job.")
        .route("poll_full_audit", "Poll status of a full audit job.")
        .requires(&["hypothesis_id"])
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "trigger_full_audit",
        route(
            ctx,
            "Run a full introspection audit.\n\nPayload: {\"hypothesis_id\"}. Returns the audit bundle.",
            CATEGORY,
            trigger_full_audit,
        ),
    );
    registry.register_route_once(
        "queue_full_audit",
        route(
            ctx,
            "Queue a full audit job.\n\nPayload: {\"hypothesis_id\"}. Returns {\"job_id\"} immediately.",
            CATEGORY,
            queue_full_audit,
        ),
    );
    registry.register_route_once(
        "poll_full_audit",
        route(
            ctx,
            "Poll status of a full audit job.\n\nPayload: {\"job_id\"}. Returns {\"status\", \"result\"?, \"error\"?}.",
            CATEGORY,
            poll_full_audit,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

pub fn register_operations(
    handlers: &mut JobHandlerRegistry,
    hooks: &Arc<HookManager>,
    db: &Database,
) {
    let hooks = hooks.clone();
    let hypotheses = HypothesisRepository::new(db.clone());
    handlers.register(Operation::new(FULL_AUDIT, move |payload: Value| {
        let hooks = hooks.clone();
        let hypotheses = hypotheses.clone();
        async move { audit_and_publish(&hooks, &hypotheses, &payload).await }
    }));
}

/// Build the audit bundle for a stored hypothesis.
pub async fn run_full_audit(
    hypotheses: &HypothesisRepository,
    hypothesis_id: &str,
) -> Result<Value, HandlerError> {
    let hypothesis = super::hypothesis::load(hypotheses, hypothesis_id).await?;

    let text_preview: String = hypothesis.description.chars().take(PREVIEW_CHARS).collect();
    Ok(json!({
        "hypothesis_id": hypothesis.hypothesis_id,
        "text_preview": text_preview,
        "status": hypothesis.status,
        "score": hypothesis.score,
        "history_len": hypothesis.history.len(),
        "metadata": hypothesis.metadata(),
        "audited_at": Utc::now().to_rfc3339(),
    }))
}

async fn audit_and_publish(
    hooks: &HookManager,
    hypotheses: &HypothesisRepository,
    payload: &Value,
) -> RouteResult {
    let hypothesis_id = required_str(payload, "hypothesis_id")?;
    let bundle = run_full_audit(hypotheses, hypothesis_id).await?;
    hooks.publish(event_names::FULL_AUDIT_COMPLETED, bundle.clone());
    Ok(bundle)
}

async fn trigger_full_audit(ctx: RouteContext, payload: Value) -> RouteResult {
    audit_and_publish(&ctx.hooks, &ctx.hypotheses, &payload).await
}

async fn queue_full_audit(ctx: RouteContext, payload: Value) -> RouteResult {
    required_str(&payload, "hypothesis_id")?;
    jobs::queue_job(&ctx.jobs, FULL_AUDIT, payload).await
}

async fn poll_full_audit(ctx: RouteContext, payload: Value) -> RouteResult {
    jobs::poll_job(&ctx.jobs, Some(FULL_AUDIT), &payload).await
}
