//! Protocol routes: cross-universe remix provenance.

use bridge_core::{BridgeRecord, TankManifest, event_names};
use serde_json::{Value, json};

use super::payload::optional_str;
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::error::HandlerError;

pub const TANK: &str = "protocols";
pub const CATEGORY: &str = "protocols";

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("cross_universe_register_bridge", "Register cross-universe provenance.")
        .route("cross_universe_get_provenance", "Retrieve cross-universe provenance.")
        .mutating()
        .requires(&BridgeRecord::REQUIRED_FIELDS)
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "cross_universe_register_bridge",
        route(
            ctx,
            "Register cross-universe provenance.\n\nPayload: {\"coin_id\", \"source_universe\", \"source_coin\", \"proof\"}. Returns {\"valid\"} plus \"missing\" or \"duplicate\" when rejected.",
            CATEGORY,
            register_bridge,
        ),
    );
    registry.register_route_once(
        "cross_universe_get_provenance",
        route(
            ctx,
            "Retrieve cross-universe provenance.\n\nPayload: {\"coin_id\"} or {\"source_universe\"}. Returns {\"records\"}.",
            CATEGORY,
            get_provenance,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

/// Non-empty text of a payload field. Scalars other than strings are
/// accepted in their JSON form; `null`, `false`, `0` and `""` count as
/// missing.
fn field_text(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Validate and store a bridge record, reporting rejections as data.
async fn validate_and_store(ctx: &RouteContext, payload: &Value) -> RouteResult {
    let missing: Vec<&str> = BridgeRecord::REQUIRED_FIELDS
        .into_iter()
        .filter(|key| field_text(payload, key).is_none())
        .collect();
    if !missing.is_empty() {
        return Ok(json!({ "valid": false, "missing": missing }));
    }

    let text = |key: &str| field_text(payload, key).unwrap_or_default();
    let record = BridgeRecord {
        coin_id: text("coin_id"),
        source_universe: text("source_universe"),
        source_coin: text("source_coin"),
        proof: text("proof"),
    };

    if !ctx.bridges.register(&record).await? {
        return Ok(json!({ "valid": false, "duplicate": true }));
    }

    tracing::info!(coin_id = %record.coin_id, "Registered bridge");
    Ok(json!({ "valid": true }))
}

async fn register_bridge(ctx: RouteContext, payload: Value) -> RouteResult {
    let result = validate_and_store(&ctx, &payload).await?;
    ctx.hooks.publish(event_names::BRIDGE_REGISTERED, result.clone());
    Ok(result)
}

async fn get_provenance(ctx: RouteContext, payload: Value) -> RouteResult {
    let non_empty = |key| optional_str(&payload, key).filter(|s| !s.trim().is_empty());
    let records = match (non_empty("coin_id"), non_empty("source_universe")) {
        (Some(coin_id), _) => ctx.bridges.for_coin(coin_id).await?,
        (None, Some(universe)) => ctx.bridges.from_universe(universe).await?,
        (None, None) => {
            return Err(HandlerError::invalid("coin_id or source_universe is required"));
        }
    };
    let records = serde_json::to_value(records)?;
    ctx.hooks.publish(event_names::PROVENANCE_RETURNED, records.clone());
    Ok(json!({ "records": records }))
}
