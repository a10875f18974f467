//! Hypothesis routes: registration, scoring and ranking.

use bridge_core::{Hypothesis, TankManifest, event_names};
use db::DbError;
use db::repositories::HypothesisRepository;
use serde_json::{Value, json};

use super::payload::{optional_str, required_str};
use super::{RouteContext, route};
use crate::bridge::{RouteRegistry, RouteResult};
use crate::error::HandlerError;

pub const TANK: &str = "hypothesis";
pub const CATEGORY: &str = "hypothesis";

const DEFAULT_TOP_K: usize = 5;

pub fn manifest() -> TankManifest {
    TankManifest::new()
        .route("register_hypothesis", "Register a new hypothesis.")
        .route("update_hypothesis_score", "Update the score of a hypothesis.")
        .route("rank_hypotheses_by_confidence", "Rank hypotheses using confidence.")
        .route("detect_conflicting_hypotheses", "Flag open hypotheses that contradict each other.")
        .mutating()
}

pub fn register(registry: &RouteRegistry, ctx: &RouteContext) {
    registry.register_route_once(
        "register_hypothesis",
        route(
            ctx,
            "Register a new hypothesis.\n\nPayload: {\"text\" | \"hypothesis_text\": str, \"metadata\"?: object}. Returns {\"hypothesis_id\"}.",
            CATEGORY,
            register_hypothesis,
        ),
    );
    registry.register_route_once(
        "update_hypothesis_score",
        route(
            ctx,
            "Update the score of a hypothesis.\n\nPayload: {\"hypothesis_id\", \"new_score\": number, \"status\"?, \"reason\"?}. Returns {\"success\"}.",
            CATEGORY,
            update_hypothesis_score,
        ),
    );
    registry.register_route_once(
        "rank_hypotheses_by_confidence",
        route(
            ctx,
            "Rank hypotheses using confidence.\n\nPayload: {\"top_k\"?: int, default 5}. Returns {\"ranking\"}.",
            CATEGORY,
            rank_hypotheses_by_confidence,
        ),
    );
    registry.register_route_once(
        "detect_conflicting_hypotheses",
        route(
            ctx,
            "Flag open hypotheses that contradict each other.\n\nSimilar texts with diverging scores or disjoint supporting nodes conflict. Returns {\"conflicts\": [[id, id], ...]}.",
            CATEGORY,
            detect_conflicting_hypotheses,
        ),
    );

    ctx.tanks.register(TANK, manifest());
}

/// Load a hypothesis, mapping a missing record to `NotFound`.
pub(crate) async fn load(
    hypotheses: &HypothesisRepository,
    hypothesis_id: &str,
) -> Result<Hypothesis, HandlerError> {
    match hypotheses.get(hypothesis_id).await {
        Ok(hypothesis) => Ok(hypothesis),
        Err(DbError::NotFound(_)) => Err(HandlerError::NotFound(format!(
            "hypothesis {}",
            hypothesis_id
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn register_hypothesis(ctx: RouteContext, payload: Value) -> RouteResult {
    let text = ["text", "hypothesis_text"]
        .iter()
        .find_map(|key| optional_str(&payload, key))
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| HandlerError::invalid("text must be a non-empty string"))?;

    let metadata = match payload.get("metadata") {
        None | Some(Value::Null) => None,
        Some(m @ Value::Object(_)) => Some(m),
        Some(_) => return Err(HandlerError::invalid("metadata must be an object")),
    };

    let hypothesis = ctx
        .hypotheses
        .create(&Hypothesis::register(text, metadata))
        .await?;
    tracing::info!(hypothesis_id = %hypothesis.hypothesis_id, "Registered hypothesis");

    ctx.hooks.publish(
        event_names::HYPOTHESIS_REGISTERED,
        json!({ "hypothesis_id": hypothesis.hypothesis_id, "title": hypothesis.title }),
    );

    Ok(json!({ "hypothesis_id": hypothesis.hypothesis_id }))
}

async fn update_hypothesis_score(ctx: RouteContext, payload: Value) -> RouteResult {
    let hypothesis_id = required_str(&payload, "hypothesis_id")?;
    let new_score = payload
        .get("new_score")
        .and_then(Value::as_f64)
        .ok_or_else(|| HandlerError::invalid("new_score must be a number"))?;

    let mut hypothesis = load(&ctx.hypotheses, hypothesis_id).await?;
    hypothesis.apply_score(
        new_score,
        optional_str(&payload, "status"),
        optional_str(&payload, "reason"),
    );
    let hypothesis = ctx.hypotheses.update(&hypothesis).await?;

    ctx.hooks.publish(
        event_names::HYPOTHESIS_SCORE_UPDATED,
        json!({
            "hypothesis_id": hypothesis.hypothesis_id,
            "score": hypothesis.score,
            "status": hypothesis.status,
        }),
    );

    Ok(json!({ "success": true }))
}

/// `top_k` from the payload; missing, malformed or non-positive gives 5.
fn top_k(payload: &Value) -> usize {
    let raw = payload.get("top_k");
    raw.and_then(Value::as_i64)
        .or_else(|| raw.and_then(Value::as_str).and_then(|s| s.trim().parse().ok()))
        .filter(|k| *k > 0)
        .map_or(DEFAULT_TOP_K, |k| k as usize)
}

async fn rank_hypotheses_by_confidence(ctx: RouteContext, payload: Value) -> RouteResult {
    let top_k = top_k(&payload);
    let ranking: Vec<Value> = ctx
        .hypotheses
        .top_by_score(top_k)
        .await?
        .into_iter()
        .map(|h| {
            json!({
                "hypothesis_id": h.hypothesis_id,
                "title": h.title,
                "score": h.score,
                "status": h.status,
            })
        })
        .collect();

    ctx.hooks.publish(
        event_names::HYPOTHESIS_RANKING,
        json!({ "top_k": top_k, "ranking": ranking }),
    );

    Ok(json!({ "ranking": ranking }))
}

async fn detect_conflicting_hypotheses(ctx: RouteContext, _payload: Value) -> RouteResult {
    let open = ctx.hypotheses.with_status("open").await?;
    let mut conflicts = Vec::new();
    for (i, first) in open.iter().enumerate() {
        for second in &open[i + 1..] {
            if first.conflicts_with(second) {
                conflicts.push(json!([first.hypothesis_id, second.hypothesis_id]));
            }
        }
    }
    tracing::debug!(
        open = open.len(),
        conflicts = conflicts.len(),
        "Checked hypotheses for conflicts"
    );

    let conflicts = Value::Array(conflicts);
    ctx.hooks.publish(event_names::HYPOTHESIS_CONFLICTS, conflicts.clone());
    Ok(json!({ "conflicts": conflicts }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_k_defaults() {
        assert_eq!(top_k(&json!({})), 5);
        assert_eq!(top_k(&json!({"top_k": 0})), 5);
        assert_eq!(top_k(&json!({"top_k": -3})), 5);
        assert_eq!(top_k(&json!({"top_k": "abc"})), 5);
        assert_eq!(top_k(&json!({"top_k": "2"})), 2);
        assert_eq!(top_k(&json!({"top_k": 7})), 7);
    }
}
